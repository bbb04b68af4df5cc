//! Generated accessor names
//!
//! A property `color` answers to `getColor`, `setColor`, `resetColor`,
//! `initColor`, `styleColor`, `unstyleColor`, `computeColor` and
//! `toggleColor`. Protected (`_color`) and private (`__color`) names keep
//! their prefix in front of the verb: `_setColor`, `__getColor`.

/// Kind of generated accessor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorKind {
    Get,
    Set,
    Reset,
    Init,
    Style,
    Unstyle,
    Compute,
    Toggle,
}

impl AccessorKind {
    /// All kinds
    pub const ALL: [AccessorKind; 8] = [
        AccessorKind::Get,
        AccessorKind::Set,
        AccessorKind::Reset,
        AccessorKind::Init,
        AccessorKind::Style,
        AccessorKind::Unstyle,
        AccessorKind::Compute,
        AccessorKind::Toggle,
    ];

    /// Verb prefix
    pub fn prefix(self) -> &'static str {
        match self {
            AccessorKind::Get => "get",
            AccessorKind::Set => "set",
            AccessorKind::Reset => "reset",
            AccessorKind::Init => "init",
            AccessorKind::Style => "style",
            AccessorKind::Unstyle => "unstyle",
            AccessorKind::Compute => "compute",
            AccessorKind::Toggle => "toggle",
        }
    }
}

fn split_visibility(name: &str) -> (&str, &str) {
    let stripped = name.trim_start_matches('_');
    let underscores = (name.len() - stripped.len()).min(2);
    name.split_at(underscores)
}

/// Accessor name for a property
pub fn accessor_name(kind: AccessorKind, property: &str) -> String {
    let (visibility, base) = split_visibility(property);
    let mut chars = base.chars();
    let mut name = String::with_capacity(property.len() + 8);
    name.push_str(visibility);
    name.push_str(kind.prefix());
    if let Some(first) = chars.next() {
        name.extend(first.to_uppercase());
        name.push_str(chars.as_str());
    }
    name
}

/// Split an accessor name into its kind and property name
///
/// Returns `None` when the name does not follow the accessor convention.
pub fn parse_accessor(name: &str) -> Option<(AccessorKind, String)> {
    let (visibility, rest) = split_visibility(name);
    for kind in AccessorKind::ALL {
        let Some(tail) = rest.strip_prefix(kind.prefix()) else {
            continue;
        };
        let mut chars = tail.chars();
        let Some(first) = chars.next() else {
            continue;
        };
        if !first.is_uppercase() {
            continue;
        }
        let mut property = String::with_capacity(name.len());
        property.push_str(visibility);
        property.extend(first.to_lowercase());
        property.push_str(chars.as_str());
        return Some((kind, property));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessor_names() {
        assert_eq!(accessor_name(AccessorKind::Get, "color"), "getColor");
        assert_eq!(accessor_name(AccessorKind::Unstyle, "textColor"), "unstyleTextColor");
        assert_eq!(accessor_name(AccessorKind::Set, "_enabled"), "_setEnabled");
        assert_eq!(accessor_name(AccessorKind::Toggle, "__open"), "__toggleOpen");
    }

    #[test]
    fn test_parse_accessor() {
        assert_eq!(
            parse_accessor("resetTextColor"),
            Some((AccessorKind::Reset, "textColor".to_string()))
        );
        assert_eq!(
            parse_accessor("__initOpen"),
            Some((AccessorKind::Init, "__open".to_string()))
        );
        assert_eq!(parse_accessor("settle"), None);
        assert_eq!(parse_accessor("get"), None);
        assert_eq!(parse_accessor("speak"), None);
    }

    #[test]
    fn test_unstyle_not_parsed_as_other_verb() {
        assert_eq!(
            parse_accessor("unstyleWidth"),
            Some((AccessorKind::Unstyle, "width".to_string()))
        );
    }
}
