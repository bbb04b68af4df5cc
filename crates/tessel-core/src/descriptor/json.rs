//! JSON class descriptors
//!
//! Data-only parts of a class can be declared as a JSON document:
//!
//! ```json
//! {
//!   "extend": "app.Widget",
//!   "include": ["app.MSizable"],
//!   "properties": {
//!     "label": { "check": "String", "init": "", "event": "changeLabel" }
//!   },
//!   "events": { "changeLabel": "app.DataEvent" }
//! }
//! ```
//!
//! In checked mode unknown keys and `null` values are rejected. Unchecked
//! documents skip both, but a value of the wrong type is always an error.

use super::{ClassDescriptor, ClassKind, PropertyDescriptor, Static};
use crate::error::{RuntimeError, RuntimeResult};
use crate::options::Validation;
use crate::property::PropertyCheck;
use crate::value::Value;
use serde_json::{Map, Value as Json};

const CLASS_KEYS: &[&str] = &[
    "type",
    "extend",
    "implement",
    "include",
    "statics",
    "properties",
    "events",
    "settings",
    "autoDispose",
];

const PROPERTY_KEYS: &[&str] = &[
    "check",
    "nullable",
    "init",
    "themeable",
    "apply",
    "event",
    "compute",
    "dispose",
    "refine",
];

struct Reader<'a> {
    target: &'a str,
    validation: Validation,
}

impl<'a> Reader<'a> {
    fn error(&self, message: String) -> RuntimeError {
        RuntimeError::configuration(self.target, message)
    }

    /// Present, non-null entries of a map; rejects unknown keys and nulls in checked mode
    fn entries<'m>(
        &self,
        map: &'m Map<String, Json>,
        allowed: Option<&[&str]>,
    ) -> RuntimeResult<Vec<(&'m String, &'m Json)>> {
        let mut out = Vec::with_capacity(map.len());
        for (key, value) in map {
            if let Some(allowed) = allowed {
                if !allowed.contains(&key.as_str()) {
                    if self.validation.is_checked() {
                        return Err(self.error(format!("the configuration key \"{}\" is not allowed", key)));
                    }
                    continue;
                }
            }
            if value.is_null() {
                if self.validation.is_checked() {
                    return Err(self.error(format!("the configuration key \"{}\" is null", key)));
                }
                continue;
            }
            out.push((key, value));
        }
        Ok(out)
    }

    fn object<'m>(&self, key: &str, value: &'m Json) -> RuntimeResult<&'m Map<String, Json>> {
        value
            .as_object()
            .ok_or_else(|| self.error(format!("\"{}\" must be a map", key)))
    }

    fn string<'m>(&self, key: &str, value: &'m Json) -> RuntimeResult<&'m str> {
        value
            .as_str()
            .ok_or_else(|| self.error(format!("\"{}\" must be a string", key)))
    }

    fn boolean(&self, key: &str, value: &Json) -> RuntimeResult<bool> {
        value
            .as_bool()
            .ok_or_else(|| self.error(format!("\"{}\" must be a boolean", key)))
    }

    /// A single name or a list of names
    fn names(&self, key: &str, value: &Json) -> RuntimeResult<Vec<String>> {
        match value {
            Json::String(name) => Ok(vec![name.clone()]),
            Json::Array(items) => items
                .iter()
                .map(|item| self.string(key, item).map(str::to_string))
                .collect(),
            _ => Err(self.error(format!("\"{}\" must be a name or a list of names", key))),
        }
    }

    fn property(&self, name: &str, value: &Json) -> RuntimeResult<PropertyDescriptor> {
        let map = self.object(name, value)?;
        let mut desc = PropertyDescriptor::new();
        for (key, value) in self.entries(map, Some(PROPERTY_KEYS))? {
            match key.as_str() {
                "check" => {
                    let check = self.string(key, value)?;
                    desc.check = Some(
                        check
                            .parse::<PropertyCheck>()
                            .map_err(|e| self.error(format!("property \"{}\": {}", name, e)))?,
                    );
                }
                "nullable" => desc.nullable = Some(self.boolean(key, value)?),
                "init" => desc.init = Some(Value::from_json(value)),
                "themeable" => desc.themeable = Some(self.boolean(key, value)?),
                "apply" => desc.apply = Some(self.string(key, value)?.to_string()),
                "event" => desc.event = Some(self.string(key, value)?.to_string()),
                "compute" => desc.compute = Some(self.string(key, value)?.to_string()),
                "dispose" => desc.dispose = Some(self.boolean(key, value)?),
                "refine" => desc.refine = self.boolean(key, value)?,
                _ => {}
            }
        }
        Ok(desc)
    }
}

impl ClassDescriptor {
    /// Parse the data-only parts of a class from JSON
    ///
    /// `target` names the class in error messages.
    pub fn from_json(target: &str, doc: &Json, validation: Validation) -> RuntimeResult<Self> {
        let reader = Reader { target, validation };
        let map = reader.object("class", doc)?;
        let mut desc = ClassDescriptor::new();

        for (key, value) in reader.entries(map, Some(CLASS_KEYS))? {
            match key.as_str() {
                "type" => {
                    let kind = reader.string(key, value)?;
                    desc.kind = Some(kind.parse::<ClassKind>().map_err(|e| reader.error(e))?);
                }
                "extend" => desc.extend = Some(reader.string(key, value)?.to_string()),
                "implement" => desc.implement = reader.names(key, value)?,
                "include" => desc.include = reader.names(key, value)?,
                "statics" => {
                    for (name, value) in reader.entries(reader.object(key, value)?, None)? {
                        desc.statics
                            .push((name.clone(), Static::Value(Value::from_json(value))));
                    }
                }
                "properties" => {
                    for (name, value) in reader.entries(reader.object(key, value)?, None)? {
                        desc.properties.push((name.clone(), reader.property(name, value)?));
                    }
                }
                "events" => {
                    for (name, value) in reader.entries(reader.object(key, value)?, None)? {
                        let event_type = reader.string(name, value)?;
                        desc.events.push((name.clone(), event_type.to_string()));
                    }
                }
                "settings" => {
                    for (name, value) in reader.entries(reader.object(key, value)?, None)? {
                        desc.settings.push((name.clone(), Value::from_json(value)));
                    }
                }
                "autoDispose" => desc.auto_dispose = Some(reader.boolean(key, value)?),
                _ => {}
            }
        }
        Ok(desc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_document() {
        let doc = json!({
            "type": "abstract",
            "extend": "app.Base",
            "implement": "app.IShape",
            "include": ["app.MColor", "app.MSize"],
            "statics": { "SIDES": 4 },
            "properties": {
                "label": { "check": "String", "init": "box", "themeable": true, "event": "changeLabel" },
                "width": { "refine": true, "init": 10 }
            },
            "events": { "changeLabel": "app.DataEvent" },
            "settings": { "app.sides": 4 }
        });
        let desc = ClassDescriptor::from_json("app.Box", &doc, Validation::Checked).unwrap();

        assert_eq!(desc.kind, Some(ClassKind::Abstract));
        assert_eq!(desc.extend.as_deref(), Some("app.Base"));
        assert_eq!(desc.implement, vec!["app.IShape"]);
        assert_eq!(desc.include, vec!["app.MColor", "app.MSize"]);
        assert_eq!(desc.events, vec![("changeLabel".to_string(), "app.DataEvent".to_string())]);

        let (_, label) = desc.properties.iter().find(|(n, _)| n == "label").unwrap();
        assert_eq!(label.check, Some(PropertyCheck::String));
        assert_eq!(label.themeable, Some(true));
        assert_eq!(label.init, Some(Value::from("box")));

        let (_, width) = desc.properties.iter().find(|(n, _)| n == "width").unwrap();
        assert!(width.is_refine());
    }

    #[test]
    fn test_checked_rejects_unknown_key() {
        let doc = json!({ "extend": "app.Base", "extends": "typo" });
        let err = ClassDescriptor::from_json("app.X", &doc, Validation::Checked).unwrap_err();
        assert!(matches!(err, RuntimeError::Configuration { .. }));

        let desc = ClassDescriptor::from_json("app.X", &doc, Validation::Unchecked).unwrap();
        assert_eq!(desc.extend.as_deref(), Some("app.Base"));
    }

    #[test]
    fn test_checked_rejects_null() {
        let doc = json!({ "extend": "app.Base", "events": null });
        assert!(ClassDescriptor::from_json("app.X", &doc, Validation::Checked).is_err());
        assert!(ClassDescriptor::from_json("app.X", &doc, Validation::Unchecked).is_ok());
    }

    #[test]
    fn test_wrong_type_always_fails() {
        let doc = json!({ "extend": 42 });
        for validation in [Validation::Checked, Validation::Unchecked] {
            let err = ClassDescriptor::from_json("app.X", &doc, validation).unwrap_err();
            assert!(matches!(err, RuntimeError::Configuration { .. }));
        }
    }

    #[test]
    fn test_bad_check_name() {
        let doc = json!({ "properties": { "a": { "check": "Float" } } });
        assert!(ClassDescriptor::from_json("app.X", &doc, Validation::Unchecked).is_err());
    }
}
