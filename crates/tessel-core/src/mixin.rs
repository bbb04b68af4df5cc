//! Mixin composer
//!
//! Mixins are non-inheriting bundles of properties, members and events.
//! Including one copies its flattened content into the target class's own
//! tables once, at definition (or include) time.

use crate::class::lookup::Chain;
use crate::class::{Class, ClassRegistry, MemberEntry, MethodSlot, SlotKind};
use crate::descriptor::{reject_duplicates, DestructFn, Member, MixinDescriptor};
use crate::error::{RuntimeError, RuntimeResult};
use crate::options::Validation;
use crate::property::PropertyDef;
use std::fmt;
use std::sync::Arc;

/// A registered mixin
pub struct Mixin {
    name: Arc<str>,
    includes: Vec<Arc<Mixin>>,
    properties: Vec<(String, Arc<PropertyDef>)>,
    members: Vec<(String, Member)>,
    events: Vec<(String, String)>,
    destruct: Option<DestructFn>,
}

impl Mixin {
    /// Build a mixin, resolving nested includes against the registry
    pub(crate) fn build(
        name: &str,
        desc: MixinDescriptor,
        registry: &ClassRegistry,
        validation: Validation,
    ) -> RuntimeResult<Arc<Mixin>> {
        reject_duplicates(name, "property", desc.properties.iter().map(|(n, _)| n))?;
        reject_duplicates(name, "member", desc.members.iter().map(|(n, _)| n))?;
        reject_duplicates(name, "event", desc.events.iter().map(|(n, _)| n))?;
        reject_duplicates(name, "mixin", desc.include.iter())?;

        let includes = desc
            .include
            .iter()
            .map(|n| registry.require_mixin(n).cloned())
            .collect::<RuntimeResult<Vec<_>>>()?;

        let mut properties = Vec::with_capacity(desc.properties.len());
        for (prop_name, prop) in &desc.properties {
            if prop.is_refine() {
                return Err(RuntimeError::configuration(
                    format!("{}.{}", name, prop_name),
                    "mixins cannot refine properties",
                ));
            }
            let def = PropertyDef::from_descriptor(prop_name, name, prop);
            if validation.is_checked() {
                if let Some(init) = &def.init {
                    def.validate(init)?;
                }
            }
            properties.push((prop_name.clone(), Arc::new(def)));
        }

        let mixin = Arc::new(Mixin {
            name: Arc::from(name),
            includes,
            properties,
            members: desc.members,
            events: desc.events,
            destruct: desc.destruct,
        });
        check_compatible(std::slice::from_ref(&mixin))?;
        Ok(mixin)
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directly included mixins
    pub fn includes(&self) -> &[Arc<Mixin>] {
        &self.includes
    }

    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|(n, _)| n.as_str())
    }

    pub fn member_names(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|(n, _)| n.as_str())
    }

    pub fn event_names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(|(n, _)| n.as_str())
    }

    pub fn has_destructor(&self) -> bool {
        self.destruct.is_some()
    }

    pub(crate) fn destructor(&self) -> Option<&DestructFn> {
        self.destruct.as_ref()
    }

    /// Depth-first flattening: nested mixins before their includer,
    /// duplicates dropped, order stable
    pub fn flatten(list: &[Arc<Mixin>]) -> Vec<Arc<Mixin>> {
        fn visit(mixin: &Arc<Mixin>, out: &mut Vec<Arc<Mixin>>) {
            for nested in &mixin.includes {
                visit(nested, out);
            }
            if !out.iter().any(|m| Arc::ptr_eq(m, mixin)) {
                out.push(mixin.clone());
            }
        }

        let mut out = Vec::new();
        for mixin in list {
            visit(mixin, &mut out);
        }
        out
    }
}

impl fmt::Debug for Mixin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mixin")
            .field("name", &self.name)
            .field("includes", &self.includes.iter().map(|m| m.name()).collect::<Vec<_>>())
            .field("properties", &self.property_names().collect::<Vec<_>>())
            .field("members", &self.member_names().collect::<Vec<_>>())
            .field("events", &self.event_names().collect::<Vec<_>>())
            .finish()
    }
}

/// Fail if two mixins of the flattened list define the same symbol
pub(crate) fn check_compatible(list: &[Arc<Mixin>]) -> RuntimeResult<()> {
    let flat = Mixin::flatten(list);
    let mut properties: Vec<(&str, &str)> = Vec::new();
    let mut members: Vec<(&str, &str)> = Vec::new();
    let mut events: Vec<(&str, &str)> = Vec::new();

    for mixin in &flat {
        let checks = [
            ("property", &mut properties, mixin.property_names().collect::<Vec<_>>()),
            ("member", &mut members, mixin.member_names().collect::<Vec<_>>()),
            ("event", &mut events, mixin.event_names().collect::<Vec<_>>()),
        ];
        for (kind, seen, names) in checks {
            for name in names {
                if let Some((_, owner)) = seen.iter().find(|(n, _)| *n == name) {
                    return Err(RuntimeError::MixinConflict {
                        mixin: mixin.name().to_string(),
                        class: owner.to_string(),
                        symbol: format!("{} '{}'", kind, name),
                    });
                }
                seen.push((name, mixin.name()));
            }
        }
    }
    Ok(())
}

/// Merge a mixin (and its nested mixins) into a class's own tables
///
/// Without `patch` any symbol already reachable through the class chain is
/// a [`RuntimeError::MixinConflict`]. With `patch` the mixin overwrites.
pub(crate) fn attach(
    class: &mut Class,
    registry: &ClassRegistry,
    mixin: &Arc<Mixin>,
    patch: bool,
) -> RuntimeResult<()> {
    if Chain::new(registry, class).find_mixin(mixin.name()).is_some() {
        return Err(RuntimeError::DuplicateDefinition {
            kind: "mixin",
            name: mixin.name().to_string(),
            scope: class.name().to_string(),
        });
    }

    let handle = class.handle();
    for part in Mixin::flatten(std::slice::from_ref(mixin)) {
        if !patch {
            let chain = Chain::new(registry, class);
            let conflict = |symbol: String| RuntimeError::MixinConflict {
                mixin: part.name().to_string(),
                class: handle.name().to_string(),
                symbol,
            };
            if let Some(name) = part.event_names().find(|n| chain.find_event(n).is_some()) {
                return Err(conflict(format!("event '{}'", name)));
            }
            if let Some(name) = part.property_names().find(|n| chain.find_property(n).is_some()) {
                return Err(conflict(format!("property '{}'", name)));
            }
            if let Some(name) = part.member_names().find(|n| chain.find_member(n).is_some()) {
                return Err(conflict(format!("member '{}'", name)));
            }
        }

        for (name, event_type) in &part.events {
            class.events.insert(name.clone(), event_type.clone());
        }
        for (name, def) in &part.properties {
            class.properties.insert(name.clone(), def.clone());
        }
        for (name, member) in &part.members {
            let entry = match member {
                Member::Method(func) => MemberEntry::Method(Arc::new(MethodSlot::new(
                    name,
                    &handle,
                    func.clone(),
                    None,
                    SlotKind::Method,
                ))),
                Member::Value(value) => MemberEntry::Value(value.clone()),
            };
            class.members.insert(name.clone(), entry);
        }
    }

    class.includes.push(mixin.clone());
    Ok(())
}
