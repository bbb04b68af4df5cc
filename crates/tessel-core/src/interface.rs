//! Interface verifier
//!
//! Interfaces list required member, property and event names. Conformance is
//! purely structural: each requirement must resolve somewhere in the class
//! chain (own tables, ancestors, or merged mixin content).

use crate::class::lookup::Chain;
use crate::class::ClassRegistry;
use crate::descriptor::InterfaceDescriptor;
use crate::error::{RuntimeError, RuntimeResult};
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// A registered interface
#[derive(Debug)]
pub struct Interface {
    name: Arc<str>,
    extends: Vec<Arc<Interface>>,
    members: Vec<String>,
    properties: Vec<String>,
    events: Vec<String>,
}

impl Interface {
    pub(crate) fn build(
        name: &str,
        desc: InterfaceDescriptor,
        registry: &ClassRegistry,
    ) -> RuntimeResult<Arc<Interface>> {
        for (kind, list) in [
            ("member", &desc.members),
            ("property", &desc.properties),
            ("event", &desc.events),
            ("interface", &desc.extend),
        ] {
            let mut seen = FxHashSet::default();
            if let Some(dup) = list.iter().find(|n| !seen.insert(n.as_str())) {
                return Err(RuntimeError::DuplicateDefinition {
                    kind,
                    name: dup.clone(),
                    scope: name.to_string(),
                });
            }
        }

        let extends = desc
            .extend
            .iter()
            .map(|n| registry.require_interface(n).cloned())
            .collect::<RuntimeResult<Vec<_>>>()?;

        Ok(Arc::new(Interface {
            name: Arc::from(name),
            extends,
            members: desc.members,
            properties: desc.properties,
            events: desc.events,
        }))
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directly extended interfaces
    pub fn extends(&self) -> &[Arc<Interface>] {
        &self.extends
    }

    /// Required members
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Required properties
    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    /// Required events
    pub fn events(&self) -> &[String] {
        &self.events
    }

    /// Each interface followed by everything it extends, duplicates dropped
    pub fn flatten(list: &[Arc<Interface>]) -> Vec<Arc<Interface>> {
        fn visit(iface: &Arc<Interface>, out: &mut Vec<Arc<Interface>>) {
            if out.iter().any(|i| Arc::ptr_eq(i, iface)) {
                return;
            }
            out.push(iface.clone());
            for parent in &iface.extends {
                visit(parent, out);
            }
        }

        let mut out = Vec::new();
        for iface in list {
            visit(iface, &mut out);
        }
        out
    }
}

/// Fail with [`RuntimeError::InterfaceConformance`] on the first requirement
/// the chain does not satisfy
pub(crate) fn assert_conforms(chain: &Chain<'_>, iface: &Arc<Interface>) -> RuntimeResult<()> {
    let missing = |what: String| RuntimeError::InterfaceConformance {
        class: chain.head().name().to_string(),
        interface: iface.name().to_string(),
        missing: what,
    };

    for required in Interface::flatten(std::slice::from_ref(iface)) {
        if let Some(name) = required.members.iter().find(|n| !chain.has_callable(n)) {
            return Err(missing(format!("member '{}'", name)));
        }
        if let Some(name) = required
            .properties
            .iter()
            .find(|n| chain.find_property(n).is_none())
        {
            return Err(missing(format!("property '{}'", name)));
        }
        if let Some(name) = required.events.iter().find(|n| chain.find_event(n).is_none()) {
            return Err(missing(format!("event '{}'", name)));
        }
    }
    Ok(())
}
