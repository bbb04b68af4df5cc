//! Reflection
//!
//! Read-only queries over the metadata tables built at definition time.
//! Every query takes the class by name (or handle) and answers for the whole
//! chain unless its name says `own`.

use crate::class::ClassHandle;
use crate::descriptor::SymbolRef;
use crate::error::{RuntimeError, RuntimeResult};
use crate::interface::{self, Interface};
use crate::mixin::Mixin;
use crate::property::PropertyDef;
use crate::runtime::Runtime;
use serde::Serialize;
use std::sync::Arc;

/// Summary of a class and its chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub kind: String,
    pub superclass: Option<String>,
    /// Properties declared by the class itself (including mixin content)
    pub own_properties: Vec<String>,
    /// Properties of the whole chain
    pub properties: Vec<String>,
    pub members: Vec<String>,
    pub events: Vec<String>,
    /// Flattened mixins of the whole chain
    pub mixins: Vec<String>,
    /// Flattened declared interfaces of the whole chain
    pub interfaces: Vec<String>,
}

impl Runtime {
    /// Whether a property resolves anywhere in the chain
    pub fn has_property(&self, class: impl SymbolRef, name: &str) -> bool {
        self.with_chain(class.symbol_name(), |chain| chain.find_property(name).is_some())
            .unwrap_or(false)
    }

    /// Declaration of a property, as seen from the class
    pub fn get_property_definition(&self, class: impl SymbolRef, name: &str) -> Option<Arc<PropertyDef>> {
        self.with_chain(class.symbol_name(), |chain| chain.find_property(name).cloned())
            .flatten()
    }

    /// Whether the chain includes the mixin, directly or nested
    pub fn has_mixin(&self, class: impl SymbolRef, mixin: impl SymbolRef) -> bool {
        self.find_mixin(class, mixin).is_some()
    }

    /// Whether the class itself directly includes the mixin
    pub fn has_own_mixin(&self, class: impl SymbolRef, mixin: impl SymbolRef) -> bool {
        let mixin = mixin.symbol_name();
        self.with_chain(class.symbol_name(), |chain| {
            chain.head().includes().iter().any(|m| m.name() == mixin)
        })
        .unwrap_or(false)
    }

    /// Most-derived class in the chain that includes the mixin
    pub fn find_mixin(&self, class: impl SymbolRef, mixin: impl SymbolRef) -> Option<ClassHandle> {
        let mixin = mixin.symbol_name();
        self.with_chain(class.symbol_name(), |chain| {
            chain.find_mixin(mixin).map(|owner| owner.handle())
        })
        .flatten()
    }

    /// Every mixin of the chain, flattened
    pub fn get_mixins(&self, class: impl SymbolRef) -> Vec<Arc<Mixin>> {
        self.with_chain(class.symbol_name(), |chain| chain.mixins())
            .unwrap_or_default()
    }

    /// Whether the chain declares the interface (or one extending it)
    pub fn has_interface(&self, class: impl SymbolRef, iface: impl SymbolRef) -> bool {
        self.find_interface(class, iface).is_some()
    }

    /// Whether the class itself declares the interface
    pub fn has_own_interface(&self, class: impl SymbolRef, iface: impl SymbolRef) -> bool {
        let iface = iface.symbol_name();
        self.with_chain(class.symbol_name(), |chain| {
            chain.head().implements().iter().any(|i| i.name() == iface)
        })
        .unwrap_or(false)
    }

    /// Most-derived class in the chain that declares the interface
    pub fn find_interface(&self, class: impl SymbolRef, iface: impl SymbolRef) -> Option<ClassHandle> {
        let iface = iface.symbol_name();
        self.with_chain(class.symbol_name(), |chain| {
            chain.find_interface(iface).map(|owner| owner.handle())
        })
        .flatten()
    }

    /// Every declared interface of the chain, flattened
    pub fn get_interfaces(&self, class: impl SymbolRef) -> Vec<Arc<Interface>> {
        self.with_chain(class.symbol_name(), |chain| chain.interfaces())
            .unwrap_or_default()
    }

    /// Check structural conformance
    ///
    /// With `require_declared` the chain must also declare the interface.
    pub fn assert_interface(
        &self,
        class: impl SymbolRef,
        iface: impl SymbolRef,
        require_declared: bool,
    ) -> RuntimeResult<()> {
        let class_name = class.symbol_name();
        let iface = self
            .get_interface(iface.symbol_name())
            .ok_or_else(|| RuntimeError::UnknownInterface(iface.symbol_name().to_string()))?;

        self.with_chain(class_name, |chain| {
            interface::assert_conforms(&chain, &iface)?;
            if require_declared && chain.find_interface(iface.name()).is_none() {
                return Err(RuntimeError::InterfaceConformance {
                    class: class_name.to_string(),
                    interface: iface.name().to_string(),
                    missing: "declaration".to_string(),
                });
            }
            Ok(())
        })
        .unwrap_or_else(|| Err(RuntimeError::UnknownClass(class_name.to_string())))
    }

    /// Declared or structural conformance
    pub fn implements_interface(&self, class: impl SymbolRef, iface: impl SymbolRef) -> bool {
        let (class, iface) = (class.symbol_name(), iface.symbol_name());
        self.has_interface(class, iface) || self.assert_interface(class, iface, false).is_ok()
    }

    /// Whether `superclass` is `class` or one of its ancestors
    pub fn is_sub_class_of(&self, class: impl SymbolRef, superclass: impl SymbolRef) -> bool {
        let superclass = superclass.symbol_name();
        self.with_chain(class.symbol_name(), |chain| {
            chain.classes().any(|c| c.name() == superclass)
        })
        .unwrap_or(false)
    }

    /// Event type name of a supported event
    pub fn get_event_type(&self, class: impl SymbolRef, event: &str) -> Option<String> {
        self.with_chain(class.symbol_name(), |chain| {
            chain.find_event(event).map(str::to_string)
        })
        .flatten()
    }

    pub fn supports_event(&self, class: impl SymbolRef, event: &str) -> bool {
        self.get_event_type(class, event).is_some()
    }

    /// Summary of a class
    pub fn class_info(&self, class: impl SymbolRef) -> Option<ClassInfo> {
        self.with_chain(class.symbol_name(), |chain| {
            let head = chain.head();
            let mut own_properties: Vec<String> = head.properties.keys().cloned().collect();
            own_properties.sort();
            ClassInfo {
                name: head.name().to_string(),
                kind: head.kind().to_string(),
                superclass: chain.ancestors().next().map(|parent| parent.name().to_string()),
                own_properties,
                properties: chain.property_names(),
                members: chain.member_names(),
                events: chain.event_names(),
                mixins: chain.mixins().iter().map(|m| m.name().to_string()).collect(),
                interfaces: chain.interfaces().iter().map(|i| i.name().to_string()).collect(),
            }
        })
    }
}
