//! Class registry
//!
//! Arena of built classes plus the shared namespace of class, mixin and
//! interface names. The registry only ever stores fully built symbols; the
//! runtime holds it behind a lock and builds new classes before inserting.

use super::{Class, ClassHandle, ClassId};
use crate::error::{RuntimeError, RuntimeResult};
use crate::interface::Interface;
use crate::mixin::Mixin;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// A registered name
#[derive(Debug, Clone)]
pub(crate) enum Symbol {
    Class(ClassId),
    Mixin(Arc<Mixin>),
    Interface(Arc<Interface>),
}

impl Symbol {
    fn kind(&self) -> &'static str {
        match self {
            Symbol::Class(_) => "class",
            Symbol::Mixin(_) => "mixin",
            Symbol::Interface(_) => "interface",
        }
    }
}

/// Registry of classes, mixins and interfaces
#[derive(Debug, Default)]
pub struct ClassRegistry {
    /// Classes indexed by ID
    classes: Vec<Arc<Class>>,
    /// Name to symbol mapping
    symbols: FxHashMap<String, Symbol>,
    /// Every proper prefix of a registered name
    namespaces: FxHashSet<String>,
}

/// Check that a name is a dot-separated list of identifiers
pub(crate) fn validate_name(name: &str) -> RuntimeResult<()> {
    if name.is_empty() {
        return Err(RuntimeError::configuration(name, "name must not be empty"));
    }
    for segment in name.split('.') {
        let mut chars = segment.chars();
        let valid = match chars.next() {
            Some(first) => {
                (first.is_alphabetic() || first == '_' || first == '$')
                    && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
            }
            None => false,
        };
        if !valid {
            return Err(RuntimeError::configuration(
                name,
                format!("invalid name segment \"{}\"", segment),
            ));
        }
    }
    Ok(())
}

impl ClassRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail unless `name` is a valid, unused, non-namespace name
    pub fn check_available(&self, name: &str) -> RuntimeResult<()> {
        validate_name(name)?;
        if let Some(existing) = self.symbols.get(name) {
            return Err(RuntimeError::DuplicateDefinition {
                kind: existing.kind(),
                name: name.to_string(),
                scope: "registry".to_string(),
            });
        }
        if self.namespaces.contains(name) {
            return Err(RuntimeError::DuplicateDefinition {
                kind: "namespace",
                name: name.to_string(),
                scope: "registry".to_string(),
            });
        }
        Ok(())
    }

    fn record_name(&mut self, name: &str, symbol: Symbol) {
        let mut end = 0;
        while let Some(pos) = name[end..].find('.') {
            end += pos;
            self.namespaces.insert(name[..end].to_string());
            end += 1;
        }
        self.symbols.insert(name.to_string(), symbol);
    }

    /// Id the next inserted class will get
    pub fn next_class_id(&self) -> ClassId {
        ClassId(self.classes.len())
    }

    /// Insert a class built for [`next_class_id`](Self::next_class_id)
    pub(crate) fn insert_class(&mut self, class: Class) -> ClassHandle {
        debug_assert_eq!(class.id, self.next_class_id());
        let handle = class.handle();
        self.record_name(&class.name, Symbol::Class(class.id));
        self.classes.push(Arc::new(class));
        handle
    }

    /// Swap a rebuilt class in place of the registered one
    pub(crate) fn replace_class(&mut self, class: Class) {
        let index = class.id.0;
        if let Some(slot) = self.classes.get_mut(index) {
            *slot = Arc::new(class);
        }
    }

    pub(crate) fn insert_mixin(&mut self, mixin: Arc<Mixin>) {
        let name = mixin.name().to_string();
        self.record_name(&name, Symbol::Mixin(mixin));
    }

    pub(crate) fn insert_interface(&mut self, interface: Arc<Interface>) {
        let name = interface.name().to_string();
        self.record_name(&name, Symbol::Interface(interface));
    }

    /// Get class by ID
    pub fn get(&self, id: ClassId) -> Option<&Arc<Class>> {
        self.classes.get(id.0)
    }

    /// Get class by name
    pub fn get_by_name(&self, name: &str) -> Option<&Arc<Class>> {
        match self.symbols.get(name) {
            Some(Symbol::Class(id)) => self.classes.get(id.0),
            _ => None,
        }
    }

    /// Get mixin by name
    pub fn mixin(&self, name: &str) -> Option<&Arc<Mixin>> {
        match self.symbols.get(name) {
            Some(Symbol::Mixin(mixin)) => Some(mixin),
            _ => None,
        }
    }

    /// Get interface by name
    pub fn interface(&self, name: &str) -> Option<&Arc<Interface>> {
        match self.symbols.get(name) {
            Some(Symbol::Interface(interface)) => Some(interface),
            _ => None,
        }
    }

    /// Resolve a class name or fail with [`RuntimeError::UnknownClass`]
    pub fn require_class(&self, name: &str) -> RuntimeResult<&Arc<Class>> {
        self.get_by_name(name)
            .ok_or_else(|| RuntimeError::UnknownClass(name.to_string()))
    }

    /// Resolve a mixin name or fail with [`RuntimeError::UnknownMixin`]
    pub fn require_mixin(&self, name: &str) -> RuntimeResult<&Arc<Mixin>> {
        self.mixin(name)
            .ok_or_else(|| RuntimeError::UnknownMixin(name.to_string()))
    }

    /// Resolve an interface name or fail with [`RuntimeError::UnknownInterface`]
    pub fn require_interface(&self, name: &str) -> RuntimeResult<&Arc<Interface>> {
        self.interface(name)
            .ok_or_else(|| RuntimeError::UnknownInterface(name.to_string()))
    }

    /// Number of classes
    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Iterate over all classes
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Class>> {
        self.classes.iter()
    }
}
