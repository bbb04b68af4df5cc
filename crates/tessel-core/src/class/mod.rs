//! Classes
//!
//! A [`Class`] is the built, immutable runtime shape of a descriptor. It only
//! holds what the class itself declares (plus the content of its included
//! mixins); everything inherited is found by walking the superclass ids with
//! the [`lookup`] helpers.

pub(crate) mod builder;
pub(crate) mod dispatch;
pub(crate) mod lookup;
pub mod registry;

pub use builder::DeferScope;
pub use dispatch::{Invocation, MethodSlot, SlotKind, StaticContext};
pub use registry::ClassRegistry;

use crate::descriptor::{ClassKind, DestructFn, Static};
use crate::interface::Interface;
use crate::mixin::Mixin;
use crate::property::PropertyDef;
use crate::value::Value;
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Index of a class in its registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) usize);

impl ClassId {
    /// Raw arena index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Stable handle to a defined class
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassHandle {
    id: ClassId,
    name: Arc<str>,
}

impl ClassHandle {
    pub(crate) fn new(id: ClassId, name: Arc<str>) -> Self {
        Self { id, name }
    }

    /// Arena id
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Fully qualified name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Everything before the last dot (empty for top-level names)
    pub fn namespace(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[..pos],
            None => "",
        }
    }

    /// Last segment of the name
    pub fn basename(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }
}

impl fmt::Display for ClassHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Entry of a member table
#[derive(Clone)]
pub(crate) enum MemberEntry {
    Method(Arc<MethodSlot>),
    Value(Value),
}

impl MemberEntry {
    pub(crate) fn as_method(&self) -> Option<&Arc<MethodSlot>> {
        match self {
            MemberEntry::Method(slot) => Some(slot),
            MemberEntry::Value(_) => None,
        }
    }
}

impl fmt::Debug for MemberEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberEntry::Method(slot) => write!(f, "Method({}::{})", slot.owner_name(), slot.name()),
            MemberEntry::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Runtime shape of a class
#[derive(Clone)]
pub struct Class {
    pub(crate) id: ClassId,
    pub(crate) name: Arc<str>,
    pub(crate) kind: ClassKind,
    pub(crate) superclass: Option<ClassId>,
    pub(crate) constructor: Option<Arc<MethodSlot>>,
    pub(crate) destructor: Option<DestructFn>,
    pub(crate) statics: FxHashMap<String, Static>,
    pub(crate) properties: FxHashMap<String, Arc<PropertyDef>>,
    pub(crate) refined_inits: FxHashMap<String, Value>,
    pub(crate) members: FxHashMap<String, MemberEntry>,
    pub(crate) events: FxHashMap<String, String>,
    /// Directly included mixins, in inclusion order
    pub(crate) includes: Vec<Arc<Mixin>>,
    /// Directly declared interfaces, in declaration order
    pub(crate) implements: Vec<Arc<Interface>>,
    pub(crate) auto_dispose: Option<bool>,
}

impl Class {
    pub(crate) fn new(id: ClassId, name: &str, kind: ClassKind, superclass: Option<ClassId>) -> Self {
        Self {
            id,
            name: Arc::from(name),
            kind,
            superclass,
            constructor: None,
            destructor: None,
            statics: FxHashMap::default(),
            properties: FxHashMap::default(),
            refined_inits: FxHashMap::default(),
            members: FxHashMap::default(),
            events: FxHashMap::default(),
            includes: Vec::new(),
            implements: Vec::new(),
            auto_dispose: None,
        }
    }

    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ClassKind {
        self.kind
    }

    pub fn superclass(&self) -> Option<ClassId> {
        self.superclass
    }

    /// Handle for this class
    pub fn handle(&self) -> ClassHandle {
        ClassHandle::new(self.id, self.name.clone())
    }

    /// Own property declaration (including mixin-provided ones)
    pub fn own_property(&self, name: &str) -> Option<&Arc<PropertyDef>> {
        self.properties.get(name)
    }

    /// Whether the class itself declares a member
    pub fn has_own_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    /// Directly included mixins
    pub fn includes(&self) -> &[Arc<Mixin>] {
        &self.includes
    }

    /// Directly declared interfaces
    pub fn implements(&self) -> &[Arc<Interface>] {
        &self.implements
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("superclass", &self.superclass)
            .field("properties", &self.properties.keys().collect::<Vec<_>>())
            .field("members", &self.members.keys().collect::<Vec<_>>())
            .finish()
    }
}
