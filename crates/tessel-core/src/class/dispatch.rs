//! Member dispatch
//!
//! Every method and constructor is stored as a [`MethodSlot`] whose `base`
//! link is resolved when the class is built: it points at the implementation
//! the member overrides. `base` calls therefore never depend on the dynamic
//! type of `this`, and `self_class` always names the declaring class.

use super::{ClassHandle, ClassId};
use crate::descriptor::MethodFn;
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::Object;
use crate::runtime::Runtime;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// What a slot implements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Constructor,
    Method,
}

/// A bound member implementation
pub struct MethodSlot {
    pub(crate) name: String,
    pub(crate) owner: ClassId,
    pub(crate) owner_name: Arc<str>,
    pub(crate) func: MethodFn,
    pub(crate) base: Option<Arc<MethodSlot>>,
    pub(crate) kind: SlotKind,
}

impl MethodSlot {
    pub(crate) fn new(
        name: &str,
        owner: &ClassHandle,
        func: MethodFn,
        base: Option<Arc<MethodSlot>>,
        kind: SlotKind,
    ) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.id(),
            owner_name: Arc::from(owner.name()),
            func,
            base,
            kind,
        }
    }

    /// Member name (`construct` for constructors)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the declaring class
    pub fn owner_name(&self) -> &str {
        &self.owner_name
    }

    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// Whether the slot overrides an ancestor implementation
    pub fn has_base(&self) -> bool {
        self.base.is_some()
    }

    pub(crate) fn owner_handle(&self) -> ClassHandle {
        ClassHandle::new(self.owner, self.owner_name.clone())
    }

    /// Run the slot against `this`
    pub(crate) fn invoke(&self, this: &Object, runtime: &Runtime, args: &[Value]) -> RuntimeResult<Value> {
        let invocation = Invocation {
            this,
            slot: self,
            runtime,
        };
        (self.func)(&invocation, args)
    }
}

impl fmt::Debug for MethodSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodSlot")
            .field("name", &self.name)
            .field("owner", &self.owner_name)
            .field("kind", &self.kind)
            .field("has_base", &self.base.is_some())
            .finish()
    }
}

/// Context of an executing member or constructor
pub struct Invocation<'a> {
    this: &'a Object,
    slot: &'a MethodSlot,
    runtime: &'a Runtime,
}

impl<'a> Invocation<'a> {
    /// The receiving object
    pub fn this(&self) -> &'a Object {
        self.this
    }

    /// The runtime owning the receiver
    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// Name of the executing member
    pub fn member_name(&self) -> &str {
        &self.slot.name
    }

    /// Call the overridden ancestor implementation
    ///
    /// Constructors without an ancestor constructor treat this as a no-op.
    pub fn base(&self, args: &[Value]) -> RuntimeResult<Value> {
        match &self.slot.base {
            Some(base) => base.invoke(self.this, self.runtime, args),
            None if self.slot.kind == SlotKind::Constructor => Ok(Value::Null),
            None => Err(RuntimeError::MissingBaseMember {
                class: self.slot.owner_name.to_string(),
                member: self.slot.name.clone(),
            }),
        }
    }

    /// The class that declared the executing member
    pub fn self_class(&self) -> ClassHandle {
        self.slot.owner_handle()
    }

    /// Static value of the declaring class
    pub fn statics(&self, key: &str) -> Option<Value> {
        self.runtime.static_value(&self.self_class(), key)
    }

    /// Call a static function of the declaring class
    pub fn call_static(&self, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        self.runtime.call_static(&self.self_class(), name, args)
    }
}

/// Context of an executing static function
pub struct StaticContext<'a> {
    class: ClassHandle,
    runtime: &'a Runtime,
}

impl<'a> StaticContext<'a> {
    pub(crate) fn new(class: ClassHandle, runtime: &'a Runtime) -> Self {
        Self { class, runtime }
    }

    /// The declaring class
    pub fn class(&self) -> &ClassHandle {
        &self.class
    }

    pub fn runtime(&self) -> &'a Runtime {
        self.runtime
    }

    /// Static value of the declaring class
    pub fn statics(&self, key: &str) -> Option<Value> {
        self.runtime.static_value(&self.class, key)
    }

    /// Call another static function of the declaring class
    pub fn call_static(&self, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        self.runtime.call_static(&self.class, name, args)
    }
}
