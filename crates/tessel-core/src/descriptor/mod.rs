//! Declarative descriptors
//!
//! Descriptors are the input of the runtime: a [`ClassDescriptor`] is turned
//! into a registered class by [`Runtime::define`](crate::Runtime::define),
//! a [`MixinDescriptor`] into a [`Mixin`](crate::Mixin) and an
//! [`InterfaceDescriptor`] into an [`Interface`](crate::Interface).
//!
//! References to other classes, mixins and interfaces are by name; anything
//! implementing [`SymbolRef`] (handles, `Arc<Mixin>`, plain strings) can be
//! passed.

mod json;

use crate::class::{ClassHandle, DeferScope, Invocation, StaticContext};
use crate::error::RuntimeResult;
use crate::interface::Interface;
use crate::mixin::Mixin;
use crate::object::Object;
use crate::property::PropertyCheck;
use crate::value::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Member or constructor body
pub type MethodFn = Arc<dyn Fn(&Invocation<'_>, &[Value]) -> RuntimeResult<Value> + Send + Sync>;

/// Class or mixin destructor
pub type DestructFn = Arc<dyn Fn(&Object) -> RuntimeResult<()> + Send + Sync>;

/// Static function
pub type StaticFn = Arc<dyn Fn(&StaticContext<'_>, &[Value]) -> RuntimeResult<Value> + Send + Sync>;

/// Hook run once after a class is built
pub type DeferFn = Arc<dyn Fn(&mut DeferScope<'_>) -> RuntimeResult<()> + Send + Sync>;

// ============================================================================
// Names
// ============================================================================

/// Anything that names a class, mixin or interface
pub trait SymbolRef {
    /// The fully qualified name
    fn symbol_name(&self) -> &str;
}

impl SymbolRef for str {
    fn symbol_name(&self) -> &str {
        self
    }
}

impl SymbolRef for String {
    fn symbol_name(&self) -> &str {
        self
    }
}

impl SymbolRef for ClassHandle {
    fn symbol_name(&self) -> &str {
        self.name()
    }
}

impl SymbolRef for Mixin {
    fn symbol_name(&self) -> &str {
        self.name()
    }
}

impl SymbolRef for Interface {
    fn symbol_name(&self) -> &str {
        self.name()
    }
}

impl<T: SymbolRef + ?Sized> SymbolRef for &T {
    fn symbol_name(&self) -> &str {
        (**self).symbol_name()
    }
}

impl<T: SymbolRef + ?Sized> SymbolRef for Arc<T> {
    fn symbol_name(&self) -> &str {
        (**self).symbol_name()
    }
}

// ============================================================================
// Class kind, members, statics
// ============================================================================

/// Kind of a class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    /// Regular instantiable class
    Normal,
    /// Namespace of statics, never instantiated
    Static,
    /// Only subclasses may be instantiated
    Abstract,
    /// Exactly one lazily created instance
    Singleton,
}

impl ClassKind {
    /// Descriptor spelling of the kind
    pub fn as_str(self) -> &'static str {
        match self {
            ClassKind::Normal => "normal",
            ClassKind::Static => "static",
            ClassKind::Abstract => "abstract",
            ClassKind::Singleton => "singleton",
        }
    }

    /// Whether instances of some kind can exist
    pub fn is_instantiable(self) -> bool {
        self != ClassKind::Static
    }
}

impl FromStr for ClassKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(ClassKind::Normal),
            "static" => Ok(ClassKind::Static),
            "abstract" => Ok(ClassKind::Abstract),
            "singleton" => Ok(ClassKind::Singleton),
            other => Err(format!("Invalid class type \"{}\"", other)),
        }
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A class or mixin member
#[derive(Clone)]
pub enum Member {
    /// Callable member
    Method(MethodFn),
    /// Plain default value, shadowed by per-instance fields
    Value(Value),
}

impl Member {
    /// Wrap a closure as a method
    pub fn method<F>(f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        Member::Method(Arc::new(f))
    }

    /// Plain value member
    pub fn value(value: impl Into<Value>) -> Self {
        Member::Value(value.into())
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Member::Method(_) => write!(f, "Method(..)"),
            Member::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// A static entry of a class
#[derive(Clone)]
pub enum Static {
    /// Constant or variable
    Value(Value),
    /// Static function
    Function(StaticFn),
}

impl fmt::Debug for Static {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Static::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Static::Function(_) => write!(f, "Function(..)"),
        }
    }
}

// ============================================================================
// Property descriptor
// ============================================================================

/// Declaration of a property
///
/// A `refine` declaration may only carry `init`; it overrides the default of
/// an inherited property without redefining its shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyDescriptor {
    pub(crate) check: Option<PropertyCheck>,
    pub(crate) nullable: Option<bool>,
    pub(crate) init: Option<Value>,
    pub(crate) themeable: Option<bool>,
    pub(crate) apply: Option<String>,
    pub(crate) event: Option<String>,
    pub(crate) compute: Option<String>,
    pub(crate) dispose: Option<bool>,
    pub(crate) refine: bool,
}

impl PropertyDescriptor {
    /// Empty declaration (accepts any non-null value)
    pub fn new() -> Self {
        Self::default()
    }

    /// Refinement of an inherited property's init value
    pub fn refine_init(init: impl Into<Value>) -> Self {
        Self {
            init: Some(init.into()),
            refine: true,
            ..Default::default()
        }
    }

    /// Type constraint
    pub fn check(mut self, check: PropertyCheck) -> Self {
        self.check = Some(check);
        self
    }

    /// Accept null values
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = Some(nullable);
        self
    }

    /// Default value
    pub fn init(mut self, init: impl Into<Value>) -> Self {
        self.init = Some(init.into());
        self
    }

    /// Enable the theme layer
    pub fn themeable(mut self, themeable: bool) -> Self {
        self.themeable = Some(themeable);
        self
    }

    /// Member called with `(new, old)` on every effective change
    pub fn apply(mut self, member: impl Into<String>) -> Self {
        self.apply = Some(member.into());
        self
    }

    /// Event fired after `apply` on every effective change
    pub fn event(mut self, event: impl Into<String>) -> Self {
        self.event = Some(event.into());
        self
    }

    /// Member deriving the computed layer
    pub fn compute(mut self, member: impl Into<String>) -> Self {
        self.compute = Some(member.into());
        self
    }

    /// Clear all layers when the owner is disposed
    pub fn dispose(mut self, dispose: bool) -> Self {
        self.dispose = Some(dispose);
        self
    }

    /// Mark as refinement
    pub fn refine(mut self) -> Self {
        self.refine = true;
        self
    }

    /// Whether this is a refinement
    pub fn is_refine(&self) -> bool {
        self.refine
    }

    /// Keys present in the declaration
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.check.is_some() {
            keys.push("check");
        }
        if self.nullable.is_some() {
            keys.push("nullable");
        }
        if self.init.is_some() {
            keys.push("init");
        }
        if self.themeable.is_some() {
            keys.push("themeable");
        }
        if self.apply.is_some() {
            keys.push("apply");
        }
        if self.event.is_some() {
            keys.push("event");
        }
        if self.compute.is_some() {
            keys.push("compute");
        }
        if self.dispose.is_some() {
            keys.push("dispose");
        }
        if self.refine {
            keys.push("refine");
        }
        keys
    }
}

// ============================================================================
// Class descriptor
// ============================================================================

/// Declarative description of a class
#[derive(Clone, Default)]
pub struct ClassDescriptor {
    pub(crate) kind: Option<ClassKind>,
    pub(crate) extend: Option<String>,
    pub(crate) implement: Vec<String>,
    pub(crate) include: Vec<String>,
    pub(crate) construct: Option<MethodFn>,
    pub(crate) statics: Vec<(String, Static)>,
    pub(crate) properties: Vec<(String, PropertyDescriptor)>,
    pub(crate) members: Vec<(String, Member)>,
    pub(crate) events: Vec<(String, String)>,
    pub(crate) settings: Vec<(String, Value)>,
    pub(crate) defer: Option<DeferFn>,
    pub(crate) destruct: Option<DestructFn>,
    pub(crate) auto_dispose: Option<bool>,
}

/// Keys a static class may carry
pub(crate) const STATIC_ALLOWED_KEYS: &[&str] = &["type", "statics", "settings", "defer"];

/// Keys a refine declaration may carry
pub(crate) const REFINE_ALLOWED_KEYS: &[&str] = &["init", "refine"];

/// Fail with [`RuntimeError::DuplicateDefinition`](crate::RuntimeError) on a
/// repeated name within one table
pub(crate) fn reject_duplicates<'a>(
    scope: &str,
    kind: &'static str,
    names: impl Iterator<Item = &'a String>,
) -> RuntimeResult<()> {
    let mut seen = rustc_hash::FxHashSet::default();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(crate::error::RuntimeError::DuplicateDefinition {
                kind,
                name: name.clone(),
                scope: scope.to_string(),
            });
        }
    }
    Ok(())
}

impl ClassDescriptor {
    /// Empty descriptor
    pub fn new() -> Self {
        Self::default()
    }

    /// Class kind (defaults to `normal` with `extend`, `static` otherwise)
    pub fn kind(mut self, kind: ClassKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Superclass
    pub fn extend(mut self, superclass: impl SymbolRef) -> Self {
        self.extend = Some(superclass.symbol_name().to_string());
        self
    }

    /// Declared interface (may be repeated)
    pub fn implement(mut self, interface: impl SymbolRef) -> Self {
        self.implement.push(interface.symbol_name().to_string());
        self
    }

    /// Included mixin (may be repeated, order matters for conflicts)
    pub fn include(mut self, mixin: impl SymbolRef) -> Self {
        self.include.push(mixin.symbol_name().to_string());
        self
    }

    /// Constructor; without one the superclass constructor runs
    pub fn construct<F>(mut self, f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.construct = Some(Arc::new(move |inv: &Invocation<'_>, args: &[Value]| {
            f(inv, args)?;
            Ok(Value::Null)
        }));
        self
    }

    /// Static value
    pub fn static_value(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.statics.push((name.into(), Static::Value(value.into())));
        self
    }

    /// Static function
    pub fn static_fn<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&StaticContext<'_>, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.statics.push((name.into(), Static::Function(Arc::new(f))));
        self
    }

    /// Property declaration
    pub fn property(mut self, name: impl Into<String>, property: PropertyDescriptor) -> Self {
        self.properties.push((name.into(), property));
        self
    }

    /// Member
    pub fn member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.members.push((name.into(), member));
        self
    }

    /// Method member
    pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.member(name, Member::method(f))
    }

    /// Event with the name of its event type
    pub fn event(mut self, name: impl Into<String>, event_type: impl Into<String>) -> Self {
        self.events.push((name.into(), event_type.into()));
        self
    }

    /// Default setting
    pub fn setting(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.settings.push((key.into(), value.into()));
        self
    }

    /// Hook run once after the class is built
    pub fn defer<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut DeferScope<'_>) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.defer = Some(Arc::new(f));
        self
    }

    /// Destructor
    pub fn destruct<F>(mut self, f: F) -> Self
    where
        F: Fn(&Object) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.destruct = Some(Arc::new(f));
        self
    }

    /// Override live-table registration for instances of this class
    pub fn auto_dispose(mut self, auto_dispose: bool) -> Self {
        self.auto_dispose = Some(auto_dispose);
        self
    }

    /// Keys present in the descriptor, in declaration-table order
    pub fn keys(&self) -> Vec<&'static str> {
        let mut keys = Vec::new();
        if self.kind.is_some() {
            keys.push("type");
        }
        if self.extend.is_some() {
            keys.push("extend");
        }
        if !self.implement.is_empty() {
            keys.push("implement");
        }
        if !self.include.is_empty() {
            keys.push("include");
        }
        if self.construct.is_some() {
            keys.push("construct");
        }
        if !self.statics.is_empty() {
            keys.push("statics");
        }
        if !self.properties.is_empty() {
            keys.push("properties");
        }
        if !self.members.is_empty() {
            keys.push("members");
        }
        if !self.events.is_empty() {
            keys.push("events");
        }
        if !self.settings.is_empty() {
            keys.push("settings");
        }
        if self.defer.is_some() {
            keys.push("defer");
        }
        if self.destruct.is_some() {
            keys.push("destruct");
        }
        if self.auto_dispose.is_some() {
            keys.push("autoDispose");
        }
        keys
    }

    /// Kind after defaulting
    pub fn effective_kind(&self) -> ClassKind {
        match self.kind {
            Some(kind) => kind,
            None if self.extend.is_some() => ClassKind::Normal,
            None => ClassKind::Static,
        }
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("kind", &self.kind)
            .field("extend", &self.extend)
            .field("keys", &self.keys())
            .finish()
    }
}

// ============================================================================
// Mixin and interface descriptors
// ============================================================================

/// Declarative description of a mixin
#[derive(Clone, Default)]
pub struct MixinDescriptor {
    pub(crate) include: Vec<String>,
    pub(crate) properties: Vec<(String, PropertyDescriptor)>,
    pub(crate) members: Vec<(String, Member)>,
    pub(crate) events: Vec<(String, String)>,
    pub(crate) destruct: Option<DestructFn>,
}

impl MixinDescriptor {
    /// Empty mixin
    pub fn new() -> Self {
        Self::default()
    }

    /// Nested mixin
    pub fn include(mut self, mixin: impl SymbolRef) -> Self {
        self.include.push(mixin.symbol_name().to_string());
        self
    }

    /// Property declaration
    pub fn property(mut self, name: impl Into<String>, property: PropertyDescriptor) -> Self {
        self.properties.push((name.into(), property));
        self
    }

    /// Member
    pub fn member(mut self, name: impl Into<String>, member: Member) -> Self {
        self.members.push((name.into(), member));
        self
    }

    /// Method member
    pub fn method<F>(self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Invocation<'_>, &[Value]) -> RuntimeResult<Value> + Send + Sync + 'static,
    {
        self.member(name, Member::method(f))
    }

    /// Event with the name of its event type
    pub fn event(mut self, name: impl Into<String>, event_type: impl Into<String>) -> Self {
        self.events.push((name.into(), event_type.into()));
        self
    }

    /// Destructor
    pub fn destruct<F>(mut self, f: F) -> Self
    where
        F: Fn(&Object) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.destruct = Some(Arc::new(f));
        self
    }
}

/// Declarative description of an interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub(crate) extend: Vec<String>,
    pub(crate) members: Vec<String>,
    pub(crate) properties: Vec<String>,
    pub(crate) events: Vec<String>,
}

impl InterfaceDescriptor {
    /// Empty interface
    pub fn new() -> Self {
        Self::default()
    }

    /// Extended interface
    pub fn extend(mut self, interface: impl SymbolRef) -> Self {
        self.extend.push(interface.symbol_name().to_string());
        self
    }

    /// Required member
    pub fn member(mut self, name: impl Into<String>) -> Self {
        self.members.push(name.into());
        self
    }

    /// Required property
    pub fn property(mut self, name: impl Into<String>) -> Self {
        self.properties.push(name.into());
        self
    }

    /// Required event
    pub fn event(mut self, name: impl Into<String>) -> Self {
        self.events.push(name.into());
        self
    }
}
