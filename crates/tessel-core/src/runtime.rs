//! Runtime
//!
//! A [`Runtime`] owns one class registry, one live object table and one
//! settings table. It is cheap to clone; all clones share state. Objects
//! hold a weak reference back to the runtime that created them.
//!
//! Locks are never held while user code runs, with one exception: a class's
//! `defer` hook runs while the registry is locked for writing and therefore
//! receives a [`DeferScope`](crate::DeferScope) instead of the runtime.

use crate::class::builder::build_class;
use crate::class::lookup::Chain;
use crate::class::{ClassHandle, ClassId, ClassRegistry, MemberEntry, StaticContext};
use crate::descriptor::{
    ClassDescriptor, ClassKind, DestructFn, InterfaceDescriptor, MixinDescriptor, Static, SymbolRef,
};
use crate::error::{RuntimeError, RuntimeResult};
use crate::interface::Interface;
use crate::mixin::{self, Mixin};
use crate::object::{DbStats, DisposeFailure, Object, TeardownReport};
use crate::object::db::ObjectDb;
use crate::options::RuntimeOptions;
use crate::property::{engine, AccessorKind, PropertyDef};
use crate::value::Value;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace, warn};

pub(crate) struct RuntimeShared {
    options: RuntimeOptions,
    registry: RwLock<ClassRegistry>,
    objects: ObjectDb,
    settings: DashMap<String, Value>,
    singletons: Mutex<FxHashMap<ClassId, Object>>,
}

/// The class and object runtime
#[derive(Clone)]
pub struct Runtime {
    shared: Arc<RuntimeShared>,
}

static GLOBAL: Lazy<Runtime> = Lazy::new(Runtime::default);

/// Process-wide default runtime
pub fn global() -> &'static Runtime {
    &GLOBAL
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new(RuntimeOptions::default())
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("options", &self.shared.options)
            .field("classes", &self.get_count())
            .field("objects", &self.db_stats())
            .finish()
    }
}

impl Runtime {
    /// Create a runtime
    pub fn new(options: RuntimeOptions) -> Self {
        Self {
            shared: Arc::new(RuntimeShared {
                options,
                registry: RwLock::new(ClassRegistry::new()),
                objects: ObjectDb::new(),
                settings: DashMap::new(),
                singletons: Mutex::new(FxHashMap::default()),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<RuntimeShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<RuntimeShared> {
        Arc::downgrade(&self.shared)
    }

    /// Options the runtime was created with
    pub fn options(&self) -> &RuntimeOptions {
        &self.shared.options
    }

    /// Run `f` over the chain of a class, under the registry read lock
    pub(crate) fn with_chain<R>(&self, class: &str, f: impl FnOnce(Chain<'_>) -> R) -> Option<R> {
        let registry = self.shared.registry.read();
        let head = registry.get_by_name(class)?;
        Some(f(Chain::new(&registry, head)))
    }

    // ========================================================================
    // Definition
    // ========================================================================

    /// Define a class
    ///
    /// On failure nothing is registered.
    pub fn define(&self, name: &str, desc: ClassDescriptor) -> RuntimeResult<ClassHandle> {
        let mut registry = self.shared.registry.write();
        let built = build_class(&registry, name, desc, &self.shared.options, |key| {
            self.shared.settings.contains_key(key)
        })?;
        let kind = built.class.kind();
        let handle = registry.insert_class(built.class);
        drop(registry);

        for (key, value) in built.settings {
            self.shared.settings.insert(key, value);
        }
        debug!(class = name, kind = %kind, "defined class");
        Ok(handle)
    }

    /// Define a class from a JSON document
    pub fn define_json(&self, name: &str, doc: &serde_json::Value) -> RuntimeResult<ClassHandle> {
        let desc = ClassDescriptor::from_json(name, doc, self.shared.options.validation)?;
        self.define(name, desc)
    }

    /// Define a mixin
    pub fn define_mixin(&self, name: &str, desc: MixinDescriptor) -> RuntimeResult<Arc<Mixin>> {
        let mut registry = self.shared.registry.write();
        registry.check_available(name)?;
        let mixin = Mixin::build(name, desc, &registry, self.shared.options.validation)?;
        registry.insert_mixin(mixin.clone());
        debug!(mixin = name, "defined mixin");
        Ok(mixin)
    }

    /// Define an interface
    pub fn define_interface(&self, name: &str, desc: InterfaceDescriptor) -> RuntimeResult<Arc<Interface>> {
        let mut registry = self.shared.registry.write();
        registry.check_available(name)?;
        let iface = Interface::build(name, desc, &registry)?;
        registry.insert_interface(iface.clone());
        debug!(interface = name, "defined interface");
        Ok(iface)
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    /// Handle of a defined class
    pub fn get_by_name(&self, name: &str) -> Option<ClassHandle> {
        self.shared
            .registry
            .read()
            .get_by_name(name)
            .map(|class| class.handle())
    }

    /// Whether a class of that name is defined
    pub fn is_defined(&self, name: &str) -> bool {
        self.shared.registry.read().get_by_name(name).is_some()
    }

    /// Number of defined classes
    pub fn get_count(&self) -> usize {
        self.shared.registry.read().class_count()
    }

    pub fn get_mixin(&self, name: &str) -> Option<Arc<Mixin>> {
        self.shared.registry.read().mixin(name).cloned()
    }

    pub fn get_interface(&self, name: &str) -> Option<Arc<Interface>> {
        self.shared.registry.read().interface(name).cloned()
    }

    /// Kind of a defined class
    pub fn kind_of(&self, class: impl SymbolRef) -> Option<ClassKind> {
        self.shared
            .registry
            .read()
            .get_by_name(class.symbol_name())
            .map(|class| class.kind())
    }

    // ========================================================================
    // Mixins
    // ========================================================================

    /// Merge a mixin into a defined class; collisions fail
    pub fn include(&self, class: impl SymbolRef, mixin: impl SymbolRef) -> RuntimeResult<()> {
        self.attach_mixin(class.symbol_name(), mixin.symbol_name(), false)
    }

    /// Merge a mixin into a defined class; collisions overwrite
    pub fn patch(&self, class: impl SymbolRef, mixin: impl SymbolRef) -> RuntimeResult<()> {
        self.attach_mixin(class.symbol_name(), mixin.symbol_name(), true)
    }

    fn attach_mixin(&self, class: &str, mixin: &str, patch: bool) -> RuntimeResult<()> {
        let mut registry = self.shared.registry.write();
        let mixin = registry.require_mixin(mixin)?.clone();
        let mut rebuilt = registry.require_class(class)?.as_ref().clone();
        mixin::attach(&mut rebuilt, &registry, &mixin, patch)?;
        registry.replace_class(rebuilt);
        debug!(class, mixin = mixin.name(), patch, "attached mixin");
        Ok(())
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Construct an instance
    pub fn instantiate(&self, class: impl SymbolRef, args: &[Value]) -> RuntimeResult<Object> {
        self.construct(class.symbol_name(), args, false)
    }

    /// Construct an instance without constructor arguments
    pub fn create(&self, class: impl SymbolRef) -> RuntimeResult<Object> {
        self.construct(class.symbol_name(), &[], false)
    }

    /// The lazily created instance of a singleton class
    pub fn get_instance(&self, class: impl SymbolRef) -> RuntimeResult<Object> {
        let name = class.symbol_name();
        let id = {
            let registry = self.shared.registry.read();
            let class = registry.require_class(name)?;
            if class.kind() != ClassKind::Singleton {
                return Err(RuntimeError::configuration(name, "class is not a singleton"));
            }
            class.id()
        };

        if let Some(instance) = self.shared.singletons.lock().get(&id) {
            return Ok(instance.clone());
        }

        let created = self.construct(name, &[], true)?;
        let mut singletons = self.shared.singletons.lock();
        let instance = singletons.entry(id).or_insert_with(|| created.clone()).clone();
        drop(singletons);
        if instance != created {
            created.dispose()?;
        }
        Ok(instance)
    }

    fn construct(&self, name: &str, args: &[Value], allow_singleton: bool) -> RuntimeResult<Object> {
        let (handle, constructor, defaults, auto_dispose) = {
            let registry = self.shared.registry.read();
            let class = registry.require_class(name)?;
            match class.kind() {
                ClassKind::Static => {
                    return Err(RuntimeError::configuration(
                        name,
                        "static classes cannot be instantiated",
                    ))
                }
                ClassKind::Abstract => return Err(RuntimeError::AbstractInstantiation(name.to_string())),
                ClassKind::Singleton if !allow_singleton => {
                    return Err(RuntimeError::SingletonViolation(name.to_string()))
                }
                _ => {}
            }

            let chain = Chain::new(&registry, class);
            let defaults: Vec<(String, Value)> = chain
                .property_names()
                .into_iter()
                .filter_map(|prop| chain.init_value(&prop).cloned().map(|init| (prop, init)))
                .collect();
            let auto_dispose = chain
                .auto_dispose()
                .unwrap_or(self.shared.options.auto_dispose);
            (class.handle(), class.constructor.clone(), defaults, auto_dispose)
        };

        let object = Object::new(self.shared.objects.next_hash_code(), handle, self.downgrade());
        if auto_dispose {
            let key = self.shared.objects.register(&object);
            object.set_db_key(key);
        }
        engine::load_defaults(&object, defaults);
        trace!(class = name, hash_code = object.hash_code(), "created object");

        if let Some(constructor) = constructor {
            if let Err(err) = constructor.invoke(&object, self, args) {
                object.mark_disposed();
                if let Some(key) = object.db_key() {
                    self.shared.objects.release(key);
                }
                return Err(err);
            }
        }
        Ok(object)
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    /// Call a member (or generated accessor) on an object
    pub(crate) fn invoke_member(&self, object: &Object, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        object.ensure_live()?;
        let entry = self
            .with_chain(object.class_name(), |chain| {
                chain.find_member(name).map(|(_, entry)| entry.clone())
            })
            .flatten();

        match entry {
            Some(MemberEntry::Method(slot)) => slot.invoke(object, self, args),
            Some(MemberEntry::Value(_)) => Err(RuntimeError::UnknownMember {
                class: object.class_name().to_string(),
                member: name.to_string(),
            }),
            None => match self.find_accessor(object.class_handle(), name) {
                Some((kind, property)) => engine::call_accessor(self, object, kind, &property, args),
                None => Err(RuntimeError::UnknownMember {
                    class: object.class_name().to_string(),
                    member: name.to_string(),
                }),
            },
        }
    }

    fn find_accessor(&self, class: &ClassHandle, name: &str) -> Option<(AccessorKind, String)> {
        self.with_chain(class.name(), |chain| {
            chain
                .find_accessor(name)
                .map(|(kind, def)| (kind, def.name.clone()))
        })
        .flatten()
    }

    /// Default of a plain value member
    pub(crate) fn member_value(&self, class: &ClassHandle, name: &str) -> Option<Value> {
        self.with_chain(class.name(), |chain| match chain.find_member(name) {
            Some((_, MemberEntry::Value(value))) => Some(value.clone()),
            _ => None,
        })
        .flatten()
    }

    pub(crate) fn property_def(&self, class: &ClassHandle, name: &str) -> Option<Arc<PropertyDef>> {
        self.with_chain(class.name(), |chain| chain.find_property(name).cloned())
            .flatten()
    }

    pub(crate) fn init_value(&self, class: &ClassHandle, name: &str) -> Option<Value> {
        self.with_chain(class.name(), |chain| chain.init_value(name).cloned())
            .flatten()
    }

    // ========================================================================
    // Statics and settings
    // ========================================================================

    /// Static value declared by a class itself
    pub fn static_value(&self, class: impl SymbolRef, key: &str) -> Option<Value> {
        let registry = self.shared.registry.read();
        match registry.get_by_name(class.symbol_name())?.statics.get(key) {
            Some(Static::Value(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Call a static function declared by a class itself
    pub fn call_static(&self, class: impl SymbolRef, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        let (handle, func) = {
            let registry = self.shared.registry.read();
            let target = registry.require_class(class.symbol_name())?;
            match target.statics.get(name) {
                Some(Static::Function(func)) => (target.handle(), func.clone()),
                _ => {
                    return Err(RuntimeError::UnknownMember {
                        class: target.name().to_string(),
                        member: name.to_string(),
                    })
                }
            }
        };
        func(&StaticContext::new(handle, self), args)
    }

    /// Effective value of a class-declared setting
    pub fn setting(&self, key: &str) -> Option<Value> {
        self.shared.settings.get(key).map(|entry| entry.value().clone())
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Dispose one object: destructors most-derived first, each class's
    /// directly included mixins right after the class itself
    ///
    /// Nested mixins' destructors are not invoked. The first failing
    /// destructor stops the cascade; the object is disposed and released
    /// from the live table regardless.
    pub(crate) fn dispose_object(&self, object: &Object) -> RuntimeResult<()> {
        if !object.mark_disposed() {
            return Ok(());
        }
        if self.shared.options.dispose_debug_level >= 2 {
            debug!(class = object.class_name(), hash_code = object.hash_code(), "disposing object");
        } else {
            trace!(class = object.class_name(), hash_code = object.hash_code(), "disposing object");
        }

        let (destructors, disposable) = self
            .with_chain(object.class_name(), |chain| {
                let mut destructors: Vec<DestructFn> = Vec::new();
                let mut disposable = Vec::new();
                for class in chain.classes() {
                    destructors.extend(class.destructor.clone());
                    destructors.extend(class.includes.iter().filter_map(|m| m.destructor().cloned()));
                    disposable.extend(
                        class
                            .properties
                            .values()
                            .filter(|def| def.dispose)
                            .map(|def| def.name.clone()),
                    );
                }
                (destructors, disposable)
            })
            .unwrap_or_default();

        let result = destructors
            .iter()
            .try_for_each(|destruct| destruct(object));

        engine::clear(object, &disposable);
        object.data().listeners.lock().clear();
        if let Some(key) = object.db_key() {
            self.shared.objects.release(key);
        }
        result
    }

    /// Dispose every live object, newest first
    ///
    /// Failures are logged and collected; the sweep always visits every
    /// object that was live when it started.
    pub fn dispose_all(&self) -> TeardownReport {
        let objects = &self.shared.objects;
        objects.begin_global_dispose();
        let level = self.shared.options.dispose_debug_level;
        let started = Instant::now();
        if level >= 1 {
            debug!(live = objects.stats().live, "disposing all objects");
        }

        let mut report = TeardownReport::default();
        for key in (0..objects.len()).rev() {
            let Some(object) = objects.get(key) else {
                continue;
            };
            if object.is_disposed() {
                continue;
            }
            report.disposed += 1;
            if let Err(error) = self.dispose_object(&object) {
                warn!(
                    class = object.class_name(),
                    hash_code = object.hash_code(),
                    error = %error,
                    "could not dispose object"
                );
                report.failures.push(DisposeFailure {
                    hash_code: object.hash_code(),
                    class_name: object.class_name().to_string(),
                    error,
                });
            }
        }

        if level >= 1 {
            debug!(
                disposed = report.disposed,
                failures = report.failures.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "disposing done"
            );
        }
        report
    }

    /// Whether a teardown sweep is running or has run
    pub fn in_global_dispose(&self) -> bool {
        self.shared.objects.in_global_dispose()
    }

    /// Slot counts of the live object table
    pub fn db_stats(&self) -> DbStats {
        self.shared.objects.stats()
    }

    /// Objects currently in the live table, oldest first
    pub fn live_objects(&self) -> Vec<Object> {
        self.shared.objects.live_objects()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{Member, PropertyDescriptor};

    #[test]
    fn test_define_and_lookup() {
        let rt = Runtime::new(RuntimeOptions::checked());
        let handle = rt
            .define("app.Point", ClassDescriptor::new().kind(ClassKind::Normal))
            .unwrap();
        assert_eq!(handle.basename(), "Point");
        assert!(rt.is_defined("app.Point"));
        assert!(!rt.is_defined("app.Missing"));
        assert_eq!(rt.get_by_name("app.Point"), Some(handle));
        assert_eq!(rt.get_count(), 1);
    }

    #[test]
    fn test_failed_define_registers_nothing() {
        let rt = Runtime::new(RuntimeOptions::checked());
        let err = rt
            .define(
                "app.Broken",
                ClassDescriptor::new()
                    .kind(ClassKind::Normal)
                    .property("size", PropertyDescriptor::new())
                    .implement("app.IMissing"),
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::UnknownInterface(_)));
        assert!(!rt.is_defined("app.Broken"));
        assert_eq!(rt.get_count(), 0);
    }

    #[test]
    fn test_statics() {
        let rt = Runtime::new(RuntimeOptions::checked());
        rt.define(
            "app.Math",
            ClassDescriptor::new()
                .static_value("FACTOR", 3)
                .static_fn("triple", |ctx, args| {
                    let factor = ctx.statics("FACTOR").and_then(|v| v.as_i64()).unwrap_or(0);
                    let input = args.first().and_then(Value::as_i64).unwrap_or(0);
                    Ok(Value::from(factor * input))
                }),
        )
        .unwrap();

        assert_eq!(rt.static_value("app.Math", "FACTOR"), Some(Value::from(3)));
        assert_eq!(
            rt.call_static("app.Math", "triple", &[Value::from(5)]).unwrap(),
            Value::from(15)
        );
        assert!(matches!(
            rt.call_static("app.Math", "FACTOR", &[]),
            Err(RuntimeError::UnknownMember { .. })
        ));
        assert!(matches!(
            rt.create("app.Math"),
            Err(RuntimeError::Configuration { .. })
        ));
    }

    #[test]
    fn test_member_value_and_fields() {
        let rt = Runtime::new(RuntimeOptions::checked());
        rt.define(
            "app.Counter",
            ClassDescriptor::new()
                .kind(ClassKind::Normal)
                .member("step", Member::value(1)),
        )
        .unwrap();
        let counter = rt.create("app.Counter").unwrap();
        assert_eq!(counter.field("step"), Some(Value::from(1)));
        counter.set_field("step", 5).unwrap();
        assert_eq!(counter.field("step"), Some(Value::from(5)));
        assert!(matches!(
            counter.call("step", &[]),
            Err(RuntimeError::UnknownMember { .. })
        ));
    }

    #[test]
    fn test_settings_override() {
        let mut options = RuntimeOptions::checked();
        options
            .settings
            .insert("app.level".to_string(), serde_json::json!(9));
        let rt = Runtime::new(options);
        rt.define(
            "app.Config",
            ClassDescriptor::new()
                .setting("app.level", 1)
                .setting("app.name", "demo"),
        )
        .unwrap();
        assert_eq!(rt.setting("app.level"), Some(Value::from(9)));
        assert_eq!(rt.setting("app.name"), Some(Value::from("demo")));

        let err = rt
            .define("app.Other", ClassDescriptor::new().setting("app.name", "again"))
            .unwrap_err();
        assert!(matches!(err, RuntimeError::DuplicateDefinition { kind: "setting", .. }));
    }
}
