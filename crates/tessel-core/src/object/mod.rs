//! Instances
//!
//! An [`Object`] is a cheap, clonable handle. All handles to one instance
//! share its hash code, disposed flag, property layers, fields and
//! listeners. The object refers back to its [`Runtime`] weakly; operations
//! that need class information fail with [`RuntimeError::RuntimeDropped`]
//! once the runtime is gone.

pub mod db;
pub mod events;

pub use db::{DbStats, DisposeFailure, TeardownReport};
pub use events::{Event, Listener, ListenerId};

use crate::class::ClassHandle;
use crate::error::{RuntimeError, RuntimeResult};
use crate::property::{engine, PropertyStore};
use crate::runtime::{Runtime, RuntimeShared};
use crate::value::Value;
use events::Listeners;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

pub(crate) struct ObjectData {
    hash_code: u64,
    class: ClassHandle,
    disposed: AtomicBool,
    db_key: OnceCell<usize>,
    pub(crate) properties: Mutex<PropertyStore>,
    fields: Mutex<FxHashMap<String, Value>>,
    pub(crate) listeners: Mutex<Listeners>,
    runtime: Weak<RuntimeShared>,
}

/// Handle to a runtime instance
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectData>,
}

impl Object {
    pub(crate) fn new(hash_code: u64, class: ClassHandle, runtime: Weak<RuntimeShared>) -> Self {
        Self {
            inner: Arc::new(ObjectData {
                hash_code,
                class,
                disposed: AtomicBool::new(false),
                db_key: OnceCell::new(),
                properties: Mutex::new(PropertyStore::new()),
                fields: Mutex::new(FxHashMap::default()),
                listeners: Mutex::new(Listeners::default()),
                runtime,
            }),
        }
    }

    pub(crate) fn data(&self) -> &ObjectData {
        &self.inner
    }

    /// Unique hash code
    pub fn hash_code(&self) -> u64 {
        self.inner.hash_code
    }

    /// Fully qualified name of the runtime type
    pub fn class_name(&self) -> &str {
        self.inner.class.name()
    }

    /// Handle of the runtime type
    pub fn class_handle(&self) -> &ClassHandle {
        &self.inner.class
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Key in the live object table, if registered
    pub fn db_key(&self) -> Option<usize> {
        self.inner.db_key.get().copied()
    }

    pub(crate) fn set_db_key(&self, key: usize) {
        let _ = self.inner.db_key.set(key);
    }

    /// Flip the disposed flag; true only for the call that flipped it
    pub(crate) fn mark_disposed(&self) -> bool {
        !self.inner.disposed.swap(true, Ordering::SeqCst)
    }

    /// The runtime that created this object
    pub fn runtime(&self) -> RuntimeResult<Runtime> {
        self.inner
            .runtime
            .upgrade()
            .map(Runtime::from_shared)
            .ok_or(RuntimeError::RuntimeDropped)
    }

    pub(crate) fn ensure_live(&self) -> RuntimeResult<()> {
        if self.is_disposed() {
            Err(RuntimeError::ObjectDisposed {
                class: self.class_name().to_string(),
                hash_code: self.hash_code(),
            })
        } else {
            Ok(())
        }
    }

    /// Dispose the object; idempotent
    ///
    /// If the owning runtime has been dropped, no destructor can run: the
    /// first call only marks the object disposed and returns
    /// [`RuntimeError::RuntimeDropped`], later calls return `Ok`.
    pub fn dispose(&self) -> RuntimeResult<()> {
        match self.runtime() {
            Ok(runtime) => runtime.dispose_object(self),
            Err(err) => {
                if self.mark_disposed() {
                    Err(err)
                } else {
                    Ok(())
                }
            }
        }
    }

    // ========================================================================
    // Members
    // ========================================================================

    /// Call a member or a generated property accessor
    pub fn call(&self, name: &str, args: &[Value]) -> RuntimeResult<Value> {
        let runtime = self.runtime()?;
        runtime.invoke_member(self, name, args)
    }

    /// Per-instance field, falling back to the class's plain value member
    pub fn field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.inner.fields.lock().get(name) {
            return Some(value.clone());
        }
        self.runtime().ok()?.member_value(self.class_handle(), name)
    }

    /// Set a per-instance field
    pub fn set_field(&self, name: impl Into<String>, value: impl Into<Value>) -> RuntimeResult<()> {
        self.ensure_live()?;
        self.inner.fields.lock().insert(name.into(), value.into());
        Ok(())
    }

    /// Null out fields
    pub fn dispose_fields(&self, names: &[&str]) {
        let mut fields = self.inner.fields.lock();
        for name in names {
            fields.insert(name.to_string(), Value::Null);
        }
    }

    /// Null out object-valued fields, then dispose what they held
    ///
    /// Every named field is nulled and every held object disposed even when
    /// one disposal fails; the first error is returned.
    pub fn dispose_objects(&self, names: &[&str]) -> RuntimeResult<()> {
        let held: Vec<Object> = {
            let mut fields = self.inner.fields.lock();
            names
                .iter()
                .filter_map(|name| match fields.insert(name.to_string(), Value::Null) {
                    Some(Value::Object(object)) => Some(object),
                    _ => None,
                })
                .collect()
        };

        let mut first_error = None;
        for object in held {
            if let Err(err) = object.dispose() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    // ========================================================================
    // Properties
    // ========================================================================

    /// Effective value of a property (`None` if unknown or unset)
    pub fn get(&self, name: &str) -> Option<Value> {
        self.get_property(name).ok().flatten()
    }

    /// Effective value of a property, failing on unknown names
    pub fn get_property(&self, name: &str) -> RuntimeResult<Option<Value>> {
        let runtime = self.runtime()?;
        engine::get(&runtime, self, name)
    }

    /// Set the user layer; returns the new effective value
    pub fn set_property(&self, name: &str, value: impl Into<Value>) -> RuntimeResult<Value> {
        let runtime = self.runtime()?;
        engine::set(&runtime, self, name, value.into())
    }

    /// Clear the user layer
    pub fn reset(&self, name: &str) -> RuntimeResult<Option<Value>> {
        let runtime = self.runtime()?;
        engine::reset(&runtime, self, name)
    }

    /// Reload the class default and notify with it
    pub fn init_property(&self, name: &str) -> RuntimeResult<Option<Value>> {
        let runtime = self.runtime()?;
        engine::init(&runtime, self, name)
    }

    /// Run the compute member into the computed layer
    pub fn compute(&self, name: &str) -> RuntimeResult<Option<Value>> {
        let runtime = self.runtime()?;
        engine::compute(&runtime, self, name)
    }

    /// Set the theme layer
    pub fn style_property(&self, name: &str, value: impl Into<Value>) -> RuntimeResult<Option<Value>> {
        let runtime = self.runtime()?;
        engine::style(&runtime, self, name, value.into())
    }

    /// Clear the theme layer
    pub fn unstyle_property(&self, name: &str) -> RuntimeResult<Option<Value>> {
        let runtime = self.runtime()?;
        engine::unstyle(&runtime, self, name)
    }

    /// Flip a boolean property
    pub fn toggle(&self, name: &str) -> RuntimeResult<bool> {
        let runtime = self.runtime()?;
        engine::toggle(&runtime, self, name)
    }

    /// Set several properties
    ///
    /// Every name is resolved before anything is written; the first unknown
    /// one fails with [`RuntimeError::UnknownProperty`].
    pub fn set<I, K, V>(&self, values: I) -> RuntimeResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let runtime = self.runtime()?;
        let values: Vec<(K, Value)> = values.into_iter().map(|(k, v)| (k, v.into())).collect();
        engine::require_all(&runtime, self, values.iter().map(|(k, _)| k.as_ref()))?;
        for (name, value) in values {
            engine::set(&runtime, self, name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Style several properties
    pub fn style<I, K, V>(&self, values: I) -> RuntimeResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let runtime = self.runtime()?;
        let values: Vec<(K, Value)> = values.into_iter().map(|(k, v)| (k, v.into())).collect();
        engine::require_all(&runtime, self, values.iter().map(|(k, _)| k.as_ref()))?;
        for (name, value) in values {
            engine::style(&runtime, self, name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Unstyle several properties
    pub fn unstyle<I, K>(&self, names: I) -> RuntimeResult<()>
    where
        I: IntoIterator<Item = K>,
        K: AsRef<str>,
    {
        let runtime = self.runtime()?;
        let names: Vec<K> = names.into_iter().collect();
        engine::require_all(&runtime, self, names.iter().map(|k| k.as_ref()))?;
        for name in names {
            engine::unstyle(&runtime, self, name.as_ref())?;
        }
        Ok(())
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Register a listener
    ///
    /// With validation enabled the class must support the event.
    pub fn add_listener<F>(&self, event: &str, listener: F) -> RuntimeResult<ListenerId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.ensure_live()?;
        let runtime = self.runtime()?;
        if runtime.options().validation.is_checked() && !runtime.supports_event(self.class_handle(), event) {
            return Err(RuntimeError::UnknownEvent {
                class: self.class_name().to_string(),
                event: event.to_string(),
            });
        }
        Ok(self.inner.listeners.lock().add(event, Arc::new(listener)))
    }

    /// Remove a listener; false if it was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.lock().remove(id)
    }

    /// Number of listeners for an event
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.lock().count(event)
    }

    /// Fire a plain event
    pub fn fire_event(&self, event: &str) -> RuntimeResult<()> {
        self.dispatch(Event::new(event, self.clone(), None, None))
    }

    /// Fire an event carrying a value and an optional previous value
    pub fn fire_data_event(&self, event: &str, value: Value, old_value: Option<Value>) -> RuntimeResult<()> {
        self.dispatch(Event::new(event, self.clone(), Some(value), old_value))
    }

    pub(crate) fn dispatch(&self, event: Event) -> RuntimeResult<()> {
        let runtime = self.runtime()?;
        if runtime.options().validation.is_checked()
            && !runtime.supports_event(self.class_handle(), event.kind())
        {
            return Err(RuntimeError::UnknownEvent {
                class: self.class_name().to_string(),
                event: event.kind().to_string(),
            });
        }
        self.emit(&event);
        Ok(())
    }

    /// Deliver an event to the current listeners without any lock held
    pub(crate) fn emit(&self, event: &Event) {
        let listeners = self.inner.listeners.lock().snapshot(event.kind());
        for listener in listeners {
            listener(event);
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Object {}

impl Hash for Object {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash_code.hash(state);
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[object {}]", self.class_name())
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("class", &self.class_name())
            .field("hash_code", &self.hash_code())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
