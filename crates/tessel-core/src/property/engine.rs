//! Property accessors
//!
//! Every write goes through [`write`]: validate, swap one layer under the
//! store lock, release the lock, then run `apply` and fire the change event
//! if the effective value moved. A rejected value leaves every layer as it
//! was.

use super::accessor::{accessor_name, AccessorKind};
use super::{Layer, PropertyDef};
use crate::class::lookup::accessor_applies;
use crate::error::{RuntimeError, RuntimeResult};
use crate::object::{Event, Object};
use crate::runtime::Runtime;
use crate::value::Value;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn resolve(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<Arc<PropertyDef>> {
    runtime
        .property_def(object.class_handle(), name)
        .ok_or_else(|| RuntimeError::UnknownProperty {
            class: object.class_name().to_string(),
            property: name.to_string(),
        })
}

/// Fail on the first name that is not a property of the object
pub(crate) fn require_all<'n>(
    runtime: &Runtime,
    object: &Object,
    names: impl IntoIterator<Item = &'n str>,
) -> RuntimeResult<()> {
    for name in names {
        resolve(runtime, object, name)?;
    }
    Ok(())
}

fn write(
    runtime: &Runtime,
    object: &Object,
    def: &PropertyDef,
    layer: Layer,
    value: Option<Value>,
) -> RuntimeResult<Option<Value>> {
    object.ensure_live()?;
    if let Some(value) = &value {
        if runtime.options().validation.is_checked() {
            def.validate(value)?;
        }
    }
    let change = object.data().properties.lock().write(&def.name, layer, value);
    if change.is_change() {
        notify(runtime, object, def, change.new.clone(), change.old)?;
    }
    Ok(change.new)
}

fn notify(
    runtime: &Runtime,
    object: &Object,
    def: &PropertyDef,
    new: Option<Value>,
    old: Option<Value>,
) -> RuntimeResult<()> {
    if let Some(apply) = &def.apply {
        let args = [
            new.clone().unwrap_or_default(),
            old.clone().unwrap_or_default(),
        ];
        runtime.invoke_member(object, apply, &args)?;
    }
    if let Some(event) = &def.event {
        object.emit(&Event::new(event, object.clone(), new, old));
    }
    Ok(())
}

pub(crate) fn get(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<Option<Value>> {
    resolve(runtime, object, name)?;
    Ok(object.data().properties.lock().effective(name))
}

pub(crate) fn set(runtime: &Runtime, object: &Object, name: &str, value: Value) -> RuntimeResult<Value> {
    let def = resolve(runtime, object, name)?;
    let effective = write(runtime, object, &def, Layer::User, Some(value))?;
    Ok(effective.unwrap_or_default())
}

pub(crate) fn reset(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<Option<Value>> {
    let def = resolve(runtime, object, name)?;
    write(runtime, object, &def, Layer::User, None)
}

pub(crate) fn style(
    runtime: &Runtime,
    object: &Object,
    name: &str,
    value: Value,
) -> RuntimeResult<Option<Value>> {
    let def = resolve(runtime, object, name)?;
    if !def.themeable {
        warn!(
            class = object.class_name(),
            property = name,
            "property is not themeable, styling falls back to set"
        );
        return write(runtime, object, &def, Layer::User, Some(value));
    }
    write(runtime, object, &def, Layer::Theme, Some(value))
}

pub(crate) fn unstyle(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<Option<Value>> {
    let def = resolve(runtime, object, name)?;
    if !def.themeable {
        warn!(
            class = object.class_name(),
            property = name,
            "property is not themeable, unstyling falls back to reset"
        );
        return write(runtime, object, &def, Layer::User, None);
    }
    write(runtime, object, &def, Layer::Theme, None)
}

/// Reload the init layer from the class default and run apply/event with it
pub(crate) fn init(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<Option<Value>> {
    let def = resolve(runtime, object, name)?;
    object.ensure_live()?;
    let init = runtime.init_value(object.class_handle(), name);
    let change = object.data().properties.lock().write(name, Layer::Init, init);
    if change.new.is_some() {
        notify(runtime, object, &def, change.new.clone(), change.old)?;
    }
    Ok(change.new)
}

pub(crate) fn compute(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<Option<Value>> {
    let def = resolve(runtime, object, name)?;
    let Some(member) = &def.compute else {
        return Err(RuntimeError::UnknownMember {
            class: object.class_name().to_string(),
            member: accessor_name(AccessorKind::Compute, name),
        });
    };
    let value = runtime.invoke_member(object, member, &[])?;
    write(runtime, object, &def, Layer::Computed, Some(value))
}

pub(crate) fn toggle(runtime: &Runtime, object: &Object, name: &str) -> RuntimeResult<bool> {
    let def = resolve(runtime, object, name)?;
    if !def.is_boolean() {
        return Err(RuntimeError::UnknownMember {
            class: object.class_name().to_string(),
            member: accessor_name(AccessorKind::Toggle, name),
        });
    }
    let current = object
        .data()
        .properties
        .lock()
        .effective(name)
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    write(runtime, object, &def, Layer::User, Some(Value::Boolean(!current)))?;
    Ok(!current)
}

/// Dispatch a generated accessor call
pub(crate) fn call_accessor(
    runtime: &Runtime,
    object: &Object,
    kind: AccessorKind,
    property: &str,
    args: &[Value],
) -> RuntimeResult<Value> {
    let def = resolve(runtime, object, property)?;
    if !accessor_applies(kind, &def) {
        return Err(RuntimeError::UnknownMember {
            class: object.class_name().to_string(),
            member: accessor_name(kind, property),
        });
    }
    let arg = || args.first().cloned().unwrap_or_default();
    let value = match kind {
        AccessorKind::Get => get(runtime, object, property)?,
        AccessorKind::Set => Some(set(runtime, object, property, arg())?),
        AccessorKind::Reset => reset(runtime, object, property)?,
        AccessorKind::Init => init(runtime, object, property)?,
        AccessorKind::Style => style(runtime, object, property, arg())?,
        AccessorKind::Unstyle => unstyle(runtime, object, property)?,
        AccessorKind::Compute => compute(runtime, object, property)?,
        AccessorKind::Toggle => Some(Value::Boolean(toggle(runtime, object, property)?)),
    };
    Ok(value.unwrap_or_default())
}

/// Load class defaults into the init layer of a fresh object, silently
pub(crate) fn load_defaults(object: &Object, defaults: Vec<(String, Value)>) {
    let mut store = object.data().properties.lock();
    for (name, value) in defaults {
        store.write(&name, Layer::Init, Some(value));
    }
}

/// Drop all layers of the given properties
pub(crate) fn clear(object: &Object, names: &[String]) {
    let mut store = object.data().properties.lock();
    for name in names {
        store.clear(name);
    }
}
