//! Inheritance builder
//!
//! Turns a [`ClassDescriptor`] into a [`Class`] without touching the
//! registry. The runtime holds the registry write lock around the whole build
//! and only inserts the result when every step succeeded, so a failed
//! definition leaves nothing behind.

use super::lookup::Chain;
use super::{Class, ClassRegistry, Invocation, MemberEntry, MethodSlot, SlotKind};
use crate::descriptor::{
    reject_duplicates, ClassDescriptor, ClassKind, Member, MethodFn, PropertyDescriptor, Static,
    REFINE_ALLOWED_KEYS, STATIC_ALLOWED_KEYS,
};
use crate::error::{RuntimeError, RuntimeResult};
use crate::interface::{self, Interface};
use crate::mixin::{self, Mixin};
use crate::options::{RuntimeOptions, Validation};
use crate::property::PropertyDef;
use crate::value::Value;
use std::sync::Arc;

/// A class ready for insertion together with the settings it declares
pub(crate) struct BuiltClass {
    pub(crate) class: Class,
    pub(crate) settings: Vec<(String, Value)>,
}

/// Build a class from a descriptor
///
/// `setting_exists` reports whether a setting key is already defined by an
/// earlier class.
pub(crate) fn build_class(
    registry: &ClassRegistry,
    name: &str,
    desc: ClassDescriptor,
    options: &RuntimeOptions,
    setting_exists: impl Fn(&str) -> bool,
) -> RuntimeResult<BuiltClass> {
    let validation = options.validation;
    registry.check_available(name)?;

    let kind = desc.effective_kind();
    if validation.is_checked() {
        validate_shape(name, kind, &desc)?;
    }
    reject_duplicates(name, "static", desc.statics.iter().map(|(n, _)| n))?;
    reject_duplicates(name, "property", desc.properties.iter().map(|(n, _)| n))?;
    reject_duplicates(name, "member", desc.members.iter().map(|(n, _)| n))?;
    reject_duplicates(name, "event", desc.events.iter().map(|(n, _)| n))?;
    reject_duplicates(name, "setting", desc.settings.iter().map(|(n, _)| n))?;
    reject_duplicates(name, "mixin", desc.include.iter())?;
    reject_duplicates(name, "interface", desc.implement.iter())?;

    // Superclass
    let superclass = match (&desc.extend, kind) {
        (Some(extend), kind) if kind.is_instantiable() => {
            let parent = registry.require_class(extend)?;
            if !parent.kind.is_instantiable() {
                return Err(RuntimeError::configuration(
                    name,
                    format!("cannot extend static class '{}'", parent.name()),
                ));
            }
            Some(parent.clone())
        }
        _ => None,
    };

    let mut class = Class::new(
        registry.next_class_id(),
        name,
        kind,
        superclass.as_ref().map(|parent| parent.id),
    );
    let handle = class.handle();

    // Constructor
    if kind.is_instantiable() {
        let func: MethodFn = match desc.construct {
            Some(func) => func,
            None => Arc::new(|inv: &Invocation<'_>, args: &[Value]| inv.base(args)),
        };
        let base = superclass
            .as_ref()
            .and_then(|parent| parent.constructor.clone());
        class.constructor = Some(Arc::new(MethodSlot::new(
            "construct",
            &handle,
            func,
            base,
            SlotKind::Constructor,
        )));
    }
    class.destructor = desc.destruct;
    class.auto_dispose = desc.auto_dispose;

    for (key, value) in desc.statics {
        class.statics.insert(key, value);
    }
    for (prop_name, prop) in &desc.properties {
        add_property(&mut class, registry, prop_name, prop, validation)?;
    }
    for (member_name, member) in desc.members {
        add_member(&mut class, registry, &member_name, member);
    }
    for (event, event_type) in desc.events {
        class.events.insert(event, event_type);
    }

    // Mixins
    if !desc.include.is_empty() {
        let mixins = desc
            .include
            .iter()
            .map(|n| registry.require_mixin(n).cloned())
            .collect::<RuntimeResult<Vec<_>>>()?;
        mixin::check_compatible(&mixins)?;
        for mixin in &mixins {
            mixin::attach(&mut class, registry, mixin, false)?;
        }
    }

    // Settings
    let mut settings = Vec::with_capacity(desc.settings.len());
    for (key, declared) in desc.settings {
        if validation.is_checked() {
            check_setting_namespace(name, &key)?;
        }
        if setting_exists(&key) {
            return Err(RuntimeError::DuplicateDefinition {
                kind: "setting",
                name: key,
                scope: name.to_string(),
            });
        }
        let value = match options.settings.get(&key) {
            Some(json) => Value::from_json(json),
            None => declared,
        };
        settings.push((key, value));
    }

    if let Some(defer) = desc.defer {
        let mut scope = DeferScope {
            class: &mut class,
            registry,
            validation,
        };
        defer(&mut scope)?;
    }

    // Interfaces
    for iface_name in &desc.implement {
        let iface = registry.require_interface(iface_name)?.clone();
        add_interface(&mut class, registry, iface)?;
    }
    let inherited = Chain::new(registry, &class)
        .parent()
        .map(|parent| parent.interfaces())
        .unwrap_or_default();
    let chain = Chain::new(registry, &class);
    for iface in &inherited {
        interface::assert_conforms(&chain, iface)?;
    }

    Ok(BuiltClass { class, settings })
}

fn validate_shape(name: &str, kind: ClassKind, desc: &ClassDescriptor) -> RuntimeResult<()> {
    if kind == ClassKind::Static {
        if let Some(key) = desc
            .keys()
            .into_iter()
            .find(|key| !STATIC_ALLOWED_KEYS.contains(key))
        {
            return Err(RuntimeError::configuration(
                name,
                format!("the key \"{}\" is not allowed for static classes", key),
            ));
        }
    }
    Ok(())
}

fn check_setting_namespace(class_name: &str, key: &str) -> RuntimeResult<()> {
    let class_ns = class_name.split('.').next().unwrap_or(class_name);
    match key.split_once('.') {
        Some((ns, _)) if ns == class_ns => Ok(()),
        _ => Err(RuntimeError::configuration(
            class_name,
            format!(
                "forbidden setting \"{}\": default settings must live in the \"{}\" namespace",
                key, class_ns
            ),
        )),
    }
}

/// Declare a property (or refine an inherited one) on a class under construction
pub(crate) fn add_property(
    class: &mut Class,
    registry: &ClassRegistry,
    name: &str,
    desc: &PropertyDescriptor,
    validation: Validation,
) -> RuntimeResult<()> {
    let parent = class.superclass.and_then(|id| Chain::of(registry, id));

    if desc.is_refine() {
        if validation.is_checked() {
            if let Some(key) = desc
                .keys()
                .into_iter()
                .find(|key| !REFINE_ALLOWED_KEYS.contains(key))
            {
                return Err(RuntimeError::configuration(
                    format!("{}.{}", class.name(), name),
                    format!("key \"{}\" could not be refined", key),
                ));
            }
        }
        let Some(inherited) = parent.and_then(|parent| parent.find_property(name)) else {
            return Err(RuntimeError::configuration(
                format!("{}.{}", class.name(), name),
                "cannot refine a property that is not inherited",
            ));
        };
        if let Some(init) = &desc.init {
            if validation.is_checked() {
                inherited.validate(init)?;
            }
            class.refined_inits.insert(name.to_string(), init.clone());
        }
        return Ok(());
    }

    let inherited = parent.is_some_and(|parent| parent.find_property(name).is_some());
    if inherited || class.properties.contains_key(name) {
        return Err(RuntimeError::DuplicateDefinition {
            kind: "property",
            name: name.to_string(),
            scope: class.name().to_string(),
        });
    }
    let def = PropertyDef::from_descriptor(name, class.name(), desc);
    if validation.is_checked() {
        if let Some(init) = &def.init {
            def.validate(init)?;
        }
    }
    class.properties.insert(name.to_string(), Arc::new(def));
    Ok(())
}

/// Install a member, linking methods to the implementation they override
pub(crate) fn add_member(class: &mut Class, registry: &ClassRegistry, name: &str, member: Member) {
    let entry = match member {
        Member::Method(func) => {
            let base = class
                .superclass
                .and_then(|id| Chain::of(registry, id))
                .and_then(|parent| parent.find_member(name))
                .and_then(|(_, entry)| entry.as_method().cloned());
            MemberEntry::Method(Arc::new(MethodSlot::new(
                name,
                &class.handle(),
                func,
                base,
                SlotKind::Method,
            )))
        }
        Member::Value(value) => MemberEntry::Value(value),
    };
    class.members.insert(name.to_string(), entry);
}

fn add_interface(class: &mut Class, registry: &ClassRegistry, iface: Arc<Interface>) -> RuntimeResult<()> {
    let chain = Chain::new(registry, class);
    if chain.find_interface(iface.name()).is_some() {
        return Err(RuntimeError::DuplicateDefinition {
            kind: "interface",
            name: iface.name().to_string(),
            scope: class.name().to_string(),
        });
    }
    interface::assert_conforms(&chain, &iface)?;
    class.implements.push(iface);
    Ok(())
}

// ============================================================================
// Defer scope
// ============================================================================

/// View of a class under construction, handed to its `defer` hook
///
/// The hook runs while the registry is locked for writing; it must not call
/// back into the [`Runtime`](crate::Runtime).
pub struct DeferScope<'a> {
    class: &'a mut Class,
    registry: &'a ClassRegistry,
    validation: Validation,
}

impl<'a> DeferScope<'a> {
    /// Name of the class being built
    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    pub fn kind(&self) -> ClassKind {
        self.class.kind
    }

    /// Own static entry
    pub fn statics(&self, key: &str) -> Option<&Static> {
        self.class.statics.get(key)
    }

    /// Own static value
    pub fn static_value(&self, key: &str) -> Option<Value> {
        match self.class.statics.get(key) {
            Some(Static::Value(value)) => Some(value.clone()),
            _ => None,
        }
    }

    /// Add or replace a static entry
    pub fn set_static(&mut self, key: impl Into<String>, value: Static) {
        self.class.statics.insert(key.into(), value);
    }

    /// Whether a member resolves through the chain
    pub fn has_member(&self, name: &str) -> bool {
        Chain::new(self.registry, &*self.class).find_member(name).is_some()
    }

    /// Add or replace an own member
    pub fn add_member(&mut self, name: impl Into<String>, member: Member) {
        let name = name.into();
        add_member(&mut *self.class, self.registry, &name, member);
    }

    /// Make `existing` also answer to `alias`
    pub fn alias_member(&mut self, alias: impl Into<String>, existing: &str) -> RuntimeResult<()> {
        let entry = Chain::new(self.registry, &*self.class)
            .find_member(existing)
            .map(|(_, entry)| entry.clone())
            .ok_or_else(|| RuntimeError::UnknownMember {
                class: self.class.name().to_string(),
                member: existing.to_string(),
            })?;
        self.class.members.insert(alias.into(), entry);
        Ok(())
    }

    /// Whether a property resolves through the chain
    pub fn has_property(&self, name: &str) -> bool {
        Chain::new(self.registry, &*self.class)
            .find_property(name)
            .is_some()
    }

    /// Declare an additional property
    pub fn add_property(&mut self, name: &str, desc: PropertyDescriptor) -> RuntimeResult<()> {
        add_property(&mut *self.class, self.registry, name, &desc, self.validation)
    }

    /// Mixins available for inspection
    pub fn included_mixins(&self) -> Vec<Arc<Mixin>> {
        Chain::new(self.registry, &*self.class).mixins()
    }
}
