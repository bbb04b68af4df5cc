//! Chain lookups
//!
//! Inherited symbols are never copied into subclasses. A [`Chain`] walks from
//! a head class (which may not be registered yet) through its superclass ids
//! and answers the reflection questions.

use super::{Class, ClassId, ClassRegistry, MemberEntry};
use crate::interface::Interface;
use crate::mixin::Mixin;
use crate::property::{accessor::AccessorKind, accessor_name, parse_accessor, PropertyDef};
use crate::value::Value;
use std::sync::Arc;

/// Superclass chain of a class, most-derived first
#[derive(Clone, Copy)]
pub(crate) struct Chain<'a> {
    registry: &'a ClassRegistry,
    head: &'a Class,
}

/// Iterator over the classes of a [`Chain`]
pub(crate) struct ChainIter<'a> {
    registry: &'a ClassRegistry,
    next: Option<&'a Class>,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current
            .superclass
            .and_then(|id| self.registry.get(id))
            .map(|class| class.as_ref());
        Some(current)
    }
}

impl<'a> Chain<'a> {
    pub(crate) fn new(registry: &'a ClassRegistry, head: &'a Class) -> Self {
        Self { registry, head }
    }

    /// Chain of a registered class
    pub(crate) fn of(registry: &'a ClassRegistry, id: ClassId) -> Option<Self> {
        registry.get(id).map(|class| Self::new(registry, class))
    }

    pub(crate) fn head(&self) -> &'a Class {
        self.head
    }

    /// Head first, then every ancestor
    pub(crate) fn classes(&self) -> ChainIter<'a> {
        ChainIter {
            registry: self.registry,
            next: Some(self.head),
        }
    }

    /// Ancestors only
    pub(crate) fn ancestors(&self) -> ChainIter<'a> {
        let mut iter = self.classes();
        iter.next();
        iter
    }

    /// Chain of the superclass
    pub(crate) fn parent(&self) -> Option<Chain<'a>> {
        self.head
            .superclass
            .and_then(|id| Chain::of(self.registry, id))
    }

    pub(crate) fn find_property(&self, name: &str) -> Option<&'a Arc<PropertyDef>> {
        self.classes().find_map(|class| class.properties.get(name))
    }

    /// Effective init value: the most-derived refinement or the declared init
    pub(crate) fn init_value(&self, name: &str) -> Option<&'a Value> {
        for class in self.classes() {
            if let Some(value) = class.refined_inits.get(name) {
                return Some(value);
            }
            if let Some(def) = class.properties.get(name) {
                return def.init.as_ref();
            }
        }
        None
    }

    pub(crate) fn find_member(&self, name: &str) -> Option<(&'a Class, &'a MemberEntry)> {
        self.classes()
            .find_map(|class| class.members.get(name).map(|entry| (class, entry)))
    }

    pub(crate) fn find_event(&self, name: &str) -> Option<&'a str> {
        self.classes()
            .find_map(|class| class.events.get(name).map(String::as_str))
    }

    /// Property and accessor kind a generated accessor name stands for
    ///
    /// The name is parsed first; names that do not parse back to their
    /// property (`getURL` for `URL`) are matched against every chain property.
    pub(crate) fn find_accessor(&self, name: &str) -> Option<(AccessorKind, &'a Arc<PropertyDef>)> {
        if let Some((kind, property)) = parse_accessor(name) {
            if let Some(def) = self.find_property(&property) {
                return Some((kind, def));
            }
        }
        self.classes()
            .flat_map(|class| class.properties.values())
            .find_map(|def| {
                AccessorKind::ALL
                    .into_iter()
                    .find(|kind| accessor_name(*kind, &def.name) == name)
                    .map(|kind| (kind, def))
            })
    }

    /// Whether a generated accessor of a chain property answers to `name`
    pub(crate) fn has_accessor(&self, name: &str) -> bool {
        self.find_accessor(name)
            .is_some_and(|(kind, def)| accessor_applies(kind, def))
    }

    /// Whether a callable member (method or accessor) answers to `name`
    pub(crate) fn has_callable(&self, name: &str) -> bool {
        match self.find_member(name) {
            Some((_, MemberEntry::Method(_))) => true,
            Some((_, MemberEntry::Value(_))) => false,
            None => self.has_accessor(name),
        }
    }

    /// First class in the chain that includes the mixin (directly or nested)
    pub(crate) fn find_mixin(&self, name: &str) -> Option<&'a Class> {
        self.classes().find(|class| {
            Mixin::flatten(&class.includes)
                .iter()
                .any(|mixin| mixin.name() == name)
        })
    }

    /// Every mixin in the chain, flattened, most-derived class first
    pub(crate) fn mixins(&self) -> Vec<Arc<Mixin>> {
        let mut list: Vec<Arc<Mixin>> = Vec::new();
        for class in self.classes() {
            for mixin in Mixin::flatten(&class.includes) {
                if !list.iter().any(|m| m.name() == mixin.name()) {
                    list.push(mixin);
                }
            }
        }
        list
    }

    /// First class in the chain that declares the interface (directly or by extension)
    pub(crate) fn find_interface(&self, name: &str) -> Option<&'a Class> {
        self.classes().find(|class| {
            Interface::flatten(&class.implements)
                .iter()
                .any(|iface| iface.name() == name)
        })
    }

    /// Every declared interface in the chain, flattened, most-derived class first
    pub(crate) fn interfaces(&self) -> Vec<Arc<Interface>> {
        let mut list: Vec<Arc<Interface>> = Vec::new();
        for class in self.classes() {
            for iface in Interface::flatten(&class.implements) {
                if !list.iter().any(|i| i.name() == iface.name()) {
                    list.push(iface);
                }
            }
        }
        list
    }

    /// Auto-dispose override of the nearest class that sets one
    pub(crate) fn auto_dispose(&self) -> Option<bool> {
        self.classes().find_map(|class| class.auto_dispose)
    }

    /// Sorted names of all chain properties
    pub(crate) fn property_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes()
            .flat_map(|class| class.properties.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sorted names of all chain members
    pub(crate) fn member_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes()
            .flat_map(|class| class.members.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Sorted names of all chain events
    pub(crate) fn event_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .classes()
            .flat_map(|class| class.events.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Whether an accessor kind exists for a property
pub(crate) fn accessor_applies(kind: AccessorKind, def: &PropertyDef) -> bool {
    match kind {
        AccessorKind::Style | AccessorKind::Unstyle => def.themeable,
        AccessorKind::Toggle => def.is_boolean(),
        AccessorKind::Compute => def.compute.is_some(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{ClassKind, PropertyDescriptor};

    fn registry_with_chain() -> ClassRegistry {
        let mut registry = ClassRegistry::new();

        let mut base = Class::new(registry.next_class_id(), "zoo.Animal", ClassKind::Abstract, None);
        let name = PropertyDescriptor::new().init("?");
        base.properties.insert(
            "name".to_string(),
            Arc::new(PropertyDef::from_descriptor("name", "zoo.Animal", &name)),
        );
        base.events.insert("changeName".to_string(), "zoo.DataEvent".to_string());
        base.members
            .insert("legs".to_string(), MemberEntry::Value(Value::from(4)));
        let base_id = base.id;
        registry.insert_class(base);

        let mut dog = Class::new(registry.next_class_id(), "zoo.Dog", ClassKind::Normal, Some(base_id));
        dog.refined_inits.insert("name".to_string(), Value::from("Rex"));
        registry.insert_class(dog);
        registry
    }

    #[test]
    fn test_chain_order() {
        let registry = registry_with_chain();
        let chain = Chain::of(&registry, ClassId(1)).unwrap();
        let names: Vec<&str> = chain.classes().map(|c| c.name()).collect();
        assert_eq!(names, vec!["zoo.Dog", "zoo.Animal"]);
        assert_eq!(chain.ancestors().count(), 1);
        assert_eq!(chain.parent().map(|p| p.head().id()), Some(ClassId(0)));
    }

    #[test]
    fn test_inherited_lookups() {
        let registry = registry_with_chain();
        let chain = Chain::of(&registry, ClassId(1)).unwrap();
        assert_eq!(chain.find_property("name").unwrap().owner, "zoo.Animal");
        assert_eq!(chain.find_event("changeName"), Some("zoo.DataEvent"));
        assert!(chain.find_member("legs").is_some());
        assert!(!chain.has_callable("legs"));
        assert!(chain.has_callable("getName"));
        assert!(!chain.has_callable("styleName"));
    }

    #[test]
    fn test_accessor_for_name_that_does_not_parse_back() {
        let mut registry = registry_with_chain();
        let mut link = Class::new(registry.next_class_id(), "zoo.Link", ClassKind::Normal, None);
        for name in ["URL", "___raw"] {
            link.properties.insert(
                name.to_string(),
                Arc::new(PropertyDef::from_descriptor(name, "zoo.Link", &PropertyDescriptor::new())),
            );
        }
        registry.insert_class(link);

        let chain = Chain::of(&registry, ClassId(2)).unwrap();
        let (kind, def) = chain.find_accessor("getURL").unwrap();
        assert_eq!(kind, AccessorKind::Get);
        assert_eq!(def.name, "URL");
        assert!(chain.has_callable("resetURL"));
        assert!(chain.has_callable(&accessor_name(AccessorKind::Set, "___raw")));
        assert!(!chain.has_callable("getUrl"));
    }

    #[test]
    fn test_refined_init_wins() {
        let registry = registry_with_chain();
        let dog = Chain::of(&registry, ClassId(1)).unwrap();
        let animal = Chain::of(&registry, ClassId(0)).unwrap();
        assert_eq!(dog.init_value("name"), Some(&Value::from("Rex")));
        assert_eq!(animal.init_value("name"), Some(&Value::from("?")));
    }
}
