//! Property engine
//!
//! Properties are declared on classes and mixins and resolved along the
//! class chain. Every instance keeps its own [`LayeredValue`] per property;
//! the accessors in [`engine`] implement the layer rules, type checks and
//! change notification.

pub mod accessor;
pub(crate) mod engine;
pub mod store;

pub use accessor::{accessor_name, parse_accessor, AccessorKind};
pub use store::{Layer, LayeredValue, PropertyStore};

use crate::descriptor::PropertyDescriptor;
use crate::error::{RuntimeError, RuntimeResult};
use crate::value::Value;
use std::fmt;
use std::str::FromStr;

/// Type constraint of a property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyCheck {
    /// Any non-null value
    #[default]
    Any,
    Boolean,
    /// Floating point or integer number
    Number,
    Integer,
    String,
    Array,
    Map,
    /// Reference to a runtime object
    Object,
}

impl PropertyCheck {
    /// Descriptor spelling of the check
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyCheck::Any => "Any",
            PropertyCheck::Boolean => "Boolean",
            PropertyCheck::Number => "Number",
            PropertyCheck::Integer => "Integer",
            PropertyCheck::String => "String",
            PropertyCheck::Array => "Array",
            PropertyCheck::Map => "Map",
            PropertyCheck::Object => "Object",
        }
    }

    /// Whether a non-null value satisfies the check
    pub fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => false,
            (PropertyCheck::Any, _) => true,
            (PropertyCheck::Boolean, Value::Boolean(_)) => true,
            (PropertyCheck::Number, Value::Number(_) | Value::Integer(_)) => true,
            (PropertyCheck::Integer, Value::Integer(_)) => true,
            (PropertyCheck::String, Value::String(_)) => true,
            (PropertyCheck::Array, Value::Array(_)) => true,
            (PropertyCheck::Map, Value::Map(_)) => true,
            (PropertyCheck::Object, Value::Object(_)) => true,
            _ => false,
        }
    }
}

impl FromStr for PropertyCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Any" => Ok(PropertyCheck::Any),
            "Boolean" => Ok(PropertyCheck::Boolean),
            "Number" => Ok(PropertyCheck::Number),
            "Integer" => Ok(PropertyCheck::Integer),
            "String" => Ok(PropertyCheck::String),
            "Array" => Ok(PropertyCheck::Array),
            "Map" => Ok(PropertyCheck::Map),
            "Object" => Ok(PropertyCheck::Object),
            other => Err(format!("Unknown property check \"{}\"", other)),
        }
    }
}

impl fmt::Display for PropertyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved property declaration
///
/// Built once at definition time and shared by every subclass through chain
/// lookup. Refinements never produce a new `PropertyDef`; they only store an
/// init override on the refining class.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    /// Property name
    pub name: String,
    /// Class or mixin that declared it
    pub owner: String,
    pub check: PropertyCheck,
    pub nullable: bool,
    /// Declared default (refinements are resolved separately)
    pub init: Option<Value>,
    pub themeable: bool,
    /// Member invoked with `(new, old)` on change
    pub apply: Option<String>,
    /// Event fired on change
    pub event: Option<String>,
    /// Member deriving the computed layer
    pub compute: Option<String>,
    /// Clear all layers on dispose
    pub dispose: bool,
}

impl PropertyDef {
    pub(crate) fn from_descriptor(name: &str, owner: &str, desc: &PropertyDescriptor) -> Self {
        Self {
            name: name.to_string(),
            owner: owner.to_string(),
            check: desc.check.unwrap_or_default(),
            nullable: desc.nullable.unwrap_or(false),
            init: desc.init.clone(),
            themeable: desc.themeable.unwrap_or(false),
            apply: desc.apply.clone(),
            event: desc.event.clone(),
            compute: desc.compute.clone(),
            dispose: desc.dispose.unwrap_or(false),
        }
    }

    /// Human readable form of the constraint
    pub fn expected(&self) -> String {
        if self.nullable {
            format!("{} or null", self.check)
        } else {
            self.check.to_string()
        }
    }

    /// Whether a value satisfies the check and nullable flag
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            self.nullable
        } else {
            self.check.accepts(value)
        }
    }

    /// Fail with [`RuntimeError::PropertyType`] unless the value is accepted
    pub fn validate(&self, value: &Value) -> RuntimeResult<()> {
        if self.accepts(value) {
            Ok(())
        } else {
            Err(RuntimeError::PropertyType {
                property: self.name.clone(),
                expected: self.expected(),
                value: value.clone(),
            })
        }
    }

    /// Whether `toggle` applies to this property
    pub fn is_boolean(&self) -> bool {
        self.check == PropertyCheck::Boolean
    }
}
