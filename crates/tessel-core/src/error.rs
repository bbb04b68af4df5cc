//! Runtime errors
//!
//! Every fallible runtime operation reports one of these. Definition-time
//! failures leave nothing installed in the registry; property write failures
//! leave the rest of the instance untouched.

use crate::options::ConfigError;
use crate::value::Value;
use thiserror::Error;

/// Errors raised by the class and object runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Malformed descriptor: unknown key, null value or wrong value type
    #[error("Invalid configuration of '{target}': {message}")]
    Configuration {
        /// Class, mixin, interface or property being configured
        target: String,
        /// What is wrong with it
        message: String,
    },

    /// Name collision for a class, property, mixin, interface or setting
    #[error("Duplicate {kind} '{name}' in '{scope}'")]
    DuplicateDefinition {
        /// Kind of symbol ("class", "property", "member", ...)
        kind: &'static str,
        /// Colliding name
        name: String,
        /// Where the collision happened
        scope: String,
    },

    /// A mixin brings a symbol that already exists on the target class
    #[error("Mixin '{mixin}' conflicts with {symbol} of class '{class}'")]
    MixinConflict {
        /// Mixin being included
        mixin: String,
        /// Target class
        class: String,
        /// Colliding symbol, e.g. `member 'foo'`
        symbol: String,
    },

    /// A declared (or queried) interface is not satisfied
    #[error("Class '{class}' does not implement interface '{interface}': missing {missing}")]
    InterfaceConformance {
        /// Checked class
        class: String,
        /// Required interface
        interface: String,
        /// First missing requirement, e.g. `property 'label'`
        missing: String,
    },

    /// Direct construction of an abstract class
    #[error("The class '{0}' is abstract! It is not possible to instantiate it.")]
    AbstractInstantiation(String),

    /// Direct construction of a singleton class
    #[error("The class '{0}' is a singleton! Use get_instance() instead of constructing it.")]
    SingletonViolation(String),

    /// A property value fails its type or nullable constraint
    #[error("Invalid value for property '{property}': expected {expected}, got {value}")]
    PropertyType {
        /// Property name
        property: String,
        /// Human readable constraint
        expected: String,
        /// Rejected value
        value: Value,
    },

    /// A batch or single property operation names a missing property
    #[error("Class '{class}' has no property '{property}'")]
    UnknownProperty {
        /// Class of the target
        class: String,
        /// Requested property
        property: String,
    },

    /// Class lookup miss
    #[error("Unknown class: {0}")]
    UnknownClass(String),

    /// Mixin lookup miss
    #[error("Unknown mixin: {0}")]
    UnknownMixin(String),

    /// Interface lookup miss
    #[error("Unknown interface: {0}")]
    UnknownInterface(String),

    /// Member (or static) lookup miss
    #[error("Class '{class}' has no callable member '{member}'")]
    UnknownMember {
        /// Class searched
        class: String,
        /// Requested member
        member: String,
    },

    /// Listener or event fired for an event the class does not declare
    #[error("Class '{class}' does not support event '{event}'")]
    UnknownEvent {
        /// Class searched
        class: String,
        /// Requested event
        event: String,
    },

    /// `base` called from a member that overrides nothing
    #[error("Member '{member}' of class '{class}' has no base implementation")]
    MissingBaseMember {
        /// Declaring class
        class: String,
        /// Executing member
        member: String,
    },

    /// Mutation or call on an object that was already disposed
    #[error("Object {class}[{hash_code}] is disposed")]
    ObjectDisposed {
        /// Class of the object
        class: String,
        /// Hash code of the object
        hash_code: u64,
    },

    /// The runtime that created an object no longer exists
    #[error("The runtime owning this object has been dropped")]
    RuntimeDropped,

    /// Failure reported by a user callback
    #[error("{0}")]
    Callback(String),

    /// Options could not be loaded
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl RuntimeError {
    /// Shorthand for a [`RuntimeError::Configuration`]
    pub fn configuration(target: impl Into<String>, message: impl Into<String>) -> Self {
        RuntimeError::Configuration {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Shorthand for a [`RuntimeError::Callback`]
    pub fn callback(message: impl Into<String>) -> Self {
        RuntimeError::Callback(message.into())
    }
}

/// Result alias used across the runtime
pub type RuntimeResult<T> = Result<T, RuntimeError>;
