//! Tessel Class Runtime
//!
//! This crate provides a class-based object model for dynamic applications:
//! - Class registry with namespaced names and single inheritance
//! - Property engine with layered values (user, theme, computed, init)
//! - Mixins merged into classes at definition time or later
//! - Interfaces checked structurally against the inheritance chain
//! - Object lifecycle with ordered destructors and bulk teardown
//!
//! ```ignore
//! use tessel_core::{ClassDescriptor, ClassKind, PropertyDescriptor, PropertyCheck, Runtime};
//!
//! let rt = Runtime::default();
//! rt.define(
//!     "app.Animal",
//!     ClassDescriptor::new()
//!         .kind(ClassKind::Normal)
//!         .property("name", PropertyDescriptor::new().check(PropertyCheck::String).init("unknown")),
//! )?;
//! let animal = rt.create("app.Animal")?;
//! animal.set_property("name", "Rex")?;
//! ```

#![warn(rust_2018_idioms)]

pub mod class;
pub mod descriptor;
pub mod error;
pub mod interface;
pub mod mixin;
pub mod object;
pub mod options;
pub mod property;
pub mod reflect;
pub mod runtime;
pub mod value;

pub use class::{
    Class, ClassHandle, ClassId, ClassRegistry, DeferScope, Invocation, MethodSlot, SlotKind,
    StaticContext,
};
pub use descriptor::{
    ClassDescriptor, ClassKind, DeferFn, DestructFn, InterfaceDescriptor, Member, MethodFn,
    MixinDescriptor, PropertyDescriptor, Static, StaticFn, SymbolRef,
};
pub use error::{RuntimeError, RuntimeResult};
pub use interface::Interface;
pub use mixin::Mixin;
pub use object::{DbStats, DisposeFailure, Event, Listener, ListenerId, Object, TeardownReport};
pub use options::{ConfigError, RuntimeOptions, Validation, MAX_DISPOSE_DEBUG_LEVEL};
pub use property::{AccessorKind, Layer, PropertyCheck, PropertyDef};
pub use reflect::ClassInfo;
pub use runtime::{global, Runtime};
pub use value::Value;
