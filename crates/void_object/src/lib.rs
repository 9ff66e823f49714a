//! # void_object - Void Engine Object Model
//!
//! Runtime capability system shared by every engine subsystem. Any
//! reference-counted object can be erased into a uniform handle ([`Boxed`]),
//! asked for any interface it declares or picked up at runtime, and cast
//! back to its concrete type:
//!
//! - [`Type`] / [`TypeId`]: stable identifiers without registration
//! - [`Class`] / [`ClassManager`]: per-type capability descriptors and the
//!   process-wide registry
//! - [`Interfaces`]: per-instance attachments
//! - [`SharedPtr`] / [`WeakPtr`] / [`Boxed`]: handles
//! - [`Implements`] / [`implements!`]: registration
//! - [`Duck`]: fallback for capabilities outside the declared graph
//!
//! ## Philosophy
//! A query, not a requirement: asking for something an object cannot
//! provide yields a null handle, never a panic.

pub mod boxed;
pub mod class;
pub mod duck;
pub mod error;
pub mod implements;
pub mod interfaces;
pub mod manager;
pub mod plugin;
pub mod shared_ptr;
pub mod traits;
pub mod type_id;

pub use boxed::Boxed;
pub use class::{Class, ClassBuilder};
pub use duck::Duck;
pub use error::{CastError, Error, PluginError, Result};
pub use implements::Implements;
pub use interfaces::{AttachmentTable, Interfaces, Recycler};
pub use manager::{Adapter, ClassManager, ManagerConfig};
pub use plugin::{Plugin, PluginId, PluginInfo, PluginRegistry, PluginStatus};
pub use shared_ptr::{SharedPtr, WeakPtr};
pub use traits::Traits;
pub use type_id::{Type, TypeId};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::boxed::Boxed;
    pub use crate::class::{Class, ClassBuilder};
    pub use crate::duck::Duck;
    pub use crate::error::{CastError, Error, Result};
    pub use crate::implements;
    pub use crate::implements::Implements;
    pub use crate::manager::ClassManager;
    pub use crate::plugin::{Plugin, PluginId, PluginRegistry};
    pub use crate::shared_ptr::{SharedPtr, WeakPtr};
    pub use crate::traits::Traits;
    pub use crate::type_id::{Type, TypeId};
}
