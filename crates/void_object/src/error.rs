//! Error types for the object model
//!
//! Capability queries never fail with an error: an unsatisfied cast yields a
//! null handle. These types exist for the surfaces that do need to report
//! why something went wrong.

use thiserror::Error;

/// Result type alias
pub type Result<T> = core::result::Result<T, Error>;

/// The crate error type
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// A required cast could not be satisfied
    #[error("Cast error: {0}")]
    Cast(#[from] CastError),

    /// Plugin-related error
    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),
}

/// Raised by `require` when the caller insists on a capability
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CastError {
    /// The handle being cast holds nothing
    #[error("cannot cast a null handle to '{target}'")]
    Null { target: String },

    /// The object does not support the requested capability
    #[error("'{source_type}' does not implement '{target}'")]
    Unsatisfied { source_type: String, target: String },
}

impl CastError {
    /// Create an unsatisfied-capability error
    pub fn unsatisfied(source_type: impl Into<String>, target: impl Into<String>) -> Self {
        CastError::Unsatisfied {
            source_type: source_type.into(),
            target: target.into(),
        }
    }
}

/// Plugin-specific errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// Plugin not found
    #[error("Plugin not found: {0}")]
    NotFound(String),

    /// Plugin already registered
    #[error("Plugin already registered: {0}")]
    AlreadyRegistered(String),

    /// Dependency not satisfied
    #[error("Plugin '{plugin}' requires missing dependency '{dependency}'")]
    MissingDependency { plugin: String, dependency: String },

    /// Plugin initialization failed
    #[error("Plugin initialization failed: {0}")]
    InitFailed(String),

    /// Dependencies form a cycle or can never be satisfied
    #[error("Plugins could not be ordered: {0:?}")]
    Unresolvable(Vec<String>),
}
