//! Error types for Kindle applications
//!
//! Every crate in the workspace owns its error enum; [`KindleError`]
//! aggregates them for hosts that drive a whole [`Application`](crate::Application).

use kindle_artifact::NameError;
use kindle_boot::{BootError, SettingsError};
use kindle_registry::RegistryError;
use kindle_resolve::ResolveError;
use kindle_watch::WatchError;
use std::path::PathBuf;

/// Main Kindle error type
#[derive(Debug, thiserror::Error)]
pub enum KindleError {
    /// Malformed symbolic name
    #[error("invalid name: {0}")]
    Name(#[from] NameError),

    /// Registry rejected an operation
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Name resolution failed
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Change detector failed
    #[error("change detection failed: {0}")]
    Watch(#[from] WatchError),

    /// Boot sequence failed
    #[error("boot failed: {0}")]
    Boot(#[from] BootError),

    /// Configuration could not be loaded
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Operation needs a completed boot
    #[error("application is not initialized")]
    NotInitialized,
}

impl KindleError {
    /// Check if a second initialization was refused
    #[inline]
    #[must_use]
    pub fn is_double_initialization(&self) -> bool {
        matches!(self, Self::Boot(BootError::DoubleInitialization { .. }))
    }

    /// Check if resolution hit a cycle
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::Resolve(err) if err.is_cycle())
    }

    /// Check if a name could not be resolved
    #[inline]
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Resolve(err) if err.is_unresolved())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File exists but could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// Configuration file
        path: PathBuf,
        /// Read failure
        #[source]
        source: std::io::Error,
    },

    /// File did not parse
    #[error("invalid configuration in {}: {source}", path.display())]
    File {
        /// Configuration file
        path: PathBuf,
        /// Parse or merge failure
        #[source]
        source: SettingsError,
    },

    /// Settings do not describe a valid configuration
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Result alias for application operations
pub type KindleResult<T> = Result<T, KindleError>;
