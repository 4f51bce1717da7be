//! Error types for change detection

use std::path::PathBuf;

/// Errors raised while checking watched locations
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// IO error reading a watched file
    #[error("io error reading {path}: {source}")]
    Io {
        /// File being read
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// Glob pattern could not be parsed
    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        /// Pattern as configured
        pattern: String,
        /// Parse failure
        #[source]
        source: glob::PatternError,
    },

    /// Host-supplied detector failed
    #[error("change detector failed: {0}")]
    Detector(#[source] anyhow::Error),
}

impl WatchError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
