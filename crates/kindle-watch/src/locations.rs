//! Watched-location enumerators
//!
//! The default change detector asks a [`WatchedLocations`] for the current
//! set of files on every check, so files created after start-up are picked
//! up as soon as they match.

use crate::error::WatchError;
use std::fmt::Debug;
use std::path::PathBuf;

/// Host-supplied source of watched files
pub trait WatchedLocations: Send + Sync + Debug {
    /// Current set of files to fingerprint
    ///
    /// Paths that do not exist are allowed; they count as absent.
    ///
    /// # Errors
    /// Returns error if the set cannot be enumerated
    fn enumerate(&self) -> Result<Vec<PathBuf>, WatchError>;
}

/// Fixed list of files
#[derive(Debug, Clone, Default)]
pub struct PathList {
    paths: Vec<PathBuf>,
}

impl PathList {
    /// Create from paths
    #[must_use]
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }

    /// Add a path
    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }
}

impl WatchedLocations for PathList {
    fn enumerate(&self) -> Result<Vec<PathBuf>, WatchError> {
        Ok(self.paths.clone())
    }
}

/// Files matching glob patterns (`app/models/**/*.rb`)
#[derive(Debug, Clone, Default)]
pub struct GlobLocations {
    patterns: Vec<String>,
}

impl GlobLocations {
    /// Create from patterns
    ///
    /// # Errors
    /// Returns error if a pattern does not parse
    pub fn new(patterns: impl IntoIterator<Item = impl Into<String>>) -> Result<Self, WatchError> {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        for pattern in &patterns {
            glob::Pattern::new(pattern).map_err(|source| WatchError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
        }
        Ok(Self { patterns })
    }

    /// Configured patterns
    #[inline]
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl WatchedLocations for GlobLocations {
    fn enumerate(&self) -> Result<Vec<PathBuf>, WatchError> {
        let mut files = Vec::new();
        for pattern in &self.patterns {
            let paths = glob::glob(pattern).map_err(|source| WatchError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            for entry in paths {
                let path = entry.map_err(|err| {
                    let path = err.path().to_path_buf();
                    WatchError::io(path, err.into_error())
                })?;
                if path.is_file() && !files.contains(&path) {
                    files.push(path);
                }
            }
        }
        Ok(files)
    }
}
