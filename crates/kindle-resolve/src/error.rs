//! Error types for name resolution

use kindle_artifact::{NameError, SymbolicName};
use kindle_registry::RegistryError;
use std::fmt::{self, Display, Formatter};

/// Errors surfaced by [`Resolver::resolve`](crate::Resolver::resolve)
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// Requested name is not a valid symbolic name
    #[error("invalid name: {0}")]
    InvalidName(#[from] NameError),

    /// Lookup strategy has no definition for the name
    #[error("unresolved name: '{name}'")]
    UnresolvedName {
        /// Name nothing defines
        name: String,
    },

    /// Name is already being resolved further up the chain
    #[error("cyclic resolution: {chain}")]
    CyclicResolution {
        /// Names from the outermost load to the repeated one
        chain: ResolutionChain,
    },

    /// Lookup strategy failed while loading the name
    #[error("failed to load '{name}': {source}")]
    Lookup {
        /// Name whose definition failed
        name: String,
        /// Failure reported by the strategy
        #[source]
        source: anyhow::Error,
    },

    /// Registry refused the loaded artifact
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

impl ResolveError {
    /// Create unresolved-name error
    pub fn unresolved(name: impl Into<String>) -> Self {
        Self::UnresolvedName { name: name.into() }
    }

    /// Create lookup error for name
    pub fn lookup(name: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Lookup {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Check if this is a cycle error
    #[inline]
    #[must_use]
    pub fn is_cycle(&self) -> bool {
        matches!(self, Self::CyclicResolution { .. })
    }

    /// Check if this is a not-found error
    #[inline]
    #[must_use]
    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::UnresolvedName { .. })
    }
}

/// Names in the order they were entered, ending with the repeated one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionChain(Vec<SymbolicName>);

impl ResolutionChain {
    pub(crate) fn new(names: Vec<SymbolicName>) -> Self {
        Self(names)
    }

    /// Names in the chain
    #[inline]
    #[must_use]
    pub fn names(&self) -> &[SymbolicName] {
        &self.0
    }
}

impl Display for ResolutionChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for name in &self.0 {
            if !first {
                f.write_str(" -> ")?;
            }
            first = false;
            write!(f, "{name}")?;
        }
        Ok(())
    }
}

/// Result type alias for resolution
pub type ResolveResult<T> = Result<T, ResolveError>;
