//! Lookup strategies
//!
//! A [`LookupStrategy`] maps a [`SymbolicName`] to its definition. The
//! resolver calls it at most once per name per generation.

use crate::resolver::ResolveContext;
use kindle_artifact::{Artifact, SymbolicName};
use std::fmt::{self, Debug, Formatter};

/// Host-supplied name → artifact mapping
///
/// # Contract
/// - `Ok(Some(_))`: the name is defined; the artifact gets registered
/// - `Ok(None)`: the name is not defined anywhere this strategy knows
/// - `Err(_)`: the definition exists but could not be loaded
///
/// A definition that references other names resolves them through `cx`;
/// errors returned by `cx.resolve` may be propagated with `?` and reach the
/// caller unchanged.
pub trait LookupStrategy: Send + Sync {
    /// Load the definition of `name`
    ///
    /// # Errors
    /// Returns error if the definition exists but fails to load
    fn lookup(
        &self,
        name: &SymbolicName,
        cx: &mut ResolveContext<'_>,
    ) -> anyhow::Result<Option<Artifact>>;

    /// Every name this strategy can currently define
    ///
    /// Used for eager loading. Default implementation knows none.
    ///
    /// # Errors
    /// Returns error if the definitions cannot be enumerated
    fn known_names(&self) -> anyhow::Result<Vec<SymbolicName>> {
        Ok(Vec::new())
    }
}

type LookupFn =
    dyn Fn(&SymbolicName, &mut ResolveContext<'_>) -> anyhow::Result<Option<Artifact>> + Send + Sync;

/// Lookup strategy backed by a closure
pub struct FnLookup {
    inner: Box<LookupFn>,
}

impl FnLookup {
    /// Wrap closure as a strategy
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&SymbolicName, &mut ResolveContext<'_>) -> anyhow::Result<Option<Artifact>>
            + Send
            + Sync
            + 'static,
    {
        Self { inner: Box::new(f) }
    }
}

impl Debug for FnLookup {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnLookup").finish_non_exhaustive()
    }
}

impl LookupStrategy for FnLookup {
    fn lookup(
        &self,
        name: &SymbolicName,
        cx: &mut ResolveContext<'_>,
    ) -> anyhow::Result<Option<Artifact>> {
        (self.inner)(name, cx)
    }
}

/// Strategy that defines nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLookup;

impl LookupStrategy for EmptyLookup {
    fn lookup(
        &self,
        _name: &SymbolicName,
        _cx: &mut ResolveContext<'_>,
    ) -> anyhow::Result<Option<Artifact>> {
        Ok(None)
    }
}

impl<T: LookupStrategy + ?Sized> LookupStrategy for std::sync::Arc<T> {
    fn lookup(
        &self,
        name: &SymbolicName,
        cx: &mut ResolveContext<'_>,
    ) -> anyhow::Result<Option<Artifact>> {
        (**self).lookup(name, cx)
    }

    fn known_names(&self) -> anyhow::Result<Vec<SymbolicName>> {
        (**self).known_names()
    }
}
