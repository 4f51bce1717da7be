//! Lazy resolver
//!
//! Provides [`Resolver`], which turns a name into an artifact on first
//! reference and serves it from the registry afterwards.

use crate::error::{ResolutionChain, ResolveError, ResolveResult};
use crate::strategy::LookupStrategy;
use kindle_artifact::{Artifact, Generation, Origin, SymbolicName};
use kindle_registry::ArtifactRegistry;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// Resolves names through a lookup strategy, caching in the registry
///
/// A name being loaded is claimed by the loading thread. Concurrent callers
/// asking for the same name wait for that single load instead of loading it
/// twice; unrelated names do not contend.
///
/// Before waiting on a claimed name the resolver follows the chain of
/// threads waiting on each other. If it leads back to the caller, the two
/// loads depend on each other and the caller fails with
/// [`ResolveError::CyclicResolution`] instead of blocking.
pub struct Resolver {
    registry: Arc<ArtifactRegistry>,
    strategy: Arc<dyn LookupStrategy>,
    loads: Mutex<LoadTable>,
    finished: Condvar,
}

/// Names being loaded, who loads them and who waits on what
#[derive(Debug, Default)]
struct LoadTable {
    owners: HashMap<SymbolicName, ThreadId>,
    waiting: HashMap<ThreadId, SymbolicName>,
}

impl LoadTable {
    /// Names waited on from `owner` onwards, if the wait chain reaches `me`
    fn wait_path(&self, mut owner: ThreadId, me: ThreadId) -> Option<Vec<SymbolicName>> {
        let mut path = Vec::new();
        while owner != me {
            if path.len() > self.waiting.len() {
                return None;
            }
            let name = self.waiting.get(&owner)?;
            path.push(name.clone());
            owner = *self.owners.get(name)?;
        }
        Some(path)
    }
}

/// Ownership of one in-flight name; released on drop
struct Claim<'r> {
    resolver: &'r Resolver,
    name: SymbolicName,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.resolver.loads.lock().owners.remove(&self.name);
        self.resolver.finished.notify_all();
    }
}

/// Artifact together with the generation it was loaded in
#[derive(Debug, Clone)]
pub struct ResolvedArtifact {
    /// The artifact
    pub artifact: Artifact,

    /// Generation stamped on its registry entry
    pub generation: Generation,

    /// How it entered the registry
    pub origin: Origin,
}

impl ResolvedArtifact {
    /// True when no reload happened since this artifact was loaded
    ///
    /// Explicit artifacts never go stale.
    #[inline]
    #[must_use]
    pub fn is_current(&self, registry: &ArtifactRegistry) -> bool {
        match self.origin {
            Origin::Explicit => true,
            Origin::Autoloaded => self.generation == registry.generation(),
        }
    }
}

impl Resolver {
    /// Create resolver over a shared registry
    #[must_use]
    pub fn new(registry: Arc<ArtifactRegistry>, strategy: Arc<dyn LookupStrategy>) -> Self {
        Self {
            registry,
            strategy,
            loads: Mutex::new(LoadTable::default()),
            finished: Condvar::new(),
        }
    }

    /// Registry this resolver populates
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    /// Lookup strategy in use
    #[inline]
    #[must_use]
    pub fn strategy(&self) -> &Arc<dyn LookupStrategy> {
        &self.strategy
    }

    /// Resolve `name`, loading it on first reference
    ///
    /// # Errors
    /// - [`ResolveError::UnresolvedName`] if the strategy does not define it
    /// - [`ResolveError::CyclicResolution`] if the definition references itself,
    ///   directly or through a load running on another thread
    /// - [`ResolveError::Lookup`] if the definition fails to load
    pub fn resolve(&self, name: &str) -> ResolveResult<Artifact> {
        let name = SymbolicName::new(name)?;
        let mut cx = ResolveContext::new(self);
        self.resolve_in(&name, &mut cx)
    }

    /// Resolve `name` and report the generation it belongs to
    ///
    /// # Errors
    /// Same as [`resolve`](Self::resolve)
    pub fn resolve_tagged(&self, name: &str) -> ResolveResult<ResolvedArtifact> {
        let artifact = self.resolve(name)?;
        let (generation, origin) = self
            .registry
            .entry(name)
            .filter(|entry| entry.artifact.same_identity(&artifact))
            .map_or((self.registry.generation(), Origin::Autoloaded), |entry| {
                (entry.generation, entry.origin)
            });
        Ok(ResolvedArtifact {
            artifact,
            generation,
            origin,
        })
    }

    fn resolve_in(&self, name: &SymbolicName, cx: &mut ResolveContext<'_>) -> ResolveResult<Artifact> {
        if let Some(artifact) = self.registry.get(name.as_str()) {
            tracing::debug!(%name, "resolved from registry");
            return Ok(artifact);
        }

        if cx.chain.contains(name) {
            let mut chain = cx.chain.clone();
            chain.push(name.clone());
            return Err(cyclic(name, chain));
        }

        let _claim = self.claim(name, cx)?;
        self.load_claimed(name, cx)
    }

    /// Wait until `name` is free, then claim it for this thread
    fn claim(&self, name: &SymbolicName, cx: &ResolveContext<'_>) -> ResolveResult<Claim<'_>> {
        let me = thread::current().id();
        let mut table = self.loads.lock();
        loop {
            let Some(&owner) = table.owners.get(name) else {
                table.owners.insert(name.clone(), me);
                return Ok(Claim {
                    resolver: self,
                    name: name.clone(),
                });
            };

            if let Some(path) = table.wait_path(owner, me) {
                let mut chain = cx.chain.clone();
                chain.push(name.clone());
                chain.extend(path);
                return Err(cyclic(name, chain));
            }

            table.waiting.insert(me, name.clone());
            self.finished.wait(&mut table);
            table.waiting.remove(&me);
        }
    }

    fn load_claimed(&self, name: &SymbolicName, cx: &mut ResolveContext<'_>) -> ResolveResult<Artifact> {
        loop {
            // Another caller may have finished loading while we waited.
            if let Some(artifact) = self.registry.get(name.as_str()) {
                return Ok(artifact);
            }

            let generation = self.registry.generation();
            tracing::debug!(%name, %generation, depth = cx.chain.len(), "autoloading");

            cx.chain.push(name.clone());
            let outer = cx.generation.replace(generation);
            let outcome = self.strategy.lookup(name, cx);
            cx.generation = outer;
            cx.chain.pop();

            let artifact = match outcome {
                Ok(Some(artifact)) => artifact,
                Ok(None) => return Err(ResolveError::unresolved(name.as_str())),
                Err(err) => {
                    return Err(match err.downcast::<ResolveError>() {
                        Ok(nested) => nested,
                        Err(other) => ResolveError::lookup(name.as_str(), other),
                    })
                }
            };

            match self
                .registry
                .put_if_generation(name.clone(), artifact, Origin::Autoloaded, generation)
            {
                Ok(entry) => {
                    tracing::info!(%name, generation = %entry.generation, "autoloaded");
                    return Ok(entry.artifact);
                }
                Err(err) if err.is_stale() => {
                    tracing::debug!(%name, error = %err, "reload landed during load, loading again");
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn cyclic(name: &SymbolicName, names: Vec<SymbolicName>) -> ResolveError {
    let chain = ResolutionChain::new(names);
    tracing::warn!(%name, %chain, "cyclic resolution");
    ResolveError::CyclicResolution { chain }
}

impl Debug for Resolver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("registry", &self.registry)
            .field("in_flight", &self.loads.lock().owners.len())
            .finish_non_exhaustive()
    }
}

/// State of one top-level resolution, handed to the lookup strategy
///
/// Carries the chain of names currently being loaded so nested references
/// can be checked for cycles.
pub struct ResolveContext<'r> {
    resolver: &'r Resolver,
    chain: Vec<SymbolicName>,
    generation: Option<Generation>,
}

impl<'r> ResolveContext<'r> {
    fn new(resolver: &'r Resolver) -> Self {
        Self {
            resolver,
            chain: Vec::new(),
            generation: None,
        }
    }

    /// Resolve a name referenced by the definition being loaded
    ///
    /// # Errors
    /// Same as [`Resolver::resolve`]
    pub fn resolve(&mut self, name: &str) -> ResolveResult<Artifact> {
        let name = SymbolicName::new(name)?;
        let resolver = self.resolver;
        resolver.resolve_in(&name, self)
    }

    /// Names being loaded, outermost first
    #[inline]
    #[must_use]
    pub fn chain(&self) -> &[SymbolicName] {
        &self.chain
    }

    /// Generation the artifact being loaded will be stamped with
    ///
    /// If a reload lands before the load finishes, the result is discarded
    /// and the name is loaded again in the new generation.
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.generation
            .unwrap_or_else(|| self.resolver.registry.generation())
    }
}

impl Debug for ResolveContext<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveContext")
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}
