//! Artifact registry
//!
//! Provides [`ArtifactRegistry`], the table of every artifact the process
//! has resolved or registered, keyed by [`SymbolicName`].

use indexmap::IndexMap;
use kindle_artifact::{Artifact, Generation, Origin, SymbolicName};
use parking_lot::RwLock;

/// Name → artifact table with reload support
///
/// Entries and the generation counter live behind one lock. Every mutation
/// (`put`, eviction, generation bump) takes the write side, so a concurrent
/// reader sees either the registry before an eviction sweep or after it,
/// never half of one.
///
/// Insertion order is preserved, which keeps eviction reports and
/// [`all_autoloaded`](Self::all_autoloaded) deterministic.
#[derive(Debug, Default)]
pub struct ArtifactRegistry {
    state: RwLock<RegistryState>,
}

#[derive(Debug, Default)]
struct RegistryState {
    entries: IndexMap<SymbolicName, RegistryEntry>,
    generation: Generation,
}

/// One registered artifact
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    /// Name the artifact is registered under
    pub name: SymbolicName,

    /// The artifact itself
    pub artifact: Artifact,

    /// Explicit or autoloaded
    pub origin: Origin,

    /// Generation current when the entry was created
    pub generation: Generation,
}

/// Result of an eviction sweep
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Eviction {
    /// Evicted names in insertion order
    pub evicted: Vec<SymbolicName>,

    /// Generation after the sweep
    pub generation: Generation,
}

impl Eviction {
    /// Number of evicted entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.evicted.len()
    }

    /// True when nothing was evicted
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.evicted.is_empty()
    }
}

impl ArtifactRegistry {
    /// Create empty registry at the initial generation
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an artifact by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Artifact> {
        self.state
            .read()
            .entries
            .get(name)
            .map(|entry| entry.artifact.clone())
    }

    /// Look up the full entry for a name
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<RegistryEntry> {
        self.state.read().entries.get(name).cloned()
    }

    /// Check if a name is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.state.read().entries.contains_key(name)
    }

    /// Register an artifact under `name`, stamped with the current generation
    ///
    /// # Errors
    /// Returns error if the name is already registered
    pub fn put(
        &self,
        name: SymbolicName,
        artifact: Artifact,
        origin: Origin,
    ) -> Result<RegistryEntry, RegistryError> {
        let mut state = self.state.write();
        Self::insert(&mut state, name, artifact, origin)
    }

    /// Register an artifact only if the generation is still `expected`
    ///
    /// The check and the insert happen under one write lock, so an artifact
    /// loaded before a reload can never be stored after it.
    ///
    /// # Errors
    /// - [`RegistryError::StaleGeneration`] if a reload happened since `expected`
    /// - [`RegistryError::DuplicateName`] if the name is already registered
    pub fn put_if_generation(
        &self,
        name: SymbolicName,
        artifact: Artifact,
        origin: Origin,
        expected: Generation,
    ) -> Result<RegistryEntry, RegistryError> {
        let mut state = self.state.write();
        if state.generation != expected {
            return Err(RegistryError::StaleGeneration {
                name: name.to_string(),
                expected,
                current: state.generation,
            });
        }
        Self::insert(&mut state, name, artifact, origin)
    }

    fn insert(
        state: &mut RegistryState,
        name: SymbolicName,
        artifact: Artifact,
        origin: Origin,
    ) -> Result<RegistryEntry, RegistryError> {
        if let Some(existing) = state.entries.get(&name) {
            return Err(RegistryError::DuplicateName {
                name: name.to_string(),
                existing: existing.origin,
            });
        }

        let entry = RegistryEntry {
            name: name.clone(),
            artifact,
            origin,
            generation: state.generation,
        };
        state.entries.insert(name, entry.clone());

        tracing::trace!(name = %entry.name, origin = ?origin, generation = %entry.generation, "registered artifact");
        Ok(entry)
    }

    /// All autoloaded artifacts, in insertion order
    #[must_use]
    pub fn all_autoloaded(&self) -> Vec<Artifact> {
        self.state
            .read()
            .entries
            .values()
            .filter(|entry| entry.origin.is_evictable())
            .map(|entry| entry.artifact.clone())
            .collect()
    }

    /// Names of all autoloaded entries, in insertion order
    #[must_use]
    pub fn autoloaded_names(&self) -> Vec<SymbolicName> {
        self.state
            .read()
            .entries
            .values()
            .filter(|entry| entry.origin.is_evictable())
            .map(|entry| entry.name.clone())
            .collect()
    }

    /// Remove every autoloaded entry; explicit entries stay
    ///
    /// The generation is left untouched. Use
    /// [`evict_and_advance`](Self::evict_and_advance) for a reload.
    pub fn evict_autoloaded(&self) -> Eviction {
        let mut state = self.state.write();
        let evicted = sweep(&mut state.entries);
        Eviction {
            evicted,
            generation: state.generation,
        }
    }

    /// Evict autoloaded entries and bump the generation in one step
    pub fn evict_and_advance(&self) -> Eviction {
        let mut state = self.state.write();
        let evicted = sweep(&mut state.entries);
        state.generation = state.generation.next();
        Eviction {
            evicted,
            generation: state.generation,
        }
    }

    /// Current generation
    #[inline]
    #[must_use]
    pub fn generation(&self) -> Generation {
        self.state.read().generation
    }

    /// Copy of every entry, in insertion order
    #[must_use]
    pub fn snapshot(&self) -> Vec<RegistryEntry> {
        self.state.read().entries.values().cloned().collect()
    }

    /// Drop every entry regardless of origin
    ///
    /// The generation is not reset.
    pub fn clear(&self) -> usize {
        let mut state = self.state.write();
        let count = state.entries.len();
        state.entries.clear();
        count
    }

    /// Total entry count
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn sweep(entries: &mut IndexMap<SymbolicName, RegistryEntry>) -> Vec<SymbolicName> {
    let mut evicted = Vec::new();
    entries.retain(|name, entry| {
        if entry.origin.is_evictable() {
            evicted.push(name.clone());
            false
        } else {
            true
        }
    });
    evicted
}

/// Errors raised by registry mutations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Name already bound
    #[error("'{name}' is already registered ({existing:?})")]
    DuplicateName {
        /// Name that was registered twice
        name: String,
        /// Origin of the entry already present
        existing: Origin,
    },

    /// A reload happened while the artifact was being loaded
    #[error("'{name}' was loaded in {expected} but the registry is at {current}")]
    StaleGeneration {
        /// Name of the discarded artifact
        name: String,
        /// Generation the load started in
        expected: Generation,
        /// Generation at insert time
        current: Generation,
    },
}

impl RegistryError {
    /// Check if the insert lost a race with a reload
    #[inline]
    #[must_use]
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::StaleGeneration { .. })
    }
}
