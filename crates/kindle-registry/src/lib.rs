//! Kindle Artifact Registry
//!
//! Process-wide table of resolved artifacts.
//!
//! # Overview
//!
//! - **ArtifactRegistry**: name → artifact map, insertion ordered
//! - **RegistryEntry**: artifact plus origin and generation
//! - **Eviction**: report of one autoload sweep
//!
//! # Example
//!
//! ```rust
//! use kindle_artifact::{Artifact, Origin, SymbolicName};
//! use kindle_registry::ArtifactRegistry;
//!
//! let registry = ArtifactRegistry::new();
//! let name = SymbolicName::new("Post").unwrap();
//! registry.put(name, Artifact::new("omg"), Origin::Autoloaded).unwrap();
//!
//! let eviction = registry.evict_and_advance();
//! assert_eq!(eviction.len(), 1);
//! assert!(registry.get("Post").is_none());
//! ```

#![warn(missing_docs)]

pub mod registry;

// Re-exports
pub use registry::{ArtifactRegistry, Eviction, RegistryEntry, RegistryError};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod concurrency_tests {
    use super::*;
    use kindle_artifact::{Artifact, Origin, SymbolicName};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn readers_never_observe_partial_eviction() {
        let registry = Arc::new(ArtifactRegistry::new());
        let names: Vec<_> = (0..64)
            .map(|i| SymbolicName::new(format!("Model{i}")).unwrap())
            .collect();

        for round in 0..20 {
            for name in &names {
                registry
                    .put(name.clone(), Artifact::new(round), Origin::Autoloaded)
                    .unwrap();
            }

            let reader = {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let count = registry.autoloaded_names().len();
                        assert!(count == 0 || count == 64, "saw {count} entries");
                    }
                })
            };

            registry.evict_and_advance();
            reader.join().unwrap();
        }

        assert_eq!(registry.generation().get(), 20);
    }
}
