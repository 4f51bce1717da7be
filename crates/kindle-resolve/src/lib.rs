//! Kindle Resolver
//!
//! Lazily turns symbolic names into artifacts.
//!
//! # Architecture
//!
//! ```text
//! resolve(name) → ArtifactRegistry hit? ──yes──→ cached artifact
//!                          │ no
//!                          ▼
//!                 LookupStrategy::lookup ──→ put(Autoloaded) ──→ artifact
//!                    ↑____________↓
//!              ResolveContext (nested names, cycle check)
//! ```
//!
//! # Example
//!
//! ```rust
//! use kindle_artifact::Artifact;
//! use kindle_registry::ArtifactRegistry;
//! use kindle_resolve::{FnLookup, Resolver};
//! use std::sync::Arc;
//!
//! let lookup = FnLookup::new(|name, _cx| {
//!     Ok((name.as_str() == "Post").then(|| Artifact::new("omg")))
//! });
//! let resolver = Resolver::new(Arc::new(ArtifactRegistry::new()), Arc::new(lookup));
//!
//! let post = resolver.resolve("Post").unwrap();
//! assert_eq!(*post.downcast_ref::<&str>().unwrap(), "omg");
//! assert!(resolver.resolve("Ghost").is_err());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod convention;
pub mod error;
pub mod resolver;
pub mod strategy;

// Re-exports
pub use convention::{ConventionLookup, Namespace, SourceUnit};
pub use error::{ResolutionChain, ResolveError, ResolveResult};
pub use resolver::{ResolveContext, ResolvedArtifact, Resolver};
pub use strategy::{EmptyLookup, FnLookup, LookupStrategy};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for resolution
    pub use crate::{
        ConventionLookup, FnLookup, LookupStrategy, ResolveContext, ResolveError, Resolver,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
