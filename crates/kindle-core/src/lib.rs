//! Kindle
//!
//! Boots an application once, resolves its artifacts lazily and reloads
//! them when their sources change.
//!
//! # Architecture
//!
//! ```text
//! Application::initialize ──→ Sequencer (before_config → framework → after_config → before_ready)
//!                                              │
//!                                              └─ kindle.configure_reloading → ReloadCoordinator
//!
//! Application::before_dispatch ──→ ReloadCoordinator ──→ ChangeDetector
//!                                        │ changed
//!                                        ▼
//!                         ArtifactRegistry::evict_and_advance
//!
//! Application::resolve ──→ Resolver ──→ LookupStrategy (on miss)
//! ```
//!
//! # Example
//!
//! ```rust
//! use kindle_artifact::Artifact;
//! use kindle_core::{AppConfig, Application};
//! use kindle_resolve::FnLookup;
//!
//! let lookup = FnLookup::new(|name, _cx| {
//!     Ok((name.as_str() == "Post").then(|| Artifact::new(1_u32)))
//! });
//! let mut app = Application::builder("/srv/blog")
//!     .config(AppConfig::new().with_reload_only_on_change(false))
//!     .lookup(lookup)
//!     .build()
//!     .unwrap();
//! app.initialize().unwrap();
//!
//! let before = app.resolve("Post").unwrap();
//! assert!(app.before_dispatch().unwrap().is_reload());
//! assert!(!app.resolve("Post").unwrap().same_identity(&before));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod application;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod telemetry;

// Re-exports
pub use application::{steps, Application, ApplicationBuilder};
pub use config::AppConfig;
pub use coordinator::{ReloadCoordinator, ReloadOutcome};
pub use error::{ConfigError, KindleError, KindleResult};
pub use telemetry::{init_tracing, LogFormat};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for hosts
    pub use crate::{AppConfig, Application, KindleError, ReloadOutcome};
    pub use kindle_artifact::{Artifact, SymbolicName};
    pub use kindle_boot::{InitializerStep, Phase};
    pub use kindle_resolve::{LookupStrategy, ResolveContext};
    pub use kindle_watch::ChangeDetector;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
