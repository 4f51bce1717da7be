//! Kindle Boot Sequencing
//!
//! Runs named initializer steps exactly once, phase by phase.
//!
//! # Phases
//!
//! 1. [`Phase::BeforeConfig`]: environment and configuration loading
//! 2. [`Phase::Framework`]: framework bootstrap (configuration is final)
//! 3. [`Phase::AfterConfig`]: application setup
//! 4. [`Phase::BeforeReady`]: last steps before serving
//!
//! External code splices its own steps next to a named anchor with
//! [`Sequencer::insert_before`] / [`Sequencer::insert_after`]. The
//! [`InitGuard`] latches the run so a second [`Sequencer::run_all`] fails
//! with [`BootError::DoubleInitialization`].
//!
//! # Example
//!
//! ```rust
//! use kindle_boot::{BootContext, InitializerStep, Phase, Sequencer, Settings};
//! use kindle_registry::ArtifactRegistry;
//! use std::sync::Arc;
//!
//! let mut seq = Sequencer::new();
//! seq.register(InitializerStep::new("load_env", Phase::BeforeConfig, |cx| {
//!     cx.settings.set("environment", "test")?;
//!     Ok(())
//! }))
//! .unwrap();
//!
//! let mut cx = BootContext::new(Settings::new(), Arc::new(ArtifactRegistry::new()));
//! let report = seq.run_all(&mut cx).unwrap();
//! assert!(report.ran("load_env"));
//! assert!(seq.run_all(&mut cx).is_err());
//! ```

#![warn(unreachable_pub)]

pub mod context;
pub mod error;
pub mod guard;
pub mod sequencer;
pub mod step;

// Re-exports
pub use context::{BootContext, Settings, SettingsError};
pub use error::{BootError, BootResult};
pub use guard::{allowed_transitions, validate_transition, InitGuard, LifecycleState};
pub use sequencer::{BootReport, Sequencer};
pub use step::{InitializerStep, Phase, StepAction};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
