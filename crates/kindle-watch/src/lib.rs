//! Kindle Change Detection
//!
//! Decides whether watched sources changed since the previous dispatch.
//!
//! # Detectors
//!
//! - [`FileWatcher`]: fingerprints files from a [`WatchedLocations`]
//! - [`NeverChanged`]: always false (production-style hosts, tests)
//! - [`FnDetector`]: host predicate
//!
//! Every detector resets its baseline when asked, so each call reports only
//! what changed since the previous one.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod detector;
pub mod error;
pub mod fingerprint;
pub mod locations;

// Re-exports
pub use detector::{ChangeDetector, ChangeSet, FileWatcher, FnDetector, NeverChanged};
pub use error::WatchError;
pub use fingerprint::{ContentDigest, Fingerprint, FingerprintMode};
pub use locations::{GlobLocations, PathList, WatchedLocations};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
