//! Kindle Artifact Model
//!
//! The vocabulary shared by every kindle crate.
//!
//! # Core Concepts
//!
//! - [`SymbolicName`]: Key an artifact is resolved under (`Post`, `Admin::User`)
//! - [`Artifact`]: Type-erased, identity-carrying handle to a host value
//! - [`Origin`]: Explicit (framework) or autoloaded (lazily resolved)
//! - [`Generation`]: Reload counter stamped on every registry entry
//!
//! # Example
//!
//! ```rust
//! use kindle_artifact::{Artifact, SymbolicName};
//!
//! let name = SymbolicName::new("Admin::UserProfile").unwrap();
//! assert_eq!(name.to_path_segments(), vec!["admin", "user_profile"]);
//!
//! let artifact = Artifact::new(String::from("omg"));
//! assert_eq!(artifact.downcast_ref::<String>().unwrap(), "omg");
//! ```

#![warn(unreachable_pub)]

mod artifact;
mod name;

pub use artifact::{Artifact, ArtifactId, Generation, Origin};
pub use name::{NameError, SymbolicName, SEPARATOR};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_valid_names_roundtrip_display(
            segments in proptest::collection::vec("[A-Z][a-zA-Z0-9_]{0,8}", 1..4)
        ) {
            let raw = segments.join(SEPARATOR);
            let name = SymbolicName::new(raw.clone()).unwrap();
            prop_assert_eq!(name.to_string(), raw);
            prop_assert_eq!(name.depth(), segments.len());
            prop_assert_eq!(name.to_path_segments().len(), segments.len());
        }
    }
}
