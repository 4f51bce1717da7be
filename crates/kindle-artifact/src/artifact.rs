//! Type-erased artifact handles
//!
//! An [`Artifact`] is whatever the host's lookup strategy produced for a
//! name: a model type descriptor, a parsed template, a config object. The
//! runtime only cares about its identity.

use std::any::{self, Any};
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use uuid::Uuid;

/// Unique identity of one constructed artifact
///
/// Re-resolving a name after a reload always yields a new id, even when the
/// source did not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ArtifactId(Uuid);

impl ArtifactId {
    /// Generate a fresh id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying uuid
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved value bound to a symbolic name
///
/// Cheap to clone: clones share the value and the identity.
#[derive(Clone)]
pub struct Artifact {
    id: ArtifactId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl Artifact {
    /// Wrap a host value as a new artifact
    #[must_use]
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wrap an already shared host value
    #[must_use]
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            id: ArtifactId::new(),
            type_name: any::type_name::<T>(),
            value,
        }
    }

    /// Identity of this artifact
    #[inline]
    #[must_use]
    pub fn id(&self) -> ArtifactId {
        self.id
    }

    /// Rust type name of the wrapped value (diagnostics only)
    #[inline]
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Borrow the value as `T`
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Share the value as `Arc<T>`
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Check if the value is a `T`
    #[inline]
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.value.is::<T>()
    }

    /// True when both handles point at the same construction
    #[inline]
    #[must_use]
    pub fn same_identity(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Debug for Artifact {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("id", &self.id)
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// How an entry entered the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Registered by framework bootstrap; survives reloads
    Explicit,

    /// Loaded on first reference by the resolver; evicted on reload
    #[default]
    Autoloaded,
}

impl Origin {
    /// Whether a reload sweep removes entries of this origin
    #[inline]
    #[must_use]
    pub const fn is_evictable(self) -> bool {
        matches!(self, Self::Autoloaded)
    }
}

/// Reload generation
///
/// Starts at zero and only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    /// The generation every process starts in
    pub const INITIAL: Self = Self(0);

    /// Create from raw counter
    #[inline]
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw counter value
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The generation after this one
    #[inline]
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "g{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Post {
        title: &'static str,
    }

    #[test]
    fn artifact_downcast_ref() {
        let artifact = Artifact::new(Post { title: "omg" });
        assert_eq!(artifact.downcast_ref::<Post>().unwrap().title, "omg");
        assert!(artifact.downcast_ref::<String>().is_none());
        assert!(artifact.is::<Post>());
    }

    #[test]
    fn artifact_downcast_shares_value() {
        let shared = Arc::new(Post { title: "shared" });
        let artifact = Artifact::from_arc(Arc::clone(&shared));
        let out = artifact.downcast::<Post>().unwrap();
        assert!(Arc::ptr_eq(&shared, &out));
    }

    #[test]
    fn artifact_clone_keeps_identity() {
        let artifact = Artifact::new(1_u32);
        let clone = artifact.clone();
        assert!(artifact.same_identity(&clone));
    }

    #[test]
    fn artifact_equal_values_have_distinct_identity() {
        let a = Artifact::new(Post { title: "same" });
        let b = Artifact::new(Post { title: "same" });
        assert!(!a.same_identity(&b));
    }

    #[test]
    fn artifact_debug_names_type() {
        let artifact = Artifact::new(Post { title: "x" });
        let debug = format!("{artifact:?}");
        assert!(debug.contains("Post"));
    }

    #[test]
    fn origin_evictability() {
        assert!(Origin::Autoloaded.is_evictable());
        assert!(!Origin::Explicit.is_evictable());
    }

    #[test]
    fn generation_advances() {
        let g = Generation::INITIAL;
        assert_eq!(g.get(), 0);
        assert_eq!(g.next().get(), 1);
        assert!(g < g.next());
        assert_eq!(g.next().to_string(), "g1");
    }
}
