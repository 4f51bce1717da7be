//! Reload coordination
//!
//! Consulted once per unit of work, before it runs. On a change it evicts
//! every autoloaded artifact and bumps the generation in one registry
//! write, so the work that follows resolves fresh definitions.

use crate::config::AppConfig;
use kindle_artifact::{Generation, SymbolicName};
use kindle_registry::{ArtifactRegistry, Eviction};
use kindle_watch::{ChangeDetector, WatchError};
use parking_lot::Mutex;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

/// What a dispatch check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Artifacts are cached; nothing was checked
    Skipped,

    /// Detector reported no change
    Unchanged,

    /// Autoloaded artifacts were evicted
    Reloaded {
        /// Evicted names in insertion order
        evicted: Vec<SymbolicName>,
        /// Generation after the reload
        generation: Generation,
    },
}

impl ReloadOutcome {
    /// Check if a reload happened
    #[inline]
    #[must_use]
    pub fn is_reload(&self) -> bool {
        matches!(self, Self::Reloaded { .. })
    }

    /// Evicted names, empty unless reloaded
    #[must_use]
    pub fn evicted(&self) -> &[SymbolicName] {
        match self {
            Self::Reloaded { evicted, .. } => evicted,
            _ => &[],
        }
    }
}

/// Decides before each dispatch whether to drop autoloaded artifacts
pub struct ReloadCoordinator {
    registry: Arc<ArtifactRegistry>,
    detector: Mutex<Box<dyn ChangeDetector>>,
    cache_artifacts: bool,
    reload_only_on_change: bool,
}

impl ReloadCoordinator {
    /// Create coordinator; the caching policy is fixed from here on
    #[must_use]
    pub fn new(registry: Arc<ArtifactRegistry>, detector: Box<dyn ChangeDetector>, config: &AppConfig) -> Self {
        tracing::debug!(
            detector = detector.label(),
            cache_artifacts = config.cache_artifacts,
            reload_only_on_change = config.reload_only_on_change,
            "reload coordinator configured"
        );
        Self {
            registry,
            detector: Mutex::new(detector),
            cache_artifacts: config.cache_artifacts,
            reload_only_on_change: config.reload_only_on_change,
        }
    }

    /// Whether artifacts are cached for the process lifetime
    #[inline]
    #[must_use]
    pub fn cache_artifacts(&self) -> bool {
        self.cache_artifacts
    }

    /// Whether reloads wait for the detector
    #[inline]
    #[must_use]
    pub fn reload_only_on_change(&self) -> bool {
        self.reload_only_on_change
    }

    /// Label of the configured detector
    #[must_use]
    pub fn detector_label(&self) -> &'static str {
        self.detector.lock().label()
    }

    /// Check for staleness and reload if needed
    ///
    /// Runs to completion before returning, so the caller's subsequent
    /// lookups see the post-eviction registry.
    ///
    /// # Errors
    /// Returns the detector's error; the registry is untouched in that case
    pub fn before_dispatch(&self) -> Result<ReloadOutcome, WatchError> {
        if self.cache_artifacts {
            return Ok(ReloadOutcome::Skipped);
        }

        if self.reload_only_on_change {
            let mut detector = self.detector.lock();
            let changed = detector.check_and_reset().map_err(|err| {
                tracing::warn!(detector = detector.label(), error = %err, "change detection failed");
                err
            })?;
            if !changed {
                tracing::trace!("no changes detected");
                return Ok(ReloadOutcome::Unchanged);
            }
        }

        let Eviction { evicted, generation } = self.registry.evict_and_advance();
        tracing::info!(evicted = evicted.len(), %generation, "autoloaded artifacts reloaded");
        Ok(ReloadOutcome::Reloaded { evicted, generation })
    }
}

impl Debug for ReloadCoordinator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadCoordinator")
            .field("detector", &self.detector.lock().label())
            .field("cache_artifacts", &self.cache_artifacts)
            .field("reload_only_on_change", &self.reload_only_on_change)
            .finish_non_exhaustive()
    }
}
