//! Change detectors
//!
//! A [`ChangeDetector`] answers one question: did anything change since the
//! previous call? Asking resets the baseline.

use crate::error::WatchError;
use crate::fingerprint::{Fingerprint, FingerprintMode};
use crate::locations::WatchedLocations;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::path::PathBuf;

/// Staleness signal consulted before each dispatch
pub trait ChangeDetector: Send {
    /// Report whether anything changed since the last call, then reset
    ///
    /// # Errors
    /// Returns error if the watched state cannot be inspected
    fn check_and_reset(&mut self) -> Result<bool, WatchError>;

    /// Short label for logs
    fn label(&self) -> &'static str {
        "custom"
    }
}

/// Files that differ between two scans
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Present now, absent before
    pub added: Vec<PathBuf>,

    /// Present before, absent now
    pub removed: Vec<PathBuf>,

    /// Present in both, fingerprint differs
    pub modified: Vec<PathBuf>,
}

impl ChangeSet {
    /// True when no file changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.modified.is_empty()
    }

    /// Total number of changed files
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len() + self.modified.len()
    }
}

type Snapshot = BTreeMap<PathBuf, Fingerprint>;

/// Default detector: fingerprints every watched file
pub struct FileWatcher {
    locations: Box<dyn WatchedLocations>,
    mode: FingerprintMode,
    baseline: Snapshot,
}

impl FileWatcher {
    /// Create watcher and record the initial baseline
    ///
    /// # Errors
    /// Returns error if the initial scan fails
    pub fn new(locations: impl WatchedLocations + 'static, mode: FingerprintMode) -> Result<Self, WatchError> {
        let locations: Box<dyn WatchedLocations> = Box::new(locations);
        let baseline = scan(locations.as_ref(), mode)?;
        tracing::debug!(files = baseline.len(), ?mode, "file watcher baseline recorded");
        Ok(Self {
            locations,
            mode,
            baseline,
        })
    }

    /// Number of files in the current baseline
    #[inline]
    #[must_use]
    pub fn watched_count(&self) -> usize {
        self.baseline.len()
    }

    /// Fingerprint mode
    #[inline]
    #[must_use]
    pub fn mode(&self) -> FingerprintMode {
        self.mode
    }

    /// Scan and diff against the baseline, then reset the baseline
    ///
    /// # Errors
    /// Returns error if the scan fails; the baseline is kept in that case
    pub fn take_changes(&mut self) -> Result<ChangeSet, WatchError> {
        let current = scan(self.locations.as_ref(), self.mode)?;
        let changes = diff(&self.baseline, &current);
        self.baseline = current;
        Ok(changes)
    }
}

impl Debug for FileWatcher {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileWatcher")
            .field("locations", &self.locations)
            .field("mode", &self.mode)
            .field("watched", &self.baseline.len())
            .finish()
    }
}

impl ChangeDetector for FileWatcher {
    fn check_and_reset(&mut self) -> Result<bool, WatchError> {
        let changes = self.take_changes()?;
        if !changes.is_empty() {
            tracing::debug!(
                added = changes.added.len(),
                removed = changes.removed.len(),
                modified = changes.modified.len(),
                "watched files changed"
            );
        }
        Ok(!changes.is_empty())
    }

    fn label(&self) -> &'static str {
        "file_watcher"
    }
}

fn scan(locations: &dyn WatchedLocations, mode: FingerprintMode) -> Result<Snapshot, WatchError> {
    let mut snapshot = Snapshot::new();
    for path in locations.enumerate()? {
        if let Some(fingerprint) = Fingerprint::of(&path, mode)? {
            snapshot.insert(path, fingerprint);
        }
    }
    Ok(snapshot)
}

fn diff(before: &Snapshot, after: &Snapshot) -> ChangeSet {
    let mut changes = ChangeSet::default();
    for (path, fingerprint) in after {
        match before.get(path) {
            None => changes.added.push(path.clone()),
            Some(old) if old != fingerprint => changes.modified.push(path.clone()),
            Some(_) => {}
        }
    }
    changes.removed = before
        .keys()
        .filter(|path| !after.contains_key(*path))
        .cloned()
        .collect();
    changes
}

/// Detector that never reports a change
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverChanged;

impl ChangeDetector for NeverChanged {
    fn check_and_reset(&mut self) -> Result<bool, WatchError> {
        Ok(false)
    }

    fn label(&self) -> &'static str {
        "never"
    }
}

type Predicate = dyn FnMut() -> anyhow::Result<bool> + Send;

/// Detector backed by a host predicate
pub struct FnDetector {
    predicate: Box<Predicate>,
}

impl FnDetector {
    /// Wrap predicate as a detector
    pub fn new<F>(predicate: F) -> Self
    where
        F: FnMut() -> anyhow::Result<bool> + Send + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

impl Debug for FnDetector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDetector").finish_non_exhaustive()
    }
}

impl ChangeDetector for FnDetector {
    fn check_and_reset(&mut self) -> Result<bool, WatchError> {
        (self.predicate)().map_err(WatchError::Detector)
    }
}
