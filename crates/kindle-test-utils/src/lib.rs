//! Testing utilities for the Kindle workspace
//!
//! Shared lookup strategies, detectors and filesystem fixtures.

#![allow(missing_docs)]

use kindle_artifact::{Artifact, SymbolicName};
use kindle_resolve::{LookupStrategy, ResolveContext};
use kindle_watch::{ChangeDetector, WatchError};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Value produced by [`CountingLookup`] for a defined name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loaded {
    pub name: String,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
struct Definition {
    version: u64,
    deps: Vec<String>,
}

/// In-memory definitions that count how often each name is loaded
#[derive(Debug, Default)]
pub struct CountingLookup {
    definitions: RwLock<BTreeMap<String, Definition>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl CountingLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(names: &[&str]) -> Self {
        let lookup = Self::new();
        for name in names {
            lookup.define(name);
        }
        lookup
    }

    /// Define `name` at version 1
    pub fn define(&self, name: &str) {
        self.define_with_deps(name, &[]);
    }

    /// Define `name` so that loading it first resolves `deps`
    pub fn define_with_deps(&self, name: &str, deps: &[&str]) {
        self.definitions.write().insert(
            name.to_string(),
            Definition {
                version: 1,
                deps: deps.iter().map(ToString::to_string).collect(),
            },
        );
    }

    /// Simulate an edit of the source defining `name`
    pub fn bump(&self, name: &str) {
        if let Some(definition) = self.definitions.write().get_mut(name) {
            definition.version += 1;
        }
    }

    pub fn remove(&self, name: &str) {
        self.definitions.write().remove(name);
    }

    /// Number of lookups for `name`, including failed ones
    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

impl LookupStrategy for CountingLookup {
    fn lookup(&self, name: &SymbolicName, cx: &mut ResolveContext<'_>) -> anyhow::Result<Option<Artifact>> {
        *self.calls.lock().entry(name.to_string()).or_default() += 1;

        let Some(definition) = self.definitions.read().get(name.as_str()).cloned() else {
            return Ok(None);
        };
        for dep in &definition.deps {
            cx.resolve(dep)?;
        }
        Ok(Some(Artifact::new(Loaded {
            name: name.to_string(),
            version: definition.version,
        })))
    }

    fn known_names(&self) -> anyhow::Result<Vec<SymbolicName>> {
        self.definitions
            .read()
            .keys()
            .map(|name| SymbolicName::new(name.as_str()).map_err(anyhow::Error::from))
            .collect()
    }
}

/// Detector flipped by hand; clones share state
#[derive(Debug, Clone, Default)]
pub struct ToggleDetector {
    changed: Arc<AtomicBool>,
    checks: Arc<AtomicUsize>,
}

impl ToggleDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report a change on the next check
    pub fn trigger(&self) {
        self.changed.store(true, Ordering::SeqCst);
    }

    /// Number of times the detector was consulted
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl ChangeDetector for ToggleDetector {
    fn check_and_reset(&mut self) -> Result<bool, WatchError> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        Ok(self.changed.swap(false, Ordering::SeqCst))
    }

    fn label(&self) -> &'static str {
        "toggle"
    }
}

/// Temporary application root
pub fn app_root() -> TempDir {
    TempDir::new().expect("create temp dir")
}

/// Write `contents` to `root/relative`, creating parent directories
pub fn write_source(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create source dir");
    }
    std::fs::write(&path, contents).expect("write source");
    path
}
