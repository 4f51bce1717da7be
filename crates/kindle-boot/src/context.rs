//! Boot-time configuration and shared context
//!
//! [`Settings`] is the loosely typed configuration tree steps write into
//! and read from. It is deliberately untyped while booting: a
//! `before_config` step may set keys that only a later `framework` step
//! knows how to interpret.

use kindle_artifact::{Artifact, Origin, SymbolicName};
use kindle_registry::{ArtifactRegistry, RegistryEntry, RegistryError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Configuration tree shared by initializer steps
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    root: Map<String, Value>,
}

impl Settings {
    /// Create empty settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from any serializable struct (must serialize to a map)
    ///
    /// # Errors
    /// Returns error if `value` does not serialize to a map
    pub fn from_serializable<T: Serialize>(value: &T) -> Result<Self, SettingsError> {
        match serde_json::to_value(value)? {
            Value::Object(root) => Ok(Self { root }),
            other => Err(SettingsError::NotATable(type_name(&other))),
        }
    }

    /// Set a top-level key
    ///
    /// # Errors
    /// Returns error if `value` cannot be serialized
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<(), SettingsError> {
        self.root.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    /// Read a top-level key as `T`
    ///
    /// # Errors
    /// Returns error if the key exists but does not deserialize as `T`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SettingsError> {
        self.root
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|source| SettingsError::Key {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    /// Raw value of a top-level key
    #[inline]
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<&Value> {
        self.root.get(key)
    }

    /// Check if a key is set
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.root.contains_key(key)
    }

    /// Remove a key, returning its raw value
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.root.remove(key)
    }

    /// Deep-merge `other` into `self`; `other` wins on conflicts
    pub fn merge(&mut self, other: Settings) {
        merge_maps(&mut self.root, other.root);
    }

    /// Deep-merge a TOML document
    ///
    /// # Errors
    /// Returns error if the document does not parse
    pub fn merge_toml(&mut self, source: &str) -> Result<(), SettingsError> {
        let table: toml::Table = toml::from_str(source)?;
        let other = Self::from_serializable(&table)?;
        self.merge(other);
        Ok(())
    }

    /// Deserialize the whole tree as `T`
    ///
    /// # Errors
    /// Returns error if the tree does not match `T`
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, SettingsError> {
        Ok(serde_json::from_value(Value::Object(self.root.clone()))?)
    }

    /// Number of top-level keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.len()
    }

    /// Check if no key is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }
}

fn merge_maps(into: &mut Map<String, Value>, from: Map<String, Value>) {
    for (key, value) in from {
        match (into.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => merge_maps(existing, incoming),
            (_, value) => {
                into.insert(key, value);
            }
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "table",
    }
}

/// Errors reading or writing settings
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// Value could not be converted
    #[error("settings conversion failed: {0}")]
    Convert(#[from] serde_json::Error),

    /// A specific key holds the wrong shape
    #[error("setting '{key}' has unexpected shape: {source}")]
    Key {
        /// Top-level key
        key: String,
        /// Conversion failure
        #[source]
        source: serde_json::Error,
    },

    /// TOML document did not parse
    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    /// Root value is not a table
    #[error("settings root must be a table, got {0}")]
    NotATable(&'static str),
}

/// Mutable state handed to every initializer step
#[derive(Debug)]
pub struct BootContext {
    /// Configuration visible to all later steps
    pub settings: Settings,

    registry: Arc<ArtifactRegistry>,
}

impl BootContext {
    /// Create context over a registry
    #[must_use]
    pub fn new(settings: Settings, registry: Arc<ArtifactRegistry>) -> Self {
        Self { settings, registry }
    }

    /// Registry being populated
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    /// Register a framework-owned artifact that survives reloads
    ///
    /// # Errors
    /// Returns error if the name is taken
    pub fn register_explicit(
        &self,
        name: SymbolicName,
        artifact: Artifact,
    ) -> Result<RegistryEntry, RegistryError> {
        self.registry.put(name, artifact, Origin::Explicit)
    }

    /// Consume context, returning the final settings
    #[must_use]
    pub fn into_settings(self) -> Settings {
        self.settings
    }
}
