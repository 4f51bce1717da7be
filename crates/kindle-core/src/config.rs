//! Application configuration
//!
//! Layered, lowest first:
//! 1. [`AppConfig`] handed to the builder (defaults if none)
//! 2. `config/kindle.toml` under the application root
//! 3. an environment pinned on the builder
//! 4. `config/environments/<environment>.toml`
//! 5. values written by host `before_config` steps
//!
//! Layers 2 to 4 are merged by the `kindle.load_environment` step, so the
//! final value only exists once every `before_config` step has run.

use crate::error::ConfigError;
use kindle_boot::Settings;
use kindle_watch::FingerprintMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application-wide config file, relative to the root
pub const CONFIG_FILE: &str = "config/kindle.toml";

/// Directory holding per-environment config files, relative to the root
pub const ENVIRONMENTS_DIR: &str = "config/environments";

/// Default environment name
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Kindle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment name; selects the environment config file
    pub environment: String,

    /// Keep autoloaded artifacts forever (no reloading)
    pub cache_artifacts: bool,

    /// Reload only when the change detector fires; otherwise every dispatch
    pub reload_only_on_change: bool,

    /// Resolve every known name during boot
    pub eager_load: bool,

    /// Glob patterns watched by the default detector, relative to the root
    pub watch: Vec<String>,

    /// How the default detector fingerprints files
    pub fingerprint: FingerprintMode,

    /// Tracing filter directive used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With environment name
    #[inline]
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// With artifact caching
    #[inline]
    #[must_use]
    pub fn with_cache_artifacts(mut self, cache: bool) -> Self {
        self.cache_artifacts = cache;
        self
    }

    /// With reload policy
    #[inline]
    #[must_use]
    pub fn with_reload_only_on_change(mut self, only_on_change: bool) -> Self {
        self.reload_only_on_change = only_on_change;
        self
    }

    /// With eager loading
    #[inline]
    #[must_use]
    pub fn with_eager_load(mut self, eager: bool) -> Self {
        self.eager_load = eager;
        self
    }

    /// With an additional watch pattern
    #[inline]
    #[must_use]
    pub fn with_watch(mut self, pattern: impl Into<String>) -> Self {
        self.watch.push(pattern.into());
        self
    }

    /// With fingerprint mode
    #[inline]
    #[must_use]
    pub fn with_fingerprint(mut self, mode: FingerprintMode) -> Self {
        self.fingerprint = mode;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = Some(filter.into());
        self
    }

    /// Read the configuration out of boot settings
    ///
    /// Unknown keys are ignored; missing keys take their defaults.
    ///
    /// # Errors
    /// Returns error if a known key has the wrong shape
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(settings.deserialize()?)
    }

    /// Settings seeded with this configuration
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_settings(&self) -> Result<Settings, ConfigError> {
        Ok(Settings::from_serializable(self)?)
    }

    /// Watch patterns made absolute against `root`
    #[must_use]
    pub fn watch_patterns(&self, root: &Path) -> Vec<String> {
        self.watch
            .iter()
            .map(|pattern| {
                if Path::new(pattern).is_absolute() {
                    pattern.clone()
                } else {
                    root.join(pattern).to_string_lossy().into_owned()
                }
            })
            .collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            cache_artifacts: false,
            reload_only_on_change: true,
            eager_load: false,
            watch: Vec::new(),
            fingerprint: FingerprintMode::default(),
            log_filter: None,
        }
    }
}

/// Path of the per-environment config file
#[must_use]
pub fn environment_file(root: &Path, environment: &str) -> PathBuf {
    root.join(ENVIRONMENTS_DIR).join(format!("{environment}.toml"))
}

/// Merge a TOML file into `settings` if it exists
///
/// Returns whether the file was present.
///
/// # Errors
/// Returns error if the file exists but cannot be read or parsed
pub fn merge_file(settings: &mut Settings, path: &Path) -> Result<bool, ConfigError> {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    settings
        .merge_toml(&source)
        .map_err(|source| ConfigError::File {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), "configuration merged");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = AppConfig::default();
        assert_eq!(config.environment, "development");
        assert!(!config.cache_artifacts);
        assert!(config.reload_only_on_change);
        assert!(!config.eager_load);
        assert_eq!(config.fingerprint, FingerprintMode::Metadata);
    }

    #[test]
    fn builder_methods() {
        let config = AppConfig::new()
            .with_environment("production")
            .with_cache_artifacts(true)
            .with_eager_load(true)
            .with_watch("app/**/*.rb")
            .with_log_filter("kindle=debug");
        assert_eq!(config.environment, "production");
        assert!(config.cache_artifacts);
        assert!(config.eager_load);
        assert_eq!(config.watch, vec!["app/**/*.rb"]);
        assert_eq!(config.log_filter.as_deref(), Some("kindle=debug"));
    }

    #[test]
    fn from_settings_ignores_unknown_keys() {
        let mut settings = AppConfig::new().with_eager_load(true).to_settings().unwrap();
        settings.set("host_specific", 42).unwrap();

        let config = AppConfig::from_settings(&settings).unwrap();
        assert!(config.eager_load);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let mut settings = Settings::new();
        settings
            .merge_toml("cache_artifacts = true\nfingerprint = \"content\"\n")
            .unwrap();

        let config = AppConfig::from_settings(&settings).unwrap();
        assert!(config.cache_artifacts);
        assert_eq!(config.fingerprint, FingerprintMode::Content);
        assert_eq!(config.environment, DEFAULT_ENVIRONMENT);
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let mut settings = Settings::new();
        settings.set("cache_artifacts", "yes please").unwrap();
        assert!(AppConfig::from_settings(&settings).is_err());
    }

    #[test]
    fn merge_file_missing_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::new();
        assert!(!merge_file(&mut settings, &dir.path().join(CONFIG_FILE)).unwrap());
        assert!(settings.is_empty());
    }

    #[test]
    fn merge_file_reports_path_on_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "eager_load = ").unwrap();

        let err = merge_file(&mut Settings::new(), &path).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn watch_patterns_are_rooted() {
        let config = AppConfig::new().with_watch("app/**/*.rb");
        let root = Path::new("/srv/blog");
        assert_eq!(config.watch_patterns(root), vec!["/srv/blog/app/**/*.rb"]);
        assert_eq!(
            environment_file(root, "test"),
            PathBuf::from("/srv/blog/config/environments/test.toml")
        );
    }
}
