//! Application lifecycle
//!
//! An [`Application`] owns the artifact registry, the resolver and the
//! initializer sequence. [`Application::initialize`] runs the sequence
//! once; [`Application::before_dispatch`] is then called ahead of every
//! unit of work.
//!
//! # Framework steps
//!
//! | Step | Phase |
//! |------|-------|
//! | [`steps::LOAD_ENVIRONMENT`] | `before_config` |
//! | [`steps::CONFIGURE_RELOADING`] | `framework` |
//! | [`steps::EAGER_LOAD`] | `after_config` |
//! | [`steps::READY`] | `before_ready` |
//!
//! Host steps registered through [`Application::initializer`] run after the
//! framework step of their phase unless spliced next to one.

use crate::config::{self, AppConfig, CONFIG_FILE, DEFAULT_ENVIRONMENT};
use crate::coordinator::{ReloadCoordinator, ReloadOutcome};
use crate::error::{KindleError, KindleResult};
use kindle_artifact::{Artifact, Origin, SymbolicName};
use kindle_boot::{
    BootContext, BootReport, InitializerStep, LifecycleState, Phase, Sequencer, Settings,
};
use kindle_registry::{ArtifactRegistry, RegistryEntry};
use kindle_resolve::{EmptyLookup, LookupStrategy, ResolvedArtifact, Resolver};
use kindle_watch::{ChangeDetector, FileWatcher, GlobLocations, NeverChanged};
use std::fmt::{self, Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

/// Names of the steps every application registers
pub mod steps {
    /// Merges `config/kindle.toml` and the environment file
    pub const LOAD_ENVIRONMENT: &str = "kindle.load_environment";

    /// Builds the reload coordinator from the final configuration
    pub const CONFIGURE_RELOADING: &str = "kindle.configure_reloading";

    /// Resolves every known name when `eager_load` is set
    pub const EAGER_LOAD: &str = "kindle.eager_load";

    /// Logs the boot summary
    pub const READY: &str = "kindle.ready";
}

/// Builder for [`Application`]
pub struct ApplicationBuilder {
    root: PathBuf,
    config: AppConfig,
    lookup: Option<Arc<dyn LookupStrategy>>,
    detector: Option<Box<dyn ChangeDetector>>,
    registry: Option<Arc<ArtifactRegistry>>,
    environment: Option<String>,
}

impl ApplicationBuilder {
    /// Start building an application rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: AppConfig::default(),
            lookup: None,
            detector: None,
            registry: None,
            environment: None,
        }
    }

    /// Base configuration, overridden by config files
    #[must_use]
    pub fn config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Lookup strategy for autoloaded names
    #[must_use]
    pub fn lookup(mut self, lookup: impl LookupStrategy + 'static) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Shared lookup strategy
    #[must_use]
    pub fn shared_lookup(mut self, lookup: Arc<dyn LookupStrategy>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Replace the default file watcher
    #[must_use]
    pub fn detector(mut self, detector: impl ChangeDetector + 'static) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    /// Use an existing registry
    #[must_use]
    pub fn registry(mut self, registry: Arc<ArtifactRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Pin the environment; wins over `config/kindle.toml`
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Add a watch pattern for the default file watcher
    #[must_use]
    pub fn watch(mut self, pattern: impl Into<String>) -> Self {
        self.config.watch.push(pattern.into());
        self
    }

    /// Build the application and register the framework steps
    ///
    /// # Errors
    /// Returns error if a framework step cannot be registered
    pub fn build(self) -> KindleResult<Application> {
        let registry = self.registry.unwrap_or_default();
        let lookup = self.lookup.unwrap_or_else(|| Arc::new(EmptyLookup));
        let resolver = Arc::new(Resolver::new(Arc::clone(&registry), lookup));
        let coordinator = Arc::new(OnceLock::new());
        let config = Arc::new(OnceLock::new());

        let mut sequencer = Sequencer::new();
        sequencer.register(load_environment(self.root.clone(), self.environment))?;
        sequencer.register(configure_reloading(
            self.root.clone(),
            Arc::clone(&registry),
            self.detector,
            Arc::clone(&coordinator),
            Arc::clone(&config),
        ))?;
        sequencer.register(eager_load(Arc::clone(&resolver)))?;
        sequencer.register(ready())?;

        Ok(Application {
            root: self.root,
            base: self.config,
            registry,
            resolver,
            sequencer,
            coordinator,
            config,
            settings: None,
            boot: None,
        })
    }
}

impl Debug for ApplicationBuilder {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBuilder")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("custom_detector", &self.detector.is_some())
            .finish_non_exhaustive()
    }
}

fn load_environment(root: PathBuf, pinned: Option<String>) -> InitializerStep {
    InitializerStep::new(steps::LOAD_ENVIRONMENT, Phase::BeforeConfig, move |cx| {
        config::merge_file(&mut cx.settings, &root.join(CONFIG_FILE))?;
        if let Some(environment) = pinned {
            cx.settings.set("environment", environment)?;
        }

        let environment: String = cx
            .settings
            .get("environment")?
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        let found = config::merge_file(&mut cx.settings, &config::environment_file(&root, &environment))?;

        tracing::info!(%environment, environment_file = found, "environment loaded");
        Ok(())
    })
}

fn configure_reloading(
    root: PathBuf,
    registry: Arc<ArtifactRegistry>,
    detector: Option<Box<dyn ChangeDetector>>,
    coordinator: Arc<OnceLock<ReloadCoordinator>>,
    config_slot: Arc<OnceLock<AppConfig>>,
) -> InitializerStep {
    InitializerStep::new(steps::CONFIGURE_RELOADING, Phase::Framework, move |cx| {
        let config = AppConfig::from_settings(&cx.settings)?;

        let detector: Box<dyn ChangeDetector> = match detector {
            Some(detector) => detector,
            None if config.cache_artifacts => Box::new(NeverChanged),
            None => {
                let locations = GlobLocations::new(config.watch_patterns(&root))?;
                Box::new(FileWatcher::new(locations, config.fingerprint)?)
            }
        };

        coordinator
            .set(ReloadCoordinator::new(registry, detector, &config))
            .map_err(|_| anyhow::anyhow!("reload coordinator already configured"))?;
        config_slot
            .set(config)
            .map_err(|_| anyhow::anyhow!("configuration already frozen"))?;
        Ok(())
    })
}

fn eager_load(resolver: Arc<Resolver>) -> InitializerStep {
    InitializerStep::new(steps::EAGER_LOAD, Phase::AfterConfig, move |cx| {
        let eager: Option<bool> = cx.settings.get("eager_load")?;
        if eager != Some(true) {
            return Ok(());
        }

        let names = resolver.strategy().known_names()?;
        for name in &names {
            resolver.resolve(name.as_str())?;
        }
        tracing::info!(count = names.len(), "eager loaded artifacts");
        Ok(())
    })
}

fn ready() -> InitializerStep {
    InitializerStep::new(steps::READY, Phase::BeforeReady, |cx| {
        let environment: Option<String> = cx.settings.get("environment")?;
        tracing::info!(
            environment = environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT),
            artifacts = cx.registry().len(),
            generation = %cx.registry().generation(),
            "application ready"
        );
        Ok(())
    })
}

/// A bootable, reloadable application
pub struct Application {
    root: PathBuf,
    base: AppConfig,
    registry: Arc<ArtifactRegistry>,
    resolver: Arc<Resolver>,
    sequencer: Sequencer,
    coordinator: Arc<OnceLock<ReloadCoordinator>>,
    config: Arc<OnceLock<AppConfig>>,
    settings: Option<Settings>,
    boot: Option<BootReport>,
}

impl Application {
    /// Start building an application rooted at `root`
    #[must_use]
    pub fn builder(root: impl Into<PathBuf>) -> ApplicationBuilder {
        ApplicationBuilder::new(root)
    }

    /// Application root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shared artifact registry
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<ArtifactRegistry> {
        &self.registry
    }

    /// Shared resolver
    #[inline]
    #[must_use]
    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.resolver
    }

    /// Register a host initializer step
    ///
    /// # Errors
    /// See [`Sequencer::register`]
    pub fn initializer(&mut self, step: InitializerStep) -> KindleResult<()> {
        Ok(self.sequencer.register(step)?)
    }

    /// Splice a host step before `anchor`
    ///
    /// # Errors
    /// See [`Sequencer::register`]
    pub fn initializer_before(&mut self, anchor: &str, step: InitializerStep) -> KindleResult<()> {
        Ok(self.sequencer.insert_before(anchor, step)?)
    }

    /// Splice a host step after `anchor`
    ///
    /// # Errors
    /// See [`Sequencer::register`]
    pub fn initializer_after(&mut self, anchor: &str, step: InitializerStep) -> KindleResult<()> {
        Ok(self.sequencer.insert_after(anchor, step)?)
    }

    /// The initializer sequence
    #[inline]
    #[must_use]
    pub fn initializers(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Run the initializer sequence; allowed once per application
    ///
    /// # Errors
    /// - [`BootError::DoubleInitialization`](kindle_boot::BootError::DoubleInitialization) on a second call
    /// - [`BootError::StepFailed`](kindle_boot::BootError::StepFailed) if a step fails
    pub fn initialize(&mut self) -> KindleResult<&BootReport> {
        let span = tracing::info_span!("boot", root = %self.root.display());
        let _entered = span.enter();

        let settings = self.base.to_settings()?;
        let mut cx = BootContext::new(settings, Arc::clone(&self.registry));
        let report = self.sequencer.run_all(&mut cx)?;

        self.settings = Some(cx.into_settings());
        let report: &BootReport = self.boot.insert(report);
        Ok(report)
    }

    /// Lifecycle state of the boot sequence
    #[inline]
    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.sequencer.guard().state()
    }

    /// Check if [`Self::initialize`] completed
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.sequencer.guard().is_initialized()
    }

    /// Final configuration, once booted
    #[must_use]
    pub fn config(&self) -> Option<&AppConfig> {
        self.config.get()
    }

    /// Final settings, once booted
    #[must_use]
    pub fn settings(&self) -> Option<&Settings> {
        self.settings.as_ref()
    }

    /// Report of the boot run
    #[must_use]
    pub fn boot_report(&self) -> Option<&BootReport> {
        self.boot.as_ref()
    }

    /// Reload coordinator, once booted
    #[must_use]
    pub fn coordinator(&self) -> Option<&ReloadCoordinator> {
        self.coordinator.get()
    }

    /// Reload stale artifacts ahead of a unit of work
    ///
    /// # Errors
    /// - [`KindleError::NotInitialized`] before a successful boot
    /// - [`KindleError::Watch`] if the change detector fails
    pub fn before_dispatch(&self) -> KindleResult<ReloadOutcome> {
        let coordinator = self
            .coordinator
            .get()
            .filter(|_| self.is_initialized())
            .ok_or(KindleError::NotInitialized)?;
        Ok(coordinator.before_dispatch()?)
    }

    /// Run `work` after the reload check
    ///
    /// # Errors
    /// Same as [`Self::before_dispatch`]
    pub fn dispatch<T>(&self, work: impl FnOnce(&Self) -> T) -> KindleResult<T> {
        self.before_dispatch()?;
        Ok(work(self))
    }

    /// Resolve a name, autoloading it on first reference
    ///
    /// # Errors
    /// See [`Resolver::resolve`]
    pub fn resolve(&self, name: &str) -> KindleResult<Artifact> {
        Ok(self.resolver.resolve(name)?)
    }

    /// Resolve a name together with its generation
    ///
    /// # Errors
    /// See [`Resolver::resolve`]
    pub fn resolve_tagged(&self, name: &str) -> KindleResult<ResolvedArtifact> {
        Ok(self.resolver.resolve_tagged(name)?)
    }

    /// Register a framework-owned artifact; it survives every reload
    ///
    /// # Errors
    /// Returns error if the name is invalid or already registered
    pub fn register_explicit(&self, name: &str, artifact: Artifact) -> KindleResult<RegistryEntry> {
        let name = SymbolicName::new(name)?;
        Ok(self.registry.put(name, artifact, Origin::Explicit)?)
    }

    /// Drop every registered artifact, ending the application
    pub fn teardown(self) -> usize {
        let removed = self.registry.clear();
        tracing::info!(removed, "application torn down");
        removed
    }
}

impl Debug for Application {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("root", &self.root)
            .field("state", &self.state())
            .field("artifacts", &self.registry.len())
            .field("generation", &self.registry.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindle_resolve::FnLookup;
    use kindle_watch::FnDetector;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tempfile::TempDir;

    fn post_lookup() -> FnLookup {
        FnLookup::new(|name, _cx| Ok((name.as_str() == "Post").then(|| Artifact::new("post"))))
    }

    #[test]
    fn framework_steps_are_planned_in_phase_order() {
        let app = Application::builder("/nonexistent").build().unwrap();
        let plan: Vec<_> = app.initializers().plan();
        assert_eq!(
            plan,
            vec![
                (Phase::BeforeConfig, steps::LOAD_ENVIRONMENT),
                (Phase::Framework, steps::CONFIGURE_RELOADING),
                (Phase::AfterConfig, steps::EAGER_LOAD),
                (Phase::BeforeReady, steps::READY),
            ]
        );
    }

    #[test]
    fn pinned_environment_wins_over_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config/environments")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "environment = \"production\"\n").unwrap();
        std::fs::write(
            dir.path().join("config/environments/test.toml"),
            "eager_load = true\n",
        )
        .unwrap();

        let mut app = Application::builder(dir.path()).environment("test").build().unwrap();
        app.initialize().unwrap();

        let config = app.config().unwrap();
        assert_eq!(config.environment, "test");
        assert!(config.eager_load);
    }

    #[test]
    fn dispatch_before_initialize_is_refused() {
        let app = Application::builder("/nonexistent").build().unwrap();
        assert!(matches!(app.before_dispatch(), Err(KindleError::NotInitialized)));
        assert!(app.config().is_none());
    }

    #[test]
    fn initialize_configures_coordinator_from_files() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config/environments")).unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "environment = \"production\"\n").unwrap();
        std::fs::write(
            dir.path().join("config/environments/production.toml"),
            "cache_artifacts = true\n",
        )
        .unwrap();

        let mut app = Application::builder(dir.path()).lookup(post_lookup()).build().unwrap();
        app.initialize().unwrap();

        let config = app.config().unwrap();
        assert_eq!(config.environment, "production");
        assert!(config.cache_artifacts);
        assert!(app.coordinator().unwrap().cache_artifacts());
        assert_eq!(app.before_dispatch().unwrap(), ReloadOutcome::Skipped);
    }

    #[test]
    fn custom_detector_drives_reload() {
        let flag = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&flag);
        let mut app = Application::builder("/nonexistent")
            .lookup(post_lookup())
            .detector(FnDetector::new(move || Ok(probe.swap(false, Ordering::SeqCst))))
            .build()
            .unwrap();
        app.initialize().unwrap();

        let first = app.resolve("Post").unwrap();
        assert_eq!(app.before_dispatch().unwrap(), ReloadOutcome::Unchanged);
        assert!(app.resolve("Post").unwrap().same_identity(&first));

        flag.store(true, Ordering::SeqCst);
        let outcome = app.before_dispatch().unwrap();
        assert!(outcome.is_reload());
        assert!(!app.resolve("Post").unwrap().same_identity(&first));
    }

    #[test]
    fn dispatch_runs_work_after_reload() {
        let mut app = Application::builder("/nonexistent")
            .config(AppConfig::new().with_reload_only_on_change(false))
            .lookup(post_lookup())
            .build()
            .unwrap();
        app.initialize().unwrap();

        let stale = app.resolve_tagged("Post").unwrap();
        let fresh = app.dispatch(|app| app.resolve_tagged("Post")).unwrap().unwrap();

        assert!(!stale.is_current(app.registry()));
        assert!(fresh.is_current(app.registry()));
        assert!(fresh.generation > stale.generation);
    }

    #[test]
    fn explicit_registration_and_teardown() {
        let app = Application::builder("/nonexistent").lookup(post_lookup()).build().unwrap();
        app.register_explicit("Router", Artifact::new("routes")).unwrap();
        app.resolve("Post").unwrap();

        assert!(app.register_explicit("Router", Artifact::new("again")).is_err());
        assert!(app.register_explicit("bad::", Artifact::new(())).is_err());
        assert_eq!(app.teardown(), 2);
    }
}
