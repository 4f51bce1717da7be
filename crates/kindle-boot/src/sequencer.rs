//! Initializer sequencing
//!
//! Steps are kept per phase in execution order. Registration appends to the
//! step's phase; an `after`/`before` anchor splices it next to an existing
//! step of the same phase instead. Steps spliced after the same anchor form
//! a group that later splices are appended to, so the second lands after
//! the first.

use crate::context::BootContext;
use crate::error::{BootError, BootResult};
use crate::guard::{InitGuard, LifecycleState};
use crate::step::{InitializerStep, Phase};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Summary of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootReport {
    /// Step names in the order they ran
    pub executed: Vec<String>,

    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl BootReport {
    /// Check if a step ran
    #[must_use]
    pub fn ran(&self, step: &str) -> bool {
        self.executed.iter().any(|name| name == step)
    }
}

/// Phase-ordered, run-once list of initializer steps
#[derive(Debug)]
pub struct Sequencer {
    phases: [Vec<InitializerStep>; 4],
    index: HashMap<String, Phase>,
    guard: Arc<InitGuard>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    /// Create empty sequencer with its own guard
    #[must_use]
    pub fn new() -> Self {
        Self::with_guard(Arc::new(InitGuard::new()))
    }

    /// Create empty sequencer over a shared guard
    #[must_use]
    pub fn with_guard(guard: Arc<InitGuard>) -> Self {
        Self {
            phases: Default::default(),
            index: HashMap::new(),
            guard,
        }
    }

    /// Guard latched by [`Self::run_all`]
    #[inline]
    #[must_use]
    pub fn guard(&self) -> &Arc<InitGuard> {
        &self.guard
    }

    /// Number of registered steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if no step is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Check if a step name is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Phase of a registered step
    #[must_use]
    pub fn phase_of(&self, name: &str) -> Option<Phase> {
        self.index.get(name).copied()
    }

    /// Register a step, honouring its `after`/`before` anchors
    ///
    /// # Errors
    /// - [`BootError::Sealed`] once a run has started
    /// - [`BootError::DuplicateStep`] if the name is taken
    /// - [`BootError::UnknownAnchor`] / [`BootError::PhaseMismatch`] for bad anchors
    /// - [`BootError::UnsatisfiableOrder`] if `before` precedes `after`
    pub fn register(&mut self, step: InitializerStep) -> BootResult<()> {
        if self.guard.state() != LifecycleState::Uninitialized {
            return Err(BootError::Sealed { step: step.name });
        }
        if self.index.contains_key(&step.name) {
            return Err(BootError::DuplicateStep { step: step.name });
        }

        let position = self.position_for(&step)?;
        tracing::trace!(step = %step.name, phase = %step.phase, position, "initializer registered");

        self.index.insert(step.name.clone(), step.phase);
        self.phases[step.phase.index()].insert(position, step);
        Ok(())
    }

    /// Splice `step` directly after `anchor`
    ///
    /// # Errors
    /// See [`Self::register`]
    pub fn insert_after(&mut self, anchor: &str, step: InitializerStep) -> BootResult<()> {
        self.register(step.after(anchor))
    }

    /// Splice `step` directly before `anchor`
    ///
    /// # Errors
    /// See [`Self::register`]
    pub fn insert_before(&mut self, anchor: &str, step: InitializerStep) -> BootResult<()> {
        self.register(step.before(anchor))
    }

    /// Planned execution order
    #[must_use]
    pub fn plan(&self) -> Vec<(Phase, &str)> {
        Phase::ALL
            .iter()
            .flat_map(|phase| {
                self.phases[phase.index()]
                    .iter()
                    .map(move |step| (*phase, step.name()))
            })
            .collect()
    }

    /// Run every step once, phase by phase
    ///
    /// # Errors
    /// - [`BootError::DoubleInitialization`] if a run already started
    /// - [`BootError::StepFailed`] for the first failing step; nothing after it runs
    pub fn run_all(&mut self, cx: &mut BootContext) -> BootResult<BootReport> {
        self.guard.begin()?;

        let started = Instant::now();
        let mut executed = Vec::with_capacity(self.index.len());

        for (phase, steps) in Phase::ALL.into_iter().zip(self.phases.iter_mut()) {
            for step in steps {
                let Some(action) = step.action.take() else {
                    continue;
                };
                let span = tracing::info_span!("initializer", step = %step.name, %phase);
                let _entered = span.enter();

                let step_started = Instant::now();
                if let Err(source) = action(cx) {
                    tracing::warn!(error = %source, "initializer failed, aborting boot");
                    return Err(BootError::StepFailed {
                        step: step.name.clone(),
                        phase,
                        source,
                    });
                }
                tracing::debug!(elapsed = ?step_started.elapsed(), "initializer done");
                executed.push(step.name.clone());
            }
        }

        self.guard.complete()?;
        let elapsed = started.elapsed();
        tracing::info!(steps = executed.len(), ?elapsed, "initialization complete");
        Ok(BootReport { executed, elapsed })
    }

    fn position_for(&self, step: &InitializerStep) -> BootResult<usize> {
        let steps = &self.phases[step.phase.index()];
        let after = step
            .after
            .as_deref()
            .map(|anchor| self.anchor_position(step, anchor))
            .transpose()?;
        let before = step
            .before
            .as_deref()
            .map(|anchor| self.anchor_position(step, anchor))
            .transpose()?;

        match (after, before) {
            (Some(after), before) => {
                let anchor = steps[after].name.as_str();
                let mut position = after + 1;
                while position < steps.len() && in_group(steps, position, anchor) {
                    position += 1;
                }
                match before {
                    Some(before) if before <= after => Err(BootError::UnsatisfiableOrder {
                        step: step.name.clone(),
                        after: anchor.to_string(),
                        before: steps[before].name.clone(),
                    }),
                    Some(before) => Ok(position.min(before)),
                    None => Ok(position),
                }
            }
            (None, Some(before)) => Ok(before),
            (None, None) => Ok(steps.len()),
        }
    }

    fn anchor_position(&self, step: &InitializerStep, anchor: &str) -> BootResult<usize> {
        let unknown = || BootError::UnknownAnchor {
            step: step.name.clone(),
            anchor: anchor.to_string(),
        };
        let anchor_phase = *self.index.get(anchor).ok_or_else(unknown)?;
        if anchor_phase != step.phase {
            return Err(BootError::PhaseMismatch {
                step: step.name.clone(),
                step_phase: step.phase,
                anchor: anchor.to_string(),
                anchor_phase,
            });
        }
        self.phases[anchor_phase.index()]
            .iter()
            .position(|s| s.name == anchor)
            .ok_or_else(unknown)
    }
}

/// Whether the step at `position` was spliced after `anchor`, directly or
/// through a chain of `after` anchors.
fn in_group(steps: &[InitializerStep], position: usize, anchor: &str) -> bool {
    let mut current = &steps[position];
    while let Some(after) = current.after.as_deref() {
        if after == anchor {
            return true;
        }
        match steps.iter().find(|s| s.name == after) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Settings;
    use kindle_registry::ArtifactRegistry;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    type Log = Arc<Mutex<Vec<String>>>;

    fn context() -> BootContext {
        BootContext::new(Settings::new(), Arc::new(ArtifactRegistry::new()))
    }

    fn logging(log: &Log, name: &str, phase: Phase) -> InitializerStep {
        let log = Arc::clone(log);
        let label = name.to_string();
        InitializerStep::new(name, phase, move |_| {
            log.lock().push(label);
            Ok(())
        })
    }

    fn names(seq: &Sequencer) -> Vec<&str> {
        seq.plan().into_iter().map(|(_, name)| name).collect()
    }

    #[test]
    fn runs_in_phase_order() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "ready", Phase::BeforeReady)).unwrap();
        seq.register(logging(&log, "framework", Phase::Framework)).unwrap();
        seq.register(logging(&log, "env", Phase::BeforeConfig)).unwrap();
        seq.register(logging(&log, "app", Phase::AfterConfig)).unwrap();

        let report = seq.run_all(&mut context()).unwrap();

        assert_eq!(*log.lock(), vec!["env", "framework", "app", "ready"]);
        assert_eq!(report.executed, *log.lock());
        assert!(seq.guard().is_initialized());
        assert_eq!(names(&seq), report.executed);
        assert_eq!(seq.len(), 4);
    }

    #[test]
    fn second_run_is_refused_without_rerunning() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "once", Phase::Framework)).unwrap();

        seq.run_all(&mut context()).unwrap();
        let err = seq.run_all(&mut context()).unwrap_err();

        assert!(matches!(
            err,
            BootError::DoubleInitialization {
                state: LifecycleState::Initialized
            }
        ));
        assert_eq!(log.lock().len(), 1);
    }

    #[test]
    fn insert_after_and_before_splice_adjacent() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        for name in ["a", "b", "c"] {
            seq.register(logging(&log, name, Phase::Framework)).unwrap();
        }

        seq.insert_after("a", logging(&log, "a2", Phase::Framework)).unwrap();
        seq.insert_before("c", logging(&log, "pre_c", Phase::Framework)).unwrap();

        assert_eq!(names(&seq), vec!["a", "a2", "b", "pre_c", "c"]);
    }

    #[test]
    fn repeated_splices_after_same_anchor_keep_order() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "anchor", Phase::AfterConfig)).unwrap();
        seq.register(logging(&log, "tail", Phase::AfterConfig)).unwrap();

        seq.insert_after("anchor", logging(&log, "first", Phase::AfterConfig)).unwrap();
        seq.insert_after("first", logging(&log, "first_child", Phase::AfterConfig)).unwrap();
        seq.insert_after("anchor", logging(&log, "second", Phase::AfterConfig)).unwrap();

        assert_eq!(
            names(&seq),
            vec!["anchor", "first", "first_child", "second", "tail"]
        );
    }

    #[test]
    fn repeated_splices_before_same_anchor_keep_order() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "anchor", Phase::Framework)).unwrap();
        seq.insert_before("anchor", logging(&log, "first", Phase::Framework)).unwrap();
        seq.insert_before("anchor", logging(&log, "second", Phase::Framework)).unwrap();

        assert_eq!(names(&seq), vec!["first", "second", "anchor"]);
    }

    #[test]
    fn step_anchor_fields_splice_like_hooks() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "x", Phase::Framework)).unwrap();
        seq.register(logging(&log, "y", Phase::Framework)).unwrap();
        seq.register(logging(&log, "between", Phase::Framework).after("x").before("y"))
            .unwrap();

        assert_eq!(names(&seq), vec!["x", "between", "y"]);
    }

    #[test]
    fn before_preceding_after_is_unsatisfiable() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "x", Phase::Framework)).unwrap();
        seq.register(logging(&log, "y", Phase::Framework)).unwrap();

        let err = seq
            .register(logging(&log, "bad", Phase::Framework).after("y").before("x"))
            .unwrap_err();
        assert!(matches!(err, BootError::UnsatisfiableOrder { .. }));
        assert!(!seq.contains("bad"));
    }

    #[test]
    fn unknown_anchor_rejected() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        let err = seq
            .insert_after("missing", logging(&log, "s", Phase::Framework))
            .unwrap_err();
        assert!(matches!(err, BootError::UnknownAnchor { ref anchor, .. } if anchor == "missing"));
    }

    #[test]
    fn cross_phase_anchor_rejected() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "env", Phase::BeforeConfig)).unwrap();

        let err = seq
            .insert_after("env", logging(&log, "late", Phase::Framework))
            .unwrap_err();
        assert!(matches!(
            err,
            BootError::PhaseMismatch {
                step_phase: Phase::Framework,
                anchor_phase: Phase::BeforeConfig,
                ..
            }
        ));
    }

    #[test]
    fn duplicate_name_rejected_across_phases() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "dup", Phase::Framework)).unwrap();
        let err = seq
            .register(logging(&log, "dup", Phase::BeforeReady))
            .unwrap_err();
        assert!(matches!(err, BootError::DuplicateStep { .. }));
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn failing_step_aborts_and_latches() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.register(logging(&log, "ok", Phase::BeforeConfig)).unwrap();
        seq.register(InitializerStep::new("boom", Phase::Framework, |_| {
            anyhow::bail!("database unreachable")
        }))
        .unwrap();
        seq.register(logging(&log, "never", Phase::AfterConfig)).unwrap();

        let err = seq.run_all(&mut context()).unwrap_err();
        match &err {
            BootError::StepFailed { step, phase, source } => {
                assert_eq!(step, "boom");
                assert_eq!(*phase, Phase::Framework);
                assert_eq!(source.to_string(), "database unreachable");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(*log.lock(), vec!["ok"]);
        assert_eq!(seq.guard().state(), LifecycleState::Initializing);
        assert!(matches!(
            seq.run_all(&mut context()),
            Err(BootError::DoubleInitialization { .. })
        ));
    }

    #[test]
    fn registration_sealed_after_run() {
        let log = Log::default();
        let mut seq = Sequencer::new();
        seq.run_all(&mut context()).unwrap();
        let err = seq
            .register(logging(&log, "late", Phase::Framework))
            .unwrap_err();
        assert!(matches!(err, BootError::Sealed { .. }));
    }

    #[test]
    fn before_config_settings_visible_to_framework() {
        let mut seq = Sequencer::new();
        seq.register(InitializerStep::new("configure", Phase::BeforeConfig, |cx| {
            cx.settings.set("cache_artifacts", true)?;
            Ok(())
        }))
        .unwrap();
        seq.register(InitializerStep::new("read", Phase::Framework, |cx| {
            let cached: Option<bool> = cx.settings.get("cache_artifacts")?;
            anyhow::ensure!(cached == Some(true), "configuration not visible");
            cx.settings.set("framework_saw", true)?;
            Ok(())
        }))
        .unwrap();

        let mut cx = context();
        seq.run_all(&mut cx).unwrap();
        assert_eq!(cx.settings.get::<bool>("framework_saw").unwrap(), Some(true));
    }

    fn phase_strategy() -> impl Strategy<Value = Phase> {
        prop::sample::select(Phase::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn prop_execution_is_phase_sorted_and_stable(phases in prop::collection::vec(phase_strategy(), 0..24)) {
            let log = Log::default();
            let mut seq = Sequencer::new();
            for (i, phase) in phases.iter().enumerate() {
                seq.register(logging(&log, &format!("s{i}"), *phase)).unwrap();
            }

            let report = seq.run_all(&mut context()).unwrap();

            let mut expected: Vec<(Phase, usize)> =
                phases.iter().copied().enumerate().map(|(i, p)| (p, i)).collect();
            expected.sort();
            let expected: Vec<String> = expected.into_iter().map(|(_, i)| format!("s{i}")).collect();
            prop_assert_eq!(report.executed, expected);
        }
    }
}
