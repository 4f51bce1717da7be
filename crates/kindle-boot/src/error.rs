//! Error types for boot sequencing

use crate::context::SettingsError;
use crate::guard::LifecycleState;
use crate::step::Phase;

/// Boot error type
#[derive(Debug, thiserror::Error)]
pub enum BootError {
    /// A full initialization was requested more than once
    #[error("application already {state}; initialization runs once per process")]
    DoubleInitialization {
        /// State observed when the second run was refused
        state: LifecycleState,
    },

    /// Lifecycle transition not in the state table
    #[error("illegal lifecycle transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: LifecycleState,
        /// Requested state
        to: LifecycleState,
    },

    /// Step name already registered
    #[error("initializer '{step}' is already registered")]
    DuplicateStep {
        /// Name registered twice
        step: String,
    },

    /// Splice anchor does not exist
    #[error("initializer '{step}' references unknown anchor '{anchor}'")]
    UnknownAnchor {
        /// Step being registered
        step: String,
        /// Anchor that is not registered
        anchor: String,
    },

    /// Splice anchor lives in another phase
    #[error(
        "initializer '{step}' ({step_phase}) cannot be placed next to '{anchor}' ({anchor_phase})"
    )]
    PhaseMismatch {
        /// Step being registered
        step: String,
        /// Phase of that step
        step_phase: Phase,
        /// Anchor it referenced
        anchor: String,
        /// Phase the anchor runs in
        anchor_phase: Phase,
    },

    /// Both `after` and `before` given but `before` precedes `after`
    #[error("initializer '{step}' cannot run after '{after}' and before '{before}'")]
    UnsatisfiableOrder {
        /// Step being registered
        step: String,
        /// Anchor it must follow
        after: String,
        /// Anchor it must precede
        before: String,
    },

    /// Registration attempted after the sequence started
    #[error("initializer '{step}' registered after initialization started")]
    Sealed {
        /// Step that came too late
        step: String,
    },

    /// A step action failed; the sequence was aborted
    #[error("initializer '{step}' failed during {phase}: {source}")]
    StepFailed {
        /// Failing step
        step: String,
        /// Phase it ran in
        phase: Phase,
        /// Error returned by the step
        #[source]
        source: anyhow::Error,
    },

    /// Settings could not be read or merged
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
}

impl BootError {
    /// Check if error came from a failing step action
    #[inline]
    #[must_use]
    pub fn is_step_failure(&self) -> bool {
        matches!(self, Self::StepFailed { .. })
    }

    /// Name of the step involved, if any
    #[must_use]
    pub fn step(&self) -> Option<&str> {
        match self {
            Self::DuplicateStep { step }
            | Self::UnknownAnchor { step, .. }
            | Self::PhaseMismatch { step, .. }
            | Self::UnsatisfiableOrder { step, .. }
            | Self::Sealed { step }
            | Self::StepFailed { step, .. } => Some(step),
            _ => None,
        }
    }
}

/// Result alias for boot operations
pub type BootResult<T> = Result<T, BootError>;
