//! Initializer steps and phases

use crate::context::BootContext;
use std::fmt::{self, Debug, Display, Formatter};

/// Boot phase; steps run phase by phase in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    /// Environment and configuration loading
    BeforeConfig,
    /// Framework bootstrap; configuration is complete from here on
    Framework,
    /// Application setup that needs the framework
    AfterConfig,
    /// Last steps before the first unit of work
    BeforeReady,
}

impl Phase {
    /// All phases in execution order
    pub const ALL: [Phase; 4] = [
        Phase::BeforeConfig,
        Phase::Framework,
        Phase::AfterConfig,
        Phase::BeforeReady,
    ];

    /// Position in execution order
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Snake-case label
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BeforeConfig => "before_config",
            Self::Framework => "framework",
            Self::AfterConfig => "after_config",
            Self::BeforeReady => "before_ready",
        }
    }
}

impl Display for Phase {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Step body
pub type StepAction = dyn FnOnce(&mut BootContext) -> anyhow::Result<()> + Send;

/// Named unit of bootstrap work
pub struct InitializerStep {
    pub(crate) name: String,
    pub(crate) phase: Phase,
    pub(crate) action: Option<Box<StepAction>>,
    pub(crate) after: Option<String>,
    pub(crate) before: Option<String>,
}

impl InitializerStep {
    /// Create step
    pub fn new<F>(name: impl Into<String>, phase: Phase, action: F) -> Self
    where
        F: FnOnce(&mut BootContext) -> anyhow::Result<()> + Send + 'static,
    {
        Self {
            name: name.into(),
            phase,
            action: Some(Box::new(action)),
            after: None,
            before: None,
        }
    }

    /// Run directly after `anchor`
    #[must_use]
    pub fn after(mut self, anchor: impl Into<String>) -> Self {
        self.after = Some(anchor.into());
        self
    }

    /// Run directly before `anchor`
    #[must_use]
    pub fn before(mut self, anchor: impl Into<String>) -> Self {
        self.before = Some(anchor.into());
        self
    }

    /// Step name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Step phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Anchor this step follows
    #[inline]
    #[must_use]
    pub fn after_anchor(&self) -> Option<&str> {
        self.after.as_deref()
    }

    /// Anchor this step precedes
    #[inline]
    #[must_use]
    pub fn before_anchor(&self) -> Option<&str> {
        self.before.as_deref()
    }
}

impl Debug for InitializerStep {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitializerStep")
            .field("name", &self.name)
            .field("phase", &self.phase)
            .field("after", &self.after)
            .field("before", &self.before)
            .field("ran", &self.action.is_none())
            .finish_non_exhaustive()
    }
}
