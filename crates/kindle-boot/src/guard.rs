use crate::error::BootError;
use std::fmt::{self, Display, Formatter};
use std::sync::atomic::{AtomicU8, Ordering};

/// Process lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum LifecycleState {
    Uninitialized = 0,
    Initializing = 1,
    Initialized = 2,
}

impl LifecycleState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Uninitialized,
            1 => Self::Initializing,
            _ => Self::Initialized,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Initialized => "initialized",
        }
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validates a lifecycle transition.
///
/// There is no way back to `Uninitialized` and `Initialized` is terminal.
pub fn validate_transition(from: LifecycleState, to: LifecycleState) -> Result<(), BootError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(BootError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: LifecycleState) -> &'static [LifecycleState] {
    use LifecycleState::*;
    match from {
        Uninitialized => &[Initializing],
        Initializing => &[Initialized],
        Initialized => &[],
    }
}

/// One-shot initialization latch.
///
/// `begin` is a single compare-and-set, so two concurrent callers can never
/// both observe `Uninitialized`.
#[derive(Debug, Default)]
pub struct InitGuard {
    state: AtomicU8,
}

impl InitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> LifecycleState {
        LifecycleState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_initialized(&self) -> bool {
        self.state() == LifecycleState::Initialized
    }

    /// Claims the single initialization run.
    pub fn begin(&self) -> Result<(), BootError> {
        self.transition(LifecycleState::Uninitialized, LifecycleState::Initializing)
            .map_err(|state| BootError::DoubleInitialization { state })
    }

    /// Marks the claimed run as finished.
    pub fn complete(&self) -> Result<(), BootError> {
        self.transition(LifecycleState::Initializing, LifecycleState::Initialized)
            .map_err(|from| BootError::IllegalTransition {
                from,
                to: LifecycleState::Initialized,
            })
    }

    fn transition(&self, from: LifecycleState, to: LifecycleState) -> Result<(), LifecycleState> {
        debug_assert!(validate_transition(from, to).is_ok());
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(LifecycleState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn guard_walks_forward() {
        let guard = InitGuard::new();
        assert_eq!(guard.state(), LifecycleState::Uninitialized);
        assert!(!guard.is_initialized());

        guard.begin().unwrap();
        assert_eq!(guard.state(), LifecycleState::Initializing);

        guard.complete().unwrap();
        assert!(guard.is_initialized());
    }

    #[test]
    fn guard_rejects_second_begin() {
        let guard = InitGuard::new();
        guard.begin().unwrap();
        guard.complete().unwrap();

        let err = guard.begin().unwrap_err();
        assert!(matches!(
            err,
            BootError::DoubleInitialization {
                state: LifecycleState::Initialized
            }
        ));
    }

    #[test]
    fn guard_rejects_begin_while_initializing() {
        let guard = InitGuard::new();
        guard.begin().unwrap();
        assert!(matches!(
            guard.begin(),
            Err(BootError::DoubleInitialization {
                state: LifecycleState::Initializing
            })
        ));
    }

    #[test]
    fn guard_complete_requires_begin() {
        let guard = InitGuard::new();
        assert!(matches!(
            guard.complete(),
            Err(BootError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn transitions_table() {
        use LifecycleState::*;
        assert!(validate_transition(Uninitialized, Initializing).is_ok());
        assert!(validate_transition(Initializing, Initialized).is_ok());
        assert!(validate_transition(Initialized, Uninitialized).is_err());
        assert!(validate_transition(Uninitialized, Initialized).is_err());
        assert!(allowed_transitions(Initialized).is_empty());
    }

    #[test]
    fn concurrent_begin_admits_one() {
        let guard = Arc::new(InitGuard::new());
        let winners: usize = (0..16)
            .map(|_| {
                let guard = Arc::clone(&guard);
                thread::spawn(move || usize::from(guard.begin().is_ok()))
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap())
            .sum();
        assert_eq!(winners, 1);
    }
}
