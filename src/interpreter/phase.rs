//! Interaction phase tracking.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

/// Lifecycle of one question/answer round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// Microphone open, waiting for an utterance.
    Listening,
    /// Transcript received, building the reply.
    Processing,
    /// Reply playing through the speaker.
    Speaking,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Listening => write!(f, "listening"),
            Phase::Processing => write!(f, "processing"),
            Phase::Speaking => write!(f, "speaking"),
        }
    }
}

/// Shared phase handle; transitions are logged.
#[derive(Clone, Default)]
pub struct PhaseTracker {
    phase: Arc<Mutex<Phase>>,
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, next: Phase) {
        let mut phase = self.phase.lock();
        if *phase != next {
            debug!("Phase: {} -> {}", *phase, next);
            *phase = next;
        }
    }

    pub fn get(&self) -> Phase {
        *self.phase.lock()
    }

    /// Busy check used to drop answers while one is still playing.
    pub fn is_speaking(&self) -> bool {
        self.get() == Phase::Speaking
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_idle_and_follows_transitions() {
        let phases = PhaseTracker::new();
        assert_eq!(phases.get(), Phase::Idle);
        assert!(!phases.is_speaking());

        phases.set(Phase::Listening);
        phases.set(Phase::Processing);
        phases.set(Phase::Speaking);
        assert!(phases.is_speaking());

        phases.set(Phase::Listening);
        assert_eq!(phases.get(), Phase::Listening);
    }

    #[test]
    fn clones_share_the_same_phase() {
        let phases = PhaseTracker::new();
        let view = phases.clone();
        phases.set(Phase::Speaking);
        assert!(view.is_speaking());
    }
}
