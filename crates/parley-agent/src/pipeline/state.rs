//! Request lifecycle state machine.

use std::fmt;

use tracing::{debug, warn};

use parley_core::types::RequestId;

/// Why a request ended in [`RelayState::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Input rejected before any remote call.
    Validation,
    /// Remote call failed or returned nothing.
    Generation,
    /// The transport refused a payload.
    Dispatch,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Generation => "generation",
            FailureKind::Dispatch => "dispatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    Idle,
    Requested,
    Generating,
    Formatting,
    Delivering,
    Done,
    Failed(FailureKind),
}

impl RelayState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(&self, next: RelayState) -> bool {
        use RelayState::*;
        matches!(
            (self, next),
            (Idle, Requested)
                | (Requested, Generating)
                | (Requested, Failed(FailureKind::Validation))
                | (Generating, Formatting)
                | (Generating, Failed(FailureKind::Generation))
                | (Generating, Failed(FailureKind::Dispatch))
                | (Formatting, Delivering)
                | (Delivering, Done)
                | (Delivering, Failed(FailureKind::Dispatch))
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayState::Done | RelayState::Failed(_))
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::Idle => write!(f, "idle"),
            RelayState::Requested => write!(f, "requested"),
            RelayState::Generating => write!(f, "generating"),
            RelayState::Formatting => write!(f, "formatting"),
            RelayState::Delivering => write!(f, "delivering"),
            RelayState::Done => write!(f, "done"),
            RelayState::Failed(kind) => write!(f, "failed({})", kind.as_str()),
        }
    }
}

/// Tracks the state of one request.
#[derive(Debug)]
pub struct Relay {
    id: RequestId,
    state: RelayState,
}

impl Relay {
    pub fn new(id: RequestId) -> Self {
        Self {
            id,
            state: RelayState::Idle,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    pub fn advance(&mut self, next: RelayState) {
        if !self.state.can_advance_to(next) {
            warn!(request = %self.id, from = %self.state, to = %next, "illegal relay transition");
            debug_assert!(false, "illegal relay transition {} -> {}", self.state, next);
        }
        debug!(request = %self.id, from = %self.state, to = %next, "relay transition");
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_legal() {
        let mut relay = Relay::new(RequestId::new());
        for next in [
            RelayState::Requested,
            RelayState::Generating,
            RelayState::Formatting,
            RelayState::Delivering,
            RelayState::Done,
        ] {
            relay.advance(next);
        }
        assert_eq!(relay.state(), RelayState::Done);
        assert!(relay.state().is_terminal());
    }

    #[test]
    fn formatting_cannot_fail() {
        assert!(!RelayState::Formatting.can_advance_to(RelayState::Failed(FailureKind::Dispatch)));
        assert!(!RelayState::Formatting.can_advance_to(RelayState::Failed(FailureKind::Generation)));
    }

    #[test]
    fn validation_failure_only_from_requested() {
        let failed = RelayState::Failed(FailureKind::Validation);
        assert!(RelayState::Requested.can_advance_to(failed));
        assert!(!RelayState::Generating.can_advance_to(failed));
        assert!(!RelayState::Done.can_advance_to(RelayState::Requested));
    }
}
