//! Lifecycle events emitted by the relay pipeline.

use tracing::{info, warn};

use parley_core::types::{RequestId, Strategy};

use super::state::FailureKind;
use super::Mode;

#[derive(Debug, Clone)]
pub enum RelayEvent<'a> {
    Requested {
        id: &'a RequestId,
        mode: Mode,
        requester: &'a str,
        chars: usize,
    },
    Generated {
        id: &'a RequestId,
        chars: usize,
        latency_ms: u64,
    },
    Delivered {
        id: &'a RequestId,
        strategy: Strategy,
        payloads: usize,
    },
    Failed {
        id: &'a RequestId,
        kind: FailureKind,
        reason: &'a str,
    },
}

/// Receives [`RelayEvent`]s. Must not block.
pub trait RelayObserver: Send + Sync {
    fn observe(&self, event: &RelayEvent<'_>);
}

/// Default observer: structured `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RelayObserver for TracingObserver {
    fn observe(&self, event: &RelayEvent<'_>) {
        match event {
            RelayEvent::Requested {
                id,
                mode,
                requester,
                chars,
            } => {
                info!(request = %id, command = mode.command_name(), requester, chars, "request received")
            }
            RelayEvent::Generated {
                id,
                chars,
                latency_ms,
            } => info!(request = %id, chars, latency_ms, "answer generated"),
            RelayEvent::Delivered {
                id,
                strategy,
                payloads,
            } => info!(request = %id, strategy = ?strategy, payloads, "reply delivered"),
            RelayEvent::Failed { id, kind, reason } => {
                warn!(request = %id, kind = kind.as_str(), reason, "request failed")
            }
        }
    }
}
