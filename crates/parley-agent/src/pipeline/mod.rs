//! Channel-agnostic request pipeline.
//!
//! One call to [`run_request`] drives a request through
//! `Requested → Generating → Formatting → Delivering → Done`, or into
//! `Failed`. Every failure is turned into a user-visible message here, so
//! nothing propagates to the messaging adapter.

pub mod delivery;
pub mod observe;
pub mod state;
pub mod transport;

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use parley_core::config::ParleyConfig;
use parley_core::types::{char_len, GenerationRequest, RequestId};
use parley_format::{DocumentHeader, ResponseFormatter};

use crate::provider::Generation;
use crate::runtime::AgentRuntime;

pub use observe::{RelayEvent, RelayObserver, TracingObserver};
pub use state::{FailureKind, Relay, RelayState};
pub use transport::{Transport, TransportError};

/// Generic reply when the remote service fails. Details stay in the logs.
pub const GENERATION_FAILED_MESSAGE: &str =
    "\u{274c} Error processing your question. Please try again later.";

/// Best-effort notice after a delivery failure.
pub const DELIVERY_FAILED_MESSAGE: &str =
    "\u{26a0}\u{fe0f} Part of the answer could not be delivered.";

/// Everything the pipeline needs from its host.
///
/// Implemented by the application state in `parley-gateway`; defined here so
/// channel crates depend only on `parley-agent`.
pub trait RelayContext: Send + Sync {
    fn agent(&self) -> &AgentRuntime;
    fn formatter(&self) -> &ResponseFormatter;
    fn config(&self) -> &ParleyConfig;
    fn observer(&self) -> &dyn RelayObserver;
}

/// Which command a request came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Full answer, chunked or attached as needed.
    Ask,
    /// Short generation, always a single message.
    Quick,
}

impl Mode {
    pub fn command_name(&self) -> &'static str {
        match self {
            Mode::Ask => "ask",
            Mode::Quick => "quick",
        }
    }

    pub fn max_input(&self, config: &ParleyConfig) -> usize {
        match self {
            Mode::Ask => config.limits.ask_max_input,
            Mode::Quick => config.limits.quick_max_input,
        }
    }

    pub fn max_output_tokens(&self, config: &ParleyConfig) -> Option<u32> {
        match self {
            Mode::Ask => config.gemini.max_output_tokens,
            Mode::Quick => Some(config.limits.quick_max_output_tokens),
        }
    }
}

/// One inbound question.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub id: RequestId,
    pub mode: Mode,
    pub question: String,
    /// Display identity of the asker, used in logs and attachment headers.
    pub requester: String,
}

impl RelayRequest {
    pub fn new(mode: Mode, question: impl Into<String>, requester: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            mode,
            question: question.into(),
            requester: requester.into(),
        }
    }
}

/// Final state of a request and how many payloads reached the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub id: RequestId,
    pub state: RelayState,
    pub payloads_sent: usize,
}

/// Message shown when a question exceeds the mode's input bound.
pub fn too_long_message(max: usize) -> String {
    format!("\u{274c} Your question is too long. Maximum {max} characters.")
}

/// Drive one request to completion.
pub async fn run_request<C, T>(ctx: &C, transport: &T, request: RelayRequest) -> RelayOutcome
where
    C: RelayContext + ?Sized,
    T: Transport + ?Sized,
{
    let config = ctx.config();
    let observer = ctx.observer();
    let mut relay = Relay::new(request.id.clone());

    relay.advance(RelayState::Requested);
    observer.observe(&RelayEvent::Requested {
        id: &request.id,
        mode: request.mode,
        requester: &request.requester,
        chars: char_len(&request.question),
    });

    let max_input = request.mode.max_input(config);
    let gen_req = match GenerationRequest::validated(
        request.question.as_str(),
        max_input,
        request.mode.max_output_tokens(config),
    ) {
        Ok(r) => r,
        Err(e) => {
            debug!(request = %request.id, code = e.code(), error = %e, "question rejected");
            if let Err(send_err) = transport.send_text(&too_long_message(max_input)).await {
                warn!(request = %request.id, error = %send_err, "could not report validation error");
            }
            return fail(&mut relay, observer, FailureKind::Validation, &e.to_string(), 0);
        }
    };

    relay.advance(RelayState::Generating);
    if let Err(e) = transport.acknowledge().await {
        return fail(&mut relay, observer, FailureKind::Dispatch, &e.to_string(), 0);
    }

    let started = Instant::now();
    let result = match ctx.agent().generate(&gen_req).await {
        Generation::Ok(result) => result,
        Generation::Empty => {
            return generation_failed(&mut relay, ctx, transport, "empty response").await;
        }
        Generation::Failure(reason) => {
            return generation_failed(&mut relay, ctx, transport, &reason).await;
        }
    };
    observer.observe(&RelayEvent::Generated {
        id: &request.id,
        chars: result.char_count(),
        latency_ms: started.elapsed().as_millis() as u64,
    });

    relay.advance(RelayState::Formatting);
    let formatter = ctx.formatter();
    let plan = match request.mode {
        Mode::Ask => {
            let header = DocumentHeader::new(
                request.question.as_str(),
                request.requester.as_str(),
                request.mode.command_name(),
                chrono::Utc::now(),
            );
            formatter.plan(result.text(), &header)
        }
        Mode::Quick => formatter.plan_quick(result.text(), config.limits.quick_max_chars),
    }
    .with_reply_prefix(&config.delivery.reply_prefix, formatter.config().hard_limit);

    relay.advance(RelayState::Delivering);
    let delay = Duration::from_millis(config.delivery.inter_payload_delay_ms);
    match delivery::deliver(transport, &plan, delay).await {
        Ok(sent) => {
            relay.advance(RelayState::Done);
            observer.observe(&RelayEvent::Delivered {
                id: &request.id,
                strategy: plan.strategy,
                payloads: sent,
            });
            RelayOutcome {
                id: request.id,
                state: relay.state(),
                payloads_sent: sent,
            }
        }
        Err(e) => {
            if let Err(send_err) = transport.send_text(DELIVERY_FAILED_MESSAGE).await {
                warn!(request = %request.id, error = %send_err, "could not report delivery failure");
            }
            fail(&mut relay, observer, FailureKind::Dispatch, &e.to_string(), e.sent)
        }
    }
}

async fn generation_failed<C, T>(
    relay: &mut Relay,
    ctx: &C,
    transport: &T,
    reason: &str,
) -> RelayOutcome
where
    C: RelayContext + ?Sized,
    T: Transport + ?Sized,
{
    let sent = match transport.send_text(GENERATION_FAILED_MESSAGE).await {
        Ok(()) => 1,
        Err(e) => {
            warn!(request = %relay.id(), error = %e, "could not report generation error");
            0
        }
    };
    fail(relay, ctx.observer(), FailureKind::Generation, reason, sent)
}

fn fail(
    relay: &mut Relay,
    observer: &dyn RelayObserver,
    kind: FailureKind,
    reason: &str,
    payloads_sent: usize,
) -> RelayOutcome {
    relay.advance(RelayState::Failed(kind));
    observer.observe(&RelayEvent::Failed {
        id: relay.id(),
        kind,
        reason,
    });
    RelayOutcome {
        id: relay.id().clone(),
        state: relay.state(),
        payloads_sent,
    }
}

/// Text for the `stats` command.
pub fn stats_message<C: RelayContext + ?Sized>(ctx: &C) -> String {
    let agent = ctx.agent();
    format!(
        "\u{1f4ca} Total requests: {}\n\u{1f9e0} Model: {} ({})\n\u{1f4ac} Transcript: {} turns",
        agent.tally().get(),
        agent.model(),
        agent.provider_name(),
        agent.transcript_len(),
    )
}

/// Reset the shared transcript; returns the text for the `clear` command.
pub fn clear_message<C: RelayContext + ?Sized>(ctx: &C) -> String {
    let removed = ctx.agent().clear();
    format!("\u{1f9f9} Conversation cleared ({removed} turns removed).")
}
