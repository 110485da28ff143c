use std::sync::{PoisonError, RwLock};
use std::time::Instant;

use tracing::{debug, info, warn};

use parley_core::types::{GenerationRequest, RunningTally};

use crate::provider::{Generation, GenerationClient};
use crate::session::ConversationSession;

/// Central agent runtime: holds the generation client, the shared transcript
/// and the request counter. Shared across all command handlers via `Arc`.
pub struct AgentRuntime {
    client: Box<dyn GenerationClient>,
    session: RwLock<ConversationSession>,
    tally: RunningTally,
    max_turns: usize,
}

/// History bound used unless [`AgentRuntime::with_max_turns`] says otherwise.
const DEFAULT_MAX_TURNS: usize = 40;

impl AgentRuntime {
    pub fn new(client: Box<dyn GenerationClient>) -> Self {
        Self {
            client,
            session: RwLock::new(ConversationSession::new()),
            tally: RunningTally::new(),
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    /// Bound the shared transcript to `max_turns` turns.
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    pub fn model(&self) -> &str {
        self.client.model()
    }

    pub fn provider_name(&self) -> &str {
        self.client.name()
    }

    pub fn tally(&self) -> &RunningTally {
        &self.tally
    }

    /// Number of turns in the shared transcript.
    pub fn transcript_len(&self) -> usize {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Replace the transcript with a fresh session. Returns how many turns
    /// the old one held.
    pub fn clear(&self) -> usize {
        let mut guard = self.session.write().unwrap_or_else(PoisonError::into_inner);
        let old = std::mem::replace(&mut *guard, ConversationSession::new());
        old.len()
    }

    /// Run one remote call with the current transcript as context.
    ///
    /// Counts the request whatever the outcome. Successful exchanges are
    /// appended to the transcript; failed ones leave it untouched.
    pub async fn generate(&self, req: &GenerationRequest) -> Generation {
        let total = self.tally.increment();
        let snapshot = self
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let started = Instant::now();
        let generation = Generation::from(self.client.generate(&snapshot, req).await);
        let latency_ms = started.elapsed().as_millis() as u64;

        match &generation {
            Generation::Ok(result) => {
                info!(
                    provider = %self.client.name(),
                    model = %self.client.model(),
                    chars = result.char_count(),
                    latency_ms,
                    total_requests = total,
                    "generation complete"
                );
                let dropped = {
                    let mut session =
                        self.session.write().unwrap_or_else(PoisonError::into_inner);
                    session.record_exchange(req.prompt(), result.text());
                    session.trim_to(self.max_turns)
                };
                if dropped > 0 {
                    debug!(dropped, max_turns = self.max_turns, "transcript trimmed");
                }
            }
            Generation::Empty => {
                warn!(provider = %self.client.name(), latency_ms, "generation returned no text");
            }
            Generation::Failure(reason) => {
                warn!(provider = %self.client.name(), latency_ms, error = %reason, "generation failed");
            }
        }
        generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::provider::ProviderError;

    struct Echo;

    #[async_trait]
    impl GenerationClient for Echo {
        fn name(&self) -> &str {
            "echo"
        }
        fn model(&self) -> &str {
            "echo-1"
        }
        async fn generate(
            &self,
            session: &ConversationSession,
            req: &GenerationRequest,
        ) -> Result<String, ProviderError> {
            if req.prompt() == "fail" {
                return Err(ProviderError::Unavailable("down".into()));
            }
            Ok(format!("{} after {} turns", req.prompt(), session.len()))
        }
    }

    fn request(prompt: &str) -> GenerationRequest {
        GenerationRequest::validated(prompt, 500, None).unwrap()
    }

    #[tokio::test]
    async fn transcript_grows_with_successful_exchanges() {
        let runtime = AgentRuntime::new(Box::new(Echo));
        let first = runtime.generate(&request("one")).await;
        let second = runtime.generate(&request("two")).await;

        assert_eq!(first, Generation::Ok(parley_core::types::GenerationResult::new("one after 0 turns")));
        assert_eq!(second, Generation::Ok(parley_core::types::GenerationResult::new("two after 2 turns")));
        assert_eq!(runtime.transcript_len(), 4);
        assert_eq!(runtime.tally().get(), 2);
    }

    #[tokio::test]
    async fn failures_count_but_leave_transcript_alone() {
        let runtime = AgentRuntime::new(Box::new(Echo));
        let generation = runtime.generate(&request("fail")).await;
        assert!(matches!(generation, Generation::Failure(_)));
        assert_eq!(runtime.tally().get(), 1);
        assert_eq!(runtime.transcript_len(), 0);
    }

    #[tokio::test]
    async fn transcript_stays_within_turn_bound() {
        let runtime = AgentRuntime::new(Box::new(Echo)).with_max_turns(4);
        for prompt in ["one", "two", "three", "four"] {
            runtime.generate(&request(prompt)).await;
        }
        assert_eq!(runtime.transcript_len(), 4);

        // History sent upstream is capped too.
        let next = runtime.generate(&request("five")).await;
        assert_eq!(
            next,
            Generation::Ok(parley_core::types::GenerationResult::new("five after 4 turns"))
        );
        assert_eq!(runtime.tally().get(), 5);
    }

    #[tokio::test]
    async fn clear_replaces_session_but_keeps_tally() {
        let runtime = AgentRuntime::new(Box::new(Echo));
        runtime.generate(&request("one")).await;
        assert_eq!(runtime.clear(), 2);
        assert_eq!(runtime.transcript_len(), 0);
        assert_eq!(runtime.tally().get(), 1);
    }
}
