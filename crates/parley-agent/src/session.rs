//! In-memory conversation transcript.
//!
//! One session is shared by every caller of the process; there is no
//! per-user isolation and nothing is persisted across restarts. The
//! runtime keeps it bounded with [`ConversationSession::trim_to`] so the
//! history sent upstream cannot outgrow the model's context window.

use crate::provider::Turn;

#[derive(Debug, Clone, Default)]
pub struct ConversationSession {
    turns: Vec<Turn>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Append a completed question/answer pair.
    pub fn record_exchange(&mut self, prompt: &str, answer: &str) {
        self.turns.push(Turn::user(prompt));
        self.turns.push(Turn::model(answer));
    }

    /// Drop the oldest exchanges until at most `max_turns` turns remain.
    /// Whole exchanges go together, so the history still opens with a user
    /// turn. Returns how many turns were dropped.
    pub fn trim_to(&mut self, max_turns: usize) -> usize {
        let keep = max_turns - max_turns % 2;
        let excess = self.turns.len().saturating_sub(keep);
        self.turns.drain(..excess);
        excess
    }
}
