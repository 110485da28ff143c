use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::{ParleyError, Result};

/// Length in characters (Unicode scalar values), the unit every limit uses.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Unique identifier for one request cycle (UUIDv7, time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A prompt that already passed the length check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Build a request, rejecting prompts longer than `max_len` characters.
    pub fn validated(
        prompt: impl Into<String>,
        max_len: usize,
        max_output_tokens: Option<u32>,
    ) -> Result<Self> {
        let prompt = prompt.into();
        let len = char_len(&prompt);
        if len > max_len {
            return Err(ParleyError::Validation { len, max: max_len });
        }
        Ok(Self {
            prompt,
            max_output_tokens,
        })
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }
}

/// Text returned by the remote service for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    text: String,
}

impl GenerationResult {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        char_len(&self.text)
    }
}

/// One unit of outbound delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Payload {
    /// Never longer than the channel hard limit.
    TextChunk { content: String },
    FileAttachment {
        filename: String,
        body: String,
        caption: String,
    },
    /// Informational tail message, at most one per plan.
    Notice { content: String },
}

impl Payload {
    pub fn text(content: impl Into<String>) -> Self {
        Payload::TextChunk {
            content: content.into(),
        }
    }

    pub fn notice(content: impl Into<String>) -> Self {
        Payload::Notice {
            content: content.into(),
        }
    }
}

/// How the formatter chose to deliver an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Single,
    Chunked,
    File,
}

/// Ordered payloads for one reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryPlan {
    pub strategy: Strategy,
    pub payloads: Vec<Payload>,
}

impl DeliveryPlan {
    pub fn new(strategy: Strategy, payloads: Vec<Payload>) -> Self {
        Self { strategy, payloads }
    }

    pub fn text_chunks(&self) -> impl Iterator<Item = &str> {
        self.payloads.iter().filter_map(|p| match p {
            Payload::TextChunk { content } => Some(content.as_str()),
            _ => None,
        })
    }

    pub fn has_notice(&self) -> bool {
        self.payloads
            .iter()
            .any(|p| matches!(p, Payload::Notice { .. }))
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Prefix the text of a single-message plan when the result still fits.
    pub fn with_reply_prefix(mut self, prefix: &str, limit: usize) -> Self {
        if self.strategy != Strategy::Single || prefix.is_empty() {
            return self;
        }
        if let [Payload::TextChunk { content }] = self.payloads.as_mut_slice() {
            if char_len(prefix) + char_len(content) <= limit {
                content.insert_str(0, prefix);
            }
        }
        self
    }
}

/// Process-lifetime request counter. Reset only by restarting.
#[derive(Debug, Default)]
pub struct RunningTally(AtomicU64);

impl RunningTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one request; returns the new total.
    pub fn increment(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_counts_characters_not_bytes() {
        // 500 two-byte characters are 1000 bytes but still within a 500-char bound.
        let prompt = "ñ".repeat(500);
        assert!(GenerationRequest::validated(prompt, 500, None).is_ok());

        let err = GenerationRequest::validated("a".repeat(501), 500, None).unwrap_err();
        assert!(matches!(err, ParleyError::Validation { len: 501, max: 500 }));
    }

    #[test]
    fn result_counts_chars() {
        let r = GenerationResult::new("héllo");
        assert_eq!(r.char_count(), 5);
    }

    #[test]
    fn reply_prefix_only_applies_to_fitting_single_messages() {
        let plan = DeliveryPlan::new(Strategy::Single, vec![Payload::text("hi")]);
        let plan = plan.with_reply_prefix("> ", 10);
        assert_eq!(plan.text_chunks().collect::<Vec<_>>(), vec!["> hi"]);

        let full = "x".repeat(10);
        let plan = DeliveryPlan::new(Strategy::Single, vec![Payload::text(full.clone())]);
        let plan = plan.with_reply_prefix("> ", 10);
        assert_eq!(plan.text_chunks().collect::<Vec<_>>(), vec![full.as_str()]);

        let plan = DeliveryPlan::new(
            Strategy::Chunked,
            vec![Payload::text("a"), Payload::text("b")],
        );
        let plan = plan.with_reply_prefix("> ", 10);
        assert_eq!(plan.text_chunks().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn tally_is_monotonic() {
        let tally = RunningTally::new();
        assert_eq!(tally.get(), 0);
        assert_eq!(tally.increment(), 1);
        assert_eq!(tally.increment(), 2);
        assert_eq!(tally.get(), 2);
    }
}
