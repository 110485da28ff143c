//! Response-size adaptation: turns an arbitrarily long answer into the exact
//! payload sequence a size-capped chat transport can carry.
//!
//! Everything here is pure. The same text, header and configuration always
//! produce the same [`DeliveryPlan`].

pub mod chunk;
pub mod document;
pub mod fallback;
pub mod truncate;

use parley_core::config::FormatConfig;
use parley_core::types::{char_len, DeliveryPlan, Payload, Strategy};

pub use document::DocumentHeader;
pub use fallback::{FileReason, Route};
pub use truncate::TRUNCATION_MARKER;

/// Plans replies for one channel configuration.
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    cfg: FormatConfig,
}

impl ResponseFormatter {
    pub fn new(cfg: FormatConfig) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &FormatConfig {
        &self.cfg
    }

    /// Plan the full-length reply for `text`.
    pub fn plan(&self, text: &str, header: &DocumentHeader) -> DeliveryPlan {
        if text.trim().is_empty() {
            return DeliveryPlan::new(Strategy::Single, Vec::new());
        }
        match fallback::route(text, &self.cfg) {
            Route::File(reason) => self.file_plan(text, header, reason),
            Route::Chunks(chunks) => self.chunk_plan(text, chunks),
        }
    }

    /// Plan a quick reply: always a single text payload of at most `limit`
    /// characters plus the truncation marker.
    pub fn plan_quick(&self, text: &str, limit: usize) -> DeliveryPlan {
        let limit = limit.min(
            self.cfg
                .hard_limit
                .saturating_sub(char_len(TRUNCATION_MARKER)),
        );
        let text = truncate::truncate_quick(text.trim(), limit);
        let payloads = if text.is_empty() {
            Vec::new()
        } else {
            vec![Payload::text(text)]
        };
        DeliveryPlan::new(Strategy::Single, payloads)
    }

    fn chunk_plan(&self, text: &str, mut chunks: Vec<String>) -> DeliveryPlan {
        let produced = chunks.len();
        if produced == 0 {
            return DeliveryPlan::new(Strategy::Single, Vec::new());
        }
        let truncated = produced > self.cfg.max_chunks;
        chunks.truncate(self.cfg.max_chunks);

        // Chunking only ever drops whitespace, so compare visible characters.
        let kept: usize = chunks.iter().map(|c| visible_len(c)).sum();
        let original = visible_len(text);
        let lossy = (kept as f64) < (1.0 - self.cfg.notice_loss_ratio) * original as f64;

        let strategy = if produced <= 1 {
            Strategy::Single
        } else {
            Strategy::Chunked
        };
        let mut payloads: Vec<Payload> = chunks.into_iter().map(Payload::text).collect();

        if truncated || lossy {
            let shown = payloads.len();
            payloads.push(Payload::notice(format!(
                "\u{26a0}\u{fe0f} Response was shortened: showing {shown} of {produced} parts ({kept} of {original} characters)."
            )));
        }
        DeliveryPlan::new(strategy, payloads)
    }

    fn file_plan(&self, text: &str, header: &DocumentHeader, reason: FileReason) -> DeliveryPlan {
        let chars = char_len(text);
        let reason_text = match reason {
            FileReason::TooLong { chars } => {
                format!("The answer was too long for chat ({chars} characters), so it is attached as a file.")
            }
            FileReason::Dense(_) => {
                "The answer is heavily structured, so it is attached as a file to keep its formatting."
                    .to_string()
            }
            FileReason::TooManyChunks { chunks, .. } => {
                format!("The answer would need {chunks} messages, so it is attached as a file instead.")
            }
        };

        DeliveryPlan::new(
            Strategy::File,
            vec![
                Payload::FileAttachment {
                    filename: document::attachment_filename(&header.generated_at),
                    body: document::build_document(header, text),
                    caption: format!("\u{1f4c4} Full answer ({chars} characters)"),
                },
                Payload::notice(reason_text),
            ],
        )
    }
}

/// Characters that are not whitespace.
fn visible_len(s: &str) -> usize {
    s.chars().filter(|c| !c.is_whitespace()).count()
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(FormatConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header() -> DocumentHeader {
        DocumentHeader::new(
            "question",
            "tester",
            "ask",
            chrono::Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn short_answer_is_single() {
        let plan = ResponseFormatter::default().plan("Hi there.", &header());
        assert_eq!(plan.strategy, Strategy::Single);
        assert_eq!(plan.payloads, vec![Payload::text("Hi there.")]);
    }

    #[test]
    fn empty_answer_is_empty_plan() {
        let plan = ResponseFormatter::default().plan("   ", &header());
        assert!(plan.is_empty());
    }

    #[test]
    fn long_blank_answer_is_empty_plan() {
        let plan = ResponseFormatter::default().plan(&"\n".repeat(9000), &header());
        assert!(plan.is_empty());
        assert!(!plan.has_notice());
    }

    #[test]
    fn whitespace_runs_are_not_reported_as_loss() {
        let text = format!("Intro line.{}Closing line.", "\n".repeat(3000));
        let plan = ResponseFormatter::default().plan(&text, &header());
        assert_eq!(plan.strategy, Strategy::Single);
        assert_eq!(
            plan.payloads,
            vec![Payload::text("Intro line.\n\nClosing line.")]
        );
        assert!(!plan.has_notice());
    }

    #[test]
    fn chunk_cap_adds_notice() {
        let formatter = ResponseFormatter::new(FormatConfig {
            file_fallback: false,
            ..FormatConfig::default()
        });
        let text = "word ".repeat(2000);
        let plan = formatter.plan(&text, &header());
        assert_eq!(plan.strategy, Strategy::Chunked);
        assert_eq!(plan.text_chunks().count(), 4);
        assert!(plan.has_notice());
        match plan.payloads.last() {
            Some(Payload::Notice { content }) => assert!(content.contains("4 of 5 parts")),
            other => panic!("expected trailing notice, got {other:?}"),
        }
    }

    #[test]
    fn file_plan_is_attachment_then_notice() {
        let text = "x".repeat(9000);
        let plan = ResponseFormatter::default().plan(&text, &header());
        assert_eq!(plan.strategy, Strategy::File);
        assert_eq!(plan.payloads.len(), 2);
        assert!(matches!(plan.payloads[0], Payload::FileAttachment { .. }));
        assert!(matches!(plan.payloads[1], Payload::Notice { .. }));
    }

    #[test]
    fn quick_plan_respects_hard_limit() {
        let formatter = ResponseFormatter::default();
        let plan = formatter.plan_quick(&"y".repeat(5000), 5000);
        let chunks: Vec<_> = plan.text_chunks().collect();
        assert_eq!(chunks.len(), 1);
        assert!(char_len(chunks[0]) <= 2000);
    }
}
