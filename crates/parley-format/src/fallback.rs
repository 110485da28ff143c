//! Decides whether an answer goes out as chat messages or as a file.
//!
//! Triggers are checked in order and the first match wins:
//! absolute length ceiling, structural density, then the size of the chunk
//! plan itself.

use parley_core::config::FormatConfig;
use parley_core::types::char_len;

use crate::chunk::chunk_text;

/// Why an answer was routed to a file attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileReason {
    TooLong { chars: usize },
    Dense(Density),
    TooManyChunks { chunks: usize, chars: usize },
}

/// Outcome of the routing decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    File(FileReason),
    Chunks(Vec<String>),
}

/// Line-level structure counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Density {
    /// Lines whose last visible character is `.`, `!` or `?`.
    pub line_terminators: usize,
    /// Lines that start with a bullet or an ordinal (`- `, `* `, `• `, `3.`, `3)`).
    pub list_markers: usize,
}

impl Density {
    pub fn measure(text: &str) -> Self {
        let mut density = Density::default();
        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.ends_with(['.', '!', '?']) {
                density.line_terminators += 1;
            }
            if is_list_item(trimmed) {
                density.list_markers += 1;
            }
        }
        density
    }

    fn exceeds(&self, cfg: &FormatConfig) -> bool {
        self.line_terminators > cfg.max_line_terminators || self.list_markers > cfg.max_list_markers
    }
}

fn is_list_item(line: &str) -> bool {
    if ["- ", "* ", "+ ", "\u{2022} "]
        .iter()
        .any(|marker| line.starts_with(marker))
    {
        return true;
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    digits > 0 && digits <= 3 && matches!(line[digits..].chars().next(), Some('.' | ')'))
}

/// Route `text` per the configured policy.
pub fn route(text: &str, cfg: &FormatConfig) -> Route {
    if !cfg.file_fallback {
        return Route::Chunks(chunk_text(text, cfg.hard_limit, cfg.lookback));
    }

    let chars = char_len(text);
    if chars > cfg.file_ceiling {
        return Route::File(FileReason::TooLong { chars });
    }

    let density = Density::measure(text);
    if density.exceeds(cfg) {
        return Route::File(FileReason::Dense(density));
    }

    let chunks = chunk_text(text, cfg.hard_limit, cfg.lookback);
    if chunks.len() > cfg.chunk_count_threshold && chars > cfg.size_floor {
        return Route::File(FileReason::TooManyChunks {
            chunks: chunks.len(),
            chars,
        });
    }
    Route::Chunks(chunks)
}
