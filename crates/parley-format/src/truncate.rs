//! Single-message truncation for quick answers.

use parley_core::types::char_len;

use crate::chunk::byte_offset;

/// Appended whenever text is cut.
pub const TRUNCATION_MARKER: &str = " [\u{2026}]";

/// Fraction of the limit, counted from its end, searched for a sentence end.
const SENTENCE_WINDOW: f64 = 0.3;

/// Bound `text` to a single message of `limit` characters plus the marker.
///
/// Text that fits is returned unchanged. Otherwise the cut is moved back to
/// the last `.`, `!` or `?` when that terminator lies in the final 30% of the
/// limit, and lands exactly on the limit when it doesn't.
pub fn truncate_quick(text: &str, limit: usize) -> String {
    if char_len(text) <= limit {
        return text.to_owned();
    }

    let window = &text[..byte_offset(text, limit)];
    let floor = limit - (limit as f64 * SENTENCE_WINDOW) as usize;

    let sentence_end = window
        .char_indices()
        .enumerate()
        .filter(|&(_, (_, c))| matches!(c, '.' | '!' | '?'))
        .last()
        .filter(|&(pos, _)| pos + 1 >= floor)
        .map(|(_, (i, c))| i + c.len_utf8());

    let kept = match sentence_end {
        Some(end) => &window[..end],
        None => window.trim_end(),
    };
    format!("{kept}{TRUNCATION_MARKER}")
}
