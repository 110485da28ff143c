//! Greedy sentence-then-word chunking.
//!
//! Text is cut into sentence-like units that tile the input (each unit keeps
//! its trailing whitespace), units are packed greedily into chunks of at most
//! `limit` characters, and units that are too large on their own are packed
//! word by word. A final pass force-slices anything still over the limit, so
//! the output never contains a chunk longer than `limit`.
//!
//! Only whitespace is ever discarded: runs between pieces collapse to a
//! space, a line break or a paragraph break, and chunk edges are trimmed.

use parley_core::types::char_len;

/// Split `text` into sentence-like units.
///
/// A unit ends after `.`, `!` or `?` followed by whitespace, or after a
/// newline, and absorbs the whitespace run that follows. Concatenating the
/// units yields `text` exactly.
pub fn sentence_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        let boundary = match c {
            '\n' => true,
            '.' | '!' | '?' => chars.peek().is_some_and(|&(_, next)| next.is_whitespace()),
            _ => false,
        };
        if !boundary {
            continue;
        }

        let mut end = i + c.len_utf8();
        while let Some(&(j, w)) = chars.peek() {
            if !w.is_whitespace() {
                break;
            }
            end = j + w.len_utf8();
            chars.next();
        }
        units.push(&text[start..end]);
        start = end;
    }

    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

/// Split `text` into words, each carrying the whitespace that follows it.
pub fn word_units(text: &str) -> Vec<&str> {
    let mut units = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !c.is_whitespace() {
            continue;
        }
        let next_is_word = chars.peek().is_some_and(|&(_, next)| !next.is_whitespace());
        if next_is_word {
            let end = i + c.len_utf8();
            units.push(&text[start..end]);
            start = end;
        }
    }

    if start < text.len() {
        units.push(&text[start..]);
    }
    units
}

/// Chunk `text` so that every chunk holds at most `limit` characters.
///
/// Empty and whitespace-only chunks are never returned; an empty or blank
/// input yields no chunks at all.
pub fn chunk_text(text: &str, limit: usize, lookback: usize) -> Vec<String> {
    let limit = limit.max(1);
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if char_len(text) <= limit {
        return vec![text.to_string()];
    }

    let mut packer = Packer::new(limit);
    for unit in sentence_units(text) {
        packer.push_unit(unit);
    }

    packer
        .finish()
        .into_iter()
        .flat_map(|chunk| enforce_limit(chunk, limit, lookback))
        .filter(|chunk| !chunk.trim().is_empty())
        .collect()
}

struct Packer {
    limit: usize,
    chunks: Vec<String>,
    buf: String,
    buf_len: usize,
    /// Collapsed form of the whitespace that followed the last piece.
    gap: &'static str,
}

impl Packer {
    fn new(limit: usize) -> Self {
        Self {
            limit,
            chunks: Vec::new(),
            buf: String::new(),
            buf_len: 0,
            gap: "",
        }
    }

    fn push_unit(&mut self, unit: &str) {
        if char_len(unit.trim_end()) > self.limit {
            // Oversized sentence: same greedy rule, one word at a time.
            for word in word_units(unit) {
                self.append(word);
            }
        } else {
            self.append(unit);
        }
    }

    /// Add `piece` without its trailing whitespace, joined to the buffer by
    /// the collapsed gap left by the previous piece.
    fn append(&mut self, piece: &str) {
        let content = piece.trim_end();
        if content.is_empty() {
            return;
        }
        let len = char_len(content);

        if self.buf_len > 0 && self.buf_len + char_len(self.gap) + len > self.limit {
            self.seal();
        }
        if self.buf_len > 0 {
            self.buf.push_str(self.gap);
            self.buf_len += char_len(self.gap);
        }
        self.buf.push_str(content);
        self.buf_len += len;
        self.gap = collapse(&piece[content.len()..]);
    }

    fn seal(&mut self) {
        let sealed = self.buf.trim();
        if !sealed.is_empty() {
            self.chunks.push(sealed.to_string());
        }
        self.buf.clear();
        self.buf_len = 0;
    }

    fn finish(mut self) -> Vec<String> {
        self.seal();
        self.chunks
    }
}

/// A whitespace run reduced to what it means for layout: a paragraph break,
/// a line break, or a single space.
fn collapse(ws: &str) -> &'static str {
    match ws.matches('\n').count() {
        _ if ws.is_empty() => "",
        0 => " ",
        1 => "\n",
        _ => "\n\n",
    }
}

/// Slice `chunk` into pieces of at most `limit` characters.
///
/// Each cut lands on the last sentence, word or line boundary inside the
/// final `lookback` characters of the window, or exactly at `limit` when the
/// window has none.
pub fn enforce_limit(chunk: String, limit: usize, lookback: usize) -> Vec<String> {
    let limit = limit.max(1);
    if char_len(&chunk) <= limit {
        return vec![chunk];
    }

    let mut out = Vec::new();
    let mut rest = chunk.as_str();

    while char_len(rest) > limit {
        let window_end = byte_offset(rest, limit);
        let cut = boundary_before(&rest[..window_end], limit, lookback).unwrap_or(window_end);

        let head = rest[..cut].trim_end();
        if !head.is_empty() {
            out.push(head.to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        out.push(rest.to_string());
    }
    out
}

/// Byte offset of the `n`th character, or the string length.
pub(crate) fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len())
}

/// Last cut position (byte offset, > 0) in the trailing `lookback` characters
/// of `window` that follows whitespace or a sentence terminator.
fn boundary_before(window: &str, window_chars: usize, lookback: usize) -> Option<usize> {
    let floor = window_chars.saturating_sub(lookback);
    window
        .char_indices()
        .enumerate()
        .skip(floor)
        .filter(|&(_, (_, c))| c.is_whitespace() || matches!(c, '.' | '!' | '?'))
        .map(|(_, (i, c))| i + c.len_utf8())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn squash(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    #[test]
    fn sentence_units_tile_the_input() {
        let text = "One. Two! Three?\nFour\n\nfive. six";
        let units = sentence_units(text);
        assert_eq!(units.concat(), text);
        assert_eq!(
            units,
            vec!["One. ", "Two! ", "Three?\n", "Four\n\n", "five. ", "six"]
        );
    }

    #[test]
    fn decimal_points_do_not_split() {
        let units = sentence_units("Pi is 3.14 roughly. Yes.");
        assert_eq!(units, vec!["Pi is 3.14 roughly. ", "Yes."]);
    }

    #[test]
    fn word_units_tile_the_input() {
        let text = "alpha  beta\tgamma ";
        let units = word_units(text);
        assert_eq!(units.concat(), text);
        assert_eq!(units, vec!["alpha  ", "beta\t", "gamma "]);
    }

    #[test]
    fn short_text_is_single_chunk() {
        assert_eq!(chunk_text("Hello, world!", 2000, 100), vec!["Hello, world!"]);
    }

    #[test]
    fn blank_text_yields_nothing() {
        assert!(chunk_text("", 2000, 100).is_empty());
        assert!(chunk_text(" \n\t ", 2000, 100).is_empty());
    }

    #[test]
    fn sentences_are_not_broken() {
        let text = "Aaaa aaaa. Bbbb bbbb. Cccc cccc.";
        let chunks = chunk_text(text, 22, 100);
        assert_eq!(chunks, vec!["Aaaa aaaa. Bbbb bbbb.", "Cccc cccc."]);
    }

    #[test]
    fn oversized_sentence_packs_by_word() {
        let sentence = format!("{}.", "word ".repeat(30).trim_end());
        let chunks = chunk_text(&sentence, 50, 10);
        assert!(chunks.len() >= 3);
        for c in &chunks {
            assert!(char_len(c) <= 50);
            assert!(!c.starts_with(' ') && !c.ends_with(' '));
            // Words stay whole.
            assert!(c.split(' ').all(|w| w.trim_end_matches('.') == "word"));
        }
        assert_eq!(squash(&chunks.concat()), squash(&sentence));
    }

    #[test]
    fn trailing_whitespace_does_not_make_a_sentence_oversized() {
        let text = format!("Intro line.{}Next one.", " ".repeat(50));
        assert_eq!(chunk_text(&text, 20, 5), vec!["Intro line.", "Next one."]);
    }

    #[test]
    fn blank_line_runs_collapse_to_a_paragraph_break() {
        let text = format!("Intro line.{}Closing line.", "\n".repeat(3000));
        assert_eq!(chunk_text(&text, 2000, 100), vec!["Intro line.\n\nClosing line."]);
    }

    #[test]
    fn single_newline_is_kept_at_join() {
        let text = format!("First line here.{}\nSecond line here.", " ".repeat(30));
        let chunks = chunk_text(&text, 40, 5);
        assert_eq!(chunks, vec!["First line here.\nSecond line here."]);
    }

    #[test]
    fn enforce_limit_prefers_boundary_in_lookback() {
        let text = format!("{} {}", "a".repeat(15), "b".repeat(10));
        let pieces = enforce_limit(text, 20, 10);
        assert_eq!(pieces, vec!["a".repeat(15), "b".repeat(10)]);
    }

    #[test]
    fn enforce_limit_slices_exactly_without_boundary() {
        let pieces = enforce_limit("x".repeat(45), 20, 5);
        assert_eq!(pieces.iter().map(|p| p.len()).collect::<Vec<_>>(), vec![20, 20, 5]);
    }

    #[test]
    fn multibyte_text_never_panics() {
        let text = "é".repeat(4100);
        let chunks = chunk_text(&text, 2000, 100);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| char_len(c) <= 2000));
        assert_eq!(chunks.concat(), text);
    }
}
