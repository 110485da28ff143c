//! Plain-text document sent when an answer is delivered as a file.

use chrono::{DateTime, Utc};

/// Who asked what, and when.
#[derive(Debug, Clone)]
pub struct DocumentHeader {
    pub question: String,
    pub requester: String,
    /// Command name the request came through, without the slash.
    pub command: String,
    pub generated_at: DateTime<Utc>,
}

impl DocumentHeader {
    pub fn new(
        question: impl Into<String>,
        requester: impl Into<String>,
        command: impl Into<String>,
        generated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question: question.into(),
            requester: requester.into(),
            command: command.into(),
            generated_at,
        }
    }
}

/// Attachment name derived from the generation time.
pub fn attachment_filename(at: &DateTime<Utc>) -> String {
    format!("answer-{}.txt", at.format("%Y%m%d-%H%M%S"))
}

/// Render the header followed by the complete answer, ASCII-normalized.
pub fn build_document(header: &DocumentHeader, answer: &str) -> String {
    let rule = "-".repeat(60);
    let mut doc = String::with_capacity(answer.len() + 512);
    doc.push_str("PARLEY ANSWER\n");
    doc.push_str(&rule);
    doc.push('\n');
    doc.push_str(&format!("Question:     {}\n", to_safe_ascii(&header.question)));
    doc.push_str(&format!("Requested by: {}\n", to_safe_ascii(&header.requester)));
    doc.push_str(&format!(
        "Date:         {}\n",
        header.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    doc.push_str(&format!(
        "Request:      /{} {}\n",
        header.command,
        to_safe_ascii(&header.question)
    ));
    doc.push_str(&rule);
    doc.push_str("\n\n");
    doc.push_str(&to_safe_ascii(answer));
    doc.push('\n');
    doc
}

/// Map text onto printable ASCII plus newline and tab.
///
/// Typographic punctuation and Latin accented letters are folded to their
/// closest ASCII form; anything else outside the set is dropped.
pub fn to_safe_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' | '\t' => out.push(c),
            ' '..='~' => out.push(c),
            _ => {
                if let Some(folded) = fold(c) {
                    out.push_str(folded);
                }
            }
        }
    }
    out
}

fn fold(c: char) -> Option<&'static str> {
    let s = match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{2032}' | '\u{00B4}' => "'",
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{2033}' | '\u{00AB}' | '\u{00BB}' => "\"",
        '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}' => "-",
        '\u{2026}' => "...",
        '\u{00A0}' | '\u{2002}'..='\u{200A}' | '\u{202F}' => " ",
        '\u{2022}' | '\u{00B7}' => "*",
        '\u{2192}' => "->",
        '\u{2190}' => "<-",
        '\u{00D7}' => "x",
        '\u{00E0}'..='\u{00E5}' => "a",
        '\u{00C0}'..='\u{00C5}' => "A",
        '\u{00E8}'..='\u{00EB}' => "e",
        '\u{00C8}'..='\u{00CB}' => "E",
        '\u{00EC}'..='\u{00EF}' => "i",
        '\u{00CC}'..='\u{00CF}' => "I",
        '\u{00F2}'..='\u{00F6}' | '\u{00F8}' => "o",
        '\u{00D2}'..='\u{00D6}' | '\u{00D8}' => "O",
        '\u{00F9}'..='\u{00FC}' => "u",
        '\u{00D9}'..='\u{00DC}' => "U",
        '\u{00F1}' => "n",
        '\u{00D1}' => "N",
        '\u{00E7}' => "c",
        '\u{00C7}' => "C",
        '\u{00FD}' | '\u{00FF}' => "y",
        '\u{00DD}' => "Y",
        '\u{00DF}' => "ss",
        '\u{00E6}' => "ae",
        '\u{00C6}' => "AE",
        '\u{0153}' => "oe",
        '\u{0152}' => "OE",
        _ => return None,
    };
    Some(s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn header() -> DocumentHeader {
        DocumentHeader::new(
            "¿Qué es Rust?",
            "ana#0001",
            "ask",
            Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
        )
    }

    #[test]
    fn ascii_folding() {
        assert_eq!(to_safe_ascii("“Olé” — niño…"), "\"Ole\" - nino...");
        assert_eq!(to_safe_ascii("emoji \u{1f916} gone"), "emoji  gone");
        assert_eq!(to_safe_ascii("tab\tand\nnewline\r"), "tab\tand\nnewline");
    }

    #[test]
    fn filename_uses_timestamp() {
        assert_eq!(
            attachment_filename(&header().generated_at),
            "answer-20240309-140507.txt"
        );
    }

    #[test]
    fn document_has_header_and_full_answer() {
        let answer = "Rust es un lenguaje. ".repeat(500);
        let doc = build_document(&header(), &answer);
        assert!(doc.starts_with("PARLEY ANSWER\n"));
        assert!(doc.contains("Question:     Que es Rust?\n"));
        assert!(doc.contains("Requested by: ana#0001\n"));
        assert!(doc.contains("Date:         2024-03-09 14:05:07 UTC\n"));
        assert!(doc.contains("Request:      /ask Que es Rust?\n"));
        assert!(doc.contains(&answer));
        assert!(doc.is_ascii());
    }
}
