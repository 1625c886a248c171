//! Line tokenizer for REST 1.0 responses.
//!
//! Every physical line is classified once, independent of its neighbours.
//! Decoders then walk the classified stream with small per-shape state
//! machines instead of re-searching the raw text.

use once_cell::sync::Lazy;
use regex::Regex;

/// `<field-name>: <value>`; the name starts with a letter and may hold
/// word characters, dots, braces, dashes and spaces (`CF.{Due Date}`).
static KEY_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z][\w.{} -]*?):(?: (.*))?$").expect("key line regex"));

/// `<digits>: <text>` as used by queue lists and short history.
static NUMERIC_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+):(?: (.*))?$").expect("numeric line regex"));

static DIGIT_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").expect("digit run regex"));

/// A bare id token such as `42` or `ticket/42`, one per search result line.
static ID_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z./]*?([0-9]+)[A-Za-z./]*$").expect("id token regex"));

static LINK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"ticket/([0-9]+)").expect("link token regex"));

static BARE_LINK_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([0-9]+)\s*,?\s*$").expect("bare link token regex"));

static CREATED_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^# Ticket ([0-9]+) created\.").expect("created line regex"));

static LINKS_UPDATED_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^# Links for ticket ([0-9]+) updated\.").expect("links updated line regex")
});

/// The record separator inside multi-record responses.
pub const BREAK_MARKER: &str = "--";

/// Shape of a single physical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    Key { name: &'a str, value: &'a str },
    Numeric { id: &'a str, text: &'a str },
    /// Leading whitespace run of `indent` characters.
    Continuation { indent: usize },
    Break,
    Blank,
    Other,
}

/// A classified line and its byte offset in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    pub offset: usize,
    pub text: &'a str,
    pub kind: LineKind<'a>,
}

impl<'a> Line<'a> {
    /// Key lines and break markers end any continuation run.
    pub fn is_boundary(&self) -> bool {
        matches!(self.kind, LineKind::Key { .. } | LineKind::Break)
    }

    pub fn is_break(&self) -> bool {
        matches!(self.kind, LineKind::Break)
    }

    pub fn key(&self) -> Option<(&'a str, &'a str)> {
        match self.kind {
            LineKind::Key { name, value } => Some((name, value)),
            _ => None,
        }
    }

    pub fn key_named(&self, wanted: &str) -> Option<&'a str> {
        self.key()
            .and_then(|(name, value)| (name == wanted).then_some(value))
    }

    /// The identifier carried by an `id: ...` line, if this is one.
    pub fn id(&self) -> Option<String> {
        self.key_named("id").and_then(extract_numeric_id)
    }

    /// True when this line continues a field whose name is `name`.
    pub fn continues(&self, name: &str) -> bool {
        match self.kind {
            LineKind::Continuation { indent } => indent >= name.chars().count(),
            _ => false,
        }
    }
}

/// Classify one line of text (without its trailing newline).
pub fn classify(text: &str) -> LineKind<'_> {
    if text.trim_end() == BREAK_MARKER {
        return LineKind::Break;
    }
    if text.is_empty() {
        return LineKind::Blank;
    }

    let indent = text.chars().take_while(|c| c.is_whitespace()).count();
    if indent > 0 {
        return LineKind::Continuation { indent };
    }

    if let Some(caps) = NUMERIC_LINE.captures(text) {
        let id = caps.get(1).map_or("", |m| m.as_str());
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Numeric { id, text };
    }

    if let Some(caps) = KEY_LINE.captures(text) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        let value = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Key { name, value };
    }

    LineKind::Other
}

/// Split `buffer` into classified lines, starting at byte offset `start`.
///
/// An out-of-range or non-boundary `start` yields no lines.
pub fn tokenize(buffer: &str, start: usize) -> Vec<Line<'_>> {
    let Some(rest) = buffer.get(start..) else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut offset = start;
    for raw in rest.split_inclusive('\n') {
        let text = raw.strip_suffix('\n').unwrap_or(raw);
        let text = text.strip_suffix('\r').unwrap_or(text);
        lines.push(Line {
            offset,
            text,
            kind: classify(text),
        });
        offset += raw.len();
    }
    lines
}

/// First maximal run of digits in `value` (`ticket/1234` -> `1234`).
pub fn extract_numeric_id(value: &str) -> Option<String> {
    DIGIT_RUN.find(value).map(|m| m.as_str().to_string())
}

/// A whole-line id token as printed by id-format searches.
pub fn id_token(value: &str) -> Option<String> {
    ID_TOKEN
        .captures(value.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First peer ticket referenced by a link value or continuation line.
pub fn link_token(value: &str) -> Option<String> {
    LINK_TOKEN
        .captures(value)
        .or_else(|| BARE_LINK_TOKEN.captures(value))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Ticket id from a `# Ticket <n> created.` acknowledgement line.
pub fn created_id(line: &str) -> Option<String> {
    CREATED_LINE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Ticket id from a `# Links for ticket <n> updated.` acknowledgement line.
pub fn links_updated_id(line: &str) -> Option<String> {
    LINKS_UPDATED_LINE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_each_shape() {
        assert_eq!(
            classify("Subject: Build fails"),
            LineKind::Key {
                name: "Subject",
                value: "Build fails"
            }
        );
        assert_eq!(
            classify("CF.{Due Date}: 2024-01-02"),
            LineKind::Key {
                name: "CF.{Due Date}",
                value: "2024-01-02"
            }
        );
        assert_eq!(
            classify("42: Comments added by alice"),
            LineKind::Numeric {
                id: "42",
                text: "Comments added by alice"
            }
        );
        assert_eq!(classify("         more"), LineKind::Continuation { indent: 9 });
        assert_eq!(classify("--"), LineKind::Break);
        assert_eq!(classify(""), LineKind::Blank);
        assert_eq!(classify("RT/4.4.3 200 Ok"), LineKind::Other);
        assert_eq!(classify("# Ticket 7 created."), LineKind::Other);
    }

    #[test]
    fn key_with_empty_value() {
        assert_eq!(
            classify("Owner:"),
            LineKind::Key {
                name: "Owner",
                value: ""
            }
        );
        assert_eq!(
            classify("Owner: "),
            LineKind::Key {
                name: "Owner",
                value: ""
            }
        );
    }

    #[test]
    fn urls_are_not_key_lines() {
        assert_eq!(classify("https://example.com/x"), LineKind::Other);
    }

    #[test]
    fn value_keeps_later_colons() {
        assert_eq!(
            classify("Content: note: see below"),
            LineKind::Key {
                name: "Content",
                value: "note: see below"
            }
        );
    }

    #[test]
    fn tokenize_tracks_offsets_and_strips_cr() {
        let text = "id: 1\r\nSubject: x\n";
        let lines = tokenize(text, 0);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].offset, 0);
        assert_eq!(lines[0].text, "id: 1");
        assert_eq!(lines[1].offset, 7);
        assert_eq!(lines[1].key(), Some(("Subject", "x")));
    }

    #[test]
    fn tokenize_from_offset() {
        let text = "RT/4.4.3 200 Ok\n\nid: ticket/9\n";
        let lines = tokenize(text, 17);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id().as_deref(), Some("9"));
        assert!(tokenize(text, 1000).is_empty());
    }

    #[test]
    fn continuation_depends_on_owner_name() {
        let line = tokenize("       x", 0)[0];
        assert!(line.continues("Content"));
        assert!(!line.continues("Attachments"));
    }

    #[test]
    fn numeric_id_extraction() {
        assert_eq!(extract_numeric_id("ticket/1234").as_deref(), Some("1234"));
        assert_eq!(extract_numeric_id("ticket/5/links").as_deref(), Some("5"));
        assert_eq!(extract_numeric_id("42").as_deref(), Some("42"));
        assert_eq!(extract_numeric_id("ticket/new"), None);
    }

    #[test]
    fn link_token_takes_first_ticket() {
        assert_eq!(
            link_token("fsck.com-rt://rt4.example.com/ticket/6,").as_deref(),
            Some("6")
        );
        assert_eq!(link_token("  17,").as_deref(), Some("17"));
        assert_eq!(link_token("https://example.com/"), None);
    }

    #[test]
    fn created_line() {
        assert_eq!(created_id("# Ticket 88 created.").as_deref(), Some("88"));
        assert_eq!(created_id("# Could not create ticket."), None);
    }

    #[test]
    fn id_tokens() {
        assert_eq!(id_token("ticket/5").as_deref(), Some("5"));
        assert_eq!(id_token("12").as_deref(), Some("12"));
        assert_eq!(id_token("No matching results."), None);
    }

    #[test]
    fn ids_are_ascii_digits_only() {
        assert_eq!(extract_numeric_id("ticket/\u{664}\u{662}"), None);
        assert_eq!(extract_numeric_id("ticket/\u{664}2"), Some("2".to_string()));
        assert_eq!(id_token("ticket/\u{664}\u{662}"), None);
        assert_eq!(link_token("fsck.com-rt://example.com/ticket/\u{664}\u{662}"), None);
        assert_eq!(created_id("# Ticket \u{664}\u{662} created."), None);
        assert_eq!(classify("\u{664}\u{662}: text"), LineKind::Other);
    }

    #[test]
    fn links_updated_ack() {
        assert_eq!(
            links_updated_id("# Links for ticket 20 updated.").as_deref(),
            Some("20")
        );
        assert_eq!(links_updated_id("# Ticket 20 does not exist."), None);
    }
}
