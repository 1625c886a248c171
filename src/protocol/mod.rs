//! REST 1.0 response protocol.
//!
//! Responses are line-oriented text, not structured data. `tokens`
//! classifies lines, `decode` turns line streams into records for each
//! response shape, `encode` renders write bodies, and `types` holds the
//! decoded records.

pub mod decode;
pub mod encode;
pub mod tokens;
pub mod types;

use serde::Serialize;

pub use types::{FieldRecord, HistoryEntry, LinkSet, Relation, COMMENT_FIELDS};

/// The named decoders a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoder {
    Show,
    Search,
    SearchSubjects,
    Queues,
    Created,
    Links,
    HistoryShort,
    HistoryLong,
    HistoryEntry,
    Description,
}

/// A decoded response, or the raw text when no decoder was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", content = "data", rename_all = "snake_case")]
pub enum Decoded {
    Raw(String),
    Fields(FieldRecord),
    Ids(Vec<String>),
    Numbered(Vec<(String, String)>),
    Created(Option<String>),
    Links(LinkSet),
    History(Vec<HistoryEntry>),
    Description(Option<String>),
}

impl Decoder {
    /// Decode `text` from byte offset `start`.
    pub fn decode(self, text: &str, start: usize) -> Decoded {
        match self {
            Decoder::Show => Decoded::Fields(decode::show(text, start)),
            Decoder::Search => Decoded::Ids(decode::search(text, start)),
            Decoder::SearchSubjects => Decoded::Numbered(decode::numbered(text, start)),
            Decoder::Queues => Decoded::Numbered(decode::queues(text, start)),
            Decoder::Created => Decoded::Created(decode::created(text, start)),
            Decoder::Links => Decoded::Links(decode::links(text, start)),
            Decoder::HistoryShort => Decoded::Numbered(decode::history_short(text, start)),
            Decoder::HistoryLong => Decoded::History(decode::history_long(text, start)),
            Decoder::HistoryEntry => Decoded::Fields(decode::history_entry(text, start)),
            Decoder::Description => Decoded::Description(decode::description(text, start)),
        }
    }
}

// Accessors return the empty value when the shape does not match, the
// same way a decoder that matched nothing would.
impl Decoded {
    pub fn into_raw(self) -> String {
        match self {
            Decoded::Raw(text) => text,
            _ => String::new(),
        }
    }

    pub fn into_fields(self) -> FieldRecord {
        match self {
            Decoded::Fields(record) => record,
            _ => FieldRecord::new(),
        }
    }

    pub fn into_ids(self) -> Vec<String> {
        match self {
            Decoded::Ids(ids) => ids,
            _ => Vec::new(),
        }
    }

    pub fn into_numbered(self) -> Vec<(String, String)> {
        match self {
            Decoded::Numbered(pairs) => pairs,
            _ => Vec::new(),
        }
    }

    pub fn into_created(self) -> Option<String> {
        match self {
            Decoded::Created(id) => id,
            _ => None,
        }
    }

    pub fn into_links(self) -> LinkSet {
        match self {
            Decoded::Links(links) => links,
            _ => LinkSet::new(),
        }
    }

    pub fn into_history(self) -> Vec<HistoryEntry> {
        match self {
            Decoded::History(entries) => entries,
            _ => Vec::new(),
        }
    }

    pub fn into_description(self) -> Option<String> {
        match self {
            Decoded::Description(text) => text,
            _ => None,
        }
    }

    /// True when the decoder matched nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Decoded::Raw(text) => text.is_empty(),
            Decoded::Fields(record) => record.is_empty(),
            Decoded::Ids(ids) => ids.is_empty(),
            Decoded::Numbered(pairs) => pairs.is_empty(),
            Decoded::Created(id) => id.is_none(),
            Decoded::Links(links) => links.is_empty(),
            Decoded::History(entries) => entries.is_empty(),
            Decoded::Description(text) => text.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_accessor_is_empty() {
        let decoded = Decoder::Links.decode("id: ticket/1/links\nDependsOn: ticket/2\n", 0);
        assert!(!decoded.is_empty());
        assert!(decoded.clone().into_fields().is_empty());
        assert_eq!(decoded.into_links().peers(Relation::DependsOn), ["2"]);
    }

    #[test]
    fn wrong_shape_decodes_empty() {
        for decoder in [Decoder::Show, Decoder::Links, Decoder::HistoryEntry] {
            assert!(decoder.decode("RT/4.4.3 200 Ok\n\nnothing here\n", 0).is_empty());
        }
    }
}
