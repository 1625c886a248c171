//! Per-shape response decoders.
//!
//! Each decoder scans forward from `start` over the tokenized lines and
//! returns whatever it matched. Nothing here fails: a response in the
//! wrong shape decodes to an empty record, list, or `None`.

use super::tokens::{self, Line, LineKind};
use super::types::{FieldRecord, HistoryEntry, LinkSet, Relation};

const CONTENT: &str = "Content";
const ATTACHMENTS: &str = "Attachments";

/// Read key lines into `record` until a break marker or the end of `lines`.
///
/// Continuation lines are folded into the preceding value only when
/// `fold(name)` allows it; they are appended verbatim after a newline.
/// Returns the index where scanning stopped.
fn collect_fields<F>(lines: &[Line<'_>], fold: F, record: &mut FieldRecord) -> usize
where
    F: Fn(&str) -> bool,
{
    let mut index = 0;
    while index < lines.len() {
        let line = &lines[index];
        if line.is_break() {
            return index;
        }
        let Some((name, value)) = line.key() else {
            index += 1;
            continue;
        };

        let end = next_boundary(lines, index + 1);
        let mut value = value.to_string();
        if fold(name) {
            for continuation in lines[index + 1..end].iter().filter(|l| l.continues(name)) {
                value.push('\n');
                value.push_str(continuation.text);
            }
        }
        record.push(name, value);
        index = end;
    }
    index
}

/// Index of the first key line or break marker at or after `from`.
fn next_boundary(lines: &[Line<'_>], from: usize) -> usize {
    lines[from.min(lines.len())..]
        .iter()
        .position(Line::is_boundary)
        .map_or(lines.len(), |offset| from + offset)
}

fn first_id_line(lines: &[Line<'_>]) -> Option<(usize, String)> {
    lines
        .iter()
        .enumerate()
        .find_map(|(index, line)| line.id().map(|id| (index, id)))
}

/// `ticket/<id>/show`: one record, `id` first.
pub fn show(text: &str, start: usize) -> FieldRecord {
    let lines = tokens::tokenize(text, start);
    let mut record = FieldRecord::new();
    let Some((index, id)) = first_id_line(&lines) else {
        return record;
    };

    record.push("id", id);
    collect_fields(&lines[index + 1..], |_| true, &mut record);
    record
}

/// `search/ticket?format=i`: a header line, then one id token per line.
pub fn search(text: &str, start: usize) -> Vec<String> {
    let mut ids = Vec::new();
    for line in tokens::tokenize(text, start).iter().skip(1) {
        if matches!(line.kind, LineKind::Blank) {
            continue;
        }
        match tokens::id_token(line.text) {
            Some(id) => ids.push(id),
            None => break,
        }
    }
    ids
}

/// `<digits>: <text>` lines, in order. Used by queue lists, short
/// history and subject searches.
pub fn numbered(text: &str, start: usize) -> Vec<(String, String)> {
    tokens::tokenize(text, start)
        .iter()
        .filter_map(|line| match line.kind {
            LineKind::Numeric { id, text } => Some((id.to_string(), text.to_string())),
            _ => None,
        })
        .collect()
}

/// Queue list as `(id, name)` pairs.
pub fn queues(text: &str, start: usize) -> Vec<(String, String)> {
    numbered(text, start)
}

/// Short history as `(history-id, summary)` pairs.
pub fn history_short(text: &str, start: usize) -> Vec<(String, String)> {
    numbered(text, start)
}

/// Ticket id from a creation acknowledgement.
pub fn created(text: &str, start: usize) -> Option<String> {
    tokens::tokenize(text, start)
        .iter()
        .find_map(|line| tokens::created_id(line.text))
}

/// Ticket id from a link-update acknowledgement.
pub fn links_updated(text: &str, start: usize) -> Option<String> {
    tokens::tokenize(text, start)
        .iter()
        .find_map(|line| tokens::links_updated_id(line.text))
}

/// Text of the first `# ` notice line, as the service words rejections.
pub fn notice(text: &str, start: usize) -> Option<String> {
    tokens::tokenize(text, start)
        .iter()
        .find_map(|line| line.text.strip_prefix("# "))
        .map(|notice| notice.trim().to_string())
}

/// `ticket/<id>/links/show`: the first peer token of each value line and
/// each continuation line, grouped by relation.
pub fn links(text: &str, start: usize) -> LinkSet {
    let lines = tokens::tokenize(text, start);
    let mut links = LinkSet::new();
    let Some((first, _)) = first_id_line(&lines) else {
        return links;
    };

    let mut index = first + 1;
    while index < lines.len() {
        let line = &lines[index];
        if line.is_break() {
            break;
        }
        let Some((name, value)) = line.key() else {
            index += 1;
            continue;
        };

        let end = next_boundary(&lines, index + 1);
        if let Some(relation) = Relation::from_name(name) {
            let continuations = lines[index + 1..end]
                .iter()
                .filter(|l| l.continues(name))
                .map(|l| l.text);
            for peer in std::iter::once(value)
                .chain(continuations)
                .filter_map(tokens::link_token)
            {
                links.push(relation, peer);
            }
        }
        index = end;
    }
    links
}

/// `ticket/<id>/history?format=l`: one entry per id line.
///
/// Each entry is bounded by the next id line. Only `Content` and
/// `Attachments` fold continuation lines.
pub fn history_long(text: &str, start: usize) -> Vec<HistoryEntry> {
    let lines = tokens::tokenize(text, start);
    let starts: Vec<(usize, String)> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| line.id().map(|id| (index, id)))
        .collect();

    let mut entries = Vec::with_capacity(starts.len());
    for (position, (begin, id)) in starts.iter().enumerate() {
        let end = starts
            .get(position + 1)
            .map_or(lines.len(), |(next, _)| *next);
        let mut fields = FieldRecord::new();
        collect_fields(
            &lines[*begin..end],
            |name| name == CONTENT || name == ATTACHMENTS,
            &mut fields,
        );
        entries.push(HistoryEntry {
            id: id.clone(),
            fields,
        });
    }
    entries
}

/// `ticket/<id>/history/id/<hid>`: a single transaction.
///
/// The transaction id leads the record; any other field repeating that
/// id verbatim is dropped.
pub fn history_entry(text: &str, start: usize) -> FieldRecord {
    let lines = tokens::tokenize(text, start);
    let mut record = FieldRecord::new();
    let Some((begin, id)) = first_id_line(&lines) else {
        return record;
    };
    let end = lines[begin + 1..]
        .iter()
        .position(|line| line.id().is_some())
        .map_or(lines.len(), |offset| begin + 1 + offset);

    let mut fields = FieldRecord::new();
    collect_fields(&lines[begin..end], |_| true, &mut fields);
    fields.retain(|_, value| value != id);

    record.push("id", id);
    for (name, value) in fields.into_pairs() {
        record.push(name, value);
    }
    record
}

/// The first `Content` value only, folded up to the attachments section.
pub fn description(text: &str, start: usize) -> Option<String> {
    let lines = tokens::tokenize(text, start);
    let content = lines
        .iter()
        .position(|line| line.key_named(CONTENT).is_some())?;
    let mut value = lines[content].key_named(CONTENT)?.to_string();

    let tail = &lines[content + 1..];
    let record_end = tail
        .iter()
        .position(|line| line.is_break() || line.id().is_some())
        .unwrap_or(tail.len());
    let end = tail[..record_end]
        .iter()
        .position(|line| line.key_named(ATTACHMENTS).is_some())
        .unwrap_or_else(|| next_boundary(tail, 0));

    for line in tail[..end].iter().filter(|l| l.continues(CONTENT)) {
        value.push('\n');
        value.push_str(line.text);
    }
    Some(value)
}
