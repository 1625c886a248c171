//! rtsync history and links commands.

use serde::Serialize;

use super::{block_on, Context};
use crate::error::{Error, Result};
use crate::output::{emit_success, HumanOutput};
use crate::protocol::{FieldRecord, HistoryEntry, LinkSet};

pub struct HistoryOptions {
    pub id: String,
    pub long: bool,
    pub comments: bool,
    pub entry: Option<String>,
}

#[derive(Serialize)]
#[serde(tag = "form", rename_all = "snake_case")]
enum HistoryReport {
    Short { entries: Vec<ShortEntry> },
    Long { entries: Vec<HistoryEntry> },
    Entry { fields: FieldRecord },
}

#[derive(Serialize)]
struct ShortEntry {
    id: String,
    summary: String,
}

pub fn run_history(context: &Context, options: HistoryOptions) -> Result<()> {
    let gateway = context.gateway()?;
    let id = options.id.as_str();

    if let Some(history_id) = options.entry.as_deref() {
        let fields = block_on(gateway.history_entry(id, history_id))?;
        if fields.is_empty() {
            return Err(Error::OperationFailed(format!(
                "history entry {history_id} not found on ticket {id}"
            )));
        }
        let mut human = HumanOutput::new(format!("#{id} transaction {history_id}"));
        push_fields(&mut human, &fields);
        return emit_success(
            context.output,
            "history",
            &HistoryReport::Entry { fields },
            Some(&human),
        );
    }

    if options.long || options.comments {
        let mut entries = block_on(gateway.history_long(id))?;
        if options.comments {
            entries = entries
                .iter()
                .filter_map(HistoryEntry::comment_projection)
                .collect();
        }

        let label = if options.comments { "comment(s)" } else { "transaction(s)" };
        let mut human = HumanOutput::new(format!("#{id}: {} {label}", entries.len()));
        for entry in &entries {
            let mut block = vec![format!("[{}]", entry.id)];
            for (name, value) in entry.fields.iter() {
                block.push(format!("{name}: {value}"));
            }
            human.push_body(block.join("\n"));
        }
        return emit_success(
            context.output,
            "history",
            &HistoryReport::Long { entries },
            Some(&human),
        );
    }

    let entries: Vec<ShortEntry> = block_on(gateway.history(id))?
        .into_iter()
        .map(|(id, summary)| ShortEntry { id, summary })
        .collect();
    let mut human = HumanOutput::new(format!("#{id}: {} transaction(s)", entries.len()));
    for entry in &entries {
        human.push_detail(format!("{}: {}", entry.id, entry.summary));
    }
    emit_success(
        context.output,
        "history",
        &HistoryReport::Short { entries },
        Some(&human),
    )
}

fn push_fields(human: &mut HumanOutput, fields: &FieldRecord) {
    for (name, value) in fields.iter() {
        if name == "Content" {
            human.push_body(value.to_string());
        } else {
            human.push_summary(name, value);
        }
    }
}

#[derive(Serialize)]
struct LinksReport<'a> {
    id: &'a str,
    links: LinkSet,
}

pub fn run_links(context: &Context, id: &str) -> Result<()> {
    let gateway = context.gateway()?;
    let links = block_on(gateway.links(id))?;

    let mut human = HumanOutput::new(format!("#{id} links"));
    for (relation, peers) in links.iter() {
        if !peers.is_empty() {
            human.push_summary(relation.as_str(), peers.join(" "));
        }
    }
    if links.is_empty() {
        human.push_detail("no links");
    }
    emit_success(context.output, "links", &LinksReport { id, links }, Some(&human))
}
