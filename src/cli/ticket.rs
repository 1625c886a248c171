//! rtsync ticket commands: show, search, queues, create, comment, edit,
//! resolve.

use serde::Serialize;

use super::{block_on, Context};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::protocol::Relation;
use crate::snapshot::{self, AssembleOptions, TicketSnapshot};

pub struct ShowOptions {
    pub id: String,
    pub links: bool,
    pub description: bool,
}

pub fn run_show(context: &Context, options: ShowOptions) -> Result<()> {
    let gateway = context.gateway()?;
    let assemble = AssembleOptions {
        links: options.links,
        description: options.description,
        extra_fields: context.config.fields.extra.clone(),
    };
    let snapshot = block_on(snapshot::require(&gateway, &options.id, &assemble))?;

    let human = snapshot_human(&snapshot, options.links);
    emit_success(context.output, "show", &snapshot, Some(&human))
}

pub(super) fn snapshot_human(snapshot: &TicketSnapshot, with_links: bool) -> HumanOutput {
    let subject = snapshot
        .fields
        .get("Subject")
        .map(String::as_str)
        .unwrap_or("");
    let mut human = HumanOutput::new(format!("#{} {subject}", snapshot.id));
    for (name, value) in &snapshot.fields {
        if name != "Subject" && !value.is_empty() {
            human.push_summary(name.clone(), value.clone());
        }
    }
    if with_links {
        for relation in Relation::ALL {
            match snapshot.relations.get(&relation) {
                Some(peers) if !peers.is_empty() => {
                    human.push_summary(relation.as_str(), peers.clone());
                }
                _ => {}
            }
        }
    }
    if let Some(description) = &snapshot.description {
        human.push_body(description.clone());
    }
    human
}

pub struct SearchOptions {
    pub query: String,
    pub subjects: bool,
}

#[derive(Serialize)]
struct SearchHit {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    subject: Option<String>,
}

pub fn run_search(context: &Context, options: SearchOptions) -> Result<()> {
    let gateway = context.gateway()?;
    let hits: Vec<SearchHit> = if options.subjects {
        block_on(gateway.search_subjects(&options.query))?
            .into_iter()
            .map(|(id, subject)| SearchHit {
                id,
                subject: Some(subject),
            })
            .collect()
    } else {
        block_on(gateway.search(&options.query))?
            .into_iter()
            .map(|id| SearchHit { id, subject: None })
            .collect()
    };

    let mut human = HumanOutput::new(format!("{} ticket(s) match", hits.len()));
    for hit in &hits {
        match &hit.subject {
            Some(subject) => human.push_detail(format!("#{} {subject}", hit.id)),
            None => human.push_detail(format!("#{}", hit.id)),
        }
    }
    emit_success(context.output, "search", &hits, Some(&human))
}

#[derive(Serialize)]
struct QueueInfo {
    id: String,
    name: String,
}

pub fn run_queues(context: &Context) -> Result<()> {
    let gateway = context.gateway()?;
    let queues: Vec<QueueInfo> = block_on(gateway.queues())?
        .into_iter()
        .map(|(id, name)| QueueInfo { id, name })
        .collect();

    let mut human = HumanOutput::new(format!("{} queue(s)", queues.len()));
    for queue in &queues {
        human.push_detail(format!("{}: {}", queue.id, queue.name));
    }
    emit_success(context.output, "queues", &queues, Some(&human))
}

pub struct CreateOptions {
    pub queue: String,
    pub subject: String,
    pub text: Option<String>,
    pub fields: Vec<(String, String)>,
}

#[derive(Serialize)]
struct Created {
    id: String,
    queue: String,
}

pub fn run_create(context: &Context, options: CreateOptions) -> Result<()> {
    let gateway = context.gateway()?;
    let id = block_on(gateway.create(
        &options.queue,
        &options.subject,
        options.text.as_deref(),
        &options.fields,
    ))?;

    let mut human = HumanOutput::new(format!("Created ticket #{id}"));
    human.push_summary("Queue", options.queue.clone());
    human.push_summary("Subject", options.subject);
    human.push_next_step(format!("rtsync show {id}"));
    emit_success(
        context.output,
        "create",
        &Created {
            id,
            queue: options.queue,
        },
        Some(&human),
    )
}

#[derive(Serialize)]
struct Acknowledged<'a> {
    id: &'a str,
    response: String,
}

pub fn run_comment(context: &Context, id: &str, text: &str) -> Result<()> {
    let gateway = context.gateway()?;
    let response = block_on(gateway.comment(id, text))?;
    let human = HumanOutput::new(format!("Commented on #{id}"));
    emit_success(
        context.output,
        "comment",
        &Acknowledged { id, response },
        Some(&human),
    )
}

pub fn run_edit(context: &Context, id: &str, fields: Vec<(String, String)>) -> Result<()> {
    let gateway = context.gateway()?;
    let response = block_on(gateway.edit(id, &fields))?;
    let mut human = HumanOutput::new(format!("Updated #{id}"));
    for (name, value) in fields {
        human.push_summary(name, value);
    }
    emit_success(
        context.output,
        "edit",
        &Acknowledged { id, response },
        Some(&human),
    )
}

#[derive(Serialize)]
struct Resolved<'a> {
    id: &'a str,
    commented: bool,
}

pub fn run_resolve(context: &Context, id: &str, comment: Option<&str>) -> Result<()> {
    let gateway = context.gateway()?;
    block_on(gateway.resolve(id, comment))?;
    let human = HumanOutput::new(format!("Resolved #{id}"));
    emit_success(
        context.output,
        "resolve",
        &Resolved {
            id,
            commented: comment.is_some(),
        },
        Some(&human),
    )
}
