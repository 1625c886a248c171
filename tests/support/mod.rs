#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rtsync::error::{Error, Result};
use rtsync::gateway::{Gateway, Method, Request, Transport};
use rtsync::protocol::{LinkSet, Relation};

const OK: &str = "RT/4.4.3 200 Ok\n\n";
const LINK_BASE: &str = "fsck.com-rt://example.com/ticket";

#[derive(Debug, Clone, Default)]
pub struct FakeTicket {
    pub fields: Vec<(String, String)>,
    pub description: Option<String>,
}

#[derive(Default)]
struct State {
    tickets: BTreeMap<String, FakeTicket>,
    links: BTreeMap<String, LinkSet>,
    failing_link_writes: HashSet<String>,
    refused_link_writes: HashSet<String>,
    requests: Vec<(Method, String)>,
    link_writes: Vec<(String, String)>,
    edits: Vec<(String, String)>,
    next_id: u32,
}

/// In-memory ticketing service speaking the REST 1.0 text format.
///
/// Link reads render the current link state, link writes replace one
/// relation's peers, and writes for chosen tickets can be made to fail.
pub struct FakeRt {
    state: Mutex<State>,
}

impl FakeRt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                next_id: 100,
                ..State::default()
            }),
        })
    }

    pub fn gateway(self: &Arc<Self>) -> Gateway {
        Gateway::new(Arc::clone(self) as Arc<dyn Transport>)
    }

    pub fn add_ticket(&self, id: &str, subject: &str) {
        self.add_ticket_with(
            id,
            FakeTicket {
                fields: vec![
                    ("Queue".to_string(), "General".to_string()),
                    ("Subject".to_string(), subject.to_string()),
                    ("Status".to_string(), "open".to_string()),
                ],
                description: None,
            },
        );
    }

    pub fn add_ticket_with(&self, id: &str, ticket: FakeTicket) {
        let mut state = self.state.lock().unwrap();
        state.tickets.insert(id.to_string(), ticket);
        state.links.entry(id.to_string()).or_default();
    }

    pub fn set_links(&self, id: &str, relation: Relation, peers: &[&str]) {
        let mut state = self.state.lock().unwrap();
        state
            .links
            .entry(id.to_string())
            .or_default()
            .set(relation, peers.iter().map(|peer| peer.to_string()).collect());
    }

    pub fn fail_link_writes_for(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_link_writes
            .insert(id.to_string());
    }

    /// Answer link writes for `id` with a 200 response that refuses them.
    pub fn refuse_link_writes_for(&self, id: &str) {
        self.state
            .lock()
            .unwrap()
            .refused_link_writes
            .insert(id.to_string());
    }

    pub fn links_of(&self, id: &str) -> LinkSet {
        self.state
            .lock()
            .unwrap()
            .links
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// `(ticket id, content body)` of every accepted link write.
    pub fn link_writes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().link_writes.clone()
    }

    pub fn edits(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().edits.clone()
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.lock().unwrap().requests.clone()
    }

    fn respond(&self, request: &Request) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.requests.push((request.method, request.path.clone()));

        let segments: Vec<&str> = request.path.split('/').collect();
        match (request.method, segments.as_slice()) {
            (Method::Get, ["ticket", id, "show"]) => Ok(render_show(&state, id)),
            (Method::Get, ["ticket", id, "links", "show"]) => Ok(render_links(&state, id)),
            (Method::Get, ["ticket", id, "history"]) => {
                let long = request
                    .query
                    .iter()
                    .any(|(name, value)| name == "format" && value == "l");
                Ok(render_history(&state, id, long))
            }
            (Method::Get, ["search", "ticket"]) => Ok(render_search(&state, request)),
            (Method::Get, ["search", "queue"]) => Ok(format!("{OK}1: General\n3: Support\n")),
            (Method::Post, ["ticket", id, "links"]) => {
                let id = id.to_string();
                apply_link_write(&mut state, &id, request)
            }
            (Method::Post, ["ticket", "new"]) => {
                state.next_id += 1;
                let id = state.next_id.to_string();
                state.tickets.insert(id.clone(), FakeTicket::default());
                Ok(format!("{OK}# Ticket {id} created.\n"))
            }
            (Method::Post, ["ticket", id, action]) => {
                let content = body_content(request);
                state.edits.push((id.to_string(), content));
                Ok(format!("{OK}# Ticket {id} {action} done.\n"))
            }
            _ => Ok("RT/4.4.3 400 Bad Request\n\n# Unknown path\n".to_string()),
        }
    }
}

#[async_trait]
impl Transport for FakeRt {
    async fn execute(&self, request: &Request) -> Result<String> {
        // Yield so batched requests interleave.
        tokio::task::yield_now().await;
        self.respond(request)
    }
}

fn body_content(request: &Request) -> String {
    request
        .body
        .iter()
        .find(|(name, _)| name == "content")
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

fn render_show(state: &State, id: &str) -> String {
    let Some(ticket) = state.tickets.get(id) else {
        return format!("{OK}# Ticket {id} does not exist.\n");
    };
    let mut text = format!("{OK}id: ticket/{id}\n");
    for (name, value) in &ticket.fields {
        text.push_str(&format!("{name}: {value}\n"));
    }
    text
}

fn render_links(state: &State, id: &str) -> String {
    if !state.tickets.contains_key(id) {
        return format!("{OK}# Ticket {id} does not exist.\n");
    }
    let mut text = format!("{OK}id: ticket/{id}/links\n\n");
    if let Some(links) = state.links.get(id) {
        for (relation, peers) in links.iter() {
            if peers.is_empty() {
                continue;
            }
            let name = relation.as_str();
            let indent = " ".repeat(name.len() + 2);
            let rendered: Vec<String> = peers
                .iter()
                .map(|peer| format!("{LINK_BASE}/{peer}"))
                .collect();
            text.push_str(&format!("{name}: {}\n", rendered.join(&format!(",\n{indent}"))));
        }
    }
    text
}

fn render_history(state: &State, id: &str, long: bool) -> String {
    let description = state
        .tickets
        .get(id)
        .and_then(|ticket| ticket.description.clone())
        .unwrap_or_default();
    if !long {
        return format!("{OK}# 2/2 (id/{id}/total)\n\n1001: Ticket created by alice\n1002: Comments added by bob\n");
    }
    let indented: Vec<String> = description
        .lines()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                line.to_string()
            } else {
                format!("         {line}")
            }
        })
        .collect();
    format!(
        "{OK}# 2/2 (id/1001/total)\n\nid: 1001\nTicket: {id}\nType: Create\nCreator: alice\nContent: {}\nCreated: 2024-01-02 10:00:00\nAttachments:\n\n--\n\n# 2/2 (id/1002/total)\n\nid: 1002\nTicket: {id}\nType: Comment\nCreator: bob\nContent: Looking into it.\nCreated: 2024-01-03 09:00:00\nAttachments:\n",
        indented.join("\n")
    )
}

fn render_search(state: &State, request: &Request) -> String {
    let subjects = request
        .query
        .iter()
        .any(|(name, value)| name == "format" && value == "s");
    let mut text = OK.to_string();
    for (id, ticket) in &state.tickets {
        if subjects {
            let subject = ticket
                .fields
                .iter()
                .find(|(name, _)| name == "Subject")
                .map(|(_, value)| value.as_str())
                .unwrap_or("");
            text.push_str(&format!("{id}: {subject}\n"));
        } else {
            text.push_str(&format!("ticket/{id}\n"));
        }
    }
    text
}

fn apply_link_write(state: &mut State, id: &str, request: &Request) -> Result<String> {
    if state.failing_link_writes.contains(id) {
        return Err(Error::Transport(format!("injected failure writing links of {id}")));
    }
    if state.refused_link_writes.contains(id) {
        return Ok(format!("{OK}# Ticket {id} does not exist.\n"));
    }
    let content = body_content(request);
    let (name, peers) = content
        .split_once(':')
        .ok_or_else(|| Error::OperationFailed(format!("malformed link body '{content}'")))?;
    let relation = Relation::from_name(name.trim())
        .ok_or_else(|| Error::OperationFailed(format!("unknown relation '{name}'")))?;
    let peers: Vec<String> = peers.split_whitespace().map(str::to_string).collect();

    state.links.entry(id.to_string()).or_default().set(relation, peers);
    state.link_writes.push((id.to_string(), content));
    Ok(format!("{OK}# Links for ticket {id} updated.\n"))
}

/// Peers as a sorted list, for order-insensitive comparison.
pub fn sorted(peers: &[String]) -> Vec<String> {
    let mut peers = peers.to_vec();
    peers.sort();
    peers
}
