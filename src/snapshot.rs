//! Ticket snapshots.
//!
//! A snapshot joins three independent fetches (fields, links and the
//! description) into one flat view of a ticket. The fetches run
//! concurrently and the snapshot is built only after all requested ones
//! have finished.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gateway::Gateway;
use crate::protocol::tokens::extract_numeric_id;
use crate::protocol::{FieldRecord, LinkSet, Relation};

/// Scalar fields copied into every snapshot.
pub const KNOWN_FIELDS: [&str; 21] = [
    "Queue",
    "Owner",
    "Creator",
    "Subject",
    "Status",
    "Priority",
    "InitialPriority",
    "FinalPriority",
    "Requestors",
    "Cc",
    "AdminCc",
    "Created",
    "Starts",
    "Started",
    "Due",
    "Resolved",
    "Told",
    "LastUpdated",
    "TimeEstimated",
    "TimeWorked",
    "TimeLeft",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketSnapshot {
    /// Numeric ticket id.
    pub id: String,
    pub fields: BTreeMap<String, String>,
    pub links: LinkSet,
    /// Each relation as a space-joined id list. All six are present.
    pub relations: BTreeMap<Relation, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Which fetches to run. Fields are always fetched.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub links: bool,
    pub description: bool,
    /// Names copied in addition to [`KNOWN_FIELDS`].
    pub extra_fields: Vec<String>,
}

impl Default for AssembleOptions {
    fn default() -> Self {
        Self {
            links: true,
            description: true,
            extra_fields: Vec::new(),
        }
    }
}

impl AssembleOptions {
    pub fn fields_only() -> Self {
        Self {
            links: false,
            description: false,
            extra_fields: Vec::new(),
        }
    }
}

/// Build a snapshot from already-decoded parts.
///
/// Returns `None` when the field record carries no numeric id.
pub fn compose(
    record: &FieldRecord,
    links: LinkSet,
    description: Option<String>,
    extra_fields: &[String],
) -> Option<TicketSnapshot> {
    let id = record.get("id").and_then(extract_numeric_id)?;

    let mut fields = BTreeMap::new();
    let wanted = KNOWN_FIELDS
        .iter()
        .copied()
        .chain(extra_fields.iter().map(String::as_str));
    for name in wanted {
        if let Some(value) = record.get(name) {
            fields.insert(name.to_string(), value.to_string());
        }
    }

    let relations = Relation::ALL
        .into_iter()
        .map(|relation| (relation, links.joined(relation)))
        .collect();

    Some(TicketSnapshot {
        id,
        fields,
        links,
        relations,
        description,
    })
}

/// Fetch and compose one ticket. `Ok(None)` when the ticket has no id.
pub async fn assemble(
    gateway: &Gateway,
    id: &str,
    options: &AssembleOptions,
) -> Result<Option<TicketSnapshot>> {
    let fields = gateway.show(id);
    let links = async {
        if options.links {
            gateway.links(id).await
        } else {
            Ok(LinkSet::new())
        }
    };
    let description = async {
        if options.description {
            gateway.description(id).await
        } else {
            Ok(None)
        }
    };

    let (fields, links, description) = futures::join!(fields, links, description);
    Ok(compose(
        &fields?,
        links?,
        description?,
        &options.extra_fields,
    ))
}

/// Like [`assemble`], but a missing id is `TicketNotFound`.
pub async fn require(
    gateway: &Gateway,
    id: &str,
    options: &AssembleOptions,
) -> Result<TicketSnapshot> {
    assemble(gateway, id, options)
        .await?
        .ok_or_else(|| Error::TicketNotFound(id.to_string()))
}

/// Assemble several tickets concurrently, skipping ones that decode empty.
pub async fn assemble_many(
    gateway: &Gateway,
    ids: &[String],
    options: &AssembleOptions,
) -> Result<Vec<TicketSnapshot>> {
    let results = futures::future::join_all(
        ids.iter().map(|id| assemble(gateway, id, options)),
    )
    .await;

    let mut snapshots = Vec::with_capacity(ids.len());
    for (id, result) in ids.iter().zip(results) {
        match result? {
            Some(snapshot) => snapshots.push(snapshot),
            None => tracing::warn!(ticket = %id, "no ticket id in response, skipping"),
        }
    }
    Ok(snapshots)
}
