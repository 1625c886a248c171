//! rtsync pull: fetch tickets and write them into the local mirror.

use serde::Serialize;

use super::{block_on, Context};
use crate::error::Result;
use crate::mirror::Mirror;
use crate::output::{emit_success, HumanOutput};
use crate::snapshot::{self, AssembleOptions};

#[derive(Serialize)]
struct PulledTicket {
    id: String,
    location: String,
}

#[derive(Serialize)]
struct PullReport {
    mirror: String,
    pulled: Vec<PulledTicket>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    missing: Vec<String>,
}

pub fn run(context: &Context, ids: &[String]) -> Result<()> {
    let gateway = context.gateway()?;
    let mirror = context.mirror();
    let options = AssembleOptions {
        extra_fields: context.config.fields.extra.clone(),
        ..AssembleOptions::default()
    };

    let snapshots = block_on(snapshot::assemble_many(&gateway, ids, &options))?;

    let mut pulled = Vec::with_capacity(snapshots.len());
    for snapshot in &snapshots {
        let location = mirror.store_snapshot(snapshot)?;
        pulled.push(PulledTicket {
            id: snapshot.id.clone(),
            location,
        });
    }
    let missing: Vec<String> = ids
        .iter()
        .filter(|id| !pulled.iter().any(|ticket| &ticket.id == *id))
        .cloned()
        .collect();

    let mut human = HumanOutput::new(format!("Pulled {} ticket(s)", pulled.len()));
    human.push_summary("Mirror", mirror.path().display().to_string());
    for ticket in &pulled {
        human.push_detail(format!("#{} -> {}", ticket.id, ticket.location));
    }
    for id in &missing {
        human.push_warning(format!("ticket {id} not found"));
    }

    let report = PullReport {
        mirror: mirror.path().display().to_string(),
        pulled,
        missing,
    };
    emit_success(context.output, "pull", &report, Some(&human))
}
