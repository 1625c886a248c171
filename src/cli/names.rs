//! rtsync names refresh|get

use serde::Serialize;

use super::{block_on, Context};
use crate::error::{Error, Result};
use crate::mirror::NameCache;
use crate::output::{emit_success, HumanOutput};

#[derive(Serialize)]
struct RefreshReport<'a> {
    query: &'a str,
    entries: usize,
}

pub fn run_refresh(context: &Context, query: &str) -> Result<()> {
    let gateway = context.gateway()?;
    let cache = NameCache::global();
    let table = block_on(cache.refresh_from_remote(&gateway, query))?;
    context.mirror().replace_names(&table)?;

    let mut human = HumanOutput::new(format!("Name table rebuilt: {} entries", table.len()));
    human.push_summary("Query", query);
    emit_success(
        context.output,
        "names refresh",
        &RefreshReport {
            query,
            entries: table.len(),
        },
        Some(&human),
    )
}

#[derive(Serialize)]
struct NameReport<'a> {
    id: &'a str,
    name: String,
}

pub fn run_get(context: &Context, id: &str) -> Result<()> {
    let cache = NameCache::global();
    if cache.is_empty() {
        cache.refresh(context.mirror().load_names()?);
    }
    let name = cache
        .get(id)
        .ok_or_else(|| Error::TicketNotFound(id.to_string()))?;

    let human = HumanOutput::new(format!("#{id} {name}"));
    emit_success(context.output, "names get", &NameReport { id, name }, Some(&human))
}
