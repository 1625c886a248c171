use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use crate::error::Result;
use crate::gateway::Gateway;

static GLOBAL: Lazy<NameCache> = Lazy::new(NameCache::new);

/// Process-wide ticket id -> display name table.
///
/// Readers take an `Arc` snapshot of the whole table. `refresh` builds a
/// new table and swaps it in at once, so a reader sees either the old
/// table or the new one, never a mix.
#[derive(Debug, Default)]
pub struct NameCache {
    table: RwLock<Arc<HashMap<String, String>>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> &'static NameCache {
        &GLOBAL
    }

    pub fn snapshot(&self) -> Arc<HashMap<String, String>> {
        Arc::clone(&self.table.read().unwrap_or_else(|err| err.into_inner()))
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.snapshot().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// Replace the whole table and return the new snapshot.
    pub fn refresh(&self, table: HashMap<String, String>) -> Arc<HashMap<String, String>> {
        let table = Arc::new(table);
        *self.table.write().unwrap_or_else(|err| err.into_inner()) = Arc::clone(&table);
        tracing::debug!(entries = table.len(), "name cache refreshed");
        table
    }

    /// Rebuild from the subjects of tickets matching `query`.
    ///
    /// The old table stays in place if the search fails.
    pub async fn refresh_from_remote(
        &self,
        gateway: &Gateway,
        query: &str,
    ) -> Result<Arc<HashMap<String, String>>> {
        let pairs = gateway.search_subjects(query).await?;
        Ok(self.refresh(pairs.into_iter().collect()))
    }
}
