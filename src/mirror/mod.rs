//! Local mirror of remote tickets.
//!
//! The mirror is a property store keyed by location. Each location holds
//! single-valued properties and multi-valued properties (ordered sets of
//! strings); the remote ticket id is kept in a configurable property so a
//! ticket can be found again by its external id.
//!
//! [`MemoryMirror`] keeps the document in memory. [`FileMirror`] keeps it in
//! a JSON file and locks around every read-modify-write. Both share the
//! [`MirrorDocument`] logic.

mod file;
mod names;

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::links::LocalRelation;
use crate::snapshot::TicketSnapshot;

pub use file::FileMirror;
pub use names::NameCache;

/// Property holding the ticket description.
pub const DESCRIPTION_PROPERTY: &str = "Description";

/// Property store the link synchronizer and `pull` write through.
pub trait Mirror: Send + Sync {
    fn get_property(&self, location: &str, name: &str) -> Result<Option<String>>;
    fn set_property(&self, location: &str, name: &str, value: &str) -> Result<()>;
    fn get_multi(&self, location: &str, name: &str) -> Result<Vec<String>>;
    /// Add `value` unless already present.
    fn add_to_multi(&self, location: &str, name: &str, value: &str) -> Result<()>;
    /// Remove `value`; absent values are not an error.
    fn remove_from_multi(&self, location: &str, name: &str, value: &str) -> Result<()>;
    fn find_location_by_external_id(&self, id: &str) -> Result<Option<String>>;
    /// Write a snapshot, creating the location if needed. Returns the location.
    fn store_snapshot(&self, snapshot: &TicketSnapshot) -> Result<String>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorEntry {
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    #[serde(default)]
    pub multi: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
}

/// On-disk shape of the mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorDocument {
    #[serde(default)]
    pub entries: BTreeMap<String, MirrorEntry>,
    /// Persisted id -> display name table.
    #[serde(default)]
    pub names: BTreeMap<String, String>,
}

impl MirrorDocument {
    fn entry(&self, location: &str) -> Option<&MirrorEntry> {
        self.entries.get(location)
    }

    fn entry_mut(&mut self, location: &str) -> Result<&mut MirrorEntry> {
        self.entries
            .get_mut(location)
            .ok_or_else(|| Error::InvalidArgument(format!("unknown mirror location '{location}'")))
    }

    pub fn get_property(&self, location: &str, name: &str) -> Option<String> {
        self.entry(location)
            .and_then(|entry| entry.properties.get(name).cloned())
    }

    pub fn set_property(&mut self, location: &str, name: &str, value: &str) -> Result<()> {
        self.entry_mut(location)?
            .properties
            .insert(name.to_string(), value.to_string());
        Ok(())
    }

    pub fn get_multi(&self, location: &str, name: &str) -> Vec<String> {
        self.entry(location)
            .and_then(|entry| entry.multi.get(name).cloned())
            .unwrap_or_default()
    }

    pub fn add_to_multi(&mut self, location: &str, name: &str, value: &str) -> Result<()> {
        let values = self.entry_mut(location)?.multi.entry(name.to_string()).or_default();
        if !values.iter().any(|existing| existing == value) {
            values.push(value.to_string());
        }
        Ok(())
    }

    pub fn remove_from_multi(&mut self, location: &str, name: &str, value: &str) -> Result<()> {
        if let Some(values) = self.entry_mut(location)?.multi.get_mut(name) {
            values.retain(|existing| existing != value);
        }
        Ok(())
    }

    pub fn find_location(&self, id_property: &str, id: &str) -> Option<String> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.properties.get(id_property).map(String::as_str) == Some(id))
            .map(|(location, _)| location.clone())
    }

    /// Create an entry for `id` and return its new location.
    pub fn create_location(&mut self, id_property: &str, id: &str) -> String {
        let location = Uuid::new_v4().to_string();
        let mut entry = MirrorEntry::default();
        entry
            .properties
            .insert(id_property.to_string(), id.to_string());
        self.entries.insert(location.clone(), entry);
        location
    }

    /// Replace the mirrored view of one ticket with `snapshot`.
    ///
    /// Remote fields overwrite local ones of the same name; local-only
    /// properties are left alone. Relation sets are replaced wholesale.
    pub fn store_snapshot(&mut self, id_property: &str, snapshot: &TicketSnapshot) -> String {
        let location = self
            .find_location(id_property, &snapshot.id)
            .unwrap_or_else(|| self.create_location(id_property, &snapshot.id));

        let entry = self.entries.entry(location.clone()).or_default();
        for (name, value) in &snapshot.fields {
            entry.properties.insert(name.clone(), value.clone());
        }
        if let Some(description) = &snapshot.description {
            entry
                .properties
                .insert(DESCRIPTION_PROPERTY.to_string(), description.clone());
        }
        for local in LocalRelation::ALL {
            let mut peers: Vec<String> = Vec::new();
            for peer in snapshot.links.peers(local.to_remote()) {
                if !peers.contains(peer) {
                    peers.push(peer.clone());
                }
            }
            entry.multi.insert(local.as_str().to_string(), peers);
        }
        entry.synced_at = Some(Utc::now());
        location
    }
}

/// In-memory mirror.
#[derive(Debug)]
pub struct MemoryMirror {
    document: RwLock<MirrorDocument>,
    id_property: String,
}

impl MemoryMirror {
    pub fn new(id_property: impl Into<String>) -> Self {
        Self {
            document: RwLock::new(MirrorDocument::default()),
            id_property: id_property.into(),
        }
    }

    /// Add an entry for `id` and return its location.
    pub fn insert_ticket(&self, id: &str) -> String {
        let mut document = self.document.write().unwrap_or_else(|err| err.into_inner());
        document.create_location(&self.id_property, id)
    }

    pub fn document(&self) -> MirrorDocument {
        self.read().clone()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, MirrorDocument> {
        self.document.read().unwrap_or_else(|err| err.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, MirrorDocument> {
        self.document.write().unwrap_or_else(|err| err.into_inner())
    }
}

impl Mirror for MemoryMirror {
    fn get_property(&self, location: &str, name: &str) -> Result<Option<String>> {
        Ok(self.read().get_property(location, name))
    }

    fn set_property(&self, location: &str, name: &str, value: &str) -> Result<()> {
        self.write().set_property(location, name, value)
    }

    fn get_multi(&self, location: &str, name: &str) -> Result<Vec<String>> {
        Ok(self.read().get_multi(location, name))
    }

    fn add_to_multi(&self, location: &str, name: &str, value: &str) -> Result<()> {
        self.write().add_to_multi(location, name, value)
    }

    fn remove_from_multi(&self, location: &str, name: &str, value: &str) -> Result<()> {
        self.write().remove_from_multi(location, name, value)
    }

    fn find_location_by_external_id(&self, id: &str) -> Result<Option<String>> {
        Ok(self.read().find_location(&self.id_property, id))
    }

    fn store_snapshot(&self, snapshot: &TicketSnapshot) -> Result<String> {
        Ok(self.write().store_snapshot(&self.id_property, snapshot))
    }
}
