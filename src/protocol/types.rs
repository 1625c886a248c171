//! Decoded record types.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered `(name, value)` pairs. Names may repeat.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldRecord {
    fields: Vec<(String, String)>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// Value of the first field called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Every value recorded under `name`, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.fields
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str, &str) -> bool,
    {
        self.fields.retain(|(name, value)| keep(name, value));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, String)> {
        self.fields
    }
}

impl FromIterator<(String, String)> for FieldRecord {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// The six link relations known to the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Relation {
    MemberOf,
    Members,
    DependsOn,
    DependedOnBy,
    RefersTo,
    ReferredToBy,
}

impl Relation {
    pub const ALL: [Relation; 6] = [
        Relation::MemberOf,
        Relation::Members,
        Relation::DependsOn,
        Relation::DependedOnBy,
        Relation::RefersTo,
        Relation::ReferredToBy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Relation::MemberOf => "MemberOf",
            Relation::Members => "Members",
            Relation::DependsOn => "DependsOn",
            Relation::DependedOnBy => "DependedOnBy",
            Relation::RefersTo => "RefersTo",
            Relation::ReferredToBy => "ReferredToBy",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|relation| relation.as_str() == name)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Peer ticket ids per relation, in response order. Not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkSet {
    peers: BTreeMap<Relation, Vec<String>>,
}

impl LinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, relation: Relation, peer: impl Into<String>) {
        self.peers.entry(relation).or_default().push(peer.into());
    }

    pub fn set(&mut self, relation: Relation, peers: Vec<String>) {
        self.peers.insert(relation, peers);
    }

    pub fn peers(&self, relation: Relation) -> &[String] {
        self.peers
            .get(&relation)
            .map(|peers| peers.as_slice())
            .unwrap_or(&[])
    }

    /// Space-joined peers; empty string when the relation has none.
    pub fn joined(&self, relation: Relation) -> String {
        self.peers(relation).join(" ")
    }

    pub fn iter(&self) -> impl Iterator<Item = (Relation, &[String])> {
        self.peers
            .iter()
            .map(|(relation, peers)| (*relation, peers.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.peers.values().all(|peers| peers.is_empty())
    }
}

/// Fields kept when a history entry is projected as a comment.
pub const COMMENT_FIELDS: [&str; 4] = ["Created", "Creator", "Content", "id"];

/// Transaction types shown as comments.
const COMMENT_TYPES: [&str; 2] = ["Comment", "Correspond"];

/// One transaction from a ticket's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Transaction id, distinct from the ticket id.
    pub id: String,
    pub fields: FieldRecord,
}

impl HistoryEntry {
    pub fn kind(&self) -> Option<&str> {
        self.fields.get("Type")
    }

    pub fn is_comment(&self) -> bool {
        self.kind()
            .is_some_and(|kind| COMMENT_TYPES.contains(&kind))
    }

    /// The comment view: only `Created`, `Creator`, `Content` and `id`.
    pub fn comment_projection(&self) -> Option<HistoryEntry> {
        if !self.is_comment() {
            return None;
        }
        let mut fields = self.fields.clone();
        fields.retain(|name, _| COMMENT_FIELDS.contains(&name));
        Some(HistoryEntry {
            id: self.id.clone(),
            fields,
        })
    }
}
