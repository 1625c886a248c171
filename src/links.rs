//! Link synchronization.
//!
//! A link change names a parent, a child, a [`RelationKind`] and an
//! operation. Each kind maps to one remote relation per side and one local
//! property name per side through fixed tables; nothing is inferred.
//!
//! Planning is pure: [`plan_link_change`] takes the current link sets of
//! both endpoints and returns the two peer lists to write. The
//! [`LinkSynchronizer`] drives the remote reads and writes around it and
//! touches the mirror only after both writes have succeeded.
//!
//! The two remote writes are not transactional. If the process dies
//! between them the remote endpoints disagree until the change is retried.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gateway::{link_payload, Gateway};
use crate::mirror::Mirror;
use crate::protocol::{LinkSet, Relation};

/// The three link families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    /// Parent/child.
    Member,
    /// Blocking/blocked-by.
    Dependency,
    Reference,
}

/// Human-facing relation names used in the mirror.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LocalRelation {
    Children,
    Parents,
    Blocking,
    Blockers,
    RefersTo,
    ReferredToBy,
}

struct KindNames {
    parent_remote: Relation,
    child_remote: Relation,
    parent_local: LocalRelation,
    child_local: LocalRelation,
}

const MEMBER: KindNames = KindNames {
    parent_remote: Relation::Members,
    child_remote: Relation::MemberOf,
    parent_local: LocalRelation::Children,
    child_local: LocalRelation::Parents,
};

const DEPENDENCY: KindNames = KindNames {
    parent_remote: Relation::DependedOnBy,
    child_remote: Relation::DependsOn,
    parent_local: LocalRelation::Blocking,
    child_local: LocalRelation::Blockers,
};

const REFERENCE: KindNames = KindNames {
    parent_remote: Relation::RefersTo,
    child_remote: Relation::ReferredToBy,
    parent_local: LocalRelation::RefersTo,
    child_local: LocalRelation::ReferredToBy,
};

impl RelationKind {
    pub const ALL: [RelationKind; 3] = [
        RelationKind::Member,
        RelationKind::Dependency,
        RelationKind::Reference,
    ];

    fn names(self) -> &'static KindNames {
        match self {
            RelationKind::Member => &MEMBER,
            RelationKind::Dependency => &DEPENDENCY,
            RelationKind::Reference => &REFERENCE,
        }
    }

    /// Relation the parent holds its children under.
    pub fn parent_relation(self) -> Relation {
        self.names().parent_remote
    }

    /// Relation the child holds its parents under.
    pub fn child_relation(self) -> Relation {
        self.names().child_remote
    }

    pub fn parent_local(self) -> LocalRelation {
        self.names().parent_local
    }

    pub fn child_local(self) -> LocalRelation {
        self.names().child_local
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::Member => "member",
            RelationKind::Dependency => "dependency",
            RelationKind::Reference => "reference",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(RelationKind::Member),
            "dependency" => Ok(RelationKind::Dependency),
            "reference" => Ok(RelationKind::Reference),
            other => Err(Error::InvalidArgument(format!(
                "unknown relation kind '{other}' (expected member|dependency|reference)"
            ))),
        }
    }
}

impl LocalRelation {
    pub const ALL: [LocalRelation; 6] = [
        LocalRelation::Children,
        LocalRelation::Parents,
        LocalRelation::Blocking,
        LocalRelation::Blockers,
        LocalRelation::RefersTo,
        LocalRelation::ReferredToBy,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            LocalRelation::Children => "Children",
            LocalRelation::Parents => "Parents",
            LocalRelation::Blocking => "Blocking",
            LocalRelation::Blockers => "Blockers",
            LocalRelation::RefersTo => "RefersTo",
            LocalRelation::ReferredToBy => "ReferredToBy",
        }
    }

    pub fn from_remote(relation: Relation) -> Self {
        match relation {
            Relation::Members => LocalRelation::Children,
            Relation::MemberOf => LocalRelation::Parents,
            Relation::DependedOnBy => LocalRelation::Blocking,
            Relation::DependsOn => LocalRelation::Blockers,
            Relation::RefersTo => LocalRelation::RefersTo,
            Relation::ReferredToBy => LocalRelation::ReferredToBy,
        }
    }

    pub fn to_remote(self) -> Relation {
        match self {
            LocalRelation::Children => Relation::Members,
            LocalRelation::Parents => Relation::MemberOf,
            LocalRelation::Blocking => Relation::DependedOnBy,
            LocalRelation::Blockers => Relation::DependsOn,
            LocalRelation::RefersTo => Relation::RefersTo,
            LocalRelation::ReferredToBy => Relation::ReferredToBy,
        }
    }
}

impl fmt::Display for LocalRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkOp {
    Attach,
    Detach,
}

impl LinkOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LinkOp::Attach => "attach",
            LinkOp::Detach => "detach",
        }
    }
}

/// A requested link mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkChange {
    pub parent: String,
    pub child: String,
    pub kind: RelationKind,
    pub op: LinkOp,
    /// Skip reading current links and overwrite them.
    pub clobber: bool,
}

impl LinkChange {
    pub fn new(parent: impl Into<String>, child: impl Into<String>, kind: RelationKind, op: LinkOp) -> Self {
        Self {
            parent: parent.into(),
            child: child.into(),
            kind,
            op,
            clobber: false,
        }
    }

    pub fn clobber(mut self, clobber: bool) -> Self {
        self.clobber = clobber;
        self
    }
}

/// The two peer lists a change writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkPlan {
    pub parent: String,
    pub child: String,
    pub parent_relation: Relation,
    pub child_relation: Relation,
    pub parent_peers: Vec<String>,
    pub child_peers: Vec<String>,
}

impl LinkPlan {
    pub fn parent_payload(&self) -> String {
        link_payload(self.parent_relation, &self.parent_peers)
    }

    pub fn child_payload(&self) -> String {
        link_payload(self.child_relation, &self.child_peers)
    }
}

/// Apply one operation to an existing peer list.
///
/// Attach prepends without deduplicating, so attaching twice lists the
/// peer twice. Detach removes every occurrence; detaching an absent peer
/// returns the list unchanged.
pub fn apply_op(op: LinkOp, existing: &[String], peer: &str) -> Vec<String> {
    match op {
        LinkOp::Attach => {
            let mut peers = Vec::with_capacity(existing.len() + 1);
            peers.push(peer.to_string());
            peers.extend(existing.iter().cloned());
            peers
        }
        LinkOp::Detach => existing
            .iter()
            .filter(|existing| existing.as_str() != peer)
            .cloned()
            .collect(),
    }
}

/// Compute both sides of a change from the endpoints' current links.
pub fn plan_link_change(change: &LinkChange, parent_links: &LinkSet, child_links: &LinkSet) -> LinkPlan {
    let parent_relation = change.kind.parent_relation();
    let child_relation = change.kind.child_relation();

    LinkPlan {
        parent: change.parent.clone(),
        child: change.child.clone(),
        parent_relation,
        child_relation,
        parent_peers: apply_op(change.op, parent_links.peers(parent_relation), &change.child),
        child_peers: apply_op(change.op, child_links.peers(child_relation), &change.parent),
    }
}

/// Steps of one synchronization run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    ComputeExisting,
    ComputeNewSets,
    WriteParentSide,
    WriteChildSide,
    UpdateMirror,
    Done,
}

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct LinkOutcome {
    pub plan: LinkPlan,
    pub mirror_updated: bool,
    /// Endpoints with no mirror entry.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mirror_missing: Vec<String>,
}

/// Drives one link change against the gateway and, optionally, a mirror.
pub struct LinkSynchronizer<'a> {
    gateway: &'a Gateway,
    mirror: Option<&'a dyn Mirror>,
    allow_self_link: bool,
}

impl<'a> LinkSynchronizer<'a> {
    pub fn new(gateway: &'a Gateway) -> Self {
        Self {
            gateway,
            mirror: None,
            allow_self_link: false,
        }
    }

    pub fn with_mirror(mut self, mirror: &'a dyn Mirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    pub fn allow_self_link(mut self, allow: bool) -> Self {
        self.allow_self_link = allow;
        self
    }

    pub async fn run(&self, change: &LinkChange) -> Result<LinkOutcome> {
        validate_id(&change.parent)?;
        validate_id(&change.child)?;
        if change.parent == change.child && !self.allow_self_link {
            return Err(Error::SelfLink(change.parent.clone()));
        }

        enter(SyncState::ComputeExisting, change);
        let (parent_links, child_links) = if change.clobber {
            (LinkSet::new(), LinkSet::new())
        } else {
            self.fetch_existing(change).await?
        };

        enter(SyncState::ComputeNewSets, change);
        let plan = plan_link_change(change, &parent_links, &child_links);

        // Both writes are attempted even when the first fails.
        enter(SyncState::WriteParentSide, change);
        let parent_write = self
            .gateway
            .set_links(&plan.parent, plan.parent_relation, &plan.parent_peers)
            .await;

        enter(SyncState::WriteChildSide, change);
        let child_write = self
            .gateway
            .set_links(&plan.child, plan.child_relation, &plan.child_peers)
            .await;

        match (parent_write, child_write) {
            (Ok(_), Ok(_)) => {}
            (Err(err), Ok(_)) => {
                return Err(inconsistency(&plan.child, &plan.parent, err));
            }
            (Ok(_), Err(err)) => {
                return Err(inconsistency(&plan.parent, &plan.child, err));
            }
            (Err(err), Err(child_err)) => {
                tracing::debug!(error = %child_err, "child side write also failed");
                return Err(err);
            }
        }

        let mut outcome = LinkOutcome {
            plan,
            mirror_updated: false,
            mirror_missing: Vec::new(),
        };

        if let Some(mirror) = self.mirror {
            enter(SyncState::UpdateMirror, change);
            // Both remote writes have landed by now.
            outcome.mirror_missing =
                update_mirror(mirror, change).map_err(|err| Error::MirrorNotUpdated {
                    written: vec![change.parent.clone(), change.child.clone()],
                    message: err.to_string(),
                })?;
            outcome.mirror_updated = true;
        }

        enter(SyncState::Done, change);
        Ok(outcome)
    }

    async fn fetch_existing(&self, change: &LinkChange) -> Result<(LinkSet, LinkSet)> {
        let ids = vec![change.parent.clone(), change.child.clone()];
        let fetched = self.gateway.links_batch(&ids).await?;

        let find = |id: &str| {
            fetched
                .iter()
                .find(|(key, _)| key == id)
                .map(|(_, links)| links.clone())
                .unwrap_or_default()
        };
        Ok((find(&change.parent), find(&change.child)))
    }
}

fn enter(state: SyncState, change: &LinkChange) {
    tracing::debug!(
        state = ?state,
        parent = %change.parent,
        child = %change.child,
        kind = %change.kind,
        op = change.op.as_str(),
        "link sync"
    );
}

fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(Error::InvalidArgument(format!(
            "ticket id must be numeric (got '{id}')"
        )));
    }
    Ok(())
}

fn inconsistency(written: &str, failed: &str, err: Error) -> Error {
    Error::SyncInconsistency {
        written: vec![written.to_string()],
        failed: vec![failed.to_string()],
        message: err.to_string(),
    }
}

/// Apply the change to the local relation properties of both endpoints.
///
/// The parent's local relation gains or loses the child, and the child's
/// gains or loses the parent. Returns endpoints with no mirror entry.
fn update_mirror(mirror: &dyn Mirror, change: &LinkChange) -> Result<Vec<String>> {
    let sides = [
        (&change.parent, change.kind.parent_local(), &change.child),
        (&change.child, change.kind.child_local(), &change.parent),
    ];

    let mut missing = Vec::new();
    for (endpoint, local, peer) in sides {
        let Some(location) = mirror.find_location_by_external_id(endpoint)? else {
            tracing::warn!(ticket = %endpoint, "no mirror entry for ticket, skipping");
            if !missing.contains(endpoint) {
                missing.push(endpoint.clone());
            }
            continue;
        };
        match change.op {
            LinkOp::Attach => mirror.add_to_multi(&location, local.as_str(), peer)?,
            LinkOp::Detach => mirror.remove_from_multi(&location, local.as_str(), peer)?,
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn relation_tables_are_fixed() {
        let table: Vec<_> = RelationKind::ALL
            .into_iter()
            .map(|kind| {
                (
                    kind.parent_relation().as_str(),
                    kind.child_relation().as_str(),
                    kind.parent_local().as_str(),
                    kind.child_local().as_str(),
                )
            })
            .collect();
        assert_eq!(
            table,
            vec![
                ("Members", "MemberOf", "Children", "Parents"),
                ("DependedOnBy", "DependsOn", "Blocking", "Blockers"),
                ("RefersTo", "ReferredToBy", "RefersTo", "ReferredToBy"),
            ]
        );
    }

    #[test]
    fn local_and_remote_names_round_trip() {
        for local in LocalRelation::ALL {
            assert_eq!(LocalRelation::from_remote(local.to_remote()), local);
        }
        for relation in Relation::ALL {
            assert_eq!(LocalRelation::from_remote(relation).to_remote(), relation);
        }
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!("Dependency".parse::<RelationKind>().unwrap(), RelationKind::Dependency);
        assert!(matches!(
            "blocks".parse::<RelationKind>(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn attach_to_empty_produces_expected_payloads() {
        let change = LinkChange::new("10", "20", RelationKind::Dependency, LinkOp::Attach);
        let plan = plan_link_change(&change, &LinkSet::new(), &LinkSet::new());
        assert_eq!(plan.parent_payload(), "DependedOnBy: 20");
        assert_eq!(plan.child_payload(), "DependsOn: 10");
    }

    #[test]
    fn attach_prepends_without_dedup() {
        assert_eq!(
            apply_op(LinkOp::Attach, &ids(&["7", "20"]), "20"),
            ids(&["20", "7", "20"])
        );
    }

    #[test]
    fn detach_removes_every_occurrence() {
        assert_eq!(
            apply_op(LinkOp::Detach, &ids(&["20", "7", "20"]), "20"),
            ids(&["7"])
        );
    }

    #[test]
    fn detach_of_absent_peer_is_unchanged() {
        let existing = ids(&["3", "5"]);
        assert_eq!(apply_op(LinkOp::Detach, &existing, "9"), existing);
        assert!(apply_op(LinkOp::Detach, &[], "9").is_empty());
    }

    #[test]
    fn plan_reads_each_side_under_its_own_relation() {
        let mut parent_links = LinkSet::new();
        parent_links.push(Relation::Members, "31");
        parent_links.push(Relation::MemberOf, "99");
        let mut child_links = LinkSet::new();
        child_links.push(Relation::MemberOf, "40");

        let change = LinkChange::new("1", "2", RelationKind::Member, LinkOp::Attach);
        let plan = plan_link_change(&change, &parent_links, &child_links);
        assert_eq!(plan.parent_peers, ids(&["2", "31"]));
        assert_eq!(plan.child_peers, ids(&["1", "40"]));
    }

    #[test]
    fn attach_then_detach_restores_sets() {
        let mut parent_links = LinkSet::new();
        parent_links.push(Relation::RefersTo, "5");
        let mut child_links = LinkSet::new();
        child_links.push(Relation::ReferredToBy, "6");

        let attach = LinkChange::new("1", "2", RelationKind::Reference, LinkOp::Attach);
        let attached = plan_link_change(&attach, &parent_links, &child_links);

        let mut parent_after = LinkSet::new();
        parent_after.set(Relation::RefersTo, attached.parent_peers);
        let mut child_after = LinkSet::new();
        child_after.set(Relation::ReferredToBy, attached.child_peers);

        let detach = LinkChange::new("1", "2", RelationKind::Reference, LinkOp::Detach);
        let detached = plan_link_change(&detach, &parent_after, &child_after);
        assert_eq!(detached.parent_peers, ids(&["5"]));
        assert_eq!(detached.child_peers, ids(&["6"]));
    }
}
