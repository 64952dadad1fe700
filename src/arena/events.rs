//! Best-effort change notifications for listeners that cache world state.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

use crate::domain::{CompetitorId, MatchupId, VoteId, VoterId};

/// What changed. Serialized as `{"type": ..., "id": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "id", rename_all = "camelCase")]
pub enum ChangeKind {
    CompetitorCreated(CompetitorId),
    CompetitorUpdated(CompetitorId),
    CompetitorDeleted(CompetitorId),
    MatchupCreated(MatchupId),
    VoteRecorded(VoteId),
    VoteUndone(VoteId),
    VoterUpdated(VoterId),
    WorldImported,
}

impl ChangeKind {
    /// Event name used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ChangeKind::CompetitorCreated(_) => "competitorCreated",
            ChangeKind::CompetitorUpdated(_) => "competitorUpdated",
            ChangeKind::CompetitorDeleted(_) => "competitorDeleted",
            ChangeKind::MatchupCreated(_) => "matchupCreated",
            ChangeKind::VoteRecorded(_) => "voteRecorded",
            ChangeKind::VoteUndone(_) => "voteUndone",
            ChangeKind::VoterUpdated(_) => "voterUpdated",
            ChangeKind::WorldImported => "worldImported",
        }
    }
}

/// A committed change together with the world version it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub world_version: i64,
    #[serde(flatten)]
    pub kind: ChangeKind,
}

/// Fan-out of [`StateChange`] events. Subscribers that fall behind lose the
/// oldest events and should refresh their view.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<StateChange>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, world_version: i64, kind: ChangeKind) {
        let change = StateChange {
            world_version,
            kind,
        };
        if self.sender.send(change).is_err() {
            trace!(world_version, "No change listeners");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.sender.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(256)
    }
}
