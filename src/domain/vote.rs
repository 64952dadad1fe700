use serde::{Deserialize, Serialize};

use super::primitives::{CompetitorId, MatchupId, TimeMs, VoteId, VoterId};

/// The durable outcome of one voter's choice within one matchup.
///
/// Before/after ratings are captured at vote time so that undo can restore
/// the exact prior ratings without re-running the rating math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRecord {
    pub id: VoteId,
    pub matchup_id: MatchupId,
    pub winner_id: CompetitorId,
    pub loser_id: CompetitorId,
    pub winner_rating_before: i64,
    pub winner_rating_after: i64,
    pub loser_rating_before: i64,
    pub loser_rating_after: i64,
    pub timestamp: TimeMs,
    pub voter_id: VoterId,
    pub influence_gained: i64,
    pub undo_expires_at: TimeMs,
}

impl VoteRecord {
    /// Undo is allowed up to and including the deadline.
    pub fn is_undoable_at(&self, now: TimeMs) -> bool {
        now <= self.undo_expires_at
    }

    pub fn involves(&self, id: &CompetitorId) -> bool {
        &self.winner_id == id || &self.loser_id == id
    }
}

/// Why a vote was refused without touching any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    AlreadyVoted,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rejection::AlreadyVoted => write!(f, "Already voted on this matchup"),
        }
    }
}

/// Result of casting a vote: either recorded, or rejected as a business rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastOutcome {
    Recorded(VoteRecord),
    Rejected(Rejection),
}

impl CastOutcome {
    pub fn vote(&self) -> Option<&VoteRecord> {
        match self {
            CastOutcome::Recorded(vote) => Some(vote),
            CastOutcome::Rejected(_) => None,
        }
    }
}
