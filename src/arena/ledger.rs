//! VoteLedger: records votes and reverses them inside the undo window.

use tracing::{debug, info};

use crate::domain::{CastOutcome, CompetitorId, MatchupId, VoteId, VoteRecord, VoterId};
use crate::error::LedgerError;

use super::events::ChangeKind;
use super::Shared;

/// Upper bound on `recent` page sizes.
pub const MAX_RECENT_VOTES: i64 = 500;

#[derive(Clone)]
pub struct VoteLedger {
    shared: Shared,
}

impl VoteLedger {
    pub(crate) fn new(shared: Shared) -> Self {
        Self { shared }
    }

    /// Record `voter_id` picking `winner_id` in `matchup_id`.
    ///
    /// A repeat vote on the same matchup by the same voter comes back as
    /// `CastOutcome::Rejected` and changes nothing.
    pub async fn record(
        &self,
        matchup_id: &MatchupId,
        winner_id: &CompetitorId,
        voter_id: &VoterId,
    ) -> Result<CastOutcome, LedgerError> {
        let params = self.shared.params;
        let committed = self
            .shared
            .write("record_vote", || {
                let now = self.shared.clock.now();
                self.shared
                    .repo
                    .record_vote(matchup_id, winner_id, voter_id, &params, now)
            })
            .await?;

        match &committed.value {
            CastOutcome::Recorded(vote) => {
                info!(
                    vote = %vote.id,
                    matchup = %vote.matchup_id,
                    winner = %vote.winner_id,
                    loser = %vote.loser_id,
                    winner_rating = vote.winner_rating_after,
                    loser_rating = vote.loser_rating_after,
                    influence = vote.influence_gained,
                    "Vote recorded"
                );
                self.shared.feed.publish(
                    committed.world_version,
                    ChangeKind::VoteRecorded(vote.id.clone()),
                );
            }
            CastOutcome::Rejected(reason) => {
                debug!(matchup = %matchup_id, voter = %voter_id, %reason, "Vote rejected");
            }
        }
        Ok(committed.value)
    }

    /// Reverse a vote. Returns `false` when the vote does not exist or its
    /// undo deadline has passed; nothing is changed in either case.
    ///
    /// The deadline is checked against the clock when the undo is applied,
    /// after any wait for the write lock.
    pub async fn undo(&self, vote_id: &VoteId) -> Result<bool, LedgerError> {
        let params = self.shared.params;
        let committed = self
            .shared
            .write("undo_vote", || {
                let now = self.shared.clock.now();
                self.shared.repo.undo_vote(vote_id, &params, now)
            })
            .await?;

        match committed {
            Some(committed) => {
                info!(vote = %vote_id, "Vote undone");
                self.shared.feed.publish(
                    committed.world_version,
                    ChangeKind::VoteUndone(vote_id.clone()),
                );
                Ok(true)
            }
            None => {
                debug!(vote = %vote_id, "Undo refused");
                Ok(false)
            }
        }
    }

    /// Most recent votes, newest first, at most `limit` of them.
    pub async fn recent(&self, limit: i64) -> Result<Vec<VoteRecord>, LedgerError> {
        self.shared
            .repo
            .recent_votes(limit.clamp(0, MAX_RECENT_VOTES))
            .await
    }

    /// The vote, if any, `voter_id` has standing on `matchup_id`.
    pub async fn ballot(
        &self,
        matchup_id: &MatchupId,
        voter_id: &VoterId,
    ) -> Result<Option<VoteRecord>, LedgerError> {
        self.shared.repo.get_ballot(matchup_id, voter_id).await
    }
}
