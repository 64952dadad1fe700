//! Vote ledger operations for the repository.
//!
//! `record_vote` and `undo_vote` each load, plan and write inside a single
//! transaction. A vote is never half-applied: any early return or error drops
//! the transaction, which rolls back every statement including the world
//! version bump.

use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use tracing::debug;

use crate::domain::{
    CastOutcome, CompetitorId, MatchupId, Rejection, TimeMs, VoteId, VoteRecord, VoterAccount,
    VoterId,
};
use crate::engine::{plan_undo, plan_vote, LedgerParams, UndoInputs};
use crate::error::LedgerError;

use super::competitors::{competitor_ids, fetch_competitor, save_standing};
use super::matchups::fetch_matchup;
use super::voters::{fetch_voter_account, revoke_achievements, save_voter_account};
use super::{bump_world_version, Analytics, Committed, Repository};

const VOTE_COLUMNS: &str = "id, matchup_id, winner_id, loser_id, winner_rating_before, winner_rating_after, \
     loser_rating_before, loser_rating_after, time_ms, voter_id, influence_gained, undo_expires_at";

fn vote_from_row(row: &SqliteRow) -> VoteRecord {
    VoteRecord {
        id: VoteId::new(row.get::<String, _>("id")),
        matchup_id: MatchupId::new(row.get::<String, _>("matchup_id")),
        winner_id: CompetitorId::new(row.get::<String, _>("winner_id")),
        loser_id: CompetitorId::new(row.get::<String, _>("loser_id")),
        winner_rating_before: row.get("winner_rating_before"),
        winner_rating_after: row.get("winner_rating_after"),
        loser_rating_before: row.get("loser_rating_before"),
        loser_rating_after: row.get("loser_rating_after"),
        timestamp: TimeMs::new(row.get("time_ms")),
        voter_id: VoterId::new(row.get::<String, _>("voter_id")),
        influence_gained: row.get("influence_gained"),
        undo_expires_at: TimeMs::new(row.get("undo_expires_at")),
    }
}

pub(super) async fn fetch_vote(
    conn: &mut SqliteConnection,
    id: &VoteId,
) -> Result<Option<VoteRecord>, LedgerError> {
    let row = sqlx::query(&format!("SELECT {} FROM votes WHERE id = ?", VOTE_COLUMNS))
        .bind(id.as_str())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(vote_from_row))
}

async fn fetch_ballot(
    conn: &mut SqliteConnection,
    matchup_id: &MatchupId,
    voter_id: &VoterId,
) -> Result<Option<VoteRecord>, LedgerError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM votes WHERE matchup_id = ? AND voter_id = ?",
        VOTE_COLUMNS
    ))
    .bind(matchup_id.as_str())
    .bind(voter_id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(vote_from_row))
}

/// Votes cast by `voter_id`, oldest first.
pub(super) async fn fetch_voter_votes(
    conn: &mut SqliteConnection,
    voter_id: &VoterId,
) -> Result<Vec<VoteRecord>, LedgerError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM votes WHERE voter_id = ? ORDER BY time_ms ASC, rowid ASC",
        VOTE_COLUMNS
    ))
    .bind(voter_id.as_str())
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(vote_from_row).collect())
}

pub(super) async fn fetch_all_votes(
    conn: &mut SqliteConnection,
) -> Result<Vec<VoteRecord>, LedgerError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM votes ORDER BY time_ms ASC, rowid ASC",
        VOTE_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(vote_from_row).collect())
}

pub(super) async fn insert_vote(
    conn: &mut SqliteConnection,
    vote: &VoteRecord,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO votes ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        VOTE_COLUMNS
    ))
    .bind(vote.id.as_str())
    .bind(vote.matchup_id.as_str())
    .bind(vote.winner_id.as_str())
    .bind(vote.loser_id.as_str())
    .bind(vote.winner_rating_before)
    .bind(vote.winner_rating_after)
    .bind(vote.loser_rating_before)
    .bind(vote.loser_rating_after)
    .bind(vote.timestamp.as_ms())
    .bind(vote.voter_id.as_str())
    .bind(vote.influence_gained)
    .bind(vote.undo_expires_at.as_ms())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Repository {
    /// Record `voter_id`'s pick of `winner_id` in a matchup, atomically.
    ///
    /// A second vote by the same voter on the same matchup is rejected without
    /// mutating anything, whether caught by the lookup or by the unique index.
    ///
    /// # Errors
    /// `NotFound` for a missing matchup or competitor, `InvalidWinner` when the
    /// winner is not part of the matchup.
    pub async fn record_vote(
        &self,
        matchup_id: &MatchupId,
        winner_id: &CompetitorId,
        voter_id: &VoterId,
        params: &LedgerParams,
        now: TimeMs,
    ) -> Result<Committed<CastOutcome>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;

        let matchup = fetch_matchup(&mut tx, matchup_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("matchup {}", matchup_id)))?;

        if fetch_ballot(&mut tx, matchup_id, voter_id).await?.is_some() {
            debug!(matchup = %matchup_id, voter = %voter_id, "Duplicate vote rejected");
            return Ok(Committed {
                value: CastOutcome::Rejected(Rejection::AlreadyVoted),
                world_version: world_version - 1,
            });
        }

        let loser_id = matchup.opponent_of(winner_id).cloned().ok_or_else(|| {
            LedgerError::InvalidWinner(format!(
                "{} is not a competitor in matchup {}",
                winner_id, matchup_id
            ))
        })?;
        let winner = fetch_competitor(&mut tx, winner_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("competitor {}", winner_id)))?;
        let loser = fetch_competitor(&mut tx, &loser_id)
            .await?
            .ok_or_else(|| LedgerError::NotFound(format!("competitor {}", loser_id)))?;
        let account = fetch_voter_account(&mut tx, voter_id)
            .await?
            .unwrap_or_else(|| VoterAccount::new(voter_id.clone(), params.starting_influence));

        let plan = plan_vote(
            &matchup,
            &winner,
            &loser,
            &account,
            VoteId::generate(),
            voter_id,
            params,
            now,
        )?;

        save_standing(&mut tx, &plan.outcome.winner, params.history_limit).await?;
        save_standing(&mut tx, &plan.outcome.loser, params.history_limit).await?;

        match insert_vote(&mut tx, &plan.vote).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                debug!(matchup = %matchup_id, voter = %voter_id, "Duplicate vote caught by unique index");
                return Ok(Committed {
                    value: CastOutcome::Rejected(Rejection::AlreadyVoted),
                    world_version: world_version - 1,
                });
            }
            Err(e) => return Err(e.into()),
        }

        save_voter_account(&mut tx, &plan.account).await?;
        tx.commit().await?;

        Ok(Committed {
            value: CastOutcome::Recorded(plan.vote),
            world_version,
        })
    }

    /// Reverse a vote if it still exists and its undo deadline has not passed.
    ///
    /// Returns the removed vote, or `None` when nothing was undone.
    pub async fn undo_vote(
        &self,
        vote_id: &VoteId,
        params: &LedgerParams,
        now: TimeMs,
    ) -> Result<Option<Committed<VoteRecord>>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;

        let Some(vote) = fetch_vote(&mut tx, vote_id).await? else {
            return Ok(None);
        };
        if !vote.is_undoable_at(now) {
            return Ok(None);
        }

        let winner = fetch_competitor(&mut tx, &vote.winner_id).await?;
        let loser = fetch_competitor(&mut tx, &vote.loser_id).await?;
        let account = fetch_voter_account(&mut tx, &vote.voter_id).await?;
        let remaining: Vec<VoteRecord> = fetch_voter_votes(&mut tx, &vote.voter_id)
            .await?
            .into_iter()
            .filter(|v| v.id != vote.id)
            .collect();
        let roster = competitor_ids(&mut tx).await?;

        let inputs = UndoInputs {
            vote: &vote,
            winner: winner.as_ref(),
            loser: loser.as_ref(),
            account: account.as_ref(),
            remaining_votes: &remaining,
            roster: &roster,
        };
        let Some(plan) = plan_undo(inputs, params, now) else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM votes WHERE id = ?")
            .bind(vote.id.as_str())
            .execute(&mut *tx)
            .await?;

        for competitor in plan.winner.iter().chain(plan.loser.iter()) {
            save_standing(&mut tx, competitor, params.history_limit).await?;
        }
        if let Some(account) = &plan.account {
            save_voter_account(&mut tx, account).await?;
            revoke_achievements(&mut tx, &account.id, &plan.revoked_achievements).await?;
        }

        tx.commit().await?;
        Ok(Some(Committed {
            value: vote,
            world_version,
        }))
    }

    pub async fn get_vote(&self, id: &VoteId) -> Result<Option<VoteRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_vote(&mut conn, id).await
    }

    /// The vote `voter_id` cast on `matchup_id`, if any.
    pub async fn get_ballot(
        &self,
        matchup_id: &MatchupId,
        voter_id: &VoterId,
    ) -> Result<Option<VoteRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_ballot(&mut conn, matchup_id, voter_id).await
    }

    /// Most recent votes, newest first.
    pub async fn recent_votes(&self, limit: i64) -> Result<Vec<VoteRecord>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM votes ORDER BY time_ms DESC, rowid DESC LIMIT ?",
            VOTE_COLUMNS
        ))
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(vote_from_row).collect())
    }

    /// Most recent votes in which `competitor_id` won or lost, newest first.
    pub async fn votes_involving(
        &self,
        competitor_id: &CompetitorId,
        limit: i64,
    ) -> Result<Vec<VoteRecord>, LedgerError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM votes WHERE winner_id = ? OR loser_id = ? ORDER BY time_ms DESC, rowid DESC LIMIT ?",
            VOTE_COLUMNS
        ))
        .bind(competitor_id.as_str())
        .bind(competitor_id.as_str())
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(vote_from_row).collect())
    }

    /// Votes cast by `voter_id`, oldest first.
    pub async fn votes_by_voter(&self, voter_id: &VoterId) -> Result<Vec<VoteRecord>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_voter_votes(&mut conn, voter_id).await
    }

    pub async fn analytics(&self) -> Result<Analytics, LedgerError> {
        let totals = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM votes) AS total_votes,
                (SELECT COUNT(*) FROM matchups) AS total_matchups,
                (SELECT COUNT(DISTINCT voter_id) FROM votes) AS unique_voters
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let hourly = sqlx::query(
            r#"
            SELECT CAST(strftime('%H', time_ms / 1000, 'unixepoch') AS INTEGER) AS hour,
                   COUNT(*) AS votes
            FROM votes
            GROUP BY hour
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut votes_by_hour_of_day = vec![0i64; 24];
        for row in &hourly {
            let hour: i64 = row.get("hour");
            if let Some(slot) = usize::try_from(hour)
                .ok()
                .and_then(|h| votes_by_hour_of_day.get_mut(h))
            {
                *slot = row.get("votes");
            }
        }

        Ok(Analytics {
            total_votes: totals.get("total_votes"),
            total_matchups: totals.get("total_matchups"),
            unique_voters: totals.get("unique_voters"),
            votes_by_hour_of_day,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repo::test_support::setup_test_db;
    use crate::domain::{Competitor, NewCompetitor};

    async fn arena(repo: &Repository) -> (CompetitorId, CompetitorId, MatchupId) {
        let mut ids = Vec::new();
        for name in ["A", "B"] {
            let c = Competitor::new(
                CompetitorId::generate(),
                NewCompetitor::new(name, "d", "i").unwrap(),
                TimeMs::new(0),
            );
            repo.insert_new_competitor(&c).await.unwrap();
            ids.push(c.id);
        }
        let m = repo
            .create_matchup_between(&ids[0], &ids[1], TimeMs::new(0))
            .await
            .unwrap()
            .value;
        (ids[0].clone(), ids[1].clone(), m.id)
    }

    #[tokio::test]
    async fn test_record_vote_persists_everything() {
        let (repo, _temp) = setup_test_db().await;
        let (a, b, m) = arena(&repo).await;
        let voter = VoterId::new("device-1");
        let params = LedgerParams::default();

        let committed = repo
            .record_vote(&m, &a, &voter, &params, TimeMs::new(1_000))
            .await
            .unwrap();
        let vote = committed.value.vote().cloned().expect("vote recorded");
        assert_eq!(vote.loser_id, b);

        let winner = repo.get_competitor(&a).await.unwrap().unwrap();
        let loser = repo.get_competitor(&b).await.unwrap().unwrap();
        assert_eq!((winner.rating, winner.streak), (1216, 1));
        assert_eq!((loser.rating, loser.streak), (1184, -1));
        assert_eq!(winner.rating_history.len(), 2);
        assert_eq!(repo.get_vote(&vote.id).await.unwrap(), Some(vote.clone()));
        assert_eq!(
            repo.get_ballot(&m, &voter).await.unwrap().map(|v| v.id),
            Some(vote.id)
        );
    }

    #[tokio::test]
    async fn test_duplicate_vote_is_rejected_without_changes() {
        let (repo, _temp) = setup_test_db().await;
        let (a, b, m) = arena(&repo).await;
        let voter = VoterId::new("device-1");
        let params = LedgerParams::default();

        repo.record_vote(&m, &a, &voter, &params, TimeMs::new(1))
            .await
            .unwrap();
        let version = repo.world_version().await.unwrap();

        let second = repo
            .record_vote(&m, &b, &voter, &params, TimeMs::new(2))
            .await
            .unwrap();
        assert_eq!(second.value, CastOutcome::Rejected(Rejection::AlreadyVoted));
        assert_eq!(repo.world_version().await.unwrap(), version);

        let winner = repo.get_competitor(&a).await.unwrap().unwrap();
        assert_eq!(winner.rating, 1216);
        assert_eq!(repo.recent_votes(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_matchup_and_outsider_winner() {
        let (repo, _temp) = setup_test_db().await;
        let (a, _b, m) = arena(&repo).await;
        let voter = VoterId::new("device-1");
        let params = LedgerParams::default();

        let err = repo
            .record_vote(&MatchupId::new("nope"), &a, &voter, &params, TimeMs::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound(_)));

        let err = repo
            .record_vote(&m, &CompetitorId::new("z"), &voter, &params, TimeMs::new(1))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidWinner(_)));
        assert_eq!(repo.world_version().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_undo_window() {
        let (repo, _temp) = setup_test_db().await;
        let (a, b, m) = arena(&repo).await;
        let voter = VoterId::new("device-1");
        let params = LedgerParams::default();

        let vote = repo
            .record_vote(&m, &a, &voter, &params, TimeMs::new(1_000))
            .await
            .unwrap()
            .value
            .vote()
            .cloned()
            .unwrap();

        assert!(repo
            .undo_vote(&vote.id, &params, TimeMs::new(6_001))
            .await
            .unwrap()
            .is_none());
        assert!(repo.get_vote(&vote.id).await.unwrap().is_some());

        assert!(repo
            .undo_vote(&vote.id, &params, TimeMs::new(5_999))
            .await
            .unwrap()
            .is_some());
        assert!(repo.get_vote(&vote.id).await.unwrap().is_none());
        let winner = repo.get_competitor(&a).await.unwrap().unwrap();
        let loser = repo.get_competitor(&b).await.unwrap().unwrap();
        assert_eq!((winner.rating, winner.streak), (1200, 0));
        assert_eq!((loser.rating, loser.streak), (1200, 0));
        assert_eq!(winner.record.total_matches, 0);

        assert!(repo
            .undo_vote(&vote.id, &params, TimeMs::new(5_999))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_recent_votes_newest_first_and_analytics() {
        let (repo, _temp) = setup_test_db().await;
        let (a, b, m) = arena(&repo).await;
        let params = LedgerParams::default();
        let hour_ms = 3_600_000;

        repo.record_vote(&m, &a, &VoterId::new("v1"), &params, TimeMs::new(hour_ms))
            .await
            .unwrap();
        repo.record_vote(&m, &b, &VoterId::new("v2"), &params, TimeMs::new(2 * hour_ms))
            .await
            .unwrap();
        repo.record_vote(&m, &b, &VoterId::new("v3"), &params, TimeMs::new(2 * hour_ms + 5))
            .await
            .unwrap();

        let recent = repo.recent_votes(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].voter_id, VoterId::new("v3"));
        assert_eq!(recent[1].voter_id, VoterId::new("v2"));

        let involving = repo.votes_involving(&a, 10).await.unwrap();
        assert_eq!(involving.len(), 3);

        let analytics = repo.analytics().await.unwrap();
        assert_eq!(analytics.total_votes, 3);
        assert_eq!(analytics.total_matchups, 1);
        assert_eq!(analytics.unique_voters, 3);
        assert_eq!(analytics.votes_by_hour_of_day.len(), 24);
        assert_eq!(analytics.votes_by_hour_of_day[1], 1);
        assert_eq!(analytics.votes_by_hour_of_day[2], 2);
        assert_eq!(analytics.votes_by_hour_of_day.iter().sum::<i64>(), 3);
    }
}
