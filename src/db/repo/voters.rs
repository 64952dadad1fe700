//! Voter account operations for the repository.

use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

use crate::domain::{Achievement, TimeMs, VoteId, VoterAccount, VoterAccountUpdate, VoterId};
use crate::engine::{evaluate, EvaluationContext};
use crate::error::LedgerError;

use super::competitors::competitor_ids;
use super::votes::fetch_voter_votes;
use super::{bump_world_version, Committed, Repository};

/// Load an account with its unlocked achievements and vote history.
pub(super) async fn fetch_voter_account(
    conn: &mut SqliteConnection,
    id: &VoterId,
) -> Result<Option<VoterAccount>, LedgerError> {
    let row = sqlx::query(
        "SELECT display_name, avatar_ref, influence, vote_count, last_vote_at FROM voter_accounts WHERE id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let achievements = sqlx::query(
        "SELECT achievement_id FROM voter_achievements WHERE voter_id = ?",
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let history = sqlx::query(
        "SELECT id FROM votes WHERE voter_id = ? ORDER BY time_ms ASC, rowid ASC",
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(VoterAccount {
        id: id.clone(),
        display_name: row.get("display_name"),
        avatar_ref: row.get("avatar_ref"),
        influence: row.get("influence"),
        vote_count: row.get("vote_count"),
        last_vote_at: row.get::<Option<i64>, _>("last_vote_at").map(TimeMs::new),
        unlocked_achievement_ids: achievements
            .iter()
            .map(|r| r.get::<String, _>("achievement_id"))
            .collect(),
        vote_history: history
            .iter()
            .map(|r| VoteId::new(r.get::<String, _>("id")))
            .collect(),
    }))
}

/// Upsert the account row. Achievements and history live in their own tables.
pub(super) async fn save_voter_account(
    conn: &mut SqliteConnection,
    account: &VoterAccount,
) -> Result<(), LedgerError> {
    sqlx::query(
        r#"
        INSERT INTO voter_accounts (id, display_name, avatar_ref, influence, vote_count, last_vote_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            display_name = excluded.display_name,
            avatar_ref = excluded.avatar_ref,
            influence = excluded.influence,
            vote_count = excluded.vote_count,
            last_vote_at = excluded.last_vote_at
        "#,
    )
    .bind(account.id.as_str())
    .bind(&account.display_name)
    .bind(&account.avatar_ref)
    .bind(account.influence)
    .bind(account.vote_count)
    .bind(account.last_vote_at.map(|t| t.as_ms()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub(super) async fn revoke_achievements(
    conn: &mut SqliteConnection,
    voter_id: &VoterId,
    achievement_ids: &[String],
) -> Result<(), LedgerError> {
    for achievement_id in achievement_ids {
        sqlx::query("DELETE FROM voter_achievements WHERE voter_id = ? AND achievement_id = ?")
            .bind(voter_id.as_str())
            .bind(achievement_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

impl Repository {
    /// The stored account, or a fresh unsaved one for a voter never seen before.
    pub async fn get_voter_account(
        &self,
        id: &VoterId,
        starting_influence: i64,
    ) -> Result<VoterAccount, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        Ok(fetch_voter_account(&mut conn, id)
            .await?
            .unwrap_or_else(|| VoterAccount::new(id.clone(), starting_influence)))
    }

    /// Apply a validated profile update, creating the account if needed.
    pub async fn update_voter_account(
        &self,
        id: &VoterId,
        update: &VoterAccountUpdate,
        starting_influence: i64,
    ) -> Result<Committed<VoterAccount>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;
        let mut account = fetch_voter_account(&mut tx, id)
            .await?
            .unwrap_or_else(|| VoterAccount::new(id.clone(), starting_influence));
        update.apply_to(&mut account);
        save_voter_account(&mut tx, &account).await?;
        tx.commit().await?;

        Ok(Committed {
            value: account,
            world_version,
        })
    }

    /// Evaluate the catalog for `id` and persist every newly qualifying unlock.
    ///
    /// Returns the achievements unlocked by this call, which may be empty.
    pub async fn claim_achievements(
        &self,
        id: &VoterId,
        starting_influence: i64,
        now: TimeMs,
    ) -> Result<Committed<Vec<&'static Achievement>>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;

        let account = fetch_voter_account(&mut tx, id)
            .await?
            .unwrap_or_else(|| VoterAccount::new(id.clone(), starting_influence));
        let votes = fetch_voter_votes(&mut tx, id).await?;
        let roster = competitor_ids(&mut tx).await?;

        let unlocked = evaluate(&EvaluationContext {
            account: &account,
            votes: &votes,
            roster: &roster,
        });
        if unlocked.is_empty() {
            return Ok(Committed {
                value: unlocked,
                world_version: world_version - 1,
            });
        }

        save_voter_account(&mut tx, &account).await?;
        for achievement in &unlocked {
            sqlx::query(
                "INSERT OR IGNORE INTO voter_achievements (voter_id, achievement_id, unlocked_at) VALUES (?, ?, ?)",
            )
            .bind(id.as_str())
            .bind(achievement.id)
            .bind(now.as_ms())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(Committed {
            value: unlocked,
            world_version,
        })
    }
}
