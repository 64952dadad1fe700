//! Whole-world snapshot export and import.

use tracing::info;

use crate::db::migrations::SCHEMA_VERSION;
use crate::domain::WorldSnapshot;
use crate::error::LedgerError;

use super::competitors::{fetch_all_competitors, insert_competitor};
use super::matchups::{fetch_all_matchups, insert_matchup};
use super::votes::{fetch_all_votes, insert_vote};
use super::{bump_world_version, Committed, Repository};

impl Repository {
    /// Read competitors, matchups and votes in one consistent transaction.
    pub async fn export_world(&self) -> Result<WorldSnapshot, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version: (i64,) =
            sqlx::query_as("SELECT world_version FROM schema_meta WHERE id = 1")
                .fetch_one(&mut *tx)
                .await?;
        let competitors = fetch_all_competitors(&mut tx).await?;
        let matchups = fetch_all_matchups(&mut tx).await?;
        let votes = fetch_all_votes(&mut tx).await?;
        tx.commit().await?;

        Ok(WorldSnapshot {
            schema_version: SCHEMA_VERSION,
            world_version: world_version.0,
            competitors,
            matchups,
            votes,
        })
    }

    /// Atomically replace the stored world with `snapshot`.
    ///
    /// Voter accounts are kept as they are. Their `voteCount` and `influence`
    /// are not recomputed, so they may disagree with the imported votes; only
    /// `voteHistory` follows the new votes table. Rating histories longer than
    /// `history_limit` are cut from the oldest end.
    ///
    /// # Errors
    /// `UnsupportedSchemaVersion` for a snapshot from another schema version,
    /// `Validation` when the snapshot breaks a structural invariant.
    pub async fn import_world(
        &self,
        snapshot: WorldSnapshot,
        history_limit: usize,
    ) -> Result<Committed<()>, LedgerError> {
        if snapshot.schema_version != SCHEMA_VERSION {
            return Err(LedgerError::UnsupportedSchemaVersion {
                found: snapshot.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        snapshot.validate().map_err(LedgerError::Validation)?;

        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;

        for table in ["votes", "matchups", "rating_history", "competitors"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&mut *tx)
                .await?;
        }

        let limit = history_limit.max(1);
        for mut competitor in snapshot.competitors {
            let excess = competitor.rating_history.len().saturating_sub(limit);
            competitor.rating_history.drain(..excess);
            insert_competitor(&mut tx, &competitor).await?;
        }
        for matchup in &snapshot.matchups {
            insert_matchup(&mut tx, matchup).await?;
        }
        for vote in &snapshot.votes {
            insert_vote(&mut tx, vote).await?;
        }

        tx.commit().await?;
        info!(
            world_version,
            matchups = snapshot.matchups.len(),
            votes = snapshot.votes.len(),
            "World imported"
        );
        Ok(Committed {
            value: (),
            world_version,
        })
    }
}
