//! Matchup operations for the repository.

use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

use crate::domain::{CompetitorId, Matchup, MatchupId, TimeMs};
use crate::error::LedgerError;

use super::competitors::{competitor_ids, fetch_competitor};
use super::{bump_world_version, Committed, Repository};

fn matchup_from_row(row: &SqliteRow) -> Matchup {
    Matchup {
        id: MatchupId::new(row.get::<String, _>("id")),
        competitor_a_id: CompetitorId::new(row.get::<String, _>("competitor_a_id")),
        competitor_b_id: CompetitorId::new(row.get::<String, _>("competitor_b_id")),
        created_at: TimeMs::new(row.get("created_at")),
    }
}

pub(super) async fn fetch_matchup(
    conn: &mut SqliteConnection,
    id: &MatchupId,
) -> Result<Option<Matchup>, LedgerError> {
    let row = sqlx::query(
        "SELECT id, competitor_a_id, competitor_b_id, created_at FROM matchups WHERE id = ?",
    )
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.as_ref().map(matchup_from_row))
}

pub(super) async fn fetch_all_matchups(
    conn: &mut SqliteConnection,
) -> Result<Vec<Matchup>, LedgerError> {
    let rows = sqlx::query(
        "SELECT id, competitor_a_id, competitor_b_id, created_at FROM matchups ORDER BY created_at ASC, rowid ASC",
    )
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.iter().map(matchup_from_row).collect())
}

pub(super) async fn insert_matchup(
    conn: &mut SqliteConnection,
    matchup: &Matchup,
) -> Result<(), LedgerError> {
    sqlx::query(
        "INSERT INTO matchups (id, competitor_a_id, competitor_b_id, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(matchup.id.as_str())
    .bind(matchup.competitor_a_id.as_str())
    .bind(matchup.competitor_b_id.as_str())
    .bind(matchup.created_at.as_ms())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Repository {
    pub async fn get_matchup(&self, id: &MatchupId) -> Result<Option<Matchup>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_matchup(&mut conn, id).await
    }

    pub async fn count_matchups(&self) -> Result<i64, LedgerError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matchups")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }

    /// Create a matchup between two explicitly chosen competitors.
    ///
    /// # Errors
    /// `InvalidPairing` unless both ids resolve to distinct existing competitors.
    pub async fn create_matchup_between(
        &self,
        a: &CompetitorId,
        b: &CompetitorId,
        now: TimeMs,
    ) -> Result<Committed<Matchup>, LedgerError> {
        if a == b {
            return Err(LedgerError::InvalidPairing(format!(
                "competitor {} cannot face itself",
                a
            )));
        }

        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;
        for id in [a, b] {
            if fetch_competitor(&mut tx, id).await?.is_none() {
                return Err(LedgerError::InvalidPairing(format!(
                    "competitor {} does not exist",
                    id
                )));
            }
        }

        let matchup = Matchup {
            id: MatchupId::generate(),
            competitor_a_id: a.clone(),
            competitor_b_id: b.clone(),
            created_at: now,
        };
        insert_matchup(&mut tx, &matchup).await?;
        tx.commit().await?;

        Ok(Committed {
            value: matchup,
            world_version,
        })
    }

    /// Create a matchup between two competitors chosen by `pick` from the current roster.
    ///
    /// # Errors
    /// `InsufficientCompetitors` when `pick` finds no pair.
    pub async fn create_random_matchup<F>(
        &self,
        pick: F,
        now: TimeMs,
    ) -> Result<Committed<Matchup>, LedgerError>
    where
        F: FnOnce(&[CompetitorId]) -> Option<(CompetitorId, CompetitorId)> + Send,
    {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;
        let roster = competitor_ids(&mut tx).await?;
        let (a, b) = pick(&roster).ok_or(LedgerError::InsufficientCompetitors)?;

        let matchup = Matchup {
            id: MatchupId::generate(),
            competitor_a_id: a,
            competitor_b_id: b,
            created_at: now,
        };
        insert_matchup(&mut tx, &matchup).await?;
        tx.commit().await?;

        Ok(Committed {
            value: matchup,
            world_version,
        })
    }
}
