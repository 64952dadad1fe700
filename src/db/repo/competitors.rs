//! Competitor operations for the repository.

use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;
use std::collections::HashMap;
use tracing::warn;

use crate::domain::{
    Competitor, CompetitorId, CompetitorUpdate, NewCompetitor, RatingPoint, Record, TimeMs,
};
use crate::error::LedgerError;

use super::{bump_world_version, Committed, Repository};

const COMPETITOR_COLUMNS: &str =
    "id, name, description, image_ref, rating, streak, wins, losses, created_at";

fn competitor_from_row(row: &SqliteRow, history: Vec<RatingPoint>) -> Competitor {
    let id = CompetitorId::new(row.get::<String, _>("id"));
    let rating: i64 = row.get("rating");
    let created_at = TimeMs::new(row.get("created_at"));

    let rating_history = match history.last() {
        Some(last) if last.rating == rating => history,
        _ => {
            warn!(competitor = %id, rating, "Rating history out of sync, reseeding from current rating");
            let mut history = history;
            history.push(RatingPoint {
                timestamp: created_at,
                rating,
            });
            history
        }
    };

    Competitor {
        id,
        name: row.get("name"),
        description: row.get("description"),
        image_ref: row.get("image_ref"),
        rating,
        streak: row.get("streak"),
        record: Record::new(row.get("wins"), row.get("losses")),
        rating_history,
        created_at,
    }
}

async fn load_history(
    conn: &mut SqliteConnection,
    id: &CompetitorId,
) -> Result<Vec<RatingPoint>, LedgerError> {
    let rows = sqlx::query(
        "SELECT time_ms, rating FROM rating_history WHERE competitor_id = ? ORDER BY id ASC",
    )
    .bind(id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows
        .iter()
        .map(|r| RatingPoint {
            timestamp: TimeMs::new(r.get("time_ms")),
            rating: r.get("rating"),
        })
        .collect())
}

pub(super) async fn fetch_competitor(
    conn: &mut SqliteConnection,
    id: &CompetitorId,
) -> Result<Option<Competitor>, LedgerError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM competitors WHERE id = ?",
        COMPETITOR_COLUMNS
    ))
    .bind(id.as_str())
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let history = load_history(conn, id).await?;
            Ok(Some(competitor_from_row(&row, history)))
        }
        None => Ok(None),
    }
}

pub(super) async fn fetch_all_competitors(
    conn: &mut SqliteConnection,
) -> Result<Vec<Competitor>, LedgerError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM competitors ORDER BY created_at ASC, rowid ASC",
        COMPETITOR_COLUMNS
    ))
    .fetch_all(&mut *conn)
    .await?;

    let history_rows = sqlx::query(
        "SELECT competitor_id, time_ms, rating FROM rating_history ORDER BY id ASC",
    )
    .fetch_all(&mut *conn)
    .await?;

    let mut histories: HashMap<String, Vec<RatingPoint>> = HashMap::new();
    for r in &history_rows {
        histories
            .entry(r.get("competitor_id"))
            .or_default()
            .push(RatingPoint {
                timestamp: TimeMs::new(r.get("time_ms")),
                rating: r.get("rating"),
            });
    }

    Ok(rows
        .iter()
        .map(|row| {
            let id: String = row.get("id");
            let history = histories.remove(&id).unwrap_or_default();
            competitor_from_row(row, history)
        })
        .collect())
}

pub(super) async fn competitor_ids(
    conn: &mut SqliteConnection,
) -> Result<Vec<CompetitorId>, LedgerError> {
    let rows = sqlx::query("SELECT id FROM competitors ORDER BY created_at ASC, rowid ASC")
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows
        .iter()
        .map(|r| CompetitorId::new(r.get::<String, _>("id")))
        .collect())
}

/// Insert a competitor row together with its full rating history.
pub(super) async fn insert_competitor(
    conn: &mut SqliteConnection,
    competitor: &Competitor,
) -> Result<(), LedgerError> {
    sqlx::query(&format!(
        "INSERT INTO competitors ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        COMPETITOR_COLUMNS
    ))
    .bind(competitor.id.as_str())
    .bind(&competitor.name)
    .bind(&competitor.description)
    .bind(&competitor.image_ref)
    .bind(competitor.rating)
    .bind(competitor.streak)
    .bind(competitor.record.wins)
    .bind(competitor.record.losses)
    .bind(competitor.created_at.as_ms())
    .execute(&mut *conn)
    .await?;

    for point in &competitor.rating_history {
        sqlx::query("INSERT INTO rating_history (competitor_id, time_ms, rating) VALUES (?, ?, ?)")
            .bind(competitor.id.as_str())
            .bind(point.timestamp.as_ms())
            .bind(point.rating)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

/// Persist rating, streak and record, append the newest history point and
/// truncate history to the most recent `history_limit` points.
pub(super) async fn save_standing(
    conn: &mut SqliteConnection,
    competitor: &Competitor,
    history_limit: usize,
) -> Result<(), LedgerError> {
    sqlx::query("UPDATE competitors SET rating = ?, streak = ?, wins = ?, losses = ? WHERE id = ?")
        .bind(competitor.rating)
        .bind(competitor.streak)
        .bind(competitor.record.wins)
        .bind(competitor.record.losses)
        .bind(competitor.id.as_str())
        .execute(&mut *conn)
        .await?;

    if let Some(point) = competitor.rating_history.last() {
        sqlx::query("INSERT INTO rating_history (competitor_id, time_ms, rating) VALUES (?, ?, ?)")
            .bind(competitor.id.as_str())
            .bind(point.timestamp.as_ms())
            .bind(point.rating)
            .execute(&mut *conn)
            .await?;
    }

    sqlx::query(
        r#"
        DELETE FROM rating_history
        WHERE competitor_id = ?
          AND id NOT IN (
            SELECT id FROM rating_history
            WHERE competitor_id = ?
            ORDER BY id DESC
            LIMIT ?
          )
        "#,
    )
    .bind(competitor.id.as_str())
    .bind(competitor.id.as_str())
    .bind(history_limit.max(1) as i64)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

impl Repository {
    /// All competitors, oldest first.
    pub async fn list_competitors(&self) -> Result<Vec<Competitor>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_all_competitors(&mut conn).await
    }

    pub async fn get_competitor(&self, id: &CompetitorId) -> Result<Option<Competitor>, LedgerError> {
        let mut conn = self.pool.acquire().await?;
        fetch_competitor(&mut conn, id).await
    }

    pub async fn insert_new_competitor(
        &self,
        competitor: &Competitor,
    ) -> Result<Committed<()>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;
        insert_competitor(&mut tx, competitor).await?;
        tx.commit().await?;
        Ok(Committed {
            value: (),
            world_version,
        })
    }

    /// Apply a validated partial update; `None` if the competitor does not exist.
    pub async fn update_competitor(
        &self,
        id: &CompetitorId,
        update: &CompetitorUpdate,
    ) -> Result<Option<Committed<Competitor>>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;
        let Some(mut competitor) = fetch_competitor(&mut tx, id).await? else {
            return Ok(None);
        };
        update.apply_to(&mut competitor);

        sqlx::query("UPDATE competitors SET name = ?, description = ?, image_ref = ? WHERE id = ?")
            .bind(&competitor.name)
            .bind(&competitor.description)
            .bind(&competitor.image_ref)
            .bind(competitor.id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Committed {
            value: competitor,
            world_version,
        }))
    }

    /// Hard-delete a competitor and its rating history. Matchups and votes
    /// that reference it are left untouched. `None` if it did not exist.
    pub async fn delete_competitor(
        &self,
        id: &CompetitorId,
    ) -> Result<Option<Committed<()>>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;

        let result = sqlx::query("DELETE FROM competitors WHERE id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("DELETE FROM rating_history WHERE competitor_id = ?")
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(Committed {
            value: (),
            world_version,
        }))
    }

    /// Insert the given roster if nothing was ever written to this store.
    ///
    /// Returns the number of competitors created.
    pub async fn seed_if_fresh(
        &self,
        roster: &[NewCompetitor],
        now: TimeMs,
    ) -> Result<usize, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let world_version = bump_world_version(&mut tx).await?;
        if world_version != 1 {
            return Ok(0);
        }

        for (offset, fields) in roster.iter().enumerate() {
            let competitor = Competitor::new(
                CompetitorId::generate(),
                fields.clone(),
                now.plus_ms(offset as i64),
            );
            insert_competitor(&mut tx, &competitor).await?;
        }

        tx.commit().await?;
        Ok(roster.len())
    }
}
