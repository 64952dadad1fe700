//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `competitors.rs` - Competitor rows and bounded rating history
//! - `matchups.rs` - Matchup creation and lookup
//! - `votes.rs` - Atomic vote recording and undo, vote queries, analytics
//! - `voters.rs` - Voter accounts and achievement unlocks
//! - `world.rs` - Whole-world snapshot export and import
//!
//! Every mutation of the world runs in one transaction whose first statement
//! bumps `schema_meta.world_version`. Starting with a write takes SQLite's
//! write lock up front, so the read-check-write that follows cannot
//! interleave with another writer.

mod competitors;
mod matchups;
mod votes;
mod voters;
mod world;

use serde::Serialize;
use sqlx::sqlite::{SqliteConnection, SqlitePool};
use sqlx::Row;

use crate::error::LedgerError;

/// A value written by a committed transaction, with the world version it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub world_version: i64,
}

/// Aggregate vote statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_votes: i64,
    pub total_matchups: i64,
    pub unique_voters: i64,
    /// Vote counts per UTC hour of day, index 0 through 23.
    pub votes_by_hour_of_day: Vec<i64>,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// Round-trip a trivial query, for readiness checks.
    pub async fn ping(&self) -> Result<(), LedgerError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Current world version; zero for a store nothing was ever written to.
    pub async fn world_version(&self) -> Result<i64, LedgerError> {
        let row = sqlx::query("SELECT world_version FROM schema_meta WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.get::<i64, _>("world_version"))
            .ok_or_else(|| LedgerError::Corrupt("schema_meta row missing".to_string()))
    }
}

/// Increment the world version inside an open transaction and return the new value.
async fn bump_world_version(conn: &mut SqliteConnection) -> Result<i64, LedgerError> {
    let row = sqlx::query(
        "UPDATE schema_meta SET world_version = world_version + 1 WHERE id = 1 RETURNING world_version",
    )
    .fetch_optional(&mut *conn)
    .await?;
    row.map(|r| r.get::<i64, _>("world_version"))
        .ok_or_else(|| LedgerError::Corrupt("schema_meta row missing".to_string()))
}
