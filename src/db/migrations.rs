//! Database initialization, schema versioning and pragmas.

use sqlx::sqlite::{SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use tracing::{info, warn};

use crate::error::LedgerError;

/// Version of the persisted world layout. Bump on any breaking schema change.
pub const SCHEMA_VERSION: i64 = 1;

/// Tables owned by the current schema, dropped when an older store is reset.
const TABLES: &[&str] = &[
    "voter_achievements",
    "voter_accounts",
    "votes",
    "matchups",
    "rating_history",
    "competitors",
    "schema_meta",
];

/// Initialize the SQLite database with schema and pragmas.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, LedgerError> {
    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).ok();
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .after_connect(|conn, _meta| Box::pin(async move { configure_pragmas_conn(conn).await }))
        .connect(&format!("sqlite:{}?mode=rwc", db_path))
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully at {}", db_path);
    Ok(pool)
}

async fn stored_schema_version(pool: &SqlitePool) -> Result<Option<i64>, sqlx::Error> {
    let has_meta: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_meta'",
    )
    .fetch_one(pool)
    .await?;
    if has_meta.0 == 0 {
        return Ok(None);
    }

    let row = sqlx::query("SELECT schema_version FROM schema_meta WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get::<i64, _>("schema_version")))
}

async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let schema_sql = include_str!("schema.sql");
    let mut tx = pool.begin().await?;

    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(&mut *tx).await?;
        }
    }

    sqlx::query(
        "INSERT INTO schema_meta (id, schema_version, world_version) VALUES (1, ?, 0)
         ON CONFLICT(id) DO NOTHING",
    )
    .bind(SCHEMA_VERSION)
    .execute(&mut *tx)
    .await?;

    tx.commit().await
}

async fn drop_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;
    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await
}

/// Bring the store to [`SCHEMA_VERSION`].
///
/// A missing store is created, an older one is reset, and a newer one is
/// refused so that it is never misparsed.
async fn run_migrations(pool: &SqlitePool) -> Result<(), LedgerError> {
    info!("Running database migrations...");

    match stored_schema_version(pool).await? {
        None => {
            create_schema(pool).await?;
            info!(schema_version = SCHEMA_VERSION, "Created arena schema");
        }
        Some(v) if v == SCHEMA_VERSION => {
            create_schema(pool).await?;
        }
        Some(v) if v < SCHEMA_VERSION => {
            warn!(
                found = v,
                expected = SCHEMA_VERSION,
                "Stored schema is older than supported, resetting arena data"
            );
            drop_schema(pool).await?;
            create_schema(pool).await?;
        }
        Some(v) => {
            return Err(LedgerError::UnsupportedSchemaVersion {
                found: v,
                expected: SCHEMA_VERSION,
            })
        }
    }

    info!("Migrations completed successfully");
    Ok(())
}

/// Configure SQLite pragmas for optimal performance and reliability.
async fn configure_pragmas_conn(conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    info!("Configuring SQLite pragmas...");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&mut *conn)
        .await?;

    // journal_mode returns the actual mode set; must use fetch to get result
    let row = sqlx::query("PRAGMA journal_mode = WAL")
        .fetch_one(&mut *conn)
        .await?;
    let journal_mode: String = row.get(0);
    info!("SQLite journal_mode set to: {}", journal_mode);

    sqlx::query("PRAGMA busy_timeout = 5000")
        .execute(&mut *conn)
        .await?;
    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;

    info!("SQLite pragmas configured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn db_path(temp_dir: &TempDir) -> String {
        temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string()
    }

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = db_path(&temp_dir);

        let pool = init_db(&db_path).await.expect("init_db failed");
        assert!(Path::new(&db_path).exists());

        let result: (i64,) = sqlx::query_as("SELECT schema_version FROM schema_meta")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_migrations_create_tables() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");

        for table in TABLES {
            let result: (String,) = sqlx::query_as(
                "SELECT name FROM sqlite_master WHERE type='table' AND name = ?",
            )
            .bind(table)
            .fetch_one(&pool)
            .await
            .expect("query failed");
            assert_eq!(&result.0, table);
        }
    }

    #[tokio::test]
    async fn test_migrations_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");

        sqlx::query("INSERT INTO matchups (id, competitor_a_id, competitor_b_id, created_at) VALUES ('m', 'a', 'b', 0)")
            .execute(&pool)
            .await
            .unwrap();

        run_migrations(&pool)
            .await
            .expect("second migration run failed");

        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matchups")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);
    }

    #[tokio::test]
    async fn test_older_schema_is_reset() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");

        sqlx::query("INSERT INTO matchups (id, competitor_a_id, competitor_b_id, created_at) VALUES ('m', 'a', 'b', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("UPDATE schema_meta SET schema_version = 0")
            .execute(&pool)
            .await
            .unwrap();

        run_migrations(&pool).await.expect("reset failed");

        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM matchups")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(result.0, 0);
        assert_eq!(
            stored_schema_version(&pool).await.unwrap(),
            Some(SCHEMA_VERSION)
        );
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");
        sqlx::query("UPDATE schema_meta SET schema_version = ?")
            .bind(SCHEMA_VERSION + 1)
            .execute(&pool)
            .await
            .unwrap();

        let err = run_migrations(&pool).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::UnsupportedSchemaVersion { found, expected }
                if found == SCHEMA_VERSION + 1 && expected == SCHEMA_VERSION
        ));
    }

    #[tokio::test]
    async fn test_pragmas_configured() {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&db_path(&temp_dir)).await.expect("init_db failed");

        let result: (i64,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        assert_eq!(result.0, 1);

        let result: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool)
            .await
            .expect("query failed");
        // `journal_mode=WAL` is best-effort; SQLite can fall back depending on environment.
        assert!(
            matches!(result.0.as_str(), "wal" | "delete"),
            "unexpected journal_mode: {}",
            result.0
        );
    }
}
