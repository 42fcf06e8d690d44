//! SQLite-backed run repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::debug;

use cutover_core::{MigrationRun, RunId, RunStatus};
use cutover_interfaces::{RepositoryError, RunRepository};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS migration_run (
    id TEXT PRIMARY KEY,
    domain TEXT NOT NULL,
    filter TEXT NOT NULL,
    status TEXT NOT NULL,
    estimated_count INTEGER NOT NULL,
    migrated_count INTEGER NOT NULL DEFAULT 0,
    failed_count INTEGER NOT NULL DEFAULT 0,
    started_at TEXT NOT NULL,
    ended_at TEXT
)
"#;

// The one-active-run-per-domain rule. A partial unique index means the
// constraint releases as soon as the run reaches a terminal status.
const CREATE_ACTIVE_INDEX: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS idx_migration_run_active
    ON migration_run(domain) WHERE status IN ('started', 'cancel_requested')
"#;

/// Durable run repository over SQLite
#[derive(Debug, Clone)]
pub struct SqliteRunRepository {
    pool: SqlitePool,
}

impl SqliteRunRepository {
    /// Connect to a database file, creating the schema if needed
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(connection_error)?;
        Self::with_pool(pool).await
    }

    /// Private in-memory database, mainly for tests.
    /// Single connection: each sqlite in-memory connection is its own
    /// database.
    pub async fn in_memory() -> Result<Self, RepositoryError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(connection_error)?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self, RepositoryError> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(internal_error)?;
        sqlx::query(CREATE_ACTIVE_INDEX)
            .execute(&pool)
            .await
            .map_err(internal_error)?;
        debug!("run repository schema ready");
        Ok(Self { pool })
    }
}

#[async_trait]
impl RunRepository for SqliteRunRepository {
    async fn create(&self, run: MigrationRun) -> Result<MigrationRun, RepositoryError> {
        let filter = serde_json::to_string(&run.filter)
            .map_err(|e| RepositoryError::Internal { message: e.to_string() })?;

        let result = sqlx::query(
            "INSERT INTO migration_run \
             (id, domain, filter, status, estimated_count, migrated_count, failed_count, started_at, ended_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(run.id.to_string())
        .bind(&run.domain)
        .bind(&filter)
        .bind(run.status.to_string())
        .bind(run.estimated_count as i64)
        .bind(run.migrated_count as i64)
        .bind(run.failed_count as i64)
        .bind(run.started_at.to_rfc3339())
        .bind(run.ended_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(run),
            Err(e) if is_unique_violation(&e) => {
                let existing = self
                    .find_active(&run.domain)
                    .await?
                    .map(|r| r.id)
                    .unwrap_or(run.id);
                Err(RepositoryError::ActiveRunExists {
                    domain: run.domain.clone(),
                    existing,
                })
            }
            Err(e) => Err(internal_error(e)),
        }
    }

    async fn find_by_id(&self, id: RunId) -> Result<Option<MigrationRun>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM migration_run WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(internal_error)?;

        row.map(|r| row_to_run(&r)).transpose()
    }

    async fn find_active(&self, domain: &str) -> Result<Option<MigrationRun>, RepositoryError> {
        let row = sqlx::query(
            "SELECT * FROM migration_run \
             WHERE domain = ?1 AND status IN ('started', 'cancel_requested') \
             LIMIT 1",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await
        .map_err(internal_error)?;

        row.map(|r| row_to_run(&r)).transpose()
    }

    async fn list(&self, domain: &str) -> Result<Vec<MigrationRun>, RepositoryError> {
        // v7 run ids sort chronologically, so this is newest first
        let rows = sqlx::query("SELECT * FROM migration_run WHERE domain = ?1 ORDER BY id DESC")
            .bind(domain)
            .fetch_all(&self.pool)
            .await
            .map_err(internal_error)?;

        rows.iter().map(row_to_run).collect()
    }

    async fn update_status(
        &self,
        id: RunId,
        status: RunStatus,
        ended_at: Option<DateTime<Utc>>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE migration_run SET status = ?1, ended_at = COALESCE(?2, ended_at) WHERE id = ?3",
        )
        .bind(status.to_string())
        .bind(ended_at.map(|t| t.to_rfc3339()))
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(internal_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn record_failure(&self, id: RunId) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE migration_run SET failed_count = failed_count + 1 WHERE id = ?1")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(internal_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }

    async fn set_counts(&self, id: RunId, migrated: u64, failed: u64) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE migration_run SET migrated_count = ?1, failed_count = ?2 WHERE id = ?3",
        )
        .bind(migrated as i64)
        .bind(failed as i64)
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(internal_error)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}

fn row_to_run(row: &SqliteRow) -> Result<MigrationRun, RepositoryError> {
    let id: String = row.try_get("id").map_err(internal_error)?;
    let domain: String = row.try_get("domain").map_err(internal_error)?;
    let filter: String = row.try_get("filter").map_err(internal_error)?;
    let status: String = row.try_get("status").map_err(internal_error)?;
    let estimated_count: i64 = row.try_get("estimated_count").map_err(internal_error)?;
    let migrated_count: i64 = row.try_get("migrated_count").map_err(internal_error)?;
    let failed_count: i64 = row.try_get("failed_count").map_err(internal_error)?;
    let started_at: String = row.try_get("started_at").map_err(internal_error)?;
    let ended_at: Option<String> = row.try_get("ended_at").map_err(internal_error)?;

    Ok(MigrationRun {
        id: id.parse().map_err(parse_error)?,
        domain,
        filter: serde_json::from_str(&filter)
            .map_err(|e| RepositoryError::Internal { message: e.to_string() })?,
        status: status.parse().map_err(parse_error)?,
        estimated_count: estimated_count as u64,
        migrated_count: migrated_count as u64,
        failed_count: failed_count as u64,
        started_at: parse_timestamp(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Internal {
            message: format!("bad timestamp '{}': {}", value, e),
        })
}

fn parse_error(e: cutover_core::ParseError) -> RepositoryError {
    RepositoryError::Internal { message: e.to_string() }
}

fn connection_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Connection { message: e.to_string() }
}

fn internal_error(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Internal { message: e.to_string() }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e,
        sqlx::Error::Database(db) if matches!(db.kind(), sqlx::error::ErrorKind::UniqueViolation)
    )
}
