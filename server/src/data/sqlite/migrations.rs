//! Schema creation and versioning
//!
//! The schema is small enough that version upgrades re-apply the full
//! `IF NOT EXISTS` schema; `ensure_schema` is also the recovery entry point
//! when a repository operation finds the samples table missing mid-run.

use sqlx::SqlitePool;

use super::error::SqliteError;
use super::schema::{SCHEMA, SCHEMA_VERSION};

/// Bring the database up to the current schema version
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteError> {
    let table_exists: bool = sqlx::query_scalar(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        tracing::debug!(version = SCHEMA_VERSION, "Initializing database schema");
        return ensure_schema(pool).await;
    }

    let current_version: i32 =
        sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_optional(pool)
            .await?
            .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        return Err(SqliteError::MigrationFailed {
            version: current_version,
            error: "database is newer than this binary".to_string(),
        });
    }

    if current_version < SCHEMA_VERSION {
        tracing::debug!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Upgrading database schema"
        );
        ensure_schema(pool).await?;
    }

    Ok(())
}

/// Apply the full schema and record the version
///
/// Idempotent; safe to call on a live database from the self-heal path.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), SqliteError> {
    let mut tx = pool.begin().await?;

    sqlx::query(SCHEMA).execute(&mut *tx).await?;

    let now = chrono::Utc::now().timestamp_millis();
    sqlx::query(
        "INSERT INTO schema_version (id, version, applied_at, description) \
         VALUES (1, ?, ?, 'telemetry schema') \
         ON CONFLICT(id) DO UPDATE SET version = excluded.version, applied_at = excluded.applied_at",
    )
    .bind(SCHEMA_VERSION)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn bare_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_migrations_create_schema() {
        let pool = bare_pool().await;
        run_migrations(&pool).await.unwrap();

        let samples_exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='samples'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert!(samples_exists);

        let version: i32 = sqlx::query_scalar("SELECT version FROM schema_version WHERE id = 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = bare_pool().await;
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        // No duplicate structures
        let sample_tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='samples'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(sample_tables, 1);
    }

    #[tokio::test]
    async fn test_ensure_schema_on_live_database() {
        let pool = bare_pool().await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("INSERT INTO samples (key, value, timestamp) VALUES ('K1', '1.0', 1000)")
            .execute(&pool)
            .await
            .unwrap();

        // Re-applying the schema must not touch existing rows
        ensure_schema(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM samples")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_newer_database_is_rejected() {
        let pool = bare_pool().await;
        run_migrations(&pool).await.unwrap();

        sqlx::query("UPDATE schema_version SET version = 99 WHERE id = 1")
            .execute(&pool)
            .await
            .unwrap();

        let err = run_migrations(&pool).await.unwrap_err();
        assert!(matches!(
            err,
            SqliteError::MigrationFailed { version: 99, .. }
        ));
    }
}
