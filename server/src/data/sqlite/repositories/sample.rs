//! Sample repository: bounded per-key retention over the samples table
//!
//! Write path: dedup on (key, timestamp) via `ON CONFLICT DO NOTHING`, then
//! prune the key back down to the retention cap. Prune order is
//! `timestamp DESC, id DESC` — newest first, insertion order as tie-break —
//! so pruning is deterministic even when two samples share a millisecond.
//!
//! Every operation retries once through `ensure_schema` if the samples table
//! has gone missing, so a wiped database heals on the next touch.

use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::core::constants::SAMPLES_PER_KEY_CAP;
use crate::data::sqlite::error::SqliteError;
use crate::data::sqlite::migrations;
use crate::data::types::Descriptor;

/// One persisted observation, as served to clients.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SampleValue {
    pub value: String,
    pub timestamp: i64,
    pub id: i64,
}

/// Retained history for one key, newest sample first.
#[derive(Debug, Clone, Serialize)]
pub struct KeySeries {
    pub key: String,
    #[serde(flatten)]
    pub descriptor: Descriptor,
    pub values: Vec<SampleValue>,
}

/// The most recent sample for one key.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct LatestSample {
    pub value: String,
    pub timestamp: i64,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub descriptor: Descriptor,
}

/// A distinct key with its descriptor.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct KeyInfo {
    pub key: String,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub descriptor: Descriptor,
}

#[derive(FromRow)]
struct SampleRow {
    id: i64,
    key: String,
    value: String,
    timestamp: i64,
    #[sqlx(flatten)]
    descriptor: Descriptor,
}

#[derive(FromRow)]
struct LatestRow {
    key: String,
    #[sqlx(flatten)]
    latest: LatestSample,
}

const SERIES_COLUMNS: &str = "id, key, value, timestamp, description, ops_nom, eng_nom, \
     units, min_value, max_value, enum_values, format_spec";

/// Rank rows newest-first within each key; rank 1 is the most recent sample.
const RANKED_SAMPLES: &str = "SELECT *, ROW_NUMBER() OVER ( \
         PARTITION BY key ORDER BY timestamp DESC, id DESC \
     ) AS row_rank FROM samples";

/// Run `op`, recreating the schema and retrying once if the samples table is
/// missing. Any other error surfaces unchanged.
async fn with_schema_recovery<T, F, Fut>(pool: &SqlitePool, op: F) -> Result<T, SqliteError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, SqliteError>>,
{
    match op().await {
        Err(e) if e.is_missing_schema() => {
            tracing::warn!("Samples table missing, recreating schema and retrying");
            migrations::ensure_schema(pool).await?;
            op().await
        }
        other => other,
    }
}

/// Persist one sample (idempotent on (key, timestamp))
///
/// Returns true if a row was inserted, false if the (key, timestamp) pair
/// already existed — feed redelivery is a successful no-op, not an error.
/// A successful insert triggers pruning for the key; prune failures are
/// logged and never fail the acknowledged insert.
pub async fn insert(
    pool: &SqlitePool,
    key: &str,
    value: &str,
    timestamp: i64,
    descriptor: &Descriptor,
) -> Result<bool, SqliteError> {
    with_schema_recovery(pool, || async {
        let result = sqlx::query(
            r#"
            INSERT INTO samples
                (key, value, timestamp, description, ops_nom, eng_nom, units,
                 min_value, max_value, enum_values, format_spec)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(key, timestamp) DO NOTHING
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(timestamp)
        .bind(&descriptor.description)
        .bind(&descriptor.ops_nom)
        .bind(&descriptor.eng_nom)
        .bind(&descriptor.units)
        .bind(&descriptor.min_value)
        .bind(&descriptor.max_value)
        .bind(&descriptor.enum_values)
        .bind(&descriptor.format_spec)
        .execute(pool)
        .await?;

        let inserted = result.rows_affected() > 0;
        if inserted {
            // The insert is already acknowledged; cap enforcement is
            // eventual and must not roll it back.
            if let Err(e) = prune_key(pool, key).await {
                tracing::warn!(key, error = %e, "Prune after insert failed");
            }
        }

        Ok(inserted)
    })
    .await
}

/// Delete rows beyond the retention cap for one key
async fn prune_key(pool: &SqlitePool, key: &str) -> Result<u64, SqliteError> {
    let result = sqlx::query(
        r#"
        DELETE FROM samples
        WHERE key = ?
          AND id NOT IN (
            SELECT id FROM samples
            WHERE key = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
          )
        "#,
    )
    .bind(key)
    .bind(key)
    .bind(SAMPLES_PER_KEY_CAP)
    .execute(pool)
    .await?;

    let pruned = result.rows_affected();
    if pruned > 0 {
        tracing::trace!(key, pruned, "Pruned samples beyond retention cap");
    }
    Ok(pruned)
}

/// Full retained history for every key, ordered key ASC, samples newest
/// first. Each key's descriptor comes from its most recent row.
pub async fn get_all(pool: &SqlitePool) -> Result<Vec<KeySeries>, SqliteError> {
    let query =
        format!("SELECT {SERIES_COLUMNS} FROM samples ORDER BY key ASC, timestamp DESC, id DESC");
    with_schema_recovery(pool, || async {
        let rows: Vec<SampleRow> = sqlx::query_as(&query).fetch_all(pool).await?;
        Ok(group_series(rows))
    })
    .await
}

/// Retained history for one key; `None` when no samples exist.
pub async fn get_by_key(pool: &SqlitePool, key: &str) -> Result<Option<KeySeries>, SqliteError> {
    let query = format!(
        "SELECT {SERIES_COLUMNS} FROM samples WHERE key = ? ORDER BY timestamp DESC, id DESC"
    );
    with_schema_recovery(pool, || async {
        let rows: Vec<SampleRow> = sqlx::query_as(&query).bind(key).fetch_all(pool).await?;
        Ok(group_series(rows).pop())
    })
    .await
}

/// The single most recent sample per key.
pub async fn get_latest(
    pool: &SqlitePool,
) -> Result<BTreeMap<String, LatestSample>, SqliteError> {
    let query = format!(
        "SELECT key, value, timestamp, description, ops_nom, eng_nom, units, \
                min_value, max_value, enum_values, format_spec \
         FROM ({RANKED_SAMPLES}) WHERE row_rank = 1"
    );
    with_schema_recovery(pool, || async {
        let rows: Vec<LatestRow> = sqlx::query_as(&query).fetch_all(pool).await?;
        Ok(rows.into_iter().map(|r| (r.key, r.latest)).collect())
    })
    .await
}

/// Every distinct key with its descriptor (most recent row wins), key ASC.
pub async fn list_keys(pool: &SqlitePool) -> Result<Vec<KeyInfo>, SqliteError> {
    let query = format!(
        "SELECT key, description, ops_nom, eng_nom, units, \
                min_value, max_value, enum_values, format_spec \
         FROM ({RANKED_SAMPLES}) WHERE row_rank = 1 ORDER BY key ASC"
    );
    with_schema_recovery(pool, || async {
        let rows: Vec<KeyInfo> = sqlx::query_as(&query).fetch_all(pool).await?;
        Ok(rows)
    })
    .await
}

/// Group rows (already ordered key ASC, timestamp DESC) into per-key series.
fn group_series(rows: Vec<SampleRow>) -> Vec<KeySeries> {
    let mut series: Vec<KeySeries> = Vec::new();
    for row in rows {
        let sample = SampleValue {
            value: row.value,
            timestamp: row.timestamp,
            id: row.id,
        };
        match series.last_mut() {
            Some(s) if s.key == row.key => s.values.push(sample),
            _ => series.push(KeySeries {
                key: row.key,
                descriptor: row.descriptor,
                values: vec![sample],
            }),
        }
    }
    series
}
