//! SQLite schema definitions

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Complete schema SQL
///
/// Every statement is `IF NOT EXISTS`: the schema can be (re)applied on a
/// live database, which the self-heal path relies on.
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

-- =============================================================================
-- Telemetry samples
--
-- One row per observed (key, timestamp) pair; the descriptor columns are a
-- denormalized copy of the catalog entry at insert time. The UNIQUE
-- constraint makes feed redelivery a no-op.
-- =============================================================================
CREATE TABLE IF NOT EXISTS samples (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL CHECK(length(key) >= 1),
    value TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    ops_nom TEXT NOT NULL DEFAULT '',
    eng_nom TEXT NOT NULL DEFAULT '',
    units TEXT NOT NULL DEFAULT '',
    min_value TEXT NOT NULL DEFAULT '',
    max_value TEXT NOT NULL DEFAULT '',
    enum_values TEXT NOT NULL DEFAULT '',
    format_spec TEXT NOT NULL DEFAULT '',
    UNIQUE(key, timestamp)
);

CREATE INDEX IF NOT EXISTS idx_samples_key ON samples(key);
"#;
