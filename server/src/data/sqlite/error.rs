//! SQLite error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SqliteError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration to version {version} failed: {error}")]
    MigrationFailed { version: i32, error: String },
}

impl SqliteError {
    /// True when the underlying failure is the schema having gone missing,
    /// which repository operations self-heal by recreating it.
    pub fn is_missing_schema(&self) -> bool {
        match self {
            SqliteError::Database(sqlx::Error::Database(e)) => {
                e.message().contains("no such table")
            }
            _ => false,
        }
    }
}
