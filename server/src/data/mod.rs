//! Data layer

pub mod sqlite;
pub mod types;

pub use sqlite::SqliteService;
pub use types::Descriptor;
