//! SQLite repositories

pub mod sample;
