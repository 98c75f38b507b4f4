//! Shared data-layer types

use serde::{Deserialize, Serialize};

/// Static engineering metadata for one telemetry parameter.
///
/// Loaded once from the descriptor catalog and denormalized onto every
/// stored sample row at insert time, so historical rows keep the descriptor
/// text that was current when they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Descriptor {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ops_nom: String,
    #[serde(default)]
    pub eng_nom: String,
    #[serde(default)]
    pub units: String,
    #[serde(default)]
    pub min_value: String,
    #[serde(default)]
    pub max_value: String,
    #[serde(default)]
    pub enum_values: String,
    #[serde(default)]
    pub format_spec: String,
}
