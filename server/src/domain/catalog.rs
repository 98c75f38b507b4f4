//! Parameter descriptor catalog
//!
//! Loaded once at startup from a JSON descriptor document and never
//! reloaded; descriptors are effectively write-once for the process
//! lifetime. Catalog problems are never fatal: a missing or unparseable
//! document degrades to the fixed default key set with empty descriptors.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::constants::DEFAULT_FEED_KEYS;
use crate::data::types::Descriptor;

/// One symbol entry of the descriptor document.
#[derive(Debug, Clone, Deserialize)]
struct CatalogEntry {
    /// The feed key this symbol is published under.
    public_key: String,
    #[serde(flatten)]
    descriptor: Descriptor,
}

/// Static key → descriptor mapping
pub struct Catalog {
    entries: BTreeMap<String, Descriptor>,
}

impl Catalog {
    /// Load the catalog from a JSON descriptor document
    pub fn load(path: &Path) -> Self {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Descriptor catalog unavailable, using default key set"
                );
                return Self::empty();
            }
        };

        match serde_json::from_str::<BTreeMap<String, CatalogEntry>>(&raw) {
            Ok(doc) => {
                let entries: BTreeMap<String, Descriptor> = doc
                    .into_values()
                    .filter(|entry| !entry.public_key.is_empty())
                    .map(|entry| (entry.public_key, entry.descriptor))
                    .collect();
                tracing::info!(
                    keys = entries.len(),
                    path = %path.display(),
                    "Descriptor catalog loaded"
                );
                Self { entries }
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Descriptor catalog unparseable, using default key set"
                );
                Self::empty()
            }
        }
    }

    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build a catalog directly from key/descriptor pairs
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Descriptor)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Descriptor for a key; all-empty when unknown
    pub fn descriptor(&self, key: &str) -> Descriptor {
        self.entries.get(key).cloned().unwrap_or_default()
    }

    /// Keys to subscribe to: every catalog key, or the fixed default set
    /// when the catalog loaded none
    pub fn feed_keys(&self) -> Vec<String> {
        if self.entries.is_empty() {
            DEFAULT_FEED_KEYS.iter().map(|k| k.to_string()).collect()
        } else {
            self.entries.keys().cloned().collect()
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
