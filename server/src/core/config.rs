//! Application configuration
//!
//! Layered loading, lowest to highest priority: built-in defaults, a JSON
//! config file (local `orbitel.json` or the `--config` path), then CLI
//! arguments (which include env var fallbacks via clap).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_FEED_RECONNECT_SECS, DEFAULT_FEED_URL, DEFAULT_HOST, DEFAULT_PORT,
};

// =============================================================================
// File Config Structs (JSON deserialization)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Telemetry feed configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FeedFileConfig {
    pub url: Option<String>,
    pub reconnect_secs: Option<u64>,
}

/// Descriptor catalog configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CatalogFileConfig {
    pub path: Option<PathBuf>,
}

/// Root of the JSON config file
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub feed: Option<FeedFileConfig>,
    pub catalog: Option<CatalogFileConfig>,
}

impl FileConfig {
    fn load_from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct FeedConfig {
    pub url: String,
    pub reconnect_secs: u64,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Explicit catalog path; when absent the data directory default is used.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub feed: FeedConfig,
    pub catalog: CatalogConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let file_config = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                let config = FileConfig::load_from_file(path)?;
                tracing::debug!(path = %path.display(), "Config file loaded");
                config
            }
            None => {
                let local = PathBuf::from(CONFIG_FILE_NAME);
                if local.exists() {
                    let config = FileConfig::load_from_file(&local)?;
                    tracing::debug!(path = %local.display(), "Config file loaded");
                    config
                } else {
                    FileConfig::default()
                }
            }
        };

        let file_server = file_config.server.unwrap_or_default();
        let file_feed = file_config.feed.unwrap_or_default();
        let file_catalog = file_config.catalog.unwrap_or_default();

        let server = ServerConfig {
            host: cli
                .host
                .clone()
                .or(file_server.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT),
        };

        let feed = FeedConfig {
            url: cli
                .feed_url
                .clone()
                .or(file_feed.url)
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            reconnect_secs: cli
                .feed_reconnect_secs
                .or(file_feed.reconnect_secs)
                .unwrap_or(DEFAULT_FEED_RECONNECT_SECS),
        };

        let catalog = CatalogConfig {
            path: cli.catalog.clone().or(file_catalog.path),
        };

        Ok(Self {
            server,
            feed,
            catalog,
        })
    }
}
