use std::path::PathBuf;

use clap::Parser;

use super::constants::{
    ENV_CATALOG, ENV_CONFIG, ENV_FEED_RECONNECT_SECS, ENV_FEED_URL, ENV_HOST, ENV_PORT,
};

#[derive(Parser)]
#[command(name = "orbitel")]
#[command(version, about = "ISS telemetry retention service", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// Path to config file
    #[arg(long, short = 'c', env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Telemetry feed stream URL
    #[arg(long, env = ENV_FEED_URL)]
    pub feed_url: Option<String>,

    /// Delay between feed reconnect attempts, in seconds
    #[arg(long, env = ENV_FEED_RECONNECT_SECS)]
    pub feed_reconnect_secs: Option<u64>,

    /// Path to the parameter descriptor catalog (JSON)
    #[arg(long, env = ENV_CATALOG)]
    pub catalog: Option<PathBuf>,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub config: Option<PathBuf>,
    pub feed_url: Option<String>,
    pub feed_reconnect_secs: Option<u64>,
    pub catalog: Option<PathBuf>,
}

/// Parse CLI arguments (with env var fallbacks via clap)
pub fn parse() -> CliConfig {
    let cli = Cli::parse();
    CliConfig {
        host: cli.host,
        port: cli.port,
        config: cli.config,
        feed_url: cli.feed_url,
        feed_reconnect_secs: cli.feed_reconnect_secs,
        catalog: cli.catalog,
    }
}
