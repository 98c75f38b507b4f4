// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "Orbitel";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "orbitel";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".orbitel";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "orbitel.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "ORBITEL_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "ORBITEL_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "ORBITEL_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "ORBITEL_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 3000;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "ORBITEL_DATA_DIR";

// =============================================================================
// Telemetry Feed
// =============================================================================

/// Environment variable for the feed stream URL
pub const ENV_FEED_URL: &str = "ORBITEL_FEED_URL";

/// Environment variable for the feed reconnect delay
pub const ENV_FEED_RECONNECT_SECS: &str = "ORBITEL_FEED_RECONNECT_SECS";

/// Default feed stream URL (local relay)
pub const DEFAULT_FEED_URL: &str = "http://127.0.0.1:8600/telemetry/stream";

/// Default delay between feed reconnect attempts, in seconds
pub const DEFAULT_FEED_RECONNECT_SECS: u64 = 5;

/// Field of a feed update that carries the parameter value
pub const FEED_VALUE_FIELD: &str = "Value";

// =============================================================================
// Descriptor Catalog
// =============================================================================

/// Environment variable for the descriptor catalog path
pub const ENV_CATALOG: &str = "ORBITEL_CATALOG";

/// Default catalog file name (looked up in the data directory)
pub const CATALOG_FILE_NAME: &str = "catalog.json";

/// Subscription key set used when the catalog loads no entries
pub const DEFAULT_FEED_KEYS: &[&str] = &[
    "AIRLOCK000049",
    "AIRLOCK000050",
    "NODE3000011",
    "NODE3000012",
    "P1000004",
    "S0000005",
    "USLAB000058",
    "USLAB000059",
];

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "orbitel.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// SQLite WAL autocheckpoint threshold in pages
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Interval between forced WAL checkpoints in seconds
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Retention
// =============================================================================

/// Maximum number of samples retained per key
pub const SAMPLES_PER_KEY_CAP: i64 = 100;

// =============================================================================
// Shutdown
// =============================================================================

/// Timeout for background tasks to finish during shutdown, in seconds
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
