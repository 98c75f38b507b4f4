//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, CATALOG_FILE_NAME, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::sqlite::SqliteService;
use crate::domain::catalog::Catalog;
use crate::domain::ingest::IngestPipeline;
use crate::feed::FeedSource;
use crate::feed::http::HttpFeed;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<SqliteService>,
    pub catalog: Arc<Catalog>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli_config = cli::parse();
        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init().await?;

        // Store init (schema creation included) is the one fatal failure;
        // everything after it degrades and keeps the process alive.
        let database = Arc::new(
            SqliteService::init(&storage)
                .await
                .context("Failed to initialize telemetry store")?,
        );

        let catalog_path = config
            .catalog
            .path
            .clone()
            .unwrap_or_else(|| storage.data_path(CATALOG_FILE_NAME));
        let catalog = Arc::new(Catalog::load(&catalog_path));

        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            storage,
            database,
            catalog,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;

        let feed: Arc<dyn FeedSource> = Arc::new(HttpFeed::new(self.config.feed.clone()));
        let pipeline = IngestPipeline::new(self.database.clone(), self.catalog.clone());
        self.shutdown
            .register(pipeline.start(feed, self.shutdown.subscribe()))
            .await;

        tracing::debug!("Background tasks started");
    }
}
