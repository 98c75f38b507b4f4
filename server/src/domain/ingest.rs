//! Feed ingest pipeline
//!
//! Bridges one feed update to one retention store write: stamps receipt
//! time, attaches catalog metadata, inserts, and lets the store prune.
//! Patterned as a background task wired to the shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::constants::DEFAULT_FEED_RECONNECT_SECS;
use crate::data::sqlite::SqliteService;
use crate::data::sqlite::repositories::sample;
use crate::domain::catalog::Catalog;
use crate::feed::{FeedSource, FeedSubscription, FeedUpdate};

pub struct IngestPipeline {
    database: Arc<SqliteService>,
    catalog: Arc<Catalog>,
}

impl IngestPipeline {
    pub fn new(database: Arc<SqliteService>, catalog: Arc<Catalog>) -> Self {
        Self { database, catalog }
    }

    pub fn start(
        self,
        feed: Arc<dyn FeedSource>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let keys = self.catalog.feed_keys();
            tracing::info!(keys = keys.len(), "Ingest pipeline starting");

            let Some(mut subscription) = self
                .subscribe_with_retry(feed.as_ref(), &keys, &mut shutdown_rx)
                .await
            else {
                tracing::debug!("Ingest pipeline shut down before subscribing");
                return;
            };

            loop {
                tokio::select! {
                    biased;
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::debug!("Ingest pipeline received shutdown");
                            break;
                        }
                    }
                    update = subscription.recv() => {
                        match update {
                            Some(update) => self.handle_update(update).await,
                            None => {
                                tracing::warn!("Feed subscription ended");
                                break;
                            }
                        }
                    }
                }
            }

            subscription.unsubscribe();
            tracing::debug!("Ingest pipeline shutdown complete");
        })
    }

    async fn subscribe_with_retry(
        &self,
        feed: &dyn FeedSource,
        keys: &[String],
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Option<FeedSubscription> {
        loop {
            match feed.subscribe(keys).await {
                Ok(subscription) => {
                    tracing::info!("Feed subscription established");
                    return Some(subscription);
                }
                Err(e) => tracing::warn!(error = %e, "Feed subscription failed, retrying"),
            }

            tokio::select! {
                res = shutdown_rx.changed() => {
                    if res.is_err() || *shutdown_rx.borrow() {
                        return None;
                    }
                }
                _ = tokio::time::sleep(Duration::from_secs(DEFAULT_FEED_RECONNECT_SECS)) => {}
            }
        }
    }

    /// Persist one update. Receipt time is authoritative; the feed's own
    /// staleness fields are not consulted. A failed insert is logged and
    /// skipped — it never terminates the loop.
    async fn handle_update(&self, update: FeedUpdate) {
        if update.key.is_empty() {
            tracing::warn!("Skipping feed update with empty key");
            return;
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        let descriptor = self.catalog.descriptor(&update.key);

        match sample::insert(
            self.database.pool(),
            &update.key,
            &update.value,
            timestamp,
            &descriptor,
        )
        .await
        {
            Ok(true) => tracing::trace!(key = %update.key, timestamp, "Sample stored"),
            Ok(false) => tracing::trace!(key = %update.key, timestamp, "Duplicate sample ignored"),
            Err(e) => tracing::error!(key = %update.key, error = %e, "Failed to store sample"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sqlx::sqlite::SqlitePoolOptions;
    use tokio::sync::{Mutex, mpsc};

    use crate::data::sqlite::migrations;
    use crate::data::types::Descriptor;
    use crate::feed::FeedError;

    /// In-process feed fake: hands out a pre-wired channel subscription.
    struct ChannelFeed {
        updates: Mutex<Option<mpsc::Receiver<FeedUpdate>>>,
    }

    impl ChannelFeed {
        fn new(rx: mpsc::Receiver<FeedUpdate>) -> Self {
            Self {
                updates: Mutex::new(Some(rx)),
            }
        }
    }

    #[async_trait]
    impl FeedSource for ChannelFeed {
        async fn subscribe(&self, _keys: &[String]) -> Result<FeedSubscription, FeedError> {
            let rx = self
                .updates
                .lock()
                .await
                .take()
                .ok_or_else(|| FeedError::Connect("already subscribed".to_string()))?;
            let (cancel_tx, _) = tokio::sync::watch::channel(false);
            Ok(FeedSubscription::new(rx, cancel_tx))
        }
    }

    async fn test_database() -> Arc<SqliteService> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(":memory:")
            .await
            .unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        Arc::new(SqliteService::from_pool(pool))
    }

    fn pressure_catalog() -> Arc<Catalog> {
        Arc::new(Catalog::from_entries([(
            "USLAB000058".to_string(),
            Descriptor {
                description: "Cabin Pressure".to_string(),
                units: "psia".to_string(),
                ..Default::default()
            },
        )]))
    }

    #[tokio::test]
    async fn test_handle_update_attaches_descriptor_and_receipt_time() {
        let database = test_database().await;
        let pipeline = IngestPipeline::new(database.clone(), pressure_catalog());

        let before = chrono::Utc::now().timestamp_millis();
        pipeline
            .handle_update(FeedUpdate {
                key: "USLAB000058".to_string(),
                value: "14.69".to_string(),
            })
            .await;
        let after = chrono::Utc::now().timestamp_millis();

        let series = sample::get_by_key(database.pool(), "USLAB000058")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.values.len(), 1);
        assert_eq!(series.values[0].value, "14.69");
        assert!(series.values[0].timestamp >= before && series.values[0].timestamp <= after);
        assert_eq!(series.descriptor.description, "Cabin Pressure");
        assert_eq!(series.descriptor.units, "psia");
    }

    #[tokio::test]
    async fn test_handle_update_unknown_key_gets_empty_descriptor() {
        let database = test_database().await;
        let pipeline = IngestPipeline::new(database.clone(), pressure_catalog());

        pipeline
            .handle_update(FeedUpdate {
                key: "NODE3000011".to_string(),
                value: "1".to_string(),
            })
            .await;

        let series = sample::get_by_key(database.pool(), "NODE3000011")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.descriptor, Descriptor::default());
    }

    #[tokio::test]
    async fn test_handle_update_skips_empty_key() {
        let database = test_database().await;
        let pipeline = IngestPipeline::new(database.clone(), pressure_catalog());

        pipeline
            .handle_update(FeedUpdate {
                key: String::new(),
                value: "1".to_string(),
            })
            .await;

        assert!(sample::get_all(database.pool()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_drains_feed_until_shutdown() {
        let database = test_database().await;
        let (tx, rx) = mpsc::channel(16);
        let feed = Arc::new(ChannelFeed::new(rx));
        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let pipeline = IngestPipeline::new(database.clone(), pressure_catalog());
        let handle = pipeline.start(feed, shutdown_rx);

        for value in ["14.68", "14.69", "14.70"] {
            tx.send(FeedUpdate {
                key: "USLAB000058".to_string(),
                value: value.to_string(),
            })
            .await
            .unwrap();
            // Distinct receipt timestamps
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // Wait for the pipeline to drain the channel
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let stored = sample::get_by_key(database.pool(), "USLAB000058")
                    .await
                    .unwrap()
                    .map(|s| s.values.len())
                    .unwrap_or(0);
                if stored == 3 {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
