//! Telemetry feed boundary
//!
//! The upstream push feed is abstracted behind [`FeedSource`] so the ingest
//! pipeline (and tests) never touch the transport directly. A subscription
//! delivers [`FeedUpdate`]s until it is cancelled or the source ends.

pub mod http;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// One parameter update delivered by the feed.
///
/// The feed's own staleness/quality fields are deliberately not carried:
/// receipt time is assigned downstream by the ingest pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedUpdate {
    pub key: String,
    pub value: String,
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed connection failed: {0}")]
    Connect(String),
}

/// Push source of parameter updates.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Subscribe to updates for the given keys.
    ///
    /// Delivery starts immediately; the connection lifecycle (reconnects
    /// included) is owned by the source, not the subscriber.
    async fn subscribe(&self, keys: &[String]) -> Result<FeedSubscription, FeedError>;
}

/// Handle to an active subscription.
pub struct FeedSubscription {
    updates: mpsc::Receiver<FeedUpdate>,
    cancel: watch::Sender<bool>,
}

impl FeedSubscription {
    pub fn new(updates: mpsc::Receiver<FeedUpdate>, cancel: watch::Sender<bool>) -> Self {
        Self { updates, cancel }
    }

    /// Receive the next update; `None` when the subscription has ended.
    pub async fn recv(&mut self) -> Option<FeedUpdate> {
        self.updates.recv().await
    }

    /// Cancel the subscription and stop the underlying connection task.
    pub fn unsubscribe(self) {
        let _ = self.cancel.send(true);
    }
}
