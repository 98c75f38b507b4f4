//! Streaming HTTP feed transport
//!
//! Consumes a newline-delimited JSON stream of parameter updates, one object
//! per line: `{"name": "<item>", "values": {"Value": "...", ...}}`. The
//! connection task reconnects with a fixed delay and skips malformed lines,
//! so a single bad update never tears down the subscription.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::{mpsc, watch};

use super::{FeedError, FeedSource, FeedSubscription, FeedUpdate};
use crate::core::config::FeedConfig;
use crate::core::constants::FEED_VALUE_FIELD;

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Feed client over a streaming HTTP endpoint
pub struct HttpFeed {
    client: reqwest::Client,
    config: FeedConfig,
}

impl HttpFeed {
    pub fn new(config: FeedConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

/// One line of the wire stream.
#[derive(Debug, Deserialize)]
struct WireUpdate {
    name: String,
    #[serde(default)]
    values: HashMap<String, serde_json::Value>,
}

/// Why a connection attempt stopped delivering.
enum StreamEnd {
    /// The server closed the stream; reconnect.
    Disconnected,
    /// The subscriber dropped its receiver; stop for good.
    SubscriberGone,
}

#[async_trait]
impl FeedSource for HttpFeed {
    async fn subscribe(&self, keys: &[String]) -> Result<FeedSubscription, FeedError> {
        let mut url = reqwest::Url::parse(&self.config.url).map_err(|e| {
            FeedError::Connect(format!("invalid feed url {}: {}", self.config.url, e))
        })?;
        url.query_pairs_mut().append_pair("items", &keys.join(","));

        let (tx, rx) = mpsc::channel(UPDATE_CHANNEL_CAPACITY);
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let client = self.client.clone();
        let reconnect = Duration::from_secs(self.config.reconnect_secs);

        tokio::spawn(async move {
            tracing::info!(url = %url, "Feed subscription started");
            loop {
                let outcome = tokio::select! {
                    biased;
                    res = cancel_rx.changed() => {
                        // A dropped sender counts as cancellation too
                        if res.is_err() || *cancel_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                    result = stream_updates(&client, &url, &tx) => result,
                };

                match outcome {
                    Ok(StreamEnd::SubscriberGone) => break,
                    Ok(StreamEnd::Disconnected) => {
                        tracing::warn!("Feed stream ended, reconnecting");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Feed connection failed, reconnecting");
                    }
                }

                if sleep_or_cancel(&mut cancel_rx, reconnect).await {
                    break;
                }
            }
            tracing::info!("Feed subscription stopped");
        });

        Ok(FeedSubscription::new(rx, cancel_tx))
    }
}

/// Stream one connection's worth of updates into `tx`.
async fn stream_updates(
    client: &reqwest::Client,
    url: &reqwest::Url,
    tx: &mpsc::Sender<FeedUpdate>,
) -> Result<StreamEnd, reqwest::Error> {
    let response = client.get(url.clone()).send().await?.error_for_status()?;
    tracing::info!(status = %response.status(), "Feed connected");

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        while let Some(pos) = buffer.find('\n') {
            let line: String = buffer.drain(..=pos).collect();
            if let Some(update) = parse_line(&line) {
                if tx.send(update).await.is_err() {
                    return Ok(StreamEnd::SubscriberGone);
                }
            }
        }
    }

    Ok(StreamEnd::Disconnected)
}

/// Sleep for the reconnect delay; true when cancelled in the meantime.
async fn sleep_or_cancel(cancel_rx: &mut watch::Receiver<bool>, delay: Duration) -> bool {
    tokio::select! {
        res = cancel_rx.changed() => res.is_err() || *cancel_rx.borrow(),
        _ = tokio::time::sleep(delay) => false,
    }
}

/// Parse one stream line; `None` means skip (blank, malformed, or missing
/// the value field) — delivery failures never terminate the subscription.
fn parse_line(line: &str) -> Option<FeedUpdate> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let wire: WireUpdate = match serde_json::from_str(line) {
        Ok(wire) => wire,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed feed update");
            return None;
        }
    };

    if wire.name.is_empty() {
        tracing::warn!("Skipping feed update with empty item name");
        return None;
    }

    let value = match wire.values.get(FEED_VALUE_FIELD) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => {
            tracing::warn!(item = %wire.name, "Skipping feed update without a value field");
            return None;
        }
    };

    Some(FeedUpdate {
        key: wire.name,
        value,
    })
}
