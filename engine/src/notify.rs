//! The notification sink contract.
//!
//! After a fully successful sync the synchronizer hands the entity's
//! business fields to a sink. Delivery is fire-and-forget: a sink failure
//! is logged by the caller and never changes the sync outcome.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors a sink may report. Callers log these and move on.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification channel closed")]
    Closed,

    #[error("sink backend error: {0}")]
    Backend(String),
}

/// A fire-and-forget notification target.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, topic: &str, payload: Value) -> Result<(), SinkError>;
}

/// A sink that drops everything. Useful when no messaging is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl NotificationSink for NullSink {
    async fn send(&self, _topic: &str, _payload: Value) -> Result<(), SinkError> {
        Ok(())
    }
}

/// A delivered notification, as observed by a [`ChannelSink`] receiver.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub topic: String,
    pub payload: Value,
}

/// A sink backed by an in-process channel. Tests subscribe to the
/// receiving end to assert on what was (or was not) published.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    /// Create a sink and the receiver observing it.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl NotificationSink for ChannelSink {
    async fn send(&self, topic: &str, payload: Value) -> Result<(), SinkError> {
        self.tx
            .send(Notification {
                topic: topic.to_string(),
                payload,
            })
            .map_err(|_| SinkError::Closed)
    }
}
