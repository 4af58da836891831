//! # Brewsync Store
//!
//! SQLite implementations of the engine's storage and notification
//! contracts, plus the seeding tooling that populates a fresh deployment.
//!
//! The engine never sees SQL. [`SqliteEntityStore`] adapts a connection
//! pool to the [`brewsync_engine::EntityStore`] contract, and
//! [`OutboxSink`] persists notifications into the same database for a
//! relay to pick up later.

pub mod config;
pub mod db;
pub mod entity_store;
pub mod error;
pub mod outbox;
pub mod seed;

pub use config::Config;
pub use db::{connect, migrate};
pub use entity_store::SqliteEntityStore;
pub use error::StoreError;
pub use outbox::{OutboxEntry, OutboxSink};

use brewsync_engine::Timestamp;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    chrono::Utc::now().timestamp_millis() as Timestamp
}
