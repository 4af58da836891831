//! Errors raised while setting up or seeding a deployment.
//!
//! Inside the [`brewsync_engine::EntityStore`] implementation, sqlx
//! errors are folded into the engine's own taxonomy instead; see
//! [`to_engine_error`].

use brewsync_engine::Error as EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Fold a sqlx error into the engine's error taxonomy. Connection-level
/// failures become `Unavailable` (retryable); everything else is an
/// opaque backend rejection.
pub fn to_engine_error(err: sqlx::Error) -> EngineError {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            EngineError::Unavailable
        }
        other => EngineError::Backend(other.to_string()),
    }
}
