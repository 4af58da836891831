//! Error types for the Brewsync engine.

use crate::entity::EntityKind;
use crate::EntityId;
use thiserror::Error;

/// All possible errors from the Brewsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A store's connectivity probe failed, or a store refused to talk
    /// to us at all. Recoverable by retry; nothing was written.
    #[error("store unavailable")]
    Unavailable,

    /// The store collaborator reported a failure after its connectivity
    /// probe passed.
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: EntityId },

    /// The entity was never inserted into a store, so it has no
    /// identifier to work with.
    #[error("entity has no assigned identifier")]
    MissingId,

    #[error("entity kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        expected: EntityKind,
        actual: EntityKind,
    },

    /// A foreign key pointed at a row whose identifier pair was never
    /// recorded in the translation map. Copying the parent kind first
    /// would have prevented this.
    #[error("no translation recorded for {kind} id {source_id}")]
    MissingTranslation {
        kind: EntityKind,
        source_id: EntityId,
    },

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
