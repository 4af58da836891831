//! Single-entity synchronization: create locally, back up globally.
//!
//! The synchronizer owns one local store, one global store, and a
//! notification sink. Local persistence is the priority: a create always
//! commits locally, and a failed global backup leaves the entity in a
//! valid but degraded local-only state that callers can detect and retry.
//!
//! Outcomes are values, never exceptions. Store errors are converted at
//! this boundary; nothing below it leaks raw backend errors into
//! caller-facing validation messages.

use crate::copy::ShallowCopy;
use crate::entity::{Entity, EntityKind};
use crate::error::{Error, Result};
use crate::notify::NotificationSink;
use crate::store::EntityStore;
use crate::{EntityId, Timestamp};
use serde::Serialize;
use std::fmt;
use thiserror::Error as ThisError;

/// Tri-state result of a single backup attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupOutcome {
    /// The global row exists and the local entity's `global_id` resolves
    /// to it.
    Success,
    /// A store failed after the connectivity probe passed. Local data is
    /// intact; the global mirror is absent or unchanged.
    Rejected,
    /// A connectivity probe failed up front. Nothing was attempted.
    Unavailable,
}

/// Why an [`Synchronizer::add_and_backup`] call did not fully succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncFailure {
    /// A store was unreachable. Retry later.
    Unavailable,
    /// The backup was rejected by the global store.
    Rejected,
    /// A global id was assigned but the confirming re-fetch failed;
    /// treat as a conflict needing attention, not a hard failure.
    MissingConfirmation,
    /// The entity was persisted locally but no global reference was
    /// ever established (degraded, local-only state).
    NoGlobalReference,
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SyncFailure::Unavailable => "backup service unavailable",
            SyncFailure::Rejected => "backup rejected by the global store",
            SyncFailure::MissingConfirmation => "backup not confirmed by the global store",
            SyncFailure::NoGlobalReference => "no global reference established",
        };
        f.write_str(msg)
    }
}

/// A failed `add_and_backup`. Carries the entity back to the caller:
/// on every failure past the local insert the entity is durably
/// persisted locally and should not be thrown away.
#[derive(Debug, Clone, ThisError)]
#[error("{failure}")]
pub struct SyncError {
    pub failure: SyncFailure,
    pub entity: Entity,
}

/// Error collector consumed by form-style callers.
///
/// [`Synchronizer::validate_add_and_backup`] reports failures through
/// this instead of returning errors, so a caller can redisplay input
/// with an inline message rather than crash.
pub trait ValidationContext {
    fn add_error(&mut self, field: &str, message: &str);
}

/// A plain [`ValidationContext`] implementation.
#[derive(Debug, Clone, Default)]
pub struct ValidationErrors {
    pub errors: Vec<(String, String)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl ValidationContext for ValidationErrors {
    fn add_error(&mut self, field: &str, message: &str) {
        self.errors.push((field.to_string(), message.to_string()));
    }
}

/// What a consistency audit found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncAudit {
    /// Local rows with no global reference at all.
    pub local_only: Vec<(EntityKind, EntityId)>,
    /// Local rows soft-deleted where the global counterpart is not.
    pub stale_deletes: Vec<(EntityKind, EntityId)>,
}

impl SyncAudit {
    pub fn is_clean(&self) -> bool {
        self.local_only.is_empty() && self.stale_deletes.is_empty()
    }
}

/// Orchestrates "create locally, then back up globally" for single
/// entities.
pub struct Synchronizer<L, G, N> {
    local: L,
    global: G,
    sink: N,
}

impl<L, G, N> Synchronizer<L, G, N>
where
    L: EntityStore,
    G: EntityStore,
    N: NotificationSink,
{
    pub fn new(local: L, global: G, sink: N) -> Self {
        Self {
            local,
            global,
            sink,
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn global(&self) -> &G {
        &self.global
    }

    /// Back up a locally persisted entity into the global store.
    ///
    /// If the entity already carries a `global_id` that resolves to a
    /// global row, that row is overwritten in place. Otherwise a fresh
    /// global row is created and its identifier is written back onto the
    /// local entity and committed to the local store.
    ///
    /// On any outcome other than [`BackupOutcome::Success`] the entity
    /// is left exactly as it was. Connectivity is probed once, up front;
    /// a connection lost mid-flight surfaces as `Rejected`.
    pub async fn backup_to_global(&self, entity: &mut Entity) -> BackupOutcome {
        if !self.local.can_connect().await || !self.global.can_connect().await {
            return BackupOutcome::Unavailable;
        }

        match self.try_backup(entity).await {
            Ok(()) => BackupOutcome::Success,
            Err(err) => {
                tracing::warn!(kind = %entity.kind(), error = %err, "global backup rejected");
                BackupOutcome::Rejected
            }
        }
    }

    async fn try_backup(&self, entity: &mut Entity) -> Result<()> {
        let kind = entity.kind();

        if let Some(global_id) = entity.meta().global_id {
            if let Some(mut row) = self.global.find_by_id(kind, global_id).await? {
                // Overwrite-on-resync: same global row, new field values.
                row.overwrite_from(entity)?;
                self.global.update(&row).await?;
                return Ok(());
            }
            // The referenced global row is gone; fall through and create
            // a replacement.
        }

        let mut copy = entity.shallow_copy();
        let global_id = self.global.insert(&mut copy).await?;
        entity.meta_mut().global_id = Some(global_id);
        if let Err(err) = self.local.update(entity).await {
            // Keep the no-mutation guarantee for non-success outcomes.
            entity.meta_mut().global_id = None;
            return Err(err);
        }
        Ok(())
    }

    /// Insert a transient entity into the local store, then back it up.
    ///
    /// The local insert stamps `created_at = now` and is never rolled
    /// back by a backup failure. On full success the notification sink
    /// receives `"{kind}.created"` with the entity's business fields; a
    /// sink failure is logged and does not change the outcome.
    ///
    /// On failure the returned [`SyncError`] carries the entity so the
    /// caller keeps the (usually locally persisted) degraded row.
    pub async fn add_and_backup(
        &self,
        mut entity: Entity,
        now: Timestamp,
    ) -> std::result::Result<Entity, SyncError> {
        entity.meta_mut().created_at = Some(now);

        if let Err(err) = self.local.insert(&mut entity).await {
            tracing::warn!(kind = %entity.kind(), error = %err, "local insert failed");
            let failure = match err {
                Error::Unavailable => SyncFailure::Unavailable,
                _ => SyncFailure::Rejected,
            };
            return Err(SyncError { failure, entity });
        }

        match self.backup_to_global(&mut entity).await {
            BackupOutcome::Unavailable => Err(SyncError {
                failure: SyncFailure::Unavailable,
                entity,
            }),
            BackupOutcome::Rejected => Err(SyncError {
                failure: SyncFailure::Rejected,
                entity,
            }),
            BackupOutcome::Success => {
                let Some(global_id) = entity.meta().global_id else {
                    return Err(SyncError {
                        failure: SyncFailure::NoGlobalReference,
                        entity,
                    });
                };

                // Confirm the mirror is really there before declaring
                // victory to the outside world.
                match self.global.find_by_id(entity.kind(), global_id).await {
                    Ok(Some(_)) => {
                        self.notify_created(&entity).await;
                        Ok(entity)
                    }
                    _ => Err(SyncError {
                        failure: SyncFailure::MissingConfirmation,
                        entity,
                    }),
                }
            }
        }
    }

    async fn notify_created(&self, entity: &Entity) {
        let topic = format!("{}.created", entity.kind());
        let payload = match entity.payload_json() {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!(topic, error = %err, "notification payload skipped");
                return;
            }
        };
        if let Err(err) = self.sink.send(&topic, payload).await {
            tracing::warn!(topic, error = %err, "notification not delivered");
        }
    }

    /// [`Synchronizer::add_and_backup`] for form-style callers: any
    /// failure becomes a human-readable entry in the validation context
    /// and `None` is returned instead of an error.
    pub async fn validate_add_and_backup(
        &self,
        ctx: &mut dyn ValidationContext,
        entity: Entity,
        now: Timestamp,
    ) -> Option<Entity> {
        match self.add_and_backup(entity, now).await {
            Ok(entity) => Some(entity),
            Err(err) => {
                let message = match err.failure {
                    SyncFailure::Unavailable => {
                        "The backup service is currently unavailable; please try again later."
                    }
                    SyncFailure::Rejected => {
                        "The record could not be backed up to the global system."
                    }
                    SyncFailure::MissingConfirmation => {
                        "The backup could not be confirmed; the record may need attention."
                    }
                    SyncFailure::NoGlobalReference => {
                        "The record was saved locally but has no global reference yet."
                    }
                };
                ctx.add_error("sync", message);
                None
            }
        }
    }

    /// Soft-delete a local row, then best-effort propagate the marker to
    /// the global counterpart.
    ///
    /// The local commit happens regardless; a failed propagation only
    /// widens the documented inconsistency window, which [`Synchronizer::audit`]
    /// makes observable.
    pub async fn soft_delete(
        &self,
        kind: EntityKind,
        id: EntityId,
        now: Timestamp,
    ) -> Result<Entity> {
        let mut entity = self
            .local
            .find_by_id(kind, id)
            .await?
            .ok_or(Error::NotFound { kind, id })?;

        entity.meta_mut().deleted_at = Some(now);
        self.local.update(&entity).await?;

        if let Some(global_id) = entity.meta().global_id {
            if self.global.can_connect().await {
                if let Err(err) = self.propagate_delete(kind, global_id, now).await {
                    tracing::warn!(%kind, id, error = %err, "global delete not propagated");
                }
            } else {
                tracing::warn!(%kind, id, "global store unreachable, delete left stale");
            }
        }

        Ok(entity)
    }

    async fn propagate_delete(
        &self,
        kind: EntityKind,
        global_id: EntityId,
        now: Timestamp,
    ) -> Result<()> {
        let mut row = self
            .global
            .find_by_id(kind, global_id)
            .await?
            .ok_or(Error::NotFound {
                kind,
                id: global_id,
            })?;
        row.meta_mut().deleted_at = Some(now);
        self.global.update(&row).await
    }

    /// Walk every kind and report rows sitting in the degraded-
    /// consistency window: local-only rows and unpropagated soft
    /// deletes. Requires both stores to be reachable.
    pub async fn audit(&self) -> Result<SyncAudit> {
        if !self.local.can_connect().await || !self.global.can_connect().await {
            return Err(Error::Unavailable);
        }

        let mut audit = SyncAudit::default();
        for kind in EntityKind::DEPENDENCY_ORDER {
            for row in self.local.query(kind).await? {
                let id = row.id()?;
                let Some(global_id) = row.meta().global_id else {
                    audit.local_only.push((kind, id));
                    continue;
                };
                if row.meta().is_deleted() {
                    let stale = match self.global.find_by_id(kind, global_id).await? {
                        Some(counterpart) => !counterpart.meta().is_deleted(),
                        None => true,
                    };
                    if stale {
                        audit.stale_deletes.push((kind, id));
                    }
                }
            }
        }
        Ok(audit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Meta, User};
    use crate::notify::NullSink;
    use crate::store::MemoryStore;

    fn alice() -> Entity {
        Entity::from(User {
            user_name: "alice.smith".into(),
            email: "alice@example.com".into(),
            first_name: "Alice".into(),
            last_name: "Smith".into(),
            ..User::default()
        })
    }

    fn sync() -> Synchronizer<MemoryStore, MemoryStore, NullSink> {
        Synchronizer::new(MemoryStore::new(), MemoryStore::new(), NullSink)
    }

    #[tokio::test]
    async fn backup_requires_local_persistence_first() {
        let sync = sync();
        let mut entity = alice();
        sync.local().insert(&mut entity).await.unwrap();

        let outcome = sync.backup_to_global(&mut entity).await;
        assert_eq!(outcome, BackupOutcome::Success);
        assert_eq!(entity.meta().global_id, Some(1));
    }

    #[tokio::test]
    async fn unavailable_probe_writes_nothing() {
        let sync = sync();
        let mut entity = alice();
        sync.local().insert(&mut entity).await.unwrap();
        sync.global().set_online(false);

        let before = entity.clone();
        let outcome = sync.backup_to_global(&mut entity).await;
        assert_eq!(outcome, BackupOutcome::Unavailable);
        assert_eq!(entity, before);
        assert!(sync.global().is_empty(EntityKind::User));
    }

    #[tokio::test]
    async fn rejected_backup_leaves_entity_untouched() {
        let sync = sync();
        let mut entity = alice();
        sync.local().insert(&mut entity).await.unwrap();
        sync.global().set_fail_writes(true);

        let before = entity.clone();
        let outcome = sync.backup_to_global(&mut entity).await;
        assert_eq!(outcome, BackupOutcome::Rejected);
        assert_eq!(entity, before);
        assert_eq!(entity.meta().global_id, None);
    }

    #[tokio::test]
    async fn failed_local_writeback_rolls_back_global_id() {
        let sync = sync();
        let mut entity = alice();
        sync.local().insert(&mut entity).await.unwrap();
        sync.local().set_fail_writes(true);

        let outcome = sync.backup_to_global(&mut entity).await;
        assert_eq!(outcome, BackupOutcome::Rejected);
        assert_eq!(entity.meta().global_id, None);
    }

    #[tokio::test]
    async fn resync_updates_global_row_in_place() {
        let sync = sync();
        let mut entity = alice();
        sync.local().insert(&mut entity).await.unwrap();
        assert_eq!(sync.backup_to_global(&mut entity).await, BackupOutcome::Success);
        let global_id = entity.meta().global_id.unwrap();

        match &mut entity {
            Entity::User(u) => u.first_name = "Alicia".into(),
            other => panic!("wrong variant: {:?}", other.kind()),
        }
        sync.local().update(&entity).await.unwrap();

        assert_eq!(sync.backup_to_global(&mut entity).await, BackupOutcome::Success);
        assert_eq!(entity.meta().global_id, Some(global_id));
        assert_eq!(sync.global().len(EntityKind::User), 1);

        let row = sync
            .global()
            .find_by_id(EntityKind::User, global_id)
            .await
            .unwrap()
            .unwrap();
        match row {
            Entity::User(u) => assert_eq!(u.first_name, "Alicia"),
            other => panic!("wrong variant: {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn dangling_global_id_gets_a_replacement_row() {
        let sync = sync();
        let mut entity = alice();
        sync.local().insert(&mut entity).await.unwrap();
        entity.meta_mut().global_id = Some(999); // points nowhere
        sync.local().update(&entity).await.unwrap();

        assert_eq!(sync.backup_to_global(&mut entity).await, BackupOutcome::Success);
        let global_id = entity.meta().global_id.unwrap();
        assert_ne!(global_id, 999);
        assert!(sync
            .global()
            .find_by_id(EntityKind::User, global_id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn add_and_backup_stamps_created_at() {
        let sync = sync();
        let entity = sync.add_and_backup(alice(), 1000).await.unwrap();
        assert_eq!(entity.meta().created_at, Some(1000));
        assert_eq!(entity.meta().id, Some(1));
        assert_eq!(entity.meta().global_id, Some(1));
    }

    #[tokio::test]
    async fn add_and_backup_degrades_when_global_down() {
        let sync = sync();
        sync.global().set_online(false);

        let err = sync.add_and_backup(alice(), 1000).await.unwrap_err();
        assert_eq!(err.failure, SyncFailure::Unavailable);
        // Local row persisted, no global reference.
        assert_eq!(err.entity.meta().id, Some(1));
        assert_eq!(err.entity.meta().global_id, None);
        assert_eq!(sync.local().len(EntityKind::User), 1);
        assert!(sync.global().is_empty(EntityKind::User));
    }

    #[tokio::test]
    async fn add_and_backup_maps_rejection() {
        let sync = sync();
        sync.global().set_fail_writes(true);

        let err = sync.add_and_backup(alice(), 1000).await.unwrap_err();
        assert_eq!(err.failure, SyncFailure::Rejected);
        assert_eq!(sync.local().len(EntityKind::User), 1);
    }

    #[tokio::test]
    async fn failed_confirmation_fetch_is_surfaced() {
        let sync = sync();
        // Global writes land, but the confirming re-fetch errors out.
        sync.global().set_fail_reads(true);

        let err = sync.add_and_backup(alice(), 1000).await.unwrap_err();
        assert_eq!(err.failure, SyncFailure::MissingConfirmation);

        // The local row and its global reference stay persisted; only
        // the confirmation is missing.
        assert_eq!(err.entity.meta().id, Some(1));
        assert_eq!(err.entity.meta().global_id, Some(1));
        let local_row = sync
            .local()
            .find_by_id(EntityKind::User, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(local_row.meta().global_id, Some(1));
        assert_eq!(sync.global().len(EntityKind::User), 1);
    }

    #[tokio::test]
    async fn validate_wrapper_collects_errors_instead_of_failing() {
        let sync = sync();
        sync.global().set_online(false);

        let mut ctx = ValidationErrors::new();
        let result = sync.validate_add_and_backup(&mut ctx, alice(), 1000).await;
        assert!(result.is_none());
        assert_eq!(ctx.errors.len(), 1);
        assert_eq!(ctx.errors[0].0, "sync");
        assert!(ctx.errors[0].1.contains("unavailable"));
    }

    #[tokio::test]
    async fn validate_wrapper_passes_through_success() {
        let sync = sync();
        let mut ctx = ValidationErrors::new();
        let result = sync.validate_add_and_backup(&mut ctx, alice(), 1000).await;
        assert!(result.is_some());
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn soft_delete_commits_locally_despite_global_outage() {
        let sync = sync();
        let entity = sync.add_and_backup(alice(), 1000).await.unwrap();
        let id = entity.meta().id.unwrap();
        let global_id = entity.meta().global_id.unwrap();

        sync.global().set_online(false);
        let deleted = sync.soft_delete(EntityKind::User, id, 2000).await.unwrap();
        assert_eq!(deleted.meta().deleted_at, Some(2000));

        // Global counterpart is stale until the next successful sync.
        sync.global().set_online(true);
        let counterpart = sync
            .global()
            .find_by_id(EntityKind::User, global_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counterpart.meta().deleted_at, None);
    }

    #[tokio::test]
    async fn soft_delete_propagates_when_reachable() {
        let sync = sync();
        let entity = sync.add_and_backup(alice(), 1000).await.unwrap();
        let id = entity.meta().id.unwrap();
        let global_id = entity.meta().global_id.unwrap();

        sync.soft_delete(EntityKind::User, id, 2000).await.unwrap();

        let counterpart = sync
            .global()
            .find_by_id(EntityKind::User, global_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(counterpart.meta().deleted_at, Some(2000));
    }

    #[tokio::test]
    async fn audit_reports_degraded_rows() {
        let sync = sync();

        // One fully synced row.
        sync.add_and_backup(alice(), 1000).await.unwrap();

        // One local-only row.
        sync.global().set_online(false);
        let degraded = sync.add_and_backup(alice(), 1100).await.unwrap_err().entity;
        sync.global().set_online(true);

        // One stale delete.
        let synced = sync.add_and_backup(alice(), 1200).await.unwrap();
        sync.global().set_online(false);
        sync.soft_delete(EntityKind::User, synced.meta().id.unwrap(), 1300)
            .await
            .unwrap();
        sync.global().set_online(true);

        let audit = sync.audit().await.unwrap();
        assert!(!audit.is_clean());
        assert_eq!(
            audit.local_only,
            vec![(EntityKind::User, degraded.meta().id.unwrap())]
        );
        assert_eq!(
            audit.stale_deletes,
            vec![(EntityKind::User, synced.meta().id.unwrap())]
        );
    }

    #[tokio::test]
    async fn audit_requires_both_stores() {
        let sync = sync();
        sync.global().set_online(false);
        assert_eq!(sync.audit().await, Err(Error::Unavailable));
    }

    #[tokio::test]
    async fn sync_error_display_is_caller_friendly() {
        let err = SyncError {
            failure: SyncFailure::NoGlobalReference,
            entity: Entity::from(User {
                meta: Meta::default(),
                ..User::default()
            }),
        };
        assert_eq!(err.to_string(), "no global reference established");
    }
}
