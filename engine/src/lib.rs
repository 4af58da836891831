//! # Brewsync Engine
//!
//! The dual-store synchronization core for a small ordering application.
//!
//! Every domain entity lives in a *local* store (fast, possibly
//! offline-capable) and is mirrored, best-effort, into an authoritative
//! *global* store. The two stores assign identifiers independently; the
//! engine keeps them linked and consistent.
//!
//! ## Design Principles
//!
//! - **Local-first**: a create operation always commits locally; a failed
//!   global backup degrades the entity, it never rolls the local row back
//! - **Explicit outcomes**: backup results are values
//!   ([`BackupOutcome`], [`SyncFailure`]), not exceptions
//! - **No direct IO**: the engine talks to storage only through the
//!   [`EntityStore`] contract and to messaging only through
//!   [`NotificationSink`]
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! A closed set of variants ([`Entity`]) over the shop's domain types:
//! users, coffees, addresses, orders, order items, payment details. Each
//! carries a [`Meta`] block with:
//! - the identifier assigned by the store it lives in
//! - an optional `global_id` pointing at the mirrored global row
//! - creation and soft-delete timestamps
//!
//! Foreign keys always reference rows *within the same store*; cross-store
//! linkage exists only through `global_id`.
//!
//! ### Synchronizer
//!
//! [`Synchronizer`] orchestrates "create locally, then back up globally"
//! with a connectivity probe and a tri-state outcome (success, rejected,
//! unavailable). See [`Synchronizer::add_and_backup`] for the failure
//! taxonomy callers are expected to branch on.
//!
//! ### Bulk reconciliation
//!
//! [`BulkReconciler`] performs a one-shot, order-respecting copy of an
//! entire dataset from one store into the other, rewriting foreign keys
//! through a run-scoped [`TranslationMap`]. Parents are always copied
//! before the entities that reference them; a translation miss is a hard
//! error, never a silently defaulted key.
//!
//! ## Quick Start
//!
//! ```rust
//! use brewsync_engine::{
//!     Entity, MemoryStore, NullSink, Synchronizer, User,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(async {
//! let sync = Synchronizer::new(MemoryStore::new(), MemoryStore::new(), NullSink);
//!
//! let alice = Entity::from(User {
//!     user_name: "alice.smith".into(),
//!     email: "alice@example.com".into(),
//!     first_name: "Alice".into(),
//!     last_name: "Smith".into(),
//!     ..User::default()
//! });
//!
//! let synced = sync.add_and_backup(alice, 1_706_745_600_000).await.unwrap();
//! assert!(synced.meta().global_id.is_some());
//! # });
//! ```

pub mod copy;
pub mod entity;
pub mod error;
pub mod notify;
pub mod reconcile;
pub mod store;
pub mod sync;
pub mod translate;

// Re-export main types at crate root
pub use copy::ShallowCopy;
pub use entity::{
    Address, AddressKind, Coffee, CoffeeKind, CoffeeName, Entity, EntityKind, Meta, Order,
    OrderItem, OrderStatus, PaymentDetail, User,
};
pub use error::{Error, Result};
pub use notify::{ChannelSink, Notification, NotificationSink, NullSink, SinkError};
pub use reconcile::{BulkReconciler, CopyOrder, ReconcileReport};
pub use store::{EntityStore, MemoryStore};
pub use sync::{
    BackupOutcome, SyncAudit, SyncError, SyncFailure, Synchronizer, ValidationContext,
    ValidationErrors,
};
pub use translate::TranslationMap;

/// Type aliases for clarity
pub type EntityId = i64;
pub type Timestamp = u64;
