//! The entity store contract and an in-memory implementation.
//!
//! The synchronization layer depends only on this contract, never on a
//! particular storage engine. Both the local and the global store are
//! instances of [`EntityStore`]; the engine does not care which side it
//! is talking to.

use crate::entity::{Entity, EntityKind};
use crate::error::{Error, Result};
use crate::EntityId;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A generic keyed persistence collaborator.
///
/// Identifier assignment belongs to the store: [`EntityStore::insert`]
/// writes the new identifier back onto the entity. Queries return rows
/// including soft-deleted ones; filtering tombstones is the caller's
/// decision.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert a new row. Assigns an identifier, writes it into the
    /// entity's tracking state, and returns it.
    async fn insert(&self, entity: &mut Entity) -> Result<EntityId>;

    /// Look up a row by kind and identifier.
    async fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Result<Option<Entity>>;

    /// Overwrite an existing row. The entity must carry an identifier.
    async fn update(&self, entity: &Entity) -> Result<()>;

    /// All rows of a kind, soft-deleted ones included.
    async fn query(&self, kind: EntityKind) -> Result<Vec<Entity>>;

    /// Connectivity probe. `false` means the store should not be touched
    /// right now; it makes no promise about the next call.
    async fn can_connect(&self) -> bool;
}

#[async_trait]
impl<T: EntityStore + ?Sized> EntityStore for &T {
    async fn insert(&self, entity: &mut Entity) -> Result<EntityId> {
        (**self).insert(entity).await
    }

    async fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Result<Option<Entity>> {
        (**self).find_by_id(kind, id).await
    }

    async fn update(&self, entity: &Entity) -> Result<()> {
        (**self).update(entity).await
    }

    async fn query(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        (**self).query(kind).await
    }

    async fn can_connect(&self) -> bool {
        (**self).can_connect().await
    }
}

#[async_trait]
impl<T: EntityStore + ?Sized> EntityStore for std::sync::Arc<T> {
    async fn insert(&self, entity: &mut Entity) -> Result<EntityId> {
        (**self).insert(entity).await
    }

    async fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Result<Option<Entity>> {
        (**self).find_by_id(kind, id).await
    }

    async fn update(&self, entity: &Entity) -> Result<()> {
        (**self).update(entity).await
    }

    async fn query(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        (**self).query(kind).await
    }

    async fn can_connect(&self) -> bool {
        (**self).can_connect().await
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_id: EntityId,
    rows: HashMap<EntityKind, BTreeMap<EntityId, Entity>>,
}

/// In-memory [`EntityStore`] used by tests and examples.
///
/// Ids are assigned sequentially from 1 across all kinds, the way a
/// single-sequence database would. The store can be taken offline
/// ([`MemoryStore::set_online`]) to exercise the unavailable paths, or
/// told to fail writes ([`MemoryStore::set_fail_writes`]) or reads
/// ([`MemoryStore::set_fail_reads`]) to exercise rejection after a
/// passing connectivity probe.
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
    online: AtomicBool,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                rows: HashMap::new(),
            }),
            online: AtomicBool::new(true),
            fail_writes: AtomicBool::new(false),
            fail_reads: AtomicBool::new(false),
        }
    }

    /// Toggle the connectivity probe and all operations.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Keep the probe green but make inserts and updates fail.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Keep the probe and writes green but make lookups and queries fail.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of rows of a kind, soft-deleted ones included.
    pub fn len(&self, kind: EntityKind) -> usize {
        let inner = self.inner.lock().expect("store lock poisoned");
        inner.rows.get(&kind).map_or(0, |m| m.len())
    }

    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }

    fn check_online(&self) -> Result<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Unavailable)
        }
    }

    fn check_writable(&self) -> Result<()> {
        self.check_online()?;
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(Error::Backend("injected write failure".into()))
        } else {
            Ok(())
        }
    }

    fn check_readable(&self) -> Result<()> {
        self.check_online()?;
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(Error::Backend("injected read failure".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert(&self, entity: &mut Entity) -> Result<EntityId> {
        self.check_writable()?;
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let id = inner.next_id;
        inner.next_id += 1;
        entity.meta_mut().id = Some(id);
        inner
            .rows
            .entry(entity.kind())
            .or_default()
            .insert(id, entity.clone());
        Ok(id)
    }

    async fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Result<Option<Entity>> {
        self.check_readable()?;
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner.rows.get(&kind).and_then(|m| m.get(&id)).cloned())
    }

    async fn update(&self, entity: &Entity) -> Result<()> {
        self.check_writable()?;
        let id = entity.id()?;
        let kind = entity.kind();
        let mut inner = self.inner.lock().expect("store lock poisoned");
        let row = inner
            .rows
            .get_mut(&kind)
            .and_then(|m| m.get_mut(&id))
            .ok_or(Error::NotFound { kind, id })?;
        *row = entity.clone();
        Ok(())
    }

    async fn query(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        self.check_readable()?;
        let inner = self.inner.lock().expect("store lock poisoned");
        Ok(inner
            .rows
            .get(&kind)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn can_connect(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Coffee, CoffeeKind, CoffeeName, User};

    fn coffee(price_cents: i64) -> Entity {
        Entity::from(Coffee {
            name: CoffeeName::Arabica,
            kind: CoffeeKind::Roasted,
            price_cents,
            ..Coffee::default()
        })
    }

    #[tokio::test]
    async fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();

        let mut first = coffee(1450);
        let mut second = coffee(1120);
        assert_eq!(store.insert(&mut first).await.unwrap(), 1);
        assert_eq!(store.insert(&mut second).await.unwrap(), 2);
        assert_eq!(first.meta().id, Some(1));
        assert_eq!(second.meta().id, Some(2));
    }

    #[tokio::test]
    async fn find_and_update() {
        let store = MemoryStore::new();

        let mut row = coffee(1450);
        let id = store.insert(&mut row).await.unwrap();

        let mut found = store
            .find_by_id(EntityKind::Coffee, id)
            .await
            .unwrap()
            .unwrap();
        match &mut found {
            Entity::Coffee(c) => c.price_cents = 1500,
            other => panic!("wrong variant: {:?}", other.kind()),
        }
        store.update(&found).await.unwrap();

        let reread = store
            .find_by_id(EntityKind::Coffee, id)
            .await
            .unwrap()
            .unwrap();
        match reread {
            Entity::Coffee(c) => assert_eq!(c.price_cents, 1500),
            other => panic!("wrong variant: {:?}", other.kind()),
        }
    }

    #[tokio::test]
    async fn update_without_id_is_an_error() {
        let store = MemoryStore::new();
        let row = coffee(1450);
        assert_eq!(store.update(&row).await, Err(Error::MissingId));
    }

    #[tokio::test]
    async fn update_missing_row_is_not_found() {
        let store = MemoryStore::new();
        let mut row = coffee(1450);
        row.meta_mut().id = Some(99);
        assert!(matches!(
            store.update(&row).await,
            Err(Error::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn query_is_scoped_by_kind() {
        let store = MemoryStore::new();
        store.insert(&mut coffee(1450)).await.unwrap();
        store
            .insert(&mut Entity::from(User {
                user_name: "alice.smith".into(),
                email: "alice@example.com".into(),
                first_name: "Alice".into(),
                last_name: "Smith".into(),
                ..User::default()
            }))
            .await
            .unwrap();

        assert_eq!(store.query(EntityKind::Coffee).await.unwrap().len(), 1);
        assert_eq!(store.query(EntityKind::User).await.unwrap().len(), 1);
        assert!(store.query(EntityKind::Order).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn offline_store_refuses_everything() {
        let store = MemoryStore::new();
        store.set_online(false);

        assert!(!store.can_connect().await);
        assert_eq!(store.insert(&mut coffee(1450)).await, Err(Error::Unavailable));
        assert_eq!(
            store.find_by_id(EntityKind::Coffee, 1).await,
            Err(Error::Unavailable)
        );

        store.set_online(true);
        assert!(store.can_connect().await);
    }

    #[tokio::test]
    async fn failing_writes_keep_probe_green() {
        let store = MemoryStore::new();
        store.set_fail_writes(true);

        assert!(store.can_connect().await);
        assert!(matches!(
            store.insert(&mut coffee(1450)).await,
            Err(Error::Backend(_))
        ));
    }

    #[tokio::test]
    async fn failing_reads_leave_probe_and_writes_green() {
        let store = MemoryStore::new();
        store.set_fail_reads(true);

        assert!(store.can_connect().await);
        let id = store.insert(&mut coffee(1450)).await.unwrap();
        assert!(matches!(
            store.find_by_id(EntityKind::Coffee, id).await,
            Err(Error::Backend(_))
        ));
        assert!(matches!(
            store.query(EntityKind::Coffee).await,
            Err(Error::Backend(_))
        ));

        store.set_fail_reads(false);
        assert!(store
            .find_by_id(EntityKind::Coffee, id)
            .await
            .unwrap()
            .is_some());
    }
}
