//! The engine's scenarios, replayed against real SQLite stores.
//!
//! Each test gets its own named shared-cache in-memory database so the
//! pool's connections all see the same data and tests stay isolated.

use brewsync_engine::{
    BulkReconciler, Coffee, CoffeeKind, CoffeeName, Entity, EntityKind, EntityStore, Error,
    NullSink, Synchronizer, User,
};
use brewsync_store::{db, seed, OutboxSink, SqliteEntityStore};
use uuid::Uuid;

async fn fresh_store() -> SqliteEntityStore {
    let url = format!(
        "sqlite:file:{}?mode=memory&cache=shared",
        Uuid::new_v4().simple()
    );
    let pool = db::connect(&url).await.expect("pool");
    db::migrate(&pool).await.expect("migrations");
    SqliteEntityStore::new(pool)
}

fn arabica() -> Entity {
    Entity::from(Coffee {
        name: CoffeeName::Arabica,
        kind: CoffeeKind::Roasted,
        price_cents: 1450,
        ..Coffee::default()
    })
}

#[tokio::test]
async fn insert_find_update_round_trip() {
    let store = fresh_store().await;

    let mut coffee = arabica();
    coffee.meta_mut().created_at = Some(1000);
    let id = store.insert(&mut coffee).await.unwrap();
    assert_eq!(coffee.meta().id, Some(id));

    let mut found = store
        .find_by_id(EntityKind::Coffee, id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.meta().created_at, Some(1000));
    match &mut found {
        Entity::Coffee(c) => {
            assert_eq!(c.price_cents, 1450);
            c.price_cents = 1500;
        }
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
async fn lookups_are_kind_scoped() {
    let store = fresh_store().await;

    let mut coffee = arabica();
    store.insert(&mut coffee).await.unwrap();
    // A different kind still draws from the same table sequence.
    let mut user = Entity::from(User {
        user_name: "alice.smith".into(),
        email: "alice@example.com".into(),
        first_name: "Alice".into(),
        last_name: "Smith".into(),
        ..User::default()
    });
    let user_id = store.insert(&mut user).await.unwrap();
    assert_ne!(coffee.meta().id, Some(user_id));

    // Lookups are kind-scoped even on a shared table.
    assert!(store
        .find_by_id(EntityKind::Coffee, user_id)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn update_of_missing_row_is_not_found() {
    let store = fresh_store().await;

    let mut coffee = arabica();
    coffee.meta_mut().id = Some(404);
    assert!(matches!(
        store.update(&coffee).await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn add_and_backup_across_two_databases() {
    let local = fresh_store().await;
    let global = fresh_store().await;
    let sync = Synchronizer::new(local, global, NullSink);

    let coffee = sync.add_and_backup(arabica(), 1000).await.unwrap();
    let global_id = coffee.meta().global_id.unwrap();

    let mirrored = sync
        .global()
        .find_by_id(EntityKind::Coffee, global_id)
        .await
        .unwrap()
        .unwrap();
    match mirrored {
        Entity::Coffee(c) => assert_eq!(c.price_cents, 1450),
        other => panic!("wrong variant: {:?}", other.kind()),
    }

    // The local row carries the global reference durably.
    let local_row = sync
        .local()
        .find_by_id(EntityKind::Coffee, coffee.meta().id.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local_row.meta().global_id, Some(global_id));
}

#[tokio::test]
async fn outbox_records_successful_syncs() {
    let local = fresh_store().await;
    let global = fresh_store().await;
    let outbox = OutboxSink::new(local.pool().clone());
    let sync = Synchronizer::new(local, global, outbox.clone());

    sync.add_and_backup(arabica(), 1000).await.unwrap();

    let pending = outbox.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].topic, "coffee.created");
    let payload = pending[0].payload_json().unwrap();
    assert_eq!(payload["priceCents"], 1450);

    outbox.mark_published(pending[0].id, 2000).await.unwrap();
    assert!(outbox.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn soft_delete_propagates_between_databases() {
    let local = fresh_store().await;
    let global = fresh_store().await;
    let sync = Synchronizer::new(local, global, NullSink);

    let coffee = sync.add_and_backup(arabica(), 1000).await.unwrap();
    let id = coffee.meta().id.unwrap();
    let global_id = coffee.meta().global_id.unwrap();

    sync.soft_delete(EntityKind::Coffee, id, 2000).await.unwrap();

    let local_row = sync
        .local()
        .find_by_id(EntityKind::Coffee, id)
        .await
        .unwrap()
        .unwrap();
    let global_row = sync
        .global()
        .find_by_id(EntityKind::Coffee, global_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(local_row.meta().deleted_at, Some(2000));
    assert_eq!(global_row.meta().deleted_at, Some(2000));
}

#[tokio::test]
async fn seed_and_mirror_full_deployment() {
    let global = fresh_store().await;
    let local = fresh_store().await;

    let seeded = seed::seed_store(&global, 1000, 42).await.unwrap();
    let report = BulkReconciler::new(&global, &local).run().await.unwrap();
    assert_eq!(report.total(), seeded);

    for kind in EntityKind::DEPENDENCY_ORDER {
        assert_eq!(
            local.query(kind).await.unwrap().len(),
            global.query(kind).await.unwrap().len()
        );
    }

    // Mirrored order items reference rows that exist locally, and each
    // copy remembers its global source.
    for row in local.query(EntityKind::OrderItem).await.unwrap() {
        let global_id = row.meta().global_id.unwrap();
        assert!(global
            .find_by_id(EntityKind::OrderItem, global_id)
            .await
            .unwrap()
            .is_some());

        let Entity::OrderItem(item) = row else {
            unreachable!()
        };
        assert!(local
            .find_by_id(EntityKind::Order, item.order_ref)
            .await
            .unwrap()
            .is_some());
        assert!(local
            .find_by_id(EntityKind::Coffee, item.coffee_ref)
            .await
            .unwrap()
            .is_some());
    }

    // Clean audit: everything local points at a global row.
    let sync = Synchronizer::new(local, global, NullSink);
    assert!(sync.audit().await.unwrap().is_clean());
}
