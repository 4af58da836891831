//! `brewsync-seed`: prepare a deployment's databases.
//!
//! Runs migrations on both stores, populates an empty global store with
//! the demo catalogs, and mirrors the global dataset into an empty local
//! store through a bulk reconciliation pass.

use brewsync_store::{config::Config, db, error::StoreError, now_millis, SqliteEntityStore};

use brewsync_engine::{BulkReconciler, CopyOrder, EntityKind, EntityStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), StoreError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        local = %config.local_database_url,
        global = %config.global_database_url,
        "preparing stores"
    );

    let local_pool = db::connect(&config.local_database_url).await?;
    let global_pool = db::connect(&config.global_database_url).await?;
    db::migrate(&local_pool).await?;
    db::migrate(&global_pool).await?;

    let local = SqliteEntityStore::new(local_pool);
    let global = SqliteEntityStore::new(global_pool);
    let now = now_millis();

    if global.query(EntityKind::User).await?.is_empty() {
        let rng_seed = config.seed_rng.unwrap_or(now);
        let seeded = brewsync_store::seed::seed_store(&global, now, rng_seed).await?;
        tracing::info!(rows = seeded, rng_seed, "global store seeded");
    } else {
        tracing::info!("global store already populated, skipping seed");
    }

    if !local.query(EntityKind::User).await?.is_empty() {
        tracing::info!("local store already populated, nothing to do");
        return Ok(());
    }

    let order = match config.seed_shuffle {
        Some(seed) => CopyOrder::Shuffled(seed),
        None => CopyOrder::Stable,
    };
    let report = BulkReconciler::new(&global, &local)
        .with_order(order)
        .run()
        .await?;

    for (kind, copied) in report.by_kind() {
        tracing::info!(%kind, copied, "mirrored into local store");
    }
    tracing::info!(total = report.total(), "local store ready");

    Ok(())
}
