//! Pool setup and schema migration.

use crate::error::StoreError;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

/// Open a connection pool against a SQLite database URL.
pub async fn connect(url: &str) -> Result<SqlitePool, StoreError> {
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(url)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await?;

    Ok(pool)
}

/// Apply pending schema migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
