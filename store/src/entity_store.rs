//! The SQLite implementation of the engine's storage contract.
//!
//! All kinds share one `entities` table: business fields are serialized
//! into a JSON payload column, tracking state lives in real columns. The
//! same implementation backs both the local and the global store; which
//! side it plays is decided by the connection URL alone.

use crate::error::to_engine_error;
use async_trait::async_trait;
use brewsync_engine::{
    Entity, EntityId, EntityKind, EntityStore, Error, Meta, Result, Timestamp,
};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;

#[derive(Debug, FromRow)]
struct EntityRow {
    id: i64,
    global_id: Option<i64>,
    created_at: Option<i64>,
    deleted_at: Option<i64>,
    payload: String,
}

impl EntityRow {
    fn hydrate(self, kind: EntityKind) -> Result<Entity> {
        let payload = serde_json::from_str(&self.payload)
            .map_err(|e| Error::InvalidPayload(e.to_string()))?;
        let mut entity = Entity::from_payload(kind, payload)?;
        *entity.meta_mut() = Meta {
            id: Some(self.id),
            global_id: self.global_id,
            created_at: self.created_at.map(|t| t as Timestamp),
            deleted_at: self.deleted_at.map(|t| t as Timestamp),
        };
        Ok(entity)
    }
}

/// [`EntityStore`] backed by a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct SqliteEntityStore {
    pool: SqlitePool,
}

impl SqliteEntityStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl EntityStore for SqliteEntityStore {
    async fn insert(&self, entity: &mut Entity) -> Result<EntityId> {
        let payload = entity.payload_json()?.to_string();
        let meta = entity.meta().clone();

        let result = sqlx::query(
            "INSERT INTO entities (kind, global_id, created_at, deleted_at, payload) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(entity.kind().as_str())
        .bind(meta.global_id)
        .bind(meta.created_at.map(|t| t as i64))
        .bind(meta.deleted_at.map(|t| t as i64))
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(to_engine_error)?;

        let id = result.last_insert_rowid();
        entity.meta_mut().id = Some(id);
        Ok(id)
    }

    async fn find_by_id(&self, kind: EntityKind, id: EntityId) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(
            "SELECT id, global_id, created_at, deleted_at, payload \
             FROM entities WHERE kind = ?1 AND id = ?2",
        )
        .bind(kind.as_str())
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_engine_error)?;

        row.map(|r| r.hydrate(kind)).transpose()
    }

    async fn update(&self, entity: &Entity) -> Result<()> {
        let id = entity.id()?;
        let kind = entity.kind();
        let payload = entity.payload_json()?.to_string();
        let meta = entity.meta().clone();

        let result = sqlx::query(
            "UPDATE entities \
             SET global_id = ?1, created_at = ?2, deleted_at = ?3, payload = ?4 \
             WHERE kind = ?5 AND id = ?6",
        )
        .bind(meta.global_id)
        .bind(meta.created_at.map(|t| t as i64))
        .bind(meta.deleted_at.map(|t| t as i64))
        .bind(payload)
        .bind(kind.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(to_engine_error)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound { kind, id });
        }
        Ok(())
    }

    async fn query(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        let rows: Vec<EntityRow> = sqlx::query_as(
            "SELECT id, global_id, created_at, deleted_at, payload \
             FROM entities WHERE kind = ?1 ORDER BY id",
        )
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(to_engine_error)?;

        rows.into_iter().map(|r| r.hydrate(kind)).collect()
    }

    async fn can_connect(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}
