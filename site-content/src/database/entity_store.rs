//! Dedicated entity stores
//!
//! One adapter per high-volume entity table (news, events, notices,
//! publications, tenders, teachers). All tables share a column contract, so
//! a single implementation parameterised by [`EntityKind`] serves them all.

use super::begin_write;
use super::models::{DedicatedEntity, EntityInput, EntityKind};
use crate::error::{AppError, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Hands out the per-entity adapters
#[derive(Clone)]
pub struct DedicatedStores {
    pool: SqlitePool,
}

impl DedicatedStores {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn store(&self, kind: EntityKind) -> EntityStore {
        EntityStore {
            pool: self.pool.clone(),
            kind,
        }
    }
}

/// Tenant-scoped access to one dedicated table
#[derive(Clone)]
pub struct EntityStore {
    pool: SqlitePool,
    kind: EntityKind,
}

impl EntityStore {
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// Active rows, newest first, then by position
    pub async fn list_active(&self, tenant_id: &str) -> Result<Vec<DedicatedEntity>> {
        let sql = format!(
            r#"
            SELECT * FROM {}
            WHERE tenant_id = ? AND is_active = 1 AND deleted_at IS NULL
            ORDER BY published_at DESC, sort_order ASC
            "#,
            self.kind.table()
        );

        let rows = sqlx::query_as::<_, DedicatedEntity>(&sql)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Whether the site has any active row in this table
    pub async fn has_active(&self, tenant_id: &str) -> Result<bool> {
        let sql = format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE tenant_id = ? AND is_active = 1 AND deleted_at IS NULL)",
            self.kind.table()
        );

        let exists: bool = sqlx::query_scalar(&sql)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    /// Get one row by ID
    pub async fn get(&self, tenant_id: &str, id: &str) -> Result<DedicatedEntity> {
        let mut conn = self.pool.acquire().await?;
        get_in(&mut conn, self.kind, tenant_id, id).await
    }

    /// Create a single row
    pub async fn create(
        &self,
        tenant_id: &str,
        input: &EntityInput,
        sort_order: i64,
    ) -> Result<DedicatedEntity> {
        let mut conn = self.pool.acquire().await?;
        insert_in(&mut conn, self.kind, tenant_id, input, sort_order).await
    }

    /// Update a single row in place
    pub async fn update(
        &self,
        tenant_id: &str,
        id: &str,
        input: &EntityInput,
        sort_order: i64,
    ) -> Result<DedicatedEntity> {
        let mut tx = begin_write(&self.pool).await?;
        update_in(&mut tx, self.kind, tenant_id, id, input, sort_order).await?;
        let row = get_in(&mut tx, self.kind, tenant_id, id).await?;
        tx.commit().await?;
        Ok(row)
    }

    /// Soft delete a single row
    pub async fn delete(&self, tenant_id: &str, id: &str) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let removed = soft_delete_in(&mut conn, self.kind, tenant_id, &[id.to_string()]).await?;

        if removed == 0 {
            return Err(AppError::RecordNotFound {
                entity: self.kind.table(),
                id: id.to_string(),
            });
        }

        Ok(())
    }

    /// Rewrite `sort_order` to follow the given ID order.
    ///
    /// IDs that do not belong to the site are ignored.
    pub async fn reorder(&self, tenant_id: &str, ids: &[String]) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET sort_order = ?, updated_at = ? WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
            self.kind.table()
        );
        let now = Utc::now();

        let mut tx = begin_write(&self.pool).await?;
        for (position, id) in ids.iter().enumerate() {
            sqlx::query(&sql)
                .bind(position as i64)
                .bind(now)
                .bind(id)
                .bind(tenant_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;

        tracing::debug!("Reordered {} {} rows for site {}", ids.len(), self.kind, tenant_id);
        Ok(())
    }
}

async fn get_in(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
    id: &str,
) -> Result<DedicatedEntity> {
    let sql = format!(
        "SELECT * FROM {} WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
        kind.table()
    );

    sqlx::query_as::<_, DedicatedEntity>(&sql)
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::RecordNotFound {
            entity: kind.table(),
            id: id.to_string(),
        })
}

/// IDs of every non-deleted row of the site
pub(crate) async fn ids_in(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT id FROM {} WHERE tenant_id = ? AND deleted_at IS NULL ORDER BY sort_order ASC",
        kind.table()
    );

    let ids: Vec<String> = sqlx::query_scalar(&sql)
        .bind(tenant_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(ids)
}

pub(crate) async fn insert_in(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
    input: &EntityInput,
    sort_order: i64,
) -> Result<DedicatedEntity> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let sql = format!(
        r#"
        INSERT INTO {}
            (id, tenant_id, slug, title, summary, body, image_url, link_url, attributes,
             published_at, sort_order, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
        kind.table()
    );

    let row = sqlx::query_as::<_, DedicatedEntity>(&sql)
        .bind(&id)
        .bind(tenant_id)
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(serde_json::to_string(&Value::Object(input.attributes.clone()))?)
        .bind(input.published_at)
        .bind(sort_order)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *conn)
        .await?;

    tracing::debug!("Created {} row {} for site {}", kind, id, tenant_id);
    Ok(row)
}

pub(crate) async fn update_in(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
    id: &str,
    input: &EntityInput,
    sort_order: i64,
) -> Result<()> {
    let sql = format!(
        r#"
        UPDATE {}
        SET slug = ?, title = ?, summary = ?, body = ?, image_url = ?, link_url = ?,
            attributes = ?, published_at = ?, sort_order = ?, updated_at = ?
        WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL
        "#,
        kind.table()
    );

    let rows = sqlx::query(&sql)
        .bind(&input.slug)
        .bind(&input.title)
        .bind(&input.summary)
        .bind(&input.body)
        .bind(&input.image_url)
        .bind(&input.link_url)
        .bind(serde_json::to_string(&Value::Object(input.attributes.clone()))?)
        .bind(input.published_at)
        .bind(sort_order)
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(AppError::RecordNotFound {
            entity: kind.table(),
            id: id.to_string(),
        });
    }

    tracing::debug!("Updated {} row {}", kind, id);
    Ok(())
}

/// Move rows onto a slug derived from their ID.
///
/// `slugify` never emits `~`, so parked slugs cannot clash with real ones.
/// Rows that are about to be rewritten in one batch are parked first, which
/// lets them trade slugs with each other.
pub(crate) async fn park_slugs_in(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
    ids: &[&str],
) -> Result<()> {
    let sql = format!(
        "UPDATE {} SET slug = '~' || id WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
        kind.table()
    );

    for id in ids {
        sqlx::query(&sql)
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

/// Soft delete rows, returning how many were removed
pub(crate) async fn soft_delete_in(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
    ids: &[String],
) -> Result<u64> {
    let sql = format!(
        "UPDATE {} SET deleted_at = ?, updated_at = ? WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL",
        kind.table()
    );
    let now = Utc::now();
    let mut removed = 0;

    for id in ids {
        removed += sqlx::query(&sql)
            .bind(now)
            .bind(now)
            .bind(id)
            .bind(tenant_id)
            .execute(&mut *conn)
            .await?
            .rows_affected();
    }

    tracing::debug!("Soft deleted {} {} rows for site {}", removed, kind, tenant_id);
    Ok(removed)
}
