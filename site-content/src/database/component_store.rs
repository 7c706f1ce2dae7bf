//! Component store
//!
//! Adapter over the polymorphic `components` table. Every query is scoped by
//! site; homepage records have `page_id IS NULL`.
//!
//! Connection-level helpers take `&mut SqliteConnection` so callers can run
//! several of them inside one transaction.

use super::begin_write;
use super::models::{ContentRecord, PageScope};
use crate::error::{AppError, Result};
use chrono::Utc;
use serde_json::Value;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Fields for a new component record
#[derive(Debug, Clone)]
pub struct NewRecord<'a> {
    pub tenant_id: &'a str,
    pub scope: &'a PageScope,
    pub content_type: &'a str,
    pub content: &'a Value,
    pub sort_order: i64,
    pub actor: Option<&'a str>,
}

#[derive(Clone)]
pub struct ComponentStore {
    pool: SqlitePool,
}

impl ComponentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The active homepage record of a type, if any
    pub async fn find_homepage(
        &self,
        tenant_id: &str,
        content_type: &str,
    ) -> Result<Option<ContentRecord>> {
        let mut conn = self.pool.acquire().await?;
        find_homepage_in(&mut conn, tenant_id, content_type).await
    }

    /// Get one record by ID
    pub async fn get(&self, tenant_id: &str, id: &str) -> Result<ContentRecord> {
        sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT * FROM components
            WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::RecordNotFound {
            entity: "component",
            id: id.to_string(),
        })
    }

    /// Records of one type in one scope, active or not, in display order
    pub async fn list_scope(
        &self,
        tenant_id: &str,
        content_type: &str,
        scope: &PageScope,
    ) -> Result<Vec<ContentRecord>> {
        let records = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT * FROM components
            WHERE tenant_id = ? AND type = ? AND page_id IS ? AND deleted_at IS NULL
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(content_type)
        .bind(scope.page_id())
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Active homepage components of every type, in display order
    pub async fn list_homepage_components(&self, tenant_id: &str) -> Result<Vec<ContentRecord>> {
        let records = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT * FROM components
            WHERE tenant_id = ? AND page_id IS NULL AND is_active = 1 AND deleted_at IS NULL
            ORDER BY sort_order ASC, type ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Active components placed on one page, in display order
    pub async fn list_page_components(
        &self,
        tenant_id: &str,
        page_id: &str,
    ) -> Result<Vec<ContentRecord>> {
        let records = sqlx::query_as::<_, ContentRecord>(
            r#"
            SELECT * FROM components
            WHERE tenant_id = ? AND page_id = ? AND is_active = 1 AND deleted_at IS NULL
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(tenant_id)
        .bind(page_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Show or hide a record without deleting it
    pub async fn set_active(&self, tenant_id: &str, id: &str, active: bool) -> Result<()> {
        let rows = sqlx::query(
            r#"
            UPDATE components SET is_active = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::RecordNotFound {
                entity: "component",
                id: id.to_string(),
            });
        }

        tracing::debug!("Component {} active = {}", id, active);
        Ok(())
    }

    /// Write the homepage record of a type as one transaction.
    ///
    /// Updates the existing active record in place, or inserts the first one.
    /// Returns the record and whether it was created.
    pub async fn upsert_homepage(
        &self,
        tenant_id: &str,
        content_type: &str,
        content: &Value,
        actor: Option<&str>,
    ) -> Result<(ContentRecord, bool)> {
        let mut tx = begin_write(&self.pool).await?;

        let existing = find_homepage_in(&mut tx, tenant_id, content_type).await?;
        let outcome = match existing {
            Some(record) => {
                update_in(&mut tx, tenant_id, &record.id, content, record.sort_order, actor).await?;
                let record = get_in(&mut tx, tenant_id, &record.id).await?;
                (record, false)
            }
            None => {
                let record = insert_in(
                    &mut tx,
                    NewRecord {
                        tenant_id,
                        scope: &PageScope::Homepage,
                        content_type,
                        content,
                        sort_order: 0,
                        actor,
                    },
                )
                .await?;
                (record, true)
            }
        };

        tx.commit().await?;
        Ok(outcome)
    }
}

pub(crate) async fn find_homepage_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    content_type: &str,
) -> Result<Option<ContentRecord>> {
    let record = sqlx::query_as::<_, ContentRecord>(
        r#"
        SELECT * FROM components
        WHERE tenant_id = ? AND type = ? AND page_id IS NULL
          AND is_active = 1 AND deleted_at IS NULL
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    )
    .bind(tenant_id)
    .bind(content_type)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(record)
}

async fn get_in(conn: &mut SqliteConnection, tenant_id: &str, id: &str) -> Result<ContentRecord> {
    sqlx::query_as::<_, ContentRecord>("SELECT * FROM components WHERE id = ? AND tenant_id = ?")
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::RecordNotFound {
            entity: "component",
            id: id.to_string(),
        })
}

/// IDs of every non-deleted record of a type in a scope
pub(crate) async fn ids_in_scope(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    content_type: &str,
    scope: &PageScope,
) -> Result<Vec<String>> {
    let ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT id FROM components
        WHERE tenant_id = ? AND type = ? AND page_id IS ? AND deleted_at IS NULL
        ORDER BY sort_order ASC, created_at ASC
        "#,
    )
    .bind(tenant_id)
    .bind(content_type)
    .bind(scope.page_id())
    .fetch_all(&mut *conn)
    .await?;

    Ok(ids)
}

pub(crate) async fn insert_in(
    conn: &mut SqliteConnection,
    new: NewRecord<'_>,
) -> Result<ContentRecord> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    let record = sqlx::query_as::<_, ContentRecord>(
        r#"
        INSERT INTO components
            (id, tenant_id, page_id, type, content, is_homepage, is_active, sort_order,
             created_by, updated_by, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(&id)
    .bind(new.tenant_id)
    .bind(new.scope.page_id())
    .bind(new.content_type)
    .bind(serde_json::to_string(new.content)?)
    .bind(new.scope.is_homepage())
    .bind(new.sort_order)
    .bind(new.actor)
    .bind(new.actor)
    .bind(now)
    .bind(now)
    .fetch_one(&mut *conn)
    .await?;

    tracing::debug!(
        "Created component {} ({}) for site {}",
        id,
        new.content_type,
        new.tenant_id
    );
    Ok(record)
}

pub(crate) async fn update_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    id: &str,
    content: &Value,
    sort_order: i64,
    actor: Option<&str>,
) -> Result<()> {
    let rows = sqlx::query(
        r#"
        UPDATE components
        SET content = ?, sort_order = ?, updated_by = ?, updated_at = ?
        WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL
        "#,
    )
    .bind(serde_json::to_string(content)?)
    .bind(sort_order)
    .bind(actor)
    .bind(Utc::now())
    .bind(id)
    .bind(tenant_id)
    .execute(&mut *conn)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(AppError::RecordNotFound {
            entity: "component",
            id: id.to_string(),
        });
    }

    tracing::debug!("Updated component {}", id);
    Ok(())
}

pub(crate) async fn soft_delete_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    ids: &[String],
    actor: Option<&str>,
) -> Result<()> {
    let now = Utc::now();

    for id in ids {
        sqlx::query(
            r#"
            UPDATE components SET deleted_at = ?, updated_by = ?, updated_at = ?
            WHERE id = ? AND tenant_id = ? AND deleted_at IS NULL
            "#,
        )
        .bind(now)
        .bind(actor)
        .bind(now)
        .bind(id)
        .bind(tenant_id)
        .execute(&mut *conn)
        .await?;

        tracing::debug!("Soft deleted component {}", id);
    }

    Ok(())
}
