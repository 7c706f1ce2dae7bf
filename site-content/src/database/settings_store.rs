//! Legacy settings store
//!
//! Read/write adapter over the per-site JSON settings document. The whole
//! document is read, modified and written back on every save, the same way
//! the original settings file was handled.

use super::begin_write;
use crate::error::{AppError, Result};
use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};

/// Block name → arbitrary JSON
pub type SettingsDocument = Map<String, Value>;

#[derive(Clone)]
pub struct LegacySettingsStore {
    pool: SqlitePool,
}

impl LegacySettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Load the site's settings document.
    ///
    /// A missing document is an empty one. Anything that is not a JSON
    /// object fails with `MalformedLegacyDocument`.
    pub async fn load_document(&self, tenant_id: &str) -> Result<SettingsDocument> {
        let mut conn = self.pool.acquire().await?;
        load_in(&mut conn, tenant_id).await
    }

    /// Get one block from the settings document
    pub async fn get_block(&self, tenant_id: &str, key: &str) -> Result<Option<Value>> {
        let mut document = self.load_document(tenant_id).await?;
        Ok(document.remove(key))
    }

    /// Set one block, leaving every other key of the document untouched
    pub async fn put_block(&self, tenant_id: &str, key: &str, value: Value) -> Result<()> {
        let mut tx = begin_write(&self.pool).await?;

        let mut document = load_in(&mut tx, tenant_id).await?;
        document.insert(key.to_string(), value);
        write_in(&mut tx, tenant_id, &document).await?;

        tx.commit().await?;

        tracing::debug!("Updated legacy block {} for site {}", key, tenant_id);
        Ok(())
    }
}

async fn load_in(conn: &mut SqliteConnection, tenant_id: &str) -> Result<SettingsDocument> {
    let raw: Option<Option<String>> = sqlx::query_scalar("SELECT settings FROM sites WHERE id = ?")
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

    match raw {
        None => Err(AppError::TenantNotFound(tenant_id.to_string())),
        Some(None) => Ok(SettingsDocument::new()),
        Some(Some(text)) => parse_document(tenant_id, &text),
    }
}

async fn write_in(
    conn: &mut SqliteConnection,
    tenant_id: &str,
    document: &SettingsDocument,
) -> Result<()> {
    let text = serde_json::to_string(document)?;

    let rows = sqlx::query("UPDATE sites SET settings = ?, updated_at = ? WHERE id = ?")
        .bind(text)
        .bind(Utc::now())
        .bind(tenant_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if rows == 0 {
        return Err(AppError::TenantNotFound(tenant_id.to_string()));
    }

    Ok(())
}

/// Parse stored settings text into a document
pub fn parse_document(tenant_id: &str, text: &str) -> Result<SettingsDocument> {
    if text.trim().is_empty() {
        return Ok(SettingsDocument::new());
    }

    let malformed = |reason: String| AppError::MalformedLegacyDocument {
        tenant_id: tenant_id.to_string(),
        reason,
    };

    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(document)) => Ok(document),
        Ok(Value::Null) => Ok(SettingsDocument::new()),
        Ok(Value::Array(_)) => Err(malformed("document is a list".to_string())),
        Ok(_) => Err(malformed("document is a scalar".to_string())),
        Err(e) => Err(malformed(e.to_string())),
    }
}
