//! Repository layer for sites
//!
//! Sites are the tenants every other store is scoped by. Domain routing
//! lives outside this crate; lookups here only serve tooling and tests.

use super::models::*;
use crate::error::{AppError, Result};
use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Repository for site records
#[derive(Clone)]
pub struct SiteRepository {
    pool: SqlitePool,
}

impl SiteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new site
    pub async fn create_site(&self, req: CreateSiteRequest) -> Result<Site> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let settings = req
            .settings
            .map(|doc| serde_json::to_string(&doc))
            .transpose()?;

        let site = sqlx::query_as::<_, Site>(
            r#"
            INSERT INTO sites (id, name, domain, is_active, settings, theme, created_at, updated_at)
            VALUES (?, ?, ?, 1, ?, ?, ?, ?)
            RETURNING *
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.domain)
        .bind(settings)
        .bind(&req.theme)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        tracing::debug!("Created site: {} ({})", id, req.domain);
        Ok(site)
    }

    /// Get a site by ID
    pub async fn get_site(&self, id: &str) -> Result<Site> {
        sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(id.to_string()))
    }

    /// Get the active site serving a domain
    pub async fn get_site_by_domain(&self, domain: &str) -> Result<Site> {
        sqlx::query_as::<_, Site>("SELECT * FROM sites WHERE domain = ? AND is_active = 1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::TenantNotFound(domain.to_string()))
    }

    /// List all sites, active or not
    pub async fn list_sites(&self) -> Result<Vec<Site>> {
        let sites = sqlx::query_as::<_, Site>("SELECT * FROM sites ORDER BY created_at ASC")
            .fetch_all(&self.pool)
            .await?;

        Ok(sites)
    }

    /// Activate or deactivate a site
    pub async fn set_site_active(&self, id: &str, active: bool) -> Result<()> {
        let rows = sqlx::query("UPDATE sites SET is_active = ?, updated_at = ? WHERE id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if rows == 0 {
            return Err(AppError::TenantNotFound(id.to_string()));
        }

        tracing::debug!("Site {} active = {}", id, active);
        Ok(())
    }
}

/// Fail with `TenantNotFound` unless the site exists.
///
/// Runs on the caller's connection so a write transaction checks the site
/// it is about to touch.
pub(crate) async fn ensure_site_in(conn: &mut SqliteConnection, tenant_id: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM sites WHERE id = ?)")
        .bind(tenant_id)
        .fetch_one(&mut *conn)
        .await?;

    if !exists {
        return Err(AppError::TenantNotFound(tenant_id.to_string()));
    }

    Ok(())
}
