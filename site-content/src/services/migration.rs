//! Migration engine
//!
//! Moves each site's legacy settings blocks into homepage component
//! records, or into the dedicated table when that table already has rows
//! for the site. Runs are idempotent: a block whose destination already holds
//! active data is skipped unless forced. Legacy data is left in place.
//!
//! Each block is written in its own transaction, so one bad block never
//! blocks the rest. Runs for the same site are serialized; runs for
//! different sites fan out on a bounded number of tasks.

use crate::config;
use crate::content::registry::{self, BlockSpec};
use crate::content::{is_blank, ContentBlock};
use crate::database::repository::ensure_site_in;
use crate::database::{
    begin_write, ComponentStore, DedicatedStores, EntityKind, LegacySettingsStore, SiteRepository,
};
use crate::error::{AppError, Result};
use crate::services::replace_set::{apply_entity_set, entity_inputs};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Outcome of migrating one site
#[derive(Debug, Default, Serialize)]
pub struct TenantMigrationReport {
    pub tenant_id: String,
    /// Blocks written in this run
    pub migrated: Vec<&'static str>,
    /// Blocks whose destination already held data
    pub skipped: Vec<&'static str>,
    pub failures: Vec<AppError>,
}

impl TenantMigrationReport {
    fn new(tenant_id: &str) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            ..Default::default()
        }
    }

    pub fn migrated_count(&self) -> usize {
        self.migrated.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of migrating every site
#[derive(Debug, Default, Serialize)]
pub struct BulkMigrationReport {
    pub reports: Vec<TenantMigrationReport>,
    /// Sites that could not be migrated at all
    pub failed_tenants: Vec<(String, AppError)>,
}

impl BulkMigrationReport {
    pub fn total_migrated(&self) -> usize {
        self.reports.iter().map(|r| r.migrated_count()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed_tenants.is_empty() && self.reports.iter().all(|r| r.is_success())
    }
}

type TenantLocks = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

#[derive(Clone)]
pub struct MigrationEngine {
    sites: SiteRepository,
    settings: LegacySettingsStore,
    components: ComponentStore,
    entities: DedicatedStores,
    locks: TenantLocks,
}

impl MigrationEngine {
    pub fn new(
        sites: SiteRepository,
        settings: LegacySettingsStore,
        components: ComponentStore,
        entities: DedicatedStores,
    ) -> Self {
        Self {
            sites,
            settings,
            components,
            entities,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Migrate one site.
    ///
    /// Fails as a whole only when the site is missing or its legacy document
    /// cannot be read. Block failures are collected in the report.
    pub async fn migrate_tenant(
        &self,
        tenant_id: &str,
        force: bool,
    ) -> Result<TenantMigrationReport> {
        let lock = self.tenant_lock(tenant_id);
        let _guard = lock.lock().await;

        tracing::info!("Migrating site {} (force = {})", tenant_id, force);

        let document = self.settings.load_document(tenant_id).await?;
        let mut report = TenantMigrationReport::new(tenant_id);

        for spec in registry::migration_blocks() {
            let Some(value) = document.get(spec.name).filter(|value| !is_blank(value)) else {
                continue;
            };

            match self.migrate_block(tenant_id, spec, value, force).await {
                Ok(true) => report.migrated.push(spec.name),
                Ok(false) => {
                    tracing::debug!(
                        "Skipping {} for site {}: already migrated",
                        spec.name,
                        tenant_id
                    );
                    report.skipped.push(spec.name);
                }
                Err(e) => {
                    tracing::error!(
                        "Failed to migrate {} for site {}: {}",
                        spec.name,
                        tenant_id,
                        e
                    );
                    report.failures.push(AppError::MigrationBlockFailed {
                        tenant_id: tenant_id.to_string(),
                        block: spec.name.to_string(),
                        cause: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Site {}: {} migrated, {} skipped, {} failed",
            tenant_id,
            report.migrated.len(),
            report.skipped.len(),
            report.failures.len()
        );

        Ok(report)
    }

    /// Migrate every site, a bounded number at a time
    pub async fn migrate_all(&self, force: bool) -> Result<BulkMigrationReport> {
        let sites = self.sites.list_sites().await?;
        tracing::info!("Migrating {} sites", sites.len());

        let permits = Arc::new(Semaphore::new(config::MIGRATION_CONCURRENCY));
        let mut tasks = JoinSet::new();

        for site in sites {
            let engine = self.clone();
            let permits = permits.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => engine.migrate_tenant(&site.id, force).await,
                    Err(e) => Err(AppError::Generic(format!(
                        "Migration permit unavailable: {}",
                        e
                    ))),
                };
                (site.id, result)
            });
        }

        let mut bulk = BulkMigrationReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, Ok(report))) => bulk.reports.push(report),
                Ok((tenant_id, Err(e))) => {
                    tracing::error!("Migration of site {} failed: {}", tenant_id, e);
                    bulk.failed_tenants.push((tenant_id, e));
                }
                Err(e) => {
                    tracing::error!("Migration task aborted: {}", e);
                    bulk.failed_tenants
                        .push(("<unknown>".to_string(), AppError::Generic(e.to_string())));
                }
            }
        }

        bulk.reports.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));

        tracing::info!(
            "Migration finished: {} blocks migrated, {} sites failed",
            bulk.total_migrated(),
            bulk.failed_tenants.len()
        );

        Ok(bulk)
    }

    /// Write one block. Returns false when it was skipped.
    ///
    /// Blocks backed by a dedicated table that already holds rows are
    /// written there, since the resolver reads those rows first. Everything
    /// else lands in the homepage component record.
    async fn migrate_block(
        &self,
        tenant_id: &str,
        spec: &'static BlockSpec,
        value: &Value,
        force: bool,
    ) -> Result<bool> {
        let Some(content_type) = spec.content_type else {
            return Err(AppError::Generic(format!("{} has no component type", spec.name)));
        };

        let block = ContentBlock::decode(spec, value.clone())
            .map_err(|mismatch| AppError::InvalidRequest(mismatch.to_string()))?;

        if let Some(kind) = spec.entity {
            if self.entities.store(kind).has_active(tenant_id).await? {
                if !force {
                    return Ok(false);
                }
                self.overwrite_entities(tenant_id, kind, block.into_value()).await?;
                return Ok(true);
            }
        }

        if !force
            && self
                .components
                .find_homepage(tenant_id, content_type.tag())
                .await?
                .is_some()
        {
            return Ok(false);
        }

        let (record, created) = self
            .components
            .upsert_homepage(
                tenant_id,
                content_type.tag(),
                &block.into_value(),
                Some(config::MIGRATION_ACTOR),
            )
            .await?;

        tracing::debug!(
            "{} {} as component {} for site {}",
            if created { "Migrated" } else { "Overwrote" },
            spec.name,
            record.id,
            tenant_id
        );

        Ok(true)
    }

    /// Replace a site's dedicated rows with the legacy items in one transaction
    async fn overwrite_entities(
        &self,
        tenant_id: &str,
        kind: EntityKind,
        value: Value,
    ) -> Result<()> {
        let Value::Array(values) = value else {
            return Err(AppError::InvalidRequest(format!("{} rows need a list", kind)));
        };

        let mut items = Vec::with_capacity(values.len());
        for (index, value) in values.into_iter().enumerate() {
            match value {
                Value::Object(item) => items.push(item),
                _ => {
                    return Err(AppError::ValidationFailed {
                        index,
                        fields: vec!["item".to_string()],
                    })
                }
            }
        }

        let inputs = entity_inputs(kind, &items)?;
        let ids = vec![None; inputs.len()];

        let mut tx = begin_write(self.entities.pool()).await?;
        ensure_site_in(&mut tx, tenant_id).await?;
        let (saved, removed) = apply_entity_set(&mut tx, kind, tenant_id, &ids, &inputs).await?;
        tx.commit().await?;

        tracing::debug!(
            "Overwrote {} rows for site {}: {} written, {} removed",
            kind,
            tenant_id,
            saved.len(),
            removed.len()
        );

        Ok(())
    }

    fn tenant_lock(&self, tenant_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(tenant_id.to_string()).or_default().clone()
    }
}
