//! Application state and initialization
//!
//! Builds every store and service over one pool. The binary and the
//! integration tests both start from here.

use crate::database::{
    create_pool, ComponentStore, DedicatedStores, LegacySettingsStore, SiteRepository,
};
use crate::error::Result;
use crate::services::{ContentResolver, MigrationEngine, ReplaceSetWriter};
use sqlx::SqlitePool;
use std::path::Path;

/// Central application state holding all services
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub sites: SiteRepository,
    pub resolver: ContentResolver,
    pub writer: ReplaceSetWriter,
    pub migrations: MigrationEngine,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let sites = SiteRepository::new(pool.clone());
        let settings = LegacySettingsStore::new(pool.clone());
        let components = ComponentStore::new(pool.clone());
        let entities = DedicatedStores::new(pool.clone());

        Self {
            resolver: ContentResolver::new(settings.clone(), components.clone(), entities.clone()),
            writer: ReplaceSetWriter::new(pool.clone()),
            migrations: MigrationEngine::new(sites.clone(), settings, components, entities),
            sites,
            pool,
        }
    }

    /// Open (and migrate) the database at `db_path`
    pub async fn open(db_path: &Path) -> Result<Self> {
        tracing::info!("Initializing application state");

        let pool = create_pool(db_path).await?;
        let state = Self::new(pool);

        tracing::info!("Application state initialized");
        Ok(state)
    }
}
