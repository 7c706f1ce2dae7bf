//! Operator commands behind the `site-content` binary
//!
//! - `migrate`: legacy settings → component records, one site or all
//! - `resolve`: show what a site renders for a block
//! - `save`: replace a block's items from a JSON payload
//!
//! Commands return summaries; printing and exit codes belong to `main`.

pub mod migrate;
pub mod resolve;
pub mod save;

pub use migrate::{migrate, MigrationSummary, TenantFailure};
pub use resolve::resolve_block;
pub use save::{items_from_payload, save_block};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::app::AppState;
    use crate::database::{initialize_database, CreateSiteRequest};
    use serde_json::Value;
    use sqlx::sqlite::SqlitePoolOptions;

    pub async fn create_state() -> AppState {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();
        AppState::new(pool)
    }

    pub async fn create_site(state: &AppState, domain: &str, settings: Value) -> String {
        state
            .sites
            .create_site(CreateSiteRequest {
                name: domain.to_string(),
                domain: domain.to_string(),
                settings: settings.as_object().cloned(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }
}
