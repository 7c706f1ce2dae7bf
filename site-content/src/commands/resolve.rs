//! Resolve command

use crate::app::AppState;
use crate::context::TenantContext;
use crate::error::Result;
use crate::services::Resolved;
use serde_json::Value;

/// Resolve a block for a site, with `null` as the default
pub async fn resolve_block(state: &AppState, site_id: &str, block: &str) -> Result<Resolved> {
    let ctx = TenantContext::load(&state.sites, site_id).await?;
    state.resolver.resolve(&ctx, block, Value::Null).await
}
