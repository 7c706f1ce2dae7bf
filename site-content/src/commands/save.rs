//! Save command
//!
//! Replaces a block's items from a JSON payload, the same save an admin
//! section performs.

use crate::app::AppState;
use crate::context::TenantContext;
use crate::database::PageScope;
use crate::error::{AppError, Result};
use crate::services::{ReplaceItem, ReplaceOutcome};
use serde_json::Value;

/// Turn a payload into items: a list, a single object, or `null` to clear
pub fn items_from_payload(payload: Value) -> Result<Vec<ReplaceItem>> {
    match payload {
        Value::Array(items) => Ok(items.into_iter().map(ReplaceItem::from_value).collect()),
        Value::Object(_) => Ok(vec![ReplaceItem::from_value(payload)]),
        Value::Null => Ok(Vec::new()),
        _ => Err(AppError::InvalidRequest(
            "payload must be a list, an object or null".to_string(),
        )),
    }
}

pub async fn save_block(
    state: &AppState,
    site_id: &str,
    block: &str,
    page: Option<String>,
    actor: Option<String>,
    payload: Value,
) -> Result<ReplaceOutcome> {
    let mut ctx = TenantContext::load(&state.sites, site_id).await?;
    if let Some(actor) = actor {
        ctx = ctx.with_actor(actor);
    }

    let scope = page.map_or(PageScope::Homepage, PageScope::Page);
    let items = items_from_payload(payload)?;

    state.writer.replace_set(&ctx, block, &scope, items).await
}
