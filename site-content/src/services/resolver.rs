//! Content resolver
//!
//! Answers "what content does site T show for block B". Sources are tried in
//! a fixed order and the first one holding data wins:
//!
//! 1. the block's dedicated table
//! 2. the active homepage component of the block's type
//! 3. the block's key in the legacy settings document
//! 4. the caller's default
//!
//! Sources are never merged. Resolution is read-only.

use crate::content::registry::{self, BlockSpec};
use crate::content::{is_blank, ContentBlock};
use crate::context::TenantContext;
use crate::database::{
    ComponentStore, ContentRecord, DedicatedStores, EntityKind, LegacySettingsStore,
    SettingsDocument,
};
use crate::error::{AppError, Result};
use serde::Serialize;
use serde_json::Value;

/// Where a resolved payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "store", content = "kind")]
pub enum ContentSource {
    Dedicated(EntityKind),
    Component,
    Legacy,
    Default,
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentSource::Dedicated(kind) => write!(f, "dedicated table {}", kind),
            ContentSource::Component => f.write_str("component store"),
            ContentSource::Legacy => f.write_str("legacy settings"),
            ContentSource::Default => f.write_str("default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolved {
    pub payload: Value,
    pub source: ContentSource,
    /// False when the caller's default was returned
    pub found: bool,
}

impl Resolved {
    fn default_value(default: Value) -> Self {
        Self {
            payload: default,
            source: ContentSource::Default,
            found: false,
        }
    }
}

#[derive(Clone)]
pub struct ContentResolver {
    settings: LegacySettingsStore,
    components: ComponentStore,
    entities: DedicatedStores,
}

impl ContentResolver {
    pub fn new(
        settings: LegacySettingsStore,
        components: ComponentStore,
        entities: DedicatedStores,
    ) -> Self {
        Self {
            settings,
            components,
            entities,
        }
    }

    /// Resolve one block for a site.
    ///
    /// Unknown block names resolve to the default.
    pub async fn resolve(
        &self,
        ctx: &TenantContext,
        block_name: &str,
        default: Value,
    ) -> Result<Resolved> {
        let legacy = self.load_legacy(ctx).await?;
        self.resolve_with(ctx, &legacy, block_name, default).await
    }

    /// Resolve several blocks for one page render.
    ///
    /// The legacy document is read once for the whole set. Each block falls
    /// back to `Value::Null` when nothing holds data.
    pub async fn resolve_many(
        &self,
        ctx: &TenantContext,
        block_names: &[&str],
    ) -> Result<Vec<(String, Resolved)>> {
        let legacy = self.load_legacy(ctx).await?;
        let mut resolved = Vec::with_capacity(block_names.len());

        for name in block_names {
            let value = self.resolve_with(ctx, &legacy, name, Value::Null).await?;
            resolved.push((name.to_string(), value));
        }

        Ok(resolved)
    }

    /// Active homepage components in display order
    pub async fn homepage_components(&self, ctx: &TenantContext) -> Result<Vec<ContentRecord>> {
        self.components.list_homepage_components(&ctx.tenant_id).await
    }

    /// Active components placed on one page, in display order
    pub async fn page_components(
        &self,
        ctx: &TenantContext,
        page_id: &str,
    ) -> Result<Vec<ContentRecord>> {
        self.components
            .list_page_components(&ctx.tenant_id, page_id)
            .await
    }

    /// Load the legacy document, checking the site exists.
    ///
    /// A malformed document is logged and read as empty.
    async fn load_legacy(&self, ctx: &TenantContext) -> Result<SettingsDocument> {
        match self.settings.load_document(&ctx.tenant_id).await {
            Ok(document) => Ok(document),
            Err(AppError::MalformedLegacyDocument { tenant_id, reason }) => {
                tracing::warn!(
                    "Ignoring malformed legacy settings for site {}: {}",
                    tenant_id,
                    reason
                );
                Ok(SettingsDocument::new())
            }
            Err(e) => Err(e),
        }
    }

    async fn resolve_with(
        &self,
        ctx: &TenantContext,
        legacy: &SettingsDocument,
        block_name: &str,
        default: Value,
    ) -> Result<Resolved> {
        let Some(spec) = registry::lookup(block_name) else {
            tracing::debug!("No registered block {}; using default", block_name);
            return Ok(Resolved::default_value(default));
        };

        if let Some(kind) = spec.entity {
            let rows = self.entities.store(kind).list_active(&ctx.tenant_id).await?;
            if !rows.is_empty() {
                let items = rows.iter().map(|row| row.to_public_item(kind)).collect();
                return Ok(Resolved {
                    payload: Value::Array(items),
                    source: ContentSource::Dedicated(kind),
                    found: true,
                });
            }
        }

        if let Some(content_type) = spec.content_type {
            if let Some(record) = self
                .components
                .find_homepage(&ctx.tenant_id, content_type.tag())
                .await?
            {
                return Ok(Resolved {
                    payload: record.content,
                    source: ContentSource::Component,
                    found: true,
                });
            }
        }

        match decode_legacy(ctx, spec, legacy) {
            Some(block) => Ok(Resolved {
                payload: block.into_value(),
                source: ContentSource::Legacy,
                found: true,
            }),
            None => Ok(Resolved::default_value(default)),
        }
    }
}

fn decode_legacy(
    ctx: &TenantContext,
    spec: &BlockSpec,
    legacy: &SettingsDocument,
) -> Option<ContentBlock> {
    let value = legacy.get(spec.name).filter(|value| !is_blank(value))?;

    match ContentBlock::decode(spec, value.clone()) {
        Ok(block) => Some(block),
        Err(mismatch) => {
            tracing::warn!(
                "Ignoring legacy value for site {}: {}",
                ctx.tenant_id,
                mismatch
            );
            None
        }
    }
}
