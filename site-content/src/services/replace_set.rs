//! ReplaceSet writer
//!
//! The save primitive behind every admin section: the stored collection for
//! a site + block + scope becomes exactly the incoming ordered list.
//!
//! The whole batch is validated before a transaction is opened. The diff
//! between stored and incoming IDs is computed in memory by
//! [`plan_replace`], then applied inside one transaction.
//!
//! Two concurrent saves of the same section race and the last commit wins.

use crate::config;
use crate::content::registry::{self, BlockShape, BlockSpec, ContentType};
use crate::content::validate_items;
use crate::context::TenantContext;
use crate::database::component_store::{self, NewRecord};
use crate::database::entity_store;
use crate::database::repository::ensure_site_in;
use crate::database::{begin_write, EntityInput, EntityKind, LegacySettingsStore, PageScope};
use crate::error::{AppError, Result};
use serde_json::{Map, Value};
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::HashSet;

/// One incoming item
#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceItem {
    /// Stable ID of a stored row, when the item was loaded from one
    pub id: Option<String>,
    pub data: Value,
}

impl ReplaceItem {
    pub fn new(data: Value) -> Self {
        Self { id: None, data }
    }

    pub fn with_id(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            data,
        }
    }

    /// Take the ID from the item's own `id` field, as admin forms post it
    pub fn from_value(data: Value) -> Self {
        let id = data.get("id").and_then(Value::as_str).map(str::to_string);
        Self { id, data }
    }
}

/// Store a save was written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    Entity(EntityKind),
    Component(ContentType),
    Legacy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplaceOutcome {
    pub target: WriteTarget,
    /// IDs of the stored rows, in incoming order
    pub saved_ids: Vec<String>,
    pub removed_ids: Vec<String>,
}

/// In-memory diff of stored IDs against incoming items
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReplacePlan {
    /// (incoming index, stored ID) pairs updated in place
    pub updates: Vec<(usize, String)>,
    /// Incoming indexes that become new rows
    pub creates: Vec<usize>,
    /// Stored IDs absent from the incoming list
    pub deletes: Vec<String>,
}

impl ReplacePlan {
    /// Stored ID for an incoming index, if it is an update
    pub fn update_for(&self, index: usize) -> Option<&str> {
        self.updates
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, id)| id.as_str())
    }
}

/// Diff stored IDs against incoming IDs.
///
/// IDs the scope does not hold (foreign or stale) become creates. The same
/// stored ID twice is rejected with the index of the repeat.
pub fn plan_replace(
    stored: &[String],
    incoming: &[Option<&str>],
) -> std::result::Result<ReplacePlan, usize> {
    let stored_set: HashSet<&str> = stored.iter().map(String::as_str).collect();
    let mut kept: HashSet<&str> = HashSet::new();
    let mut plan = ReplacePlan::default();

    for (index, id) in incoming.iter().enumerate() {
        match id {
            Some(id) if stored_set.contains(id) => {
                if !kept.insert(id) {
                    return Err(index);
                }
                plan.updates.push((index, id.to_string()));
            }
            _ => plan.creates.push(index),
        }
    }

    plan.deletes = stored
        .iter()
        .filter(|id| !kept.contains(id.as_str()))
        .cloned()
        .collect();

    Ok(plan)
}

#[derive(Clone)]
pub struct ReplaceSetWriter {
    pool: SqlitePool,
    settings: LegacySettingsStore,
}

impl ReplaceSetWriter {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            settings: LegacySettingsStore::new(pool.clone()),
            pool,
        }
    }

    /// Replace a block's stored items with `items`.
    ///
    /// Blocks with a dedicated table are written there, blocks with a
    /// component type go to the component store, and the rest are written
    /// into the legacy settings document. An empty list clears the section.
    pub async fn replace_set(
        &self,
        ctx: &TenantContext,
        block_name: &str,
        scope: &PageScope,
        items: Vec<ReplaceItem>,
    ) -> Result<ReplaceOutcome> {
        let spec = registry::lookup(block_name)
            .ok_or_else(|| AppError::UnknownBlock(block_name.to_string()))?;

        if items.len() > config::MAX_BATCH_ITEMS {
            return Err(AppError::InvalidRequest(format!(
                "{} accepts at most {} items",
                block_name,
                config::MAX_BATCH_ITEMS
            )));
        }

        let data: Vec<Value> = items.iter().map(|item| item.data.clone()).collect();
        let mut normalized = validate_items(spec.schema, &data)?;
        let ids: Vec<Option<&str>> = items.iter().map(|item| item.id.as_deref()).collect();

        // Row identity lives in the store, not in the stored content
        if spec.content_type.is_some() || spec.entity.is_some() {
            for item in &mut normalized {
                item.remove("id");
            }
        }

        let outcome = match (spec.entity, spec.content_type) {
            (Some(kind), _) => {
                if !scope.is_homepage() {
                    return Err(AppError::InvalidRequest(format!(
                        "{} is not placed on pages",
                        block_name
                    )));
                }
                self.replace_entities(ctx, kind, &ids, &normalized).await?
            }
            (None, Some(content_type)) if scope.is_homepage() => {
                self.replace_homepage_component(ctx, spec, content_type, normalized)
                    .await?
            }
            (None, Some(content_type)) => {
                self.replace_page_components(ctx, content_type, scope, &ids, normalized)
                    .await?
            }
            (None, None) => self.replace_legacy(ctx, spec, normalized).await?,
        };

        tracing::info!(
            "Saved {} for site {}: {} kept, {} removed ({:?})",
            block_name,
            ctx.tenant_id,
            outcome.saved_ids.len(),
            outcome.removed_ids.len(),
            outcome.target
        );

        Ok(outcome)
    }

    async fn replace_entities(
        &self,
        ctx: &TenantContext,
        kind: EntityKind,
        ids: &[Option<&str>],
        items: &[Map<String, Value>],
    ) -> Result<ReplaceOutcome> {
        let inputs = entity_inputs(kind, items)?;

        let mut tx = begin_write(&self.pool).await?;
        ensure_site_in(&mut tx, &ctx.tenant_id).await?;
        let (saved_ids, removed_ids) =
            apply_entity_set(&mut tx, kind, &ctx.tenant_id, ids, &inputs).await?;
        tx.commit().await?;

        Ok(ReplaceOutcome {
            target: WriteTarget::Entity(kind),
            saved_ids,
            removed_ids,
        })
    }

    /// Homepage sections are one record per type holding the whole list.
    ///
    /// Clearing keeps the record with empty content so the cleared section
    /// still shadows legacy data.
    async fn replace_homepage_component(
        &self,
        ctx: &TenantContext,
        spec: &BlockSpec,
        content_type: ContentType,
        items: Vec<Map<String, Value>>,
    ) -> Result<ReplaceOutcome> {
        let content = match spec.shape {
            BlockShape::List => Value::Array(items.into_iter().map(Value::Object).collect()),
            BlockShape::Object => match items.len() {
                0 => Value::Object(Map::new()),
                1 => items.into_iter().next().map(Value::Object).unwrap_or_default(),
                _ => {
                    return Err(AppError::InvalidRequest(format!(
                        "{} holds a single item",
                        spec.name
                    )))
                }
            },
        };

        let tag = content_type.tag();
        let mut tx = begin_write(&self.pool).await?;
        ensure_site_in(&mut tx, &ctx.tenant_id).await?;

        let stored =
            component_store::ids_in_scope(&mut tx, &ctx.tenant_id, tag, &PageScope::Homepage)
                .await?;
        let existing = component_store::find_homepage_in(&mut tx, &ctx.tenant_id, tag).await?;

        let kept = existing.as_ref().map(|record| record.id.clone());
        let removed: Vec<String> = stored
            .into_iter()
            .filter(|id| Some(id) != kept.as_ref())
            .collect();

        component_store::soft_delete_in(&mut tx, &ctx.tenant_id, &removed, ctx.actor()).await?;

        let saved_id = match existing {
            Some(record) => {
                component_store::update_in(
                    &mut tx,
                    &ctx.tenant_id,
                    &record.id,
                    &content,
                    record.sort_order,
                    ctx.actor(),
                )
                .await?;
                record.id
            }
            None => {
                component_store::insert_in(
                    &mut tx,
                    NewRecord {
                        tenant_id: &ctx.tenant_id,
                        scope: &PageScope::Homepage,
                        content_type: tag,
                        content: &content,
                        sort_order: 0,
                        actor: ctx.actor(),
                    },
                )
                .await?
                .id
            }
        };

        tx.commit().await?;

        Ok(ReplaceOutcome {
            target: WriteTarget::Component(content_type),
            saved_ids: vec![saved_id],
            removed_ids: removed,
        })
    }

    /// Page sections are one record per item
    async fn replace_page_components(
        &self,
        ctx: &TenantContext,
        content_type: ContentType,
        scope: &PageScope,
        ids: &[Option<&str>],
        items: Vec<Map<String, Value>>,
    ) -> Result<ReplaceOutcome> {
        let tag = content_type.tag();
        let mut tx = begin_write(&self.pool).await?;
        ensure_site_in(&mut tx, &ctx.tenant_id).await?;

        let stored = component_store::ids_in_scope(&mut tx, &ctx.tenant_id, tag, scope).await?;
        let plan = plan_replace(&stored, ids).map_err(duplicate_id)?;

        component_store::soft_delete_in(&mut tx, &ctx.tenant_id, &plan.deletes, ctx.actor())
            .await?;

        let mut saved_ids = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let content = Value::Object(item);
            let position = index as i64;
            match plan.update_for(index) {
                Some(id) => {
                    component_store::update_in(
                        &mut tx,
                        &ctx.tenant_id,
                        id,
                        &content,
                        position,
                        ctx.actor(),
                    )
                    .await?;
                    saved_ids.push(id.to_string());
                }
                None => {
                    let record = component_store::insert_in(
                        &mut tx,
                        NewRecord {
                            tenant_id: &ctx.tenant_id,
                            scope,
                            content_type: tag,
                            content: &content,
                            sort_order: position,
                            actor: ctx.actor(),
                        },
                    )
                    .await?;
                    saved_ids.push(record.id);
                }
            }
        }

        tx.commit().await?;

        Ok(ReplaceOutcome {
            target: WriteTarget::Component(content_type),
            saved_ids,
            removed_ids: plan.deletes,
        })
    }

    async fn replace_legacy(
        &self,
        ctx: &TenantContext,
        spec: &BlockSpec,
        items: Vec<Map<String, Value>>,
    ) -> Result<ReplaceOutcome> {
        let value = match spec.shape {
            BlockShape::List => Value::Array(items.into_iter().map(Value::Object).collect()),
            BlockShape::Object => match items.len() {
                0 => Value::Object(Map::new()),
                1 => items.into_iter().next().map(Value::Object).unwrap_or_default(),
                _ => {
                    return Err(AppError::InvalidRequest(format!(
                        "{} holds a single item",
                        spec.name
                    )))
                }
            },
        };

        self.settings.put_block(&ctx.tenant_id, spec.name, value).await?;

        Ok(ReplaceOutcome {
            target: WriteTarget::Legacy,
            saved_ids: Vec::new(),
            removed_ids: Vec::new(),
        })
    }
}

/// Map validated items onto dedicated rows, rejecting repeated slugs
pub(crate) fn entity_inputs(
    kind: EntityKind,
    items: &[Map<String, Value>],
) -> Result<Vec<EntityInput>> {
    let mut inputs = Vec::with_capacity(items.len());
    let mut slugs = HashSet::new();

    for (index, item) in items.iter().enumerate() {
        let input =
            EntityInput::from_item(kind, item).map_err(|field| AppError::ValidationFailed {
                index,
                fields: vec![field.to_string()],
            })?;
        if !slugs.insert(input.slug.clone()) {
            return Err(AppError::ValidationFailed {
                index,
                fields: vec!["slug".to_string()],
            });
        }
        inputs.push(input);
    }

    Ok(inputs)
}

/// Make a site's dedicated rows exactly `inputs`, inside the caller's
/// transaction. Returns the saved IDs in order and the removed IDs.
pub(crate) async fn apply_entity_set(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    tenant_id: &str,
    ids: &[Option<&str>],
    inputs: &[EntityInput],
) -> Result<(Vec<String>, Vec<String>)> {
    let stored = entity_store::ids_in(conn, kind, tenant_id).await?;
    let plan = plan_replace(&stored, ids).map_err(duplicate_id)?;

    // Removed rows go first so their slugs are free for the new set
    entity_store::soft_delete_in(conn, kind, tenant_id, &plan.deletes).await?;

    // Kept rows may trade slugs with each other or with new rows
    let kept: Vec<&str> = plan.updates.iter().map(|(_, id)| id.as_str()).collect();
    entity_store::park_slugs_in(conn, kind, tenant_id, &kept).await?;

    let mut saved_ids = Vec::with_capacity(inputs.len());
    for (index, input) in inputs.iter().enumerate() {
        let position = index as i64;
        match plan.update_for(index) {
            Some(id) => {
                entity_store::update_in(conn, kind, tenant_id, id, input, position).await?;
                saved_ids.push(id.to_string());
            }
            None => {
                let row = entity_store::insert_in(conn, kind, tenant_id, input, position).await?;
                saved_ids.push(row.id);
            }
        }
    }

    Ok((saved_ids, plan.deletes))
}

fn duplicate_id(index: usize) -> AppError {
    AppError::ValidationFailed {
        index,
        fields: vec!["id".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{
        initialize_database, ComponentStore, CreateSiteRequest, DedicatedStores, SiteRepository,
    };
    use crate::services::{ContentResolver, ContentSource, MigrationEngine};
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    struct Fixture {
        writer: ReplaceSetWriter,
        pool: SqlitePool,
        ctx: TenantContext,
    }

    async fn create_fixture() -> Fixture {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();

        let site = SiteRepository::new(pool.clone())
            .create_site(CreateSiteRequest {
                name: "MBSTU".to_string(),
                domain: "mbstu.local".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();

        Fixture {
            writer: ReplaceSetWriter::new(pool.clone()),
            pool,
            ctx: TenantContext::from_site(&site).with_actor("admin"),
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_replace_diff() {
        let stored = ids(&["a", "b", "c"]);
        let plan = plan_replace(&stored, &[Some("c"), None, Some("zz"), Some("a")]).unwrap();

        assert_eq!(plan.updates, vec![(0, "c".to_string()), (3, "a".to_string())]);
        assert_eq!(plan.creates, vec![1, 2]);
        assert_eq!(plan.deletes, ids(&["b"]));
        assert_eq!(plan.update_for(3), Some("a"));
        assert_eq!(plan.update_for(1), None);
    }

    #[test]
    fn test_plan_replace_empty_clears_everything() {
        let stored = ids(&["a", "b"]);
        let plan = plan_replace(&stored, &[]).unwrap();

        assert!(plan.updates.is_empty());
        assert!(plan.creates.is_empty());
        assert_eq!(plan.deletes, stored);
    }

    #[test]
    fn test_plan_replace_rejects_repeated_id() {
        let stored = ids(&["a"]);
        assert_eq!(plan_replace(&stored, &[Some("a"), Some("a")]), Err(1));
    }

    #[test]
    fn test_replace_item_from_value() {
        let item = ReplaceItem::from_value(json!({ "id": "n1", "title": "T" }));
        assert_eq!(item.id.as_deref(), Some("n1"));
        assert_eq!(ReplaceItem::from_value(json!({ "id": 7 })).id, None);
    }

    #[tokio::test]
    async fn test_entities_replace_then_shrink_then_clear() {
        let f = create_fixture().await;
        let notices = DedicatedStores::new(f.pool.clone()).store(EntityKind::Notices);

        let first = f
            .writer
            .replace_set(
                &f.ctx,
                "noticeItems",
                &PageScope::Homepage,
                vec![
                    ReplaceItem::new(json!({ "title": "A" })),
                    ReplaceItem::new(json!({ "title": "B" })),
                ],
            )
            .await
            .unwrap();
        assert_eq!(first.target, WriteTarget::Entity(EntityKind::Notices));
        assert_eq!(first.saved_ids.len(), 2);

        let a_id = first.saved_ids[0].clone();
        let second = f
            .writer
            .replace_set(
                &f.ctx,
                "noticeItems",
                &PageScope::Homepage,
                vec![ReplaceItem::with_id(a_id.clone(), json!({ "title": "A" }))],
            )
            .await
            .unwrap();
        assert_eq!(second.saved_ids, vec![a_id.clone()]);
        assert_eq!(second.removed_ids, vec![first.saved_ids[1].clone()]);

        let rows = notices.list_active(&f.ctx.tenant_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, a_id);

        f.writer
            .replace_set(&f.ctx, "noticeItems", &PageScope::Homepage, vec![])
            .await
            .unwrap();
        assert!(notices.list_active(&f.ctx.tenant_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_list_twice_keeps_ids() {
        let f = create_fixture().await;

        let items = |saved: &[String]| {
            vec![
                ReplaceItem::with_id(saved[0].clone(), json!({ "title": "Open day" })),
                ReplaceItem::with_id(saved[1].clone(), json!({ "title": "Sports" })),
            ]
        };

        let first = f
            .writer
            .replace_set(
                &f.ctx,
                "eventItems",
                &PageScope::Homepage,
                vec![
                    ReplaceItem::new(json!({ "title": "Open day" })),
                    ReplaceItem::new(json!({ "title": "Sports" })),
                ],
            )
            .await
            .unwrap();

        let second = f
            .writer
            .replace_set(&f.ctx, "eventItems", &PageScope::Homepage, items(&first.saved_ids))
            .await
            .unwrap();
        let third = f
            .writer
            .replace_set(&f.ctx, "eventItems", &PageScope::Homepage, items(&first.saved_ids))
            .await
            .unwrap();

        assert_eq!(second.saved_ids, first.saved_ids);
        assert_eq!(third.saved_ids, first.saved_ids);
        assert!(third.removed_ids.is_empty());
    }

    #[tokio::test]
    async fn test_validation_failure_writes_nothing() {
        let f = create_fixture().await;
        let components = ComponentStore::new(f.pool.clone());

        let slide = |title: &str| {
            json!({ "title": title, "subtitle": "s", "ctaText": "More", "ctaLink": "/more" })
        };
        f.writer
            .replace_set(
                &f.ctx,
                "heroSlides",
                &PageScope::Homepage,
                vec![ReplaceItem::new(slide("Original"))],
            )
            .await
            .unwrap();

        let err = f
            .writer
            .replace_set(
                &f.ctx,
                "heroSlides",
                &PageScope::Homepage,
                vec![
                    ReplaceItem::new(slide("One")),
                    ReplaceItem::new(slide("Two")),
                    ReplaceItem::new(json!({ "title": "Three", "subtitle": "s", "ctaLink": "/x" })),
                ],
            )
            .await
            .unwrap_err();

        match err {
            AppError::ValidationFailed { index, fields } => {
                assert_eq!(index, 2);
                assert_eq!(fields, vec!["ctaText"]);
            }
            other => panic!("unexpected error: {other}"),
        }

        let record = components
            .find_homepage(&f.ctx.tenant_id, "hero_carousel")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content, json!([slide("Original")]));
    }

    #[tokio::test]
    async fn test_homepage_component_is_single_record() {
        let f = create_fixture().await;
        let components = ComponentStore::new(f.pool.clone());
        let headline = |text: &str| json!({ "text": text, "type": "info", "priority": 1 });

        let first = f
            .writer
            .replace_set(
                &f.ctx,
                "headlines",
                &PageScope::Homepage,
                vec![ReplaceItem::new(headline("One")), ReplaceItem::new(headline("Two"))],
            )
            .await
            .unwrap();
        let second = f
            .writer
            .replace_set(
                &f.ctx,
                "headlines",
                &PageScope::Homepage,
                vec![ReplaceItem::new(headline("Three"))],
            )
            .await
            .unwrap();

        assert_eq!(first.saved_ids, second.saved_ids);
        let records = components
            .list_scope(&f.ctx.tenant_id, "headline_marquee", &PageScope::Homepage)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content, json!([headline("Three")]));
        assert_eq!(records[0].created_by.as_deref(), Some("admin"));

        let cleared = f
            .writer
            .replace_set(&f.ctx, "headlines", &PageScope::Homepage, vec![])
            .await
            .unwrap();
        assert_eq!(cleared.saved_ids, first.saved_ids);
        assert!(cleared.removed_ids.is_empty());
        let record = components
            .find_homepage(&f.ctx.tenant_id, "headline_marquee")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content, json!([]));
    }

    #[tokio::test]
    async fn test_object_block_accepts_one_item() {
        let f = create_fixture().await;

        let err = f
            .writer
            .replace_set(
                &f.ctx,
                "footerData",
                &PageScope::Homepage,
                vec![ReplaceItem::new(json!({})), ReplaceItem::new(json!({}))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidRequest(_)));

        let saved = f
            .writer
            .replace_set(
                &f.ctx,
                "footerData",
                &PageScope::Homepage,
                vec![ReplaceItem::new(json!({ "copyright": "MBSTU" }))],
            )
            .await
            .unwrap();
        assert_eq!(saved.target, WriteTarget::Component(ContentType::Footer));
    }

    #[tokio::test]
    async fn test_page_components_one_record_per_item() {
        let f = create_fixture().await;
        let components = ComponentStore::new(f.pool.clone());
        let page = PageScope::Page("admission".to_string());
        let welcome = |title: &str| json!({ "title": title, "buttonText": "Apply" });

        let first = f
            .writer
            .replace_set(
                &f.ctx,
                "welcomeItems",
                &page,
                vec![ReplaceItem::new(welcome("Undergraduate")), ReplaceItem::new(welcome("Graduate"))],
            )
            .await
            .unwrap();
        assert_eq!(first.saved_ids.len(), 2);

        f.writer
            .replace_set(
                &f.ctx,
                "welcomeItems",
                &page,
                vec![ReplaceItem::with_id(first.saved_ids[1].clone(), welcome("Graduate"))],
            )
            .await
            .unwrap();

        let on_page = components
            .list_page_components(&f.ctx.tenant_id, "admission")
            .await
            .unwrap();
        assert_eq!(on_page.len(), 1);
        assert_eq!(on_page[0].id, first.saved_ids[1]);
        assert_eq!(on_page[0].sort_order, 0);
    }

    #[tokio::test]
    async fn test_menu_items_written_to_legacy_settings() {
        let f = create_fixture().await;
        let settings = LegacySettingsStore::new(f.pool.clone());

        let outcome = f
            .writer
            .replace_set(
                &f.ctx,
                "menuItems",
                &PageScope::Homepage,
                vec![ReplaceItem::new(json!({ "title": "Home", "col": 1 }))],
            )
            .await
            .unwrap();
        assert_eq!(outcome.target, WriteTarget::Legacy);

        let stored = settings
            .get_block(&f.ctx.tenant_id, "menuItems")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, json!([{ "title": "Home", "col": 1, "subItems": [] }]));

        let err = f
            .writer
            .replace_set(
                &f.ctx,
                "menuItems",
                &PageScope::Homepage,
                vec![ReplaceItem::new(json!({ "title": "Home" }))],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed { index: 0, .. }));
    }

    #[tokio::test]
    async fn test_duplicate_slugs_rejected() {
        let f = create_fixture().await;

        let err = f
            .writer
            .replace_set(
                &f.ctx,
                "newsItems",
                &PageScope::Homepage,
                vec![
                    ReplaceItem::new(json!({ "title": "Result published" })),
                    ReplaceItem::new(json!({ "title": "Result Published!" })),
                ],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ValidationFailed { index: 1, ref fields } if fields == &["slug"]));
    }

    #[tokio::test]
    async fn test_stored_rows_can_swap_slugs() {
        let f = create_fixture().await;
        let news = DedicatedStores::new(f.pool.clone()).store(EntityKind::News);

        let first = f
            .writer
            .replace_set(
                &f.ctx,
                "newsItems",
                &PageScope::Homepage,
                vec![
                    ReplaceItem::new(json!({ "title": "Convocation", "slug": "x" })),
                    ReplaceItem::new(json!({ "title": "Sports week", "slug": "y" })),
                ],
            )
            .await
            .unwrap();
        let (a, b) = (first.saved_ids[0].clone(), first.saved_ids[1].clone());

        let swapped = f
            .writer
            .replace_set(
                &f.ctx,
                "newsItems",
                &PageScope::Homepage,
                vec![
                    ReplaceItem::with_id(a.clone(), json!({ "title": "Convocation", "slug": "y" })),
                    ReplaceItem::with_id(b.clone(), json!({ "title": "Sports week", "slug": "x" })),
                    // A new row may take a slug a kept row just gave up
                    ReplaceItem::new(json!({ "title": "Admission", "slug": "z" })),
                ],
            )
            .await
            .unwrap();
        assert_eq!(swapped.saved_ids[..2], [a.clone(), b.clone()]);
        assert!(swapped.removed_ids.is_empty());

        let mut slugs: Vec<(String, String)> = news
            .list_active(&f.ctx.tenant_id)
            .await
            .unwrap()
            .into_iter()
            .map(|row| (row.id, row.slug))
            .collect();
        slugs.sort_by(|l, r| l.1.cmp(&r.1));
        assert_eq!(slugs[0], (b, "x".to_string()));
        assert_eq!(slugs[1], (a, "y".to_string()));
        assert_eq!(slugs[2].1, "z");
    }

    #[tokio::test]
    async fn test_clearing_migrated_section_shadows_legacy() {
        let f = create_fixture().await;
        let settings = LegacySettingsStore::new(f.pool.clone());
        let components = ComponentStore::new(f.pool.clone());
        let entities = DedicatedStores::new(f.pool.clone());
        let slide = json!({ "title": "Old", "subtitle": "s", "ctaText": "Go", "ctaLink": "/" });
        settings
            .put_block(&f.ctx.tenant_id, "heroSlides", json!([slide.clone()]))
            .await
            .unwrap();

        let engine = MigrationEngine::new(
            SiteRepository::new(f.pool.clone()),
            settings.clone(),
            components.clone(),
            entities.clone(),
        );
        let report = engine.migrate_tenant(&f.ctx.tenant_id, false).await.unwrap();
        assert_eq!(report.migrated, vec!["heroSlides"]);

        f.writer
            .replace_set(&f.ctx, "heroSlides", &PageScope::Homepage, vec![])
            .await
            .unwrap();

        let resolver = ContentResolver::new(settings.clone(), components, entities);
        let resolved = resolver
            .resolve(&f.ctx, "heroSlides", json!(null))
            .await
            .unwrap();
        assert_eq!(resolved.source, ContentSource::Component);
        assert_eq!(resolved.payload, json!([]));

        // Legacy data is still kept, only shadowed
        let legacy = settings.get_block(&f.ctx.tenant_id, "heroSlides").await.unwrap();
        assert_eq!(legacy, Some(json!([slide])));
    }

    #[tokio::test]
    async fn test_clearing_object_block_keeps_empty_record() {
        let f = create_fixture().await;
        let components = ComponentStore::new(f.pool.clone());

        f.writer
            .replace_set(&f.ctx, "footerData", &PageScope::Homepage, vec![])
            .await
            .unwrap();

        let record = components
            .find_homepage(&f.ctx.tenant_id, "footer")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.content, json!({}));
    }

    #[tokio::test]
    async fn test_item_id_is_not_stored_in_content() {
        let f = create_fixture().await;
        let components = ComponentStore::new(f.pool.clone());
        let page = PageScope::Page("about".to_string());

        let first = f
            .writer
            .replace_set(
                &f.ctx,
                "welcomeItems",
                &page,
                vec![ReplaceItem::new(json!({ "title": "Mission", "buttonText": "More" }))],
            )
            .await
            .unwrap();
        let id = first.saved_ids[0].clone();

        let second = f
            .writer
            .replace_set(
                &f.ctx,
                "welcomeItems",
                &page,
                vec![ReplaceItem::from_value(
                    json!({ "id": id, "title": "Mission", "buttonText": "Read" }),
                )],
            )
            .await
            .unwrap();
        assert_eq!(second.saved_ids, vec![id.clone()]);

        let record = components.get(&f.ctx.tenant_id, &id).await.unwrap();
        assert_eq!(record.content, json!({ "title": "Mission", "buttonText": "Read" }));

        f.writer
            .replace_set(
                &f.ctx,
                "headlines",
                &PageScope::Homepage,
                vec![ReplaceItem::from_value(
                    json!({ "id": "h1", "text": "Exam", "type": "info", "priority": 1 }),
                )],
            )
            .await
            .unwrap();
        let headline = components
            .find_homepage(&f.ctx.tenant_id, "headline_marquee")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(headline.content, json!([{ "text": "Exam", "type": "info", "priority": 1 }]));
    }

    #[tokio::test]
    async fn test_unknown_block_and_site() {
        let f = create_fixture().await;

        let err = f
            .writer
            .replace_set(&f.ctx, "sidebarWidgets", &PageScope::Homepage, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UnknownBlock(_)));

        let ghost = TenantContext {
            tenant_id: "ghost".to_string(),
            domain: "ghost.local".to_string(),
            actor: None,
        };
        let err = f
            .writer
            .replace_set(&ghost, "noticeItems", &PageScope::Homepage, vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::TenantNotFound(_)));
    }
}
