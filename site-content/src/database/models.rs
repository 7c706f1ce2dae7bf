//! Database models
//!
//! Rust structs representing database entities.
//! All models use serde so they can be handed to admin surfaces as JSON.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;

/// A site (tenant) sharing the codebase and database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Site {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub is_active: bool,
    /// Legacy settings document, a JSON object keyed by block name
    pub settings: Option<String>,
    pub theme: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create site request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateSiteRequest {
    pub name: String,
    pub domain: String,
    pub theme: Option<String>,
    pub settings: Option<Map<String, Value>>,
}

/// Where a component is rendered
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PageScope {
    /// Landing page / global scope (`page_id IS NULL`)
    Homepage,
    Page(String),
}

impl PageScope {
    pub fn page_id(&self) -> Option<&str> {
        match self {
            PageScope::Homepage => None,
            PageScope::Page(id) => Some(id),
        }
    }

    pub fn is_homepage(&self) -> bool {
        matches!(self, PageScope::Homepage)
    }
}

/// A typed content block stored in the polymorphic components table
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentRecord {
    pub id: String,
    pub tenant_id: String,
    pub page_id: Option<String>,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub content_type: String,
    #[sqlx(json)]
    pub content: Value,
    pub is_homepage: bool,
    pub is_active: bool,
    pub sort_order: i64,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ContentRecord {
    pub fn scope(&self) -> PageScope {
        match &self.page_id {
            Some(page_id) => PageScope::Page(page_id.clone()),
            None => PageScope::Homepage,
        }
    }
}

/// High-volume entity kinds that own a dedicated table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    News,
    Events,
    Notices,
    Publications,
    Tenders,
    Teachers,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::News,
        EntityKind::Events,
        EntityKind::Notices,
        EntityKind::Publications,
        EntityKind::Tenders,
        EntityKind::Teachers,
    ];

    /// Table name. Only ever interpolated from this fixed set.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::News => "news",
            EntityKind::Events => "events",
            EntityKind::Notices => "notices",
            EntityKind::Publications => "publications",
            EntityKind::Tenders => "tenders",
            EntityKind::Teachers => "teachers",
        }
    }

    /// Field that carries the display title in incoming items
    pub fn title_field(&self) -> &'static str {
        match self {
            EntityKind::Teachers => "name",
            _ => "title",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table())
    }
}

/// A row in one of the dedicated entity tables
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DedicatedEntity {
    pub id: String,
    pub tenant_id: String,
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    /// Entity-specific fields (venue, deadline, designation, ...)
    #[sqlx(json)]
    pub attributes: Value,
    pub published_at: Option<DateTime<Utc>>,
    pub sort_order: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DedicatedEntity {
    /// Public item shape shared with the legacy and component blocks.
    ///
    /// Attributes are merged in but never shadow the core keys.
    pub fn to_public_item(&self, kind: EntityKind) -> Value {
        let mut item = Map::new();

        if let Value::Object(attributes) = &self.attributes {
            for (key, value) in attributes {
                item.insert(key.clone(), value.clone());
            }
        }

        item.insert("id".into(), Value::String(self.id.clone()));
        item.insert("slug".into(), Value::String(self.slug.clone()));
        item.insert(kind.title_field().into(), Value::String(self.title.clone()));
        insert_opt(&mut item, "summary", &self.summary);
        insert_opt(&mut item, "body", &self.body);
        insert_opt(&mut item, "image", &self.image_url);
        insert_opt(&mut item, "link", &self.link_url);
        if let Some(date) = self.published_at {
            item.insert("date".into(), Value::String(date.to_rfc3339()));
        }

        Value::Object(item)
    }
}

fn insert_opt(item: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        item.insert(key.to_string(), Value::String(value.clone()));
    }
}

/// Validated write form of a dedicated entity item
#[derive(Debug, Clone, PartialEq)]
pub struct EntityInput {
    pub slug: String,
    pub title: String,
    pub summary: Option<String>,
    pub body: Option<String>,
    pub image_url: Option<String>,
    pub link_url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub attributes: Map<String, Value>,
}

/// Keys of the public item shape that map onto columns
const ENTITY_CORE_KEYS: &[&str] = &[
    "id", "slug", "title", "name", "summary", "body", "image", "link", "date",
];

impl EntityInput {
    /// Build the write form from an already validated item.
    ///
    /// `slug` falls back to the slugified title. Returns the name of the
    /// offending field when a value has the wrong form.
    pub fn from_item(kind: EntityKind, item: &Map<String, Value>) -> Result<Self, &'static str> {
        let title = text(item, kind.title_field()).ok_or(kind.title_field())?;

        let slug = match text(item, "slug") {
            Some(slug) => slugify(&slug),
            None => slugify(&title),
        };
        if slug.is_empty() {
            return Err("slug");
        }

        let published_at = match item.get("date") {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) if raw.trim().is_empty() => None,
            Some(Value::String(raw)) => Some(parse_date(raw).ok_or("date")?),
            Some(_) => return Err("date"),
        };

        let attributes = item
            .iter()
            .filter(|(key, _)| !ENTITY_CORE_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Ok(Self {
            slug,
            title,
            summary: text(item, "summary"),
            body: text(item, "body"),
            image_url: text(item, "image"),
            link_url: text(item, "link"),
            published_at,
            attributes,
        })
    }
}

fn text(item: &Map<String, Value>, key: &str) -> Option<String> {
    match item.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC)
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Lowercase ASCII slug with single dashes, capped at `MAX_SLUG_LENGTH`
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }

    slug.truncate(crate::config::MAX_SLUG_LENGTH);
    slug.trim_end_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Admission Notice 2024!"), "admission-notice-2024");
        assert_eq!(slugify("  --Hello,   World--  "), "hello-world");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_parse_date_accepts_plain_dates() {
        let parsed = parse_date("2024-03-01").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert!(parse_date("yesterday").is_none());
    }

    #[test]
    fn test_entity_input_splits_attributes() {
        let item = object(json!({
            "title": "Convocation",
            "date": "2024-05-10",
            "venue": "Main Hall",
            "link": "/events/convocation"
        }));

        let input = EntityInput::from_item(EntityKind::Events, &item).unwrap();
        assert_eq!(input.slug, "convocation");
        assert_eq!(input.link_url.as_deref(), Some("/events/convocation"));
        assert_eq!(input.attributes.get("venue"), Some(&json!("Main Hall")));
        assert!(!input.attributes.contains_key("title"));
    }

    #[test]
    fn test_entity_input_rejects_bad_date() {
        let item = object(json!({ "title": "Notice", "date": 20240101 }));
        assert_eq!(
            EntityInput::from_item(EntityKind::Notices, &item),
            Err("date")
        );
    }

    #[test]
    fn test_teachers_use_name_as_title() {
        let item = object(json!({ "name": "Dr. Rahman", "designation": "Professor" }));
        let input = EntityInput::from_item(EntityKind::Teachers, &item).unwrap();
        assert_eq!(input.title, "Dr. Rahman");
        assert_eq!(input.slug, "dr-rahman");
    }
}
