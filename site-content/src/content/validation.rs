//! Per-type item validation
//!
//! Each schema names its required fields. A field is missing when it is
//! absent, null, or a blank string. A whole batch is checked before anything
//! is written.

use super::registry::ItemSchema;
use crate::error::{AppError, Result};
use serde_json::{Map, Value};

/// Required fields for a schema
pub fn required_fields(schema: ItemSchema) -> &'static [&'static str] {
    match schema {
        ItemSchema::Menu => &["title", "col"],
        ItemSchema::HeroSlide => &["title", "subtitle", "ctaText", "ctaLink"],
        ItemSchema::Headline => &["text", "type", "priority"],
        ItemSchema::Faculty => &["name", "shortName", "description"],
        ItemSchema::Welcome => &["title", "buttonText"],
        ItemSchema::Entity(kind) => match kind.title_field() {
            "name" => &["name"],
            _ => &["title"],
        },
        ItemSchema::Free => &[],
    }
}

/// Fill in defaults the stored shape relies on
pub fn normalize_item(schema: ItemSchema, item: &mut Map<String, Value>) {
    if schema == ItemSchema::Menu && !matches!(item.get("subItems"), Some(Value::Array(_))) {
        item.insert("subItems".to_string(), Value::Array(Vec::new()));
    }
}

/// Validate and normalize a batch.
///
/// Returns the normalized item objects, or the first offending index with
/// every missing field name. Indexes count from 0, so the third item of a
/// batch reports `index: 2`. An item that is not an object reports the
/// field `item`.
pub fn validate_items(schema: ItemSchema, items: &[Value]) -> Result<Vec<Map<String, Value>>> {
    let required = required_fields(schema);
    let mut normalized = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Value::Object(object) = item else {
            return Err(AppError::ValidationFailed {
                index,
                fields: vec!["item".to_string()],
            });
        };

        let missing: Vec<String> = required
            .iter()
            .filter(|field| is_missing(object.get(**field)))
            .map(|field| field.to_string())
            .collect();

        if !missing.is_empty() {
            return Err(AppError::ValidationFailed {
                index,
                fields: missing,
            });
        }

        let mut object = object.clone();
        normalize_item(schema, &mut object);
        normalized.push(object);
    }

    Ok(normalized)
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::EntityKind;
    use serde_json::json;

    #[test]
    fn test_menu_items_default_sub_items() {
        let items = vec![
            json!({ "title": "Home", "col": 1 }),
            json!({ "title": "Academics", "col": 2, "subItems": "oops" }),
            json!({ "title": "About", "col": 3, "subItems": [{ "title": "History" }] }),
        ];

        let normalized = validate_items(ItemSchema::Menu, &items).unwrap();

        assert_eq!(normalized[0]["subItems"], json!([]));
        assert_eq!(normalized[1]["subItems"], json!([]));
        assert_eq!(normalized[2]["subItems"], json!([{ "title": "History" }]));
    }

    #[test]
    fn test_reports_index_and_all_missing_fields() {
        let items = vec![
            json!({ "title": "A", "subtitle": "a", "ctaText": "Go", "ctaLink": "/a" }),
            json!({ "title": "B", "subtitle": "b", "ctaText": "Go", "ctaLink": "/b" }),
            json!({ "title": "C", "ctaText": "  " }),
        ];

        let err = validate_items(ItemSchema::HeroSlide, &items).unwrap_err();
        match err {
            AppError::ValidationFailed { index, fields } => {
                assert_eq!(index, 2);
                assert_eq!(fields, vec!["subtitle", "ctaText", "ctaLink"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_required_fields_per_schema() {
        assert_eq!(required_fields(ItemSchema::Headline), &["text", "type", "priority"]);
        assert_eq!(
            required_fields(ItemSchema::Faculty),
            &["name", "shortName", "description"]
        );
        assert_eq!(required_fields(ItemSchema::Welcome), &["title", "buttonText"]);
        assert_eq!(required_fields(ItemSchema::Entity(EntityKind::Teachers)), &["name"]);
        assert_eq!(required_fields(ItemSchema::Entity(EntityKind::News)), &["title"]);
        assert!(required_fields(ItemSchema::Free).is_empty());
    }

    #[test]
    fn test_zero_and_false_are_present() {
        let items = vec![json!({ "text": "Admission open", "type": "info", "priority": 0 })];
        assert!(validate_items(ItemSchema::Headline, &items).is_ok());
    }

    #[test]
    fn test_non_object_item_rejected() {
        let items = vec![json!({ "caption": "ok" }), json!("text")];
        let err = validate_items(ItemSchema::Free, &items).unwrap_err();
        assert!(matches!(err, AppError::ValidationFailed { index: 1, ref fields } if fields == &["item"]));
    }
}
