//! Decoded content blocks
//!
//! Values read from any store are decoded against the block's registered
//! shape before they leave the resolver, so callers never see a list where
//! an object belongs.

use super::registry::{BlockShape, BlockSpec};
use super::validation::normalize_item;
use serde_json::{Map, Value};
use thiserror::Error;

/// A block value in its registered shape
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Items(Vec<Value>),
    Document(Map<String, Value>),
}

#[derive(Debug, Error, PartialEq)]
#[error("block {block} expected {expected:?}, found {found}")]
pub struct ShapeMismatch {
    pub block: &'static str,
    pub expected: BlockShape,
    pub found: &'static str,
}

impl ContentBlock {
    /// Decode a raw value, applying item defaults for list blocks
    pub fn decode(spec: &BlockSpec, value: Value) -> Result<Self, ShapeMismatch> {
        match (spec.shape, value) {
            (BlockShape::List, Value::Array(items)) => Ok(ContentBlock::Items(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut object) => {
                            normalize_item(spec.schema, &mut object);
                            Value::Object(object)
                        }
                        other => other,
                    })
                    .collect(),
            )),
            (BlockShape::Object, Value::Object(document)) => Ok(ContentBlock::Document(document)),
            (expected, other) => Err(ShapeMismatch {
                block: spec.name,
                expected,
                found: kind_name(&other),
            }),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ContentBlock::Items(items) => items.len(),
            ContentBlock::Document(document) => document.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_value(self) -> Value {
        match self {
            ContentBlock::Items(items) => Value::Array(items),
            ContentBlock::Document(document) => Value::Object(document),
        }
    }
}

/// Null, blank strings, and empty arrays or objects count as "no data"
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
