//! Content blocks
//!
//! - `registry`: block name → component type / dedicated table / schema
//! - `validation`: per-type required fields and defaults
//! - `block`: decoded block values

pub mod block;
pub mod registry;
pub mod validation;

pub use block::{is_blank, ContentBlock, ShapeMismatch};
pub use registry::{lookup, BlockShape, BlockSpec, ContentType, ItemSchema};
pub use validation::validate_items;
