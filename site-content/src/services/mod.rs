//! Services module
//!
//! Business logic that coordinates the three content stores:
//! - `resolver`: read path with source fallback
//! - `replace_set`: save path for admin sections
//! - `migration`: legacy settings → component records

pub mod migration;
pub mod replace_set;
pub mod resolver;

pub use migration::{BulkMigrationReport, MigrationEngine, TenantMigrationReport};
pub use replace_set::{
    plan_replace, ReplaceItem, ReplaceOutcome, ReplacePlan, ReplaceSetWriter, WriteTarget,
};
pub use resolver::{ContentResolver, ContentSource, Resolved};
