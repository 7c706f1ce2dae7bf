//! Application configuration constants
//!
//! Central location for connection settings, resource limits,
//! and validation boundaries used throughout the crate.

// ===== Database =====

/// Database file used when no path is given on the command line
pub const DEFAULT_DATABASE_FILE: &str = "site-content.sqlite";

/// Environment variable that overrides the database path
pub const DATABASE_ENV_VAR: &str = "SITE_CONTENT_DATABASE";

/// Maximum pooled connections for the application pool
pub const POOL_MAX_CONNECTIONS: u32 = 5;

/// Seconds a connection waits on a locked database before failing.
/// Covers a ReplaceSet transaction holding the write lock.
pub const BUSY_TIMEOUT_SECS: u64 = 5;

// ===== Migration =====

/// Number of sites migrated concurrently by a bulk run
pub const MIGRATION_CONCURRENCY: usize = 4;

/// Actor recorded in `created_by`/`updated_by` for migrated records
pub const MIGRATION_ACTOR: &str = "migration";

// ===== Content Limits =====

/// Maximum length of a generated or supplied entity slug
pub const MAX_SLUG_LENGTH: usize = 120;

/// Maximum number of items accepted in one ReplaceSet batch
pub const MAX_BATCH_ITEMS: usize = 500;
