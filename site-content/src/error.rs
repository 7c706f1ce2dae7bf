//! Error types for site content resolution and migration
//!
//! All errors use thiserror for structured error handling.
//! Errors serialize to their display string so admin surfaces can show them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Site not found: {0}")]
    TenantNotFound(String),

    #[error("Malformed legacy settings for site {tenant_id}: {reason}")]
    MalformedLegacyDocument { tenant_id: String, reason: String },

    #[error("Validation failed for item {index}: missing or invalid {}", fields.join(", "))]
    ValidationFailed { index: usize, fields: Vec<String> },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown content block: {0}")]
    UnknownBlock(String),

    #[error("{entity} not found: {id}")]
    RecordNotFound { entity: &'static str, id: String },

    #[error("Migration of block {block} failed for site {tenant_id}: {cause}")]
    MigrationBlockFailed {
        tenant_id: String,
        block: String,
        cause: String,
    },

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
