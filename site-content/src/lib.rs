//! Site content library
//!
//! Multi-tenant content resolution for university sites: one codebase and
//! one database serve many sites, each of which may hold a block in the
//! legacy settings document, the component store, or a dedicated table.
//! The binary wraps the migration and debugging commands.

pub mod app;
pub mod commands;
pub mod config;
pub mod content;
pub mod context;
pub mod database;
pub mod error;
pub mod services;
