//! Database module
//!
//! SQLite pool, error types and schema migrations.

pub mod connection;
pub mod migrations;

pub use connection::{Database, DbError, DbResult};
pub use migrations::{get_schema_version, needs_migration, run_migrations};
