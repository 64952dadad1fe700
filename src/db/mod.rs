//! Database module for SQLite operations.
//!
//! This module provides:
//! - Database initialization and schema versioning
//! - SQLite pragma configuration
//! - Repository layer for database operations

pub mod migrations;
pub mod repo;

pub use migrations::{init_db, SCHEMA_VERSION};
pub use repo::{Analytics, Committed, Repository};
