//! Database connection and migration management for Questlog
//!
//! Provides a unified interface for connecting to SurrealDB, supporting
//! in-memory, embedded SurrealKV and remote WebSocket connections.

mod config;
mod connection;
mod migrations;

pub use config::DatabaseConfig;
pub use connection::{Database, MAX_WRITE_ATTEMPTS};
