//! Database configuration
//!
//! Supports in-memory, embedded SurrealKV and remote SurrealDB connections.
//! Connection type is inferred from which fields are set.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Scheme used for throwaway in-memory databases
pub const MEMORY_URL: &str = "mem://";

/// Database configuration
///
/// Connection type is inferred:
/// - If `url` is `mem://` → in-memory database
/// - If `url` is set otherwise → remote connection
/// - If `path` is set (no `url`) → embedded SurrealKV
/// - If neither → use default embedded path
/// - If both → error (ambiguous)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path for embedded SurrealKV database
    pub path: Option<PathBuf>,

    /// URL for remote SurrealDB connection (e.g., "wss://cloud.surrealdb.com")
    pub url: Option<String>,

    /// Namespace (defaults to "questlog")
    pub namespace: Option<String>,

    /// Username for remote connection
    pub username: Option<String>,

    /// Password for remote connection
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Create config for embedded database at the given path
    pub fn embedded(path: PathBuf) -> Self {
        Self {
            path: Some(path),
            ..Default::default()
        }
    }

    /// Create config for an in-memory database, used by tests and demos
    pub fn memory() -> Self {
        Self {
            url: Some(MEMORY_URL.to_string()),
            ..Default::default()
        }
    }

    /// Create config for remote database
    pub fn remote(url: String, username: String, password: String) -> Self {
        Self {
            url: Some(url),
            username: Some(username),
            password: Some(password),
            ..Default::default()
        }
    }

    /// Check if this config is for an in-memory database
    pub fn is_memory(&self) -> bool {
        self.url.as_deref() == Some(MEMORY_URL)
    }

    /// Check if this config is for a remote connection
    pub fn is_remote(&self) -> bool {
        self.url.is_some() && !self.is_memory()
    }

    /// Get the namespace (defaults to "questlog")
    pub fn namespace(&self) -> &str {
        self.namespace.as_deref().unwrap_or("questlog")
    }
}
