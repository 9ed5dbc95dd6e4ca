//! Database connection management
//!
//! Uses SurrealDB's `Surreal<Any>` for runtime connection type selection.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;
use surrealdb::sql::Thing;
use surrealdb::Surreal;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::migrations;

/// How often a read-modify-write is retried after losing a revision race
pub const MAX_WRITE_ATTEMPTS: usize = 5;

/// Database connection wrapper
///
/// Wraps a `Surreal<Any>` connection that can be in-memory, embedded or remote.
#[derive(Clone)]
pub struct Database {
    client: Surreal<Any>,
    database_name: String,
}

impl Database {
    /// Connect to the database and run migrations
    ///
    /// # Arguments
    /// * `config` - Database configuration
    /// * `database_name` - The database name to use (e.g., "questlog")
    /// * `default_path` - Default path for embedded database if not specified in config
    pub async fn connect(
        config: &DatabaseConfig,
        database_name: &str,
        default_path: Option<PathBuf>,
    ) -> Result<Self> {
        if config.url.is_some() && config.path.is_some() {
            bail!("Database config has both 'url' and 'path' set - this is ambiguous");
        }

        let client = if config.is_memory() {
            info!("Opening in-memory database");
            surrealdb::engine::any::connect(crate::config::MEMORY_URL)
                .await
                .context("Failed to open in-memory database")?
        } else if let Some(url) = &config.url {
            info!("Connecting to remote database: {}", url);
            let db = surrealdb::engine::any::connect(url.as_str())
                .await
                .context("Failed to connect to remote database")?;

            let username = config
                .username
                .as_deref()
                .context("Remote database requires 'username'")?;
            let password = config
                .password
                .as_deref()
                .context("Remote database requires 'password'")?;

            db.signin(Root { username, password })
                .await
                .context("Failed to authenticate with remote database")?;

            db
        } else {
            let path = config
                .path
                .clone()
                .or(default_path)
                .context("No database path specified and no default provided")?;

            info!("Opening embedded database at: {}", path.display());

            let connection_string = format!("surrealkv://{}", path.display());
            surrealdb::engine::any::connect(connection_string)
                .await
                .context("Failed to open embedded database")?
        };

        let namespace = config.namespace();
        client
            .use_ns(namespace)
            .use_db(database_name)
            .await
            .context("Failed to select namespace/database")?;

        info!("Connected to database: {}/{}", namespace, database_name);

        let db = Self {
            client,
            database_name: database_name.to_string(),
        };

        db.run_migrations().await?;

        Ok(db)
    }

    /// Open a fresh in-memory database with migrations applied
    pub async fn memory(database_name: &str) -> Result<Self> {
        Self::connect(&DatabaseConfig::memory(), database_name, None).await
    }

    /// Get a reference to the SurrealDB client
    pub fn client(&self) -> &Surreal<Any> {
        &self.client
    }

    /// Get the database name
    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    /// Replace a record's content if its `revision` field still equals
    /// `expected`
    ///
    /// The caller bumps the revision inside `content`. Returns `None` when the
    /// record is gone or another writer replaced it first.
    pub async fn replace_if_revision<T>(
        &self,
        id: Thing,
        content: T,
        expected: u64,
    ) -> Result<Option<T>>
    where
        T: Serialize + DeserializeOwned + 'static,
    {
        let mut response = self
            .client
            .query("UPDATE $id CONTENT $content WHERE revision = $expected RETURN AFTER")
            .bind(("id", id))
            .bind(("content", content))
            .bind(("expected", expected))
            .await
            .context("Failed to update record")?;

        let updated: Vec<T> = response.take(0).context("Failed to parse updated record")?;
        Ok(updated.into_iter().next())
    }

    /// Run pending migrations for this database
    async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.client, &self.database_name).await
    }
}
