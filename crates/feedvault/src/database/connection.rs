/*
 *  Copyright 2025 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Database connection management.
//!
//! Connections come from a `deadpool-diesel` pool. Diesel connections are
//! blocking, so every statement runs inside `interact`, which moves the
//! closure onto the pool's blocking thread and leaves the async caller free.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedvault::database::Database;
//!
//! let db = Database::new("sqlite:///var/lib/feedvault/feed.db", 1, None)?;
//! db.run_migrations().await?;
//! ```

use deadpool::managed::PoolError;
use deadpool_diesel::sqlite::{
    Manager as SqliteManager, Object as SqliteObject, Pool as SqlitePool, Runtime as SqliteRuntime,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::StorageError;

/// Schema migrations compiled into the binary.
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// How long SQLite waits on a locked database when no timeout is configured.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Connections held by the SQLite pool.
const SQLITE_POOL_SIZE: usize = 1;

/// Pool of connections to the package store.
///
/// `Database` is `Clone`; clones share the same pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    url: String,
    operation_timeout: Option<Duration>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("url", &self.url)
            .field("operation_timeout", &self.operation_timeout)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Creates a connection pool for a SQLite database.
    ///
    /// # Arguments
    ///
    /// * `connection_string` - File path, `sqlite://` URL, `file:` URI or `:memory:`
    /// * `max_size` - Requested pool size. SQLite pools hold one connection,
    ///   so writers queue on the pool and never hit `SQLITE_BUSY` in-process
    /// * `operation_timeout` - Upper bound for acquiring a connection and for
    ///   each transaction; `None` waits indefinitely
    pub fn new(
        connection_string: &str,
        max_size: u32,
        operation_timeout: Option<Duration>,
    ) -> Result<Self, StorageError> {
        let url = Self::build_sqlite_url(connection_string);
        let manager = SqliteManager::new(url.clone(), SqliteRuntime::Tokio1);
        // Pragmas are applied once in run_migrations and a `:memory:`
        // database lives on a single connection; both need one connection.
        let pool_size = SQLITE_POOL_SIZE;
        if max_size as usize > pool_size {
            warn!(
                requested = max_size,
                pool_size, "SQLite pool size clamped to a single connection"
            );
        }
        let pool = SqlitePool::builder(manager)
            .max_size(pool_size)
            .wait_timeout(operation_timeout)
            .runtime(SqliteRuntime::Tokio1)
            .build()
            .map_err(|e| StorageError::Pool(format!("Failed to create SQLite pool: {}", e)))?;

        info!(url = %url, pool_size, "SQLite connection pool initialized");

        Ok(Self {
            pool,
            url,
            operation_timeout,
        })
    }

    /// Strips a `sqlite://` prefix; everything else is passed to SQLite as is.
    fn build_sqlite_url(connection_string: &str) -> String {
        match connection_string.strip_prefix("sqlite://") {
            Some(path) => path.to_string(),
            None => connection_string.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    /// Maximum number of connections the pool hands out.
    pub fn pool_size(&self) -> usize {
        self.pool.status().max_size
    }

    /// Checks a connection out of the pool.
    pub async fn get_connection(&self) -> Result<SqliteObject, StorageError> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Timeout(_) => StorageError::Timeout {
                operation: "acquire_connection",
                timeout: self.operation_timeout.unwrap_or_default(),
            },
            other => StorageError::Pool(other.to_string()),
        })
    }

    /// Ensures the schema exists and applies connection pragmas.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        let conn = self.get_connection().await?;
        let busy_timeout = self
            .operation_timeout
            .unwrap_or(DEFAULT_BUSY_TIMEOUT)
            .as_millis();

        let applied = conn
            .interact(move |conn| -> Result<usize, StorageError> {
                use diesel::prelude::*;

                // WAL lets readers proceed while a writer holds the lock
                diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
                diesel::sql_query(format!("PRAGMA busy_timeout={};", busy_timeout))
                    .execute(conn)?;

                let applied = conn
                    .run_pending_migrations(SQLITE_MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(applied.len())
            })
            .await
            .map_err(|e| StorageError::Interact(e.to_string()))??;

        debug!(applied, "Package store migrations complete");
        Ok(())
    }
}
