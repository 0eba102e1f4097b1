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

//! Data access layer for the package store.
//!
//! All statements run on the pool's blocking thread through `interact`. Reads
//! run in a deferred transaction so that a multi-statement read sees one
//! snapshot. Writes run in an immediate transaction, which takes SQLite's
//! write lock up front and serializes every mutation against the store.
//!
//! A write closure receives the raw connection and may call any of the
//! synchronous helpers in [`packages`] and [`package_data`]; the whole closure
//! commits or rolls back as one unit.

pub mod models;
pub mod package_data;
pub mod packages;

use diesel::connection::Connection;
use diesel::sqlite::SqliteConnection;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::database::Database;
use crate::error::{RepositoryError, StorageError};

pub use package_data::PackageDataDAL;
pub use packages::{PackageFilter, PackagesDAL};

/// Entry point to the data access layer.
#[derive(Clone, Debug)]
pub struct DAL {
    pub database: Database,
}

impl DAL {
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    pub fn packages(&self) -> PackagesDAL<'_> {
        PackagesDAL { dal: self }
    }

    pub fn package_data(&self) -> PackageDataDAL<'_> {
        PackageDataDAL { dal: self }
    }

    /// Runs `f` in a read transaction.
    pub(crate) async fn read<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, RepositoryError> + Send + 'static,
        T: Send + 'static,
    {
        let deadline = Deadline::start(operation, self.database.operation_timeout());
        let conn = self.database.get_connection().await?;
        conn.interact(move |conn| {
            conn.transaction::<T, RepositoryError, _>(|conn| {
                let value = f(conn)?;
                deadline.check()?;
                Ok(value)
            })
        })
        .await
        .map_err(|e| StorageError::Interact(e.to_string()))?
    }

    /// Runs `f` in an immediate (write-locking) transaction.
    ///
    /// If the operation timeout elapses before `f` finishes, the transaction
    /// is rolled back and [`StorageError::Timeout`] is returned.
    pub(crate) async fn write<T, F>(&self, operation: &'static str, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&mut SqliteConnection) -> Result<T, RepositoryError> + Send + 'static,
        T: Send + 'static,
    {
        let deadline = Deadline::start(operation, self.database.operation_timeout());
        let conn = self.database.get_connection().await?;
        conn.interact(move |conn| {
            conn.immediate_transaction::<T, RepositoryError, _>(|conn| {
                let value = f(conn)?;
                deadline.check()?;
                Ok(value)
            })
        })
        .await
        .map_err(|e| StorageError::Interact(e.to_string()))?
    }
}

/// Operation timeout measured from the moment a call enters the DAL.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Deadline {
    operation: &'static str,
    timeout: Option<Duration>,
    started: Instant,
}

impl Deadline {
    pub(crate) fn start(operation: &'static str, timeout: Option<Duration>) -> Self {
        Self {
            operation,
            timeout,
            started: Instant::now(),
        }
    }

    /// Fails once the timeout has elapsed.
    pub(crate) fn check(&self) -> Result<(), StorageError> {
        match self.timeout {
            Some(timeout) if self.started.elapsed() > timeout => {
                warn!(
                    operation = self.operation,
                    timeout_ms = timeout.as_millis() as u64,
                    "Operation exceeded its timeout, rolling back"
                );
                Err(StorageError::Timeout {
                    operation: self.operation,
                    timeout,
                })
            }
            _ => Ok(()),
        }
    }
}
