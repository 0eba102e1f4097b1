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

//! Error types for the package repository.
//!
//! Errors are split by layer: [`VersionError`] never leaves the version model,
//! [`StorageError`] describes failures of the durable store, and
//! [`RepositoryError`] is what callers of the repository service see.

use std::time::Duration;
use thiserror::Error;

/// Errors raised while parsing version identifiers or version ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    /// The text is not a version this feed accepts
    #[error("Invalid version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    /// The text is not a valid version range
    #[error("Invalid version range '{input}': {reason}")]
    InvalidVersionRange { input: String, reason: String },
}

/// Failures of the durable store.
///
/// Any of these means the operation was not applied.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Connection pool could not hand out a connection
    #[error("Connection pool error: {0}")]
    Pool(String),

    /// The blocking database task failed or was aborted
    #[error("Database task failed: {0}")]
    Interact(String),

    /// The database rejected a statement or the transaction aborted
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Schema migrations could not be applied
    #[error("Migration error: {0}")]
    Migration(String),

    /// The operation exceeded its configured timeout and was rolled back
    #[error("Operation '{operation}' timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    /// A JSON-encoded column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A value is longer than its column allows
    #[error("Value for column '{column}' is {actual} characters long (max {max})")]
    ColumnLimit {
        column: &'static str,
        max: usize,
        actual: usize,
    },

    /// A stored row could not be mapped back to a package record
    #[error("Corrupt package record: {reason}")]
    CorruptRecord { reason: String },
}

/// Errors reported by the repository service.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Malformed version text
    #[error(transparent)]
    InvalidVersion(#[from] VersionError),

    /// The package already exists and overriding on push is disabled
    #[error("Package {id} {version} already exists and overwriting existing packages is disabled")]
    DuplicatePackage { id: String, version: String },

    /// Symbols packages are ignored by this feed
    #[error("Package {id} {version} is a symbols package and symbols packages are ignored by this feed")]
    SymbolsPackageRejected { id: String, version: String },

    /// The durable store failed; nothing was applied
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),
}

impl From<diesel::result::Error> for RepositoryError {
    fn from(err: diesel::result::Error) -> Self {
        RepositoryError::Storage(StorageError::Database(err))
    }
}

impl RepositoryError {
    /// Returns true for rejections a caller may resolve by changing its request.
    pub fn is_policy_rejection(&self) -> bool {
        matches!(
            self,
            RepositoryError::DuplicatePackage { .. } | RepositoryError::SymbolsPackageRejected { .. }
        )
    }
}
