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

//! # feedvault
//!
//! Storage and query core for a package feed server: versioned packages with
//! their metadata and payloads, kept in SQLite.
//!
//! - [`version`]: package versions, their ordering and version ranges
//! - [`models`]: the package record and upload metadata
//! - [`repository`]: the [`PackageRepository`] service with add, remove,
//!   lookup, search and update discovery
//! - [`dal`] and [`database`]: persistence
//! - [`config`]: repository policy and connection settings
//!
//! ```rust,ignore
//! use feedvault::{PackageRepository, RepositoryConfig, SearchQuery};
//!
//! feedvault::init_logging(None);
//! let repository = PackageRepository::open(&RepositoryConfig::from_env()).await?;
//! let results = repository.search(&SearchQuery::new("json")).await?;
//! ```

pub mod compatibility;
pub mod config;
pub mod dal;
pub mod database;
pub mod error;
pub mod framework;
pub mod models;
pub mod repository;
pub mod version;

pub use compatibility::ClientCompatibility;
pub use config::{RepositoryConfig, RepositoryConfigBuilder, RepositoryPolicy};
pub use database::{Database, Timestamp};
pub use error::{RepositoryError, StorageError, VersionError};
pub use framework::{FrameworkCompatibility, FrameworkName, FrameworkNameCompatibility};
pub use models::{Dependency, DependencySet, Package, PackageIdentity, PackageMetadata};
pub use repository::{
    InstalledPackage, LatestAssignment, PackageRepository, RemoveOutcome, SearchQuery, UpdateQuery,
};
pub use version::{PackageVersion, VersionRange, VersionScheme};

use tracing_subscriber::EnvFilter;

/// Installs a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `level` (or `info`) applies. Does
/// nothing if a global subscriber is already installed.
pub fn init_logging(level: Option<tracing::Level>) {
    let default_level = level.unwrap_or(tracing::Level::INFO);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string().to_lowercase()));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
