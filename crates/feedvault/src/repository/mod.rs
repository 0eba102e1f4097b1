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

//! The package repository service.
//!
//! [`PackageRepository`] owns the data access layer, the current policy, the
//! framework compatibility relation and the payload cache. Every mutation
//! runs as one immediate transaction that writes both the metadata row and
//! the payload row and then re-resolves the latest-version flags for the
//! package id, so callers never observe a half-applied change.
//!
//! # Example
//!
//! ```rust,ignore
//! use feedvault::{PackageRepository, RepositoryConfig, PackageMetadata, PackageVersion};
//!
//! let repository = PackageRepository::open(&RepositoryConfig::default()).await?;
//! let version: PackageVersion = "1.0.0".parse()?;
//! let record = repository
//!     .add("Foo", &version, PackageMetadata::default(), bytes)
//!     .await?;
//! assert!(record.is_latest_version);
//! ```

pub mod latest;
pub mod payload_cache;
pub mod search;
pub mod updates;

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::compatibility::ClientCompatibility;
use crate::config::{RepositoryConfig, RepositoryPolicy};
use crate::dal::models::{PackageDataRow, PackageRow};
use crate::dal::package_data::{self, UnpairedKey};
use crate::dal::packages::{self, PackageFilter};
use crate::dal::DAL;
use crate::database::{Database, Timestamp};
use crate::error::{RepositoryError, StorageError};
use crate::framework::{FrameworkCompatibility, FrameworkNameCompatibility};
use crate::models::package::{Package, PackageMetadata};
use crate::version::PackageVersion;

pub use latest::{resolve_latest, LatestAssignment, LatestCandidate};
pub use payload_cache::PayloadCache;
pub use search::{SearchFilter, SearchQuery};
pub use updates::{select_updates, InstalledPackage, UpdateQuery};

/// Name reported by [`PackageRepository::source`].
pub const SOURCE_NAME: &str = "Database Server";

/// What a successful `remove` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// No package with that id and version exists
    NotFound,
    /// The package was marked unlisted and kept
    Unlisted,
    /// The package and its payload were deleted
    Deleted,
}

/// Package store backed by SQLite.
///
/// Clones share the pool, the policy and the payload cache.
#[derive(Clone, Debug)]
pub struct PackageRepository {
    dal: DAL,
    policy: Arc<RwLock<RepositoryPolicy>>,
    frameworks: Arc<dyn FrameworkCompatibility>,
    payload_cache: PayloadCache,
}

impl PackageRepository {
    /// Opens the database described by `config` and ensures the schema exists.
    pub async fn open(config: &RepositoryConfig) -> Result<Self, RepositoryError> {
        let database = Database::new(
            config.database_url(),
            config.db_pool_size(),
            config.operation_timeout(),
        )?;
        database.run_migrations().await?;

        info!(
            url = %database.url(),
            policy = ?config.policy(),
            "Package repository opened"
        );

        Ok(Self::new(
            database,
            config.policy(),
            config.payload_cache_capacity(),
        ))
    }

    /// Wraps an already migrated database.
    pub fn new(database: Database, policy: RepositoryPolicy, payload_cache_capacity: usize) -> Self {
        Self {
            dal: DAL::new(database),
            policy: Arc::new(RwLock::new(policy)),
            frameworks: Arc::new(FrameworkNameCompatibility),
            payload_cache: PayloadCache::new(payload_cache_capacity),
        }
    }

    /// Replaces the framework compatibility relation used by search and
    /// update checks.
    pub fn with_framework_compatibility(mut self, frameworks: Arc<dyn FrameworkCompatibility>) -> Self {
        self.frameworks = frameworks;
        self
    }

    pub fn dal(&self) -> &DAL {
        &self.dal
    }

    // ------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------

    /// Snapshot of the current policy.
    pub fn policy(&self) -> RepositoryPolicy {
        *self.policy.read()
    }

    /// Replaces the policy; the next operation sees the new values.
    pub fn set_policy(&self, policy: RepositoryPolicy) {
        *self.policy.write() = policy;
        info!(policy = ?policy, "Repository policy updated");
    }

    pub fn update_policy<F>(&self, f: F) -> RepositoryPolicy
    where
        F: FnOnce(&mut RepositoryPolicy),
    {
        let mut guard = self.policy.write();
        f(&mut guard);
        let policy = *guard;
        drop(guard);
        info!(policy = ?policy, "Repository policy updated");
        policy
    }

    // ------------------------------------------------------------------
    // Feed description
    // ------------------------------------------------------------------

    pub fn source(&self) -> &'static str {
        SOURCE_NAME
    }

    pub fn supports_prerelease_packages(&self) -> bool {
        true
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub async fn exists(&self, id: &str, version: &PackageVersion) -> Result<bool, RepositoryError> {
        self.dal.packages().exists(id, version).await
    }

    /// Exact-key lookup.
    ///
    /// This does not apply version-scheme visibility: a caller that knows the
    /// exact id and version gets the record whatever its scheme. Use
    /// [`find_compatible`](Self::find_compatible) to honour a client's
    /// compatibility.
    pub async fn find(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Package>, RepositoryError> {
        self.dal.packages().get(id, version).await
    }

    /// Exact-key lookup that hides records the client cannot understand.
    pub async fn find_compatible(
        &self,
        id: &str,
        version: &PackageVersion,
        compatibility: ClientCompatibility,
    ) -> Result<Option<Package>, RepositoryError> {
        Ok(self
            .find(id, version)
            .await?
            .filter(|p| compatibility.can_see(p.is_semver2())))
    }

    /// Every version of `id` visible to `compatibility`, listed or not.
    pub async fn find_all_by_id(
        &self,
        id: &str,
        compatibility: ClientCompatibility,
    ) -> Result<Vec<Package>, RepositoryError> {
        self.dal
            .packages()
            .list(PackageFilter::visible_to(compatibility).with_package_id(id))
            .await
    }

    /// Every record visible to `compatibility`.
    pub async fn get_packages(
        &self,
        compatibility: ClientCompatibility,
    ) -> Result<Vec<Package>, RepositoryError> {
        self.dal
            .packages()
            .list(PackageFilter::visible_to(compatibility))
            .await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<Package>, RepositoryError> {
        let policy = self.policy();
        let filter = SearchFilter::new(query, policy, self.frameworks.as_ref());
        let candidates = self.dal.packages().list(filter.package_filter()).await?;
        let total = candidates.len();
        let results = filter.apply(candidates);

        debug!(
            term = %query.term,
            allow_prerelease = query.allow_prerelease,
            candidates = total,
            results = results.len(),
            "Search completed"
        );
        Ok(results)
    }

    /// Newer versions of the installed packages.
    pub async fn get_updates(&self, query: &UpdateQuery) -> Result<Vec<Package>, RepositoryError> {
        let filters: Vec<PackageFilter> = query
            .package_ids()
            .into_iter()
            .map(|id| PackageFilter {
                package_id: Some(id),
                include_prerelease: query.include_prerelease,
                listed_only: true,
                compatibility: query.compatibility,
            })
            .collect();

        let candidates = self
            .dal
            .read("get_updates", move |conn| {
                let mut rows = Vec::new();
                for filter in &filters {
                    rows.extend(packages::load_rows(conn, filter)?);
                }
                packages::rows_into_packages(rows)
            })
            .await?;

        Ok(select_updates(query, &candidates, self.frameworks.as_ref()))
    }

    // ------------------------------------------------------------------
    // Payloads
    // ------------------------------------------------------------------

    /// Payload bytes for a package, served from the cache when possible.
    pub async fn get_payload(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Arc<[u8]>>, RepositoryError> {
        let key = (id.to_string(), version.normalized());
        if let Some(payload) = self.payload_cache.get(&key) {
            return Ok(Some(payload));
        }

        let generation = self.payload_cache.generation();
        let payload = self
            .dal
            .package_data()
            .retrieve(id, version)
            .await?
            .map(Arc::<[u8]>::from);
        if let Some(payload) = &payload {
            self.payload_cache
                .insert_if_current(key, Arc::clone(payload), generation);
        }
        Ok(payload)
    }

    /// Drops every cached payload. Stored packages are unaffected.
    pub fn clear_payload_cache(&self) {
        let purged = self.payload_cache.clear();
        info!(purged = purged, "Payload cache cleared");
    }

    pub fn payload_cache(&self) -> &PayloadCache {
        &self.payload_cache
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Stores a package and its payload.
    ///
    /// Fails with [`RepositoryError::SymbolsPackageRejected`] when symbols
    /// packages are ignored and `metadata` describes one, and with
    /// [`RepositoryError::DuplicatePackage`] when the version exists and
    /// overriding is disabled. With overriding enabled an existing version is
    /// replaced. Returns the stored record with its latest flags resolved.
    pub async fn add(
        &self,
        id: &str,
        version: &PackageVersion,
        metadata: PackageMetadata,
        payload: Vec<u8>,
    ) -> Result<Package, RepositoryError> {
        let policy = self.policy();
        info!(package_id = id, version = %version, size = payload.len(), "Start adding package");

        if policy.ignore_symbols_packages && metadata.is_symbols_package() {
            error!(
                package_id = id,
                version = %version,
                "Rejected symbols package because symbols packages are ignored"
            );
            return Err(RepositoryError::SymbolsPackageRejected {
                id: id.to_string(),
                version: version.to_string(),
            });
        }

        metadata.validate(version)?;

        let package = Package::from_upload(id, version, metadata, &payload, Timestamp::now());
        let package_row = PackageRow::from_package(&package)?;
        let data_row = PackageDataRow::for_package(&package, payload);

        let package_id = id.to_string();
        let version = version.clone();
        let allow_override = policy.allow_override_existing_package_on_push;

        let result = self
            .dal
            .write("add_package", move |conn| {
                if packages::exists(conn, &package_id, &version)? {
                    if !allow_override {
                        return Err(RepositoryError::DuplicatePackage {
                            id: package_id.clone(),
                            version: version.to_string(),
                        });
                    }
                    package_data::delete(conn, &package_id, &version)?;
                    packages::delete(conn, &package_id, &version)?;
                    debug!(package_id = %package_id, version = %version, "Replacing existing package");
                }

                packages::insert(conn, &package_row)?;
                package_data::insert(conn, &data_row)?;
                latest::update_latest_versions(conn, &package_id)?;

                match packages::find_row(conn, &package_id, &version)? {
                    Some(row) => Ok(row.into_package()?),
                    None => Err(StorageError::CorruptRecord {
                        reason: format!("package {} {} missing after insert", package_id, version),
                    }
                    .into()),
                }
            })
            .await;

        match result {
            Ok(stored) => {
                self.payload_cache
                    .invalidate(&(stored.id.clone(), stored.version.normalized()));
                info!(
                    package_id = %stored.id,
                    version = %stored.version,
                    is_latest = stored.is_latest_version,
                    is_absolute_latest = stored.is_absolute_latest_version,
                    "Finished adding package"
                );
                Ok(stored)
            }
            Err(e) => {
                error!(package_id = id, version = %package.version, error = %e, "Failed to add package");
                Err(e)
            }
        }
    }

    /// Removes a package version.
    ///
    /// With delisting enabled the record is marked unlisted and kept; it stays
    /// reachable through [`find`](Self::find). Otherwise the record and its
    /// payload are deleted. Removing an unknown version is not an error.
    pub async fn remove(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<RemoveOutcome, RepositoryError> {
        let policy = self.policy();
        let package_id = id.to_string();
        let key_version = version.clone();
        let delist = policy.enable_delisting;

        let outcome = self
            .dal
            .write("remove_package", move |conn| {
                if !packages::exists(conn, &package_id, &key_version)? {
                    return Ok(RemoveOutcome::NotFound);
                }

                let outcome = if delist {
                    packages::set_listed(conn, &package_id, &key_version, false, Timestamp::now())?;
                    RemoveOutcome::Unlisted
                } else {
                    package_data::delete(conn, &package_id, &key_version)?;
                    packages::delete(conn, &package_id, &key_version)?;
                    RemoveOutcome::Deleted
                };

                latest::update_latest_versions(conn, &package_id)?;
                Ok(outcome)
            })
            .await?;

        match outcome {
            RemoveOutcome::NotFound => {
                debug!(package_id = id, version = %version, "Remove requested for unknown package");
            }
            RemoveOutcome::Unlisted => {
                info!(package_id = id, version = %version, "Unlisted package");
            }
            RemoveOutcome::Deleted => {
                self.payload_cache
                    .invalidate(&(id.to_string(), version.normalized()));
                info!(package_id = id, version = %version, "Deleted package");
            }
        }

        Ok(outcome)
    }

    /// Re-resolves the latest-version flags for `id` in its own transaction.
    pub async fn update_latest_versions(&self, id: &str) -> Result<LatestAssignment, RepositoryError> {
        info!(package_id = id, "Updating latest packages");
        let package_id = id.to_string();
        self.dal
            .write("update_latest_versions", move |conn| {
                latest::update_latest_versions(conn, &package_id)
            })
            .await
    }

    /// Metadata rows without payloads and payloads without metadata.
    pub async fn unpaired_keys(&self) -> Result<Vec<UnpairedKey>, RepositoryError> {
        self.dal.package_data().unpaired_keys().await
    }
}
