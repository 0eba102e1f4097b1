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

//! Queries over the `packages` table.
//!
//! The free functions take a connection and are meant to be composed inside a
//! single [`DAL::write`](super::DAL) or [`DAL::read`](super::DAL) transaction.
//! [`PackagesDAL`] wraps the read-only ones for callers that need a single
//! query.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use super::models::{LatestFlagsRow, PackageRow};
use super::DAL;
use crate::compatibility::ClientCompatibility;
use crate::database::schema::packages;
use crate::database::Timestamp;
use crate::error::RepositoryError;
use crate::models::package::Package;
use crate::version::PackageVersion;

/// Row-level predicates pushed down into SQL.
#[derive(Debug, Clone)]
pub struct PackageFilter {
    /// Restrict to one package id
    pub package_id: Option<String>,
    pub include_prerelease: bool,
    /// Drop unlisted rows
    pub listed_only: bool,
    pub compatibility: ClientCompatibility,
}

impl PackageFilter {
    /// Every row the given client may see.
    pub fn visible_to(compatibility: ClientCompatibility) -> Self {
        Self {
            package_id: None,
            include_prerelease: true,
            listed_only: false,
            compatibility,
        }
    }

    pub fn with_package_id(mut self, id: impl Into<String>) -> Self {
        self.package_id = Some(id.into());
        self
    }
}

// ============================================================================
// Connection-level operations
// ============================================================================

pub(crate) fn find_row(
    conn: &mut SqliteConnection,
    id: &str,
    version: &PackageVersion,
) -> QueryResult<Option<PackageRow>> {
    packages::table
        .filter(packages::package_id.eq(id))
        .filter(packages::version_key.eq(version.normalized()))
        .select(PackageRow::as_select())
        .first(conn)
        .optional()
}

pub(crate) fn exists(
    conn: &mut SqliteConnection,
    id: &str,
    version: &PackageVersion,
) -> QueryResult<bool> {
    diesel::select(diesel::dsl::exists(
        packages::table
            .filter(packages::package_id.eq(id))
            .filter(packages::version_key.eq(version.normalized())),
    ))
    .get_result(conn)
}

pub(crate) fn load_rows(
    conn: &mut SqliteConnection,
    filter: &PackageFilter,
) -> QueryResult<Vec<PackageRow>> {
    let mut query = packages::table.select(PackageRow::as_select()).into_boxed();

    if let Some(id) = &filter.package_id {
        query = query.filter(packages::package_id.eq(id.clone()));
    }
    if !filter.include_prerelease {
        query = query.filter(packages::is_prerelease.eq(false));
    }
    if filter.listed_only {
        query = query.filter(packages::listed.eq(true));
    }
    if !filter.compatibility.allow_semver2() {
        query = query.filter(packages::is_semver2.eq(false));
    }

    query
        .order((packages::package_id.asc(), packages::created.asc()))
        .load(conn)
}

pub(crate) fn insert(conn: &mut SqliteConnection, row: &PackageRow) -> QueryResult<usize> {
    diesel::insert_into(packages::table).values(row).execute(conn)
}

pub(crate) fn delete(
    conn: &mut SqliteConnection,
    id: &str,
    version: &PackageVersion,
) -> QueryResult<usize> {
    diesel::delete(
        packages::table
            .filter(packages::package_id.eq(id))
            .filter(packages::version_key.eq(version.normalized())),
    )
    .execute(conn)
}

pub(crate) fn set_listed(
    conn: &mut SqliteConnection,
    id: &str,
    version: &PackageVersion,
    listed: bool,
    now: Timestamp,
) -> QueryResult<usize> {
    diesel::update(
        packages::table
            .filter(packages::package_id.eq(id))
            .filter(packages::version_key.eq(version.normalized())),
    )
    .set((
        packages::listed.eq(listed),
        packages::last_updated.eq(now.to_column()),
    ))
    .execute(conn)
}

/// Version columns and current flags of the rows for `id` that `compatibility`
/// can see. Listing state is ignored.
pub(crate) fn load_latest_flags(
    conn: &mut SqliteConnection,
    id: &str,
    compatibility: ClientCompatibility,
) -> QueryResult<Vec<LatestFlagsRow>> {
    let mut query = packages::table
        .filter(packages::package_id.eq(id.to_string()))
        .select(LatestFlagsRow::as_select())
        .into_boxed();
    if !compatibility.allow_semver2() {
        query = query.filter(packages::is_semver2.eq(false));
    }
    query.load(conn)
}

pub(crate) fn set_latest_flags(
    conn: &mut SqliteConnection,
    id: &str,
    version_key: &str,
    is_latest: bool,
    is_absolute_latest: bool,
) -> QueryResult<usize> {
    diesel::update(
        packages::table
            .filter(packages::package_id.eq(id))
            .filter(packages::version_key.eq(version_key)),
    )
    .set((
        packages::is_latest_version.eq(is_latest),
        packages::is_absolute_latest_version.eq(is_absolute_latest),
    ))
    .execute(conn)
}

pub(crate) fn rows_into_packages(rows: Vec<PackageRow>) -> Result<Vec<Package>, RepositoryError> {
    rows.into_iter()
        .map(|row| row.into_package().map_err(RepositoryError::from))
        .collect()
}

// ============================================================================
// Single-query wrappers
// ============================================================================

/// Read access to package metadata.
#[derive(Clone)]
pub struct PackagesDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> PackagesDAL<'a> {
    pub async fn exists(&self, id: &str, version: &PackageVersion) -> Result<bool, RepositoryError> {
        let id = id.to_string();
        let version = version.clone();
        self.dal
            .read("exists", move |conn| Ok(exists(conn, &id, &version)?))
            .await
    }

    /// Exact-key lookup. Build metadata and label case are not part of the key.
    pub async fn get(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Package>, RepositoryError> {
        let id = id.to_string();
        let version = version.clone();
        self.dal
            .read("find", move |conn| {
                find_row(conn, &id, &version)?
                    .map(|row| row.into_package().map_err(RepositoryError::from))
                    .transpose()
            })
            .await
    }

    pub async fn list(&self, filter: PackageFilter) -> Result<Vec<Package>, RepositoryError> {
        self.dal
            .read("list_packages", move |conn| {
                rows_into_packages(load_rows(conn, &filter)?)
            })
            .await
    }

    pub async fn count(&self) -> Result<i64, RepositoryError> {
        self.dal
            .read("count_packages", |conn| {
                Ok(packages::table.count().get_result(conn)?)
            })
            .await
    }
}
