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

//! Row models and the projections between rows and domain records.
//!
//! Structured fields are flattened here and nowhere else: author and owner
//! lists become comma-joined text, dependency sets and framework lists become
//! JSON, URLs and timestamps become text. Reading reverses each projection and
//! reports anything that does not decode as a corrupt record.

use diesel::prelude::*;
use url::Url;

use crate::database::schema::{package_data, packages};
use crate::database::Timestamp;
use crate::error::StorageError;
use crate::models::package::{
    check_length, check_optional_length, Package, MAX_LANGUAGE_LENGTH,
    MAX_MIN_CLIENT_VERSION_LENGTH, MAX_TAGS_LENGTH, MAX_TITLE_LENGTH, MAX_VERSION_LENGTH,
};
use crate::version::PackageVersion;

// ============================================================================
// Package metadata rows
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageRow {
    pub package_id: String,
    pub version_key: String,
    pub version: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub release_notes: Option<String>,
    pub copyright: Option<String>,
    pub language: Option<String>,
    pub tags: Option<String>,
    pub authors: String,
    pub owners: String,
    pub icon_url: Option<String>,
    pub license_url: Option<String>,
    pub project_url: Option<String>,
    pub report_abuse_url: Option<String>,
    pub min_client_version: Option<String>,
    pub require_license_acceptance: bool,
    pub development_dependency: bool,
    pub dependency_sets: String,
    pub supported_frameworks: String,
    pub listed: bool,
    pub is_prerelease: bool,
    pub is_semver2: bool,
    pub is_latest_version: bool,
    pub is_absolute_latest_version: bool,
    pub package_size: i64,
    pub package_hash: String,
    pub package_hash_algorithm: String,
    pub created: String,
    pub last_updated: String,
    pub published: Option<String>,
}

/// The columns the latest-version resolver reads.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = packages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct LatestFlagsRow {
    pub version_key: String,
    pub version: String,
    pub created: String,
    pub is_latest_version: bool,
    pub is_absolute_latest_version: bool,
}

impl PackageRow {
    /// Flattens a record for storage, enforcing column limits.
    pub fn from_package(package: &Package) -> Result<Self, StorageError> {
        let version = package.version.to_string();
        check_length("version", &version, MAX_VERSION_LENGTH)?;
        check_optional_length("title", package.title.as_deref(), MAX_TITLE_LENGTH)?;
        check_optional_length("tags", package.tags.as_deref(), MAX_TAGS_LENGTH)?;
        check_optional_length("language", package.language.as_deref(), MAX_LANGUAGE_LENGTH)?;
        check_optional_length(
            "min_client_version",
            package.min_client_version.as_deref(),
            MAX_MIN_CLIENT_VERSION_LENGTH,
        )?;

        Ok(Self {
            package_id: package.id.clone(),
            version_key: package.version.normalized(),
            version,
            title: package.title.clone(),
            description: package.description.clone(),
            summary: package.summary.clone(),
            release_notes: package.release_notes.clone(),
            copyright: package.copyright.clone(),
            language: package.language.clone(),
            tags: package.tags.clone(),
            authors: join_list(&package.authors),
            owners: join_list(&package.owners),
            icon_url: package.icon_url.as_ref().map(Url::to_string),
            license_url: package.license_url.as_ref().map(Url::to_string),
            project_url: package.project_url.as_ref().map(Url::to_string),
            report_abuse_url: package.report_abuse_url.as_ref().map(Url::to_string),
            min_client_version: package.min_client_version.clone(),
            require_license_acceptance: package.require_license_acceptance,
            development_dependency: package.development_dependency,
            dependency_sets: serde_json::to_string(&package.dependency_sets)?,
            supported_frameworks: serde_json::to_string(&package.supported_frameworks)?,
            listed: package.listed,
            is_prerelease: package.is_prerelease(),
            is_semver2: package.is_semver2(),
            is_latest_version: package.is_latest_version,
            is_absolute_latest_version: package.is_absolute_latest_version,
            package_size: package.package_size,
            package_hash: package.package_hash.clone(),
            package_hash_algorithm: package.package_hash_algorithm.clone(),
            created: package.created.to_column(),
            last_updated: package.last_updated.to_column(),
            published: package.published.map(|p| p.to_column()),
        })
    }

    /// Rebuilds the domain record from a stored row.
    pub fn into_package(self) -> Result<Package, StorageError> {
        let version = parse_version(&self.package_id, &self.version)?;

        Ok(Package {
            dependency_sets: decode_json("dependency_sets", &self.dependency_sets)?,
            supported_frameworks: decode_json("supported_frameworks", &self.supported_frameworks)?,
            icon_url: parse_url("icon_url", self.icon_url)?,
            license_url: parse_url("license_url", self.license_url)?,
            project_url: parse_url("project_url", self.project_url)?,
            report_abuse_url: parse_url("report_abuse_url", self.report_abuse_url)?,
            created: parse_timestamp("created", &self.created)?,
            last_updated: parse_timestamp("last_updated", &self.last_updated)?,
            published: self
                .published
                .as_deref()
                .map(|p| parse_timestamp("published", p))
                .transpose()?,
            authors: split_list(&self.authors),
            owners: split_list(&self.owners),
            id: self.package_id,
            version,
            title: self.title,
            description: self.description,
            summary: self.summary,
            release_notes: self.release_notes,
            copyright: self.copyright,
            language: self.language,
            tags: self.tags,
            min_client_version: self.min_client_version,
            require_license_acceptance: self.require_license_acceptance,
            development_dependency: self.development_dependency,
            listed: self.listed,
            is_latest_version: self.is_latest_version,
            is_absolute_latest_version: self.is_absolute_latest_version,
            package_size: self.package_size,
            package_hash: self.package_hash,
            package_hash_algorithm: self.package_hash_algorithm,
        })
    }
}

// ============================================================================
// Package payload rows
// ============================================================================

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = package_data)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PackageDataRow {
    pub package_id: String,
    pub version_key: String,
    pub version: String,
    pub data: Vec<u8>,
    pub created: String,
    pub last_updated: String,
}

impl PackageDataRow {
    /// The payload row paired with `package`.
    pub fn for_package(package: &Package, data: Vec<u8>) -> Self {
        Self {
            package_id: package.id.clone(),
            version_key: package.version.normalized(),
            version: package.version.to_string(),
            data,
            created: package.created.to_column(),
            last_updated: package.last_updated.to_column(),
        }
    }
}

// ============================================================================
// Projection helpers
// ============================================================================

pub(crate) fn join_list(items: &[String]) -> String {
    items.join(",")
}

pub(crate) fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub(crate) fn parse_version(id: &str, text: &str) -> Result<PackageVersion, StorageError> {
    PackageVersion::parse(text).map_err(|e| StorageError::CorruptRecord {
        reason: format!("package {} has unreadable version: {}", id, e),
    })
}

pub(crate) fn parse_timestamp(column: &str, text: &str) -> Result<Timestamp, StorageError> {
    Timestamp::from_column(text).map_err(|e| StorageError::CorruptRecord {
        reason: format!("column {} holds invalid timestamp '{}': {}", column, text, e),
    })
}

fn parse_url(column: &str, text: Option<String>) -> Result<Option<Url>, StorageError> {
    text.map(|t| {
        Url::parse(&t).map_err(|e| StorageError::CorruptRecord {
            reason: format!("column {} holds invalid URL '{}': {}", column, t, e),
        })
    })
    .transpose()
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, text: &str) -> Result<T, StorageError> {
    serde_json::from_str(text).map_err(|e| StorageError::CorruptRecord {
        reason: format!("column {} holds invalid JSON: {}", column, e),
    })
}
