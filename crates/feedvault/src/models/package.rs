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

//! Domain models for package records.
//!
//! These are the structured, in-memory types the repository hands out. The
//! DAL converts them to and from flat table rows; nothing in here knows how
//! a column is encoded.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use url::Url;

use crate::database::Timestamp;
use crate::error::StorageError;
use crate::version::PackageVersion;

/// Name of the digest stored in `package_hash_algorithm`.
pub const PACKAGE_HASH_ALGORITHM: &str = "SHA512";

/// Maximum stored length of the version text.
pub const MAX_VERSION_LENGTH: usize = 64;
/// Maximum stored length of a title.
pub const MAX_TITLE_LENGTH: usize = 256;
/// Maximum stored length of the tag string.
pub const MAX_TAGS_LENGTH: usize = 2000;
/// Maximum stored length of a language code.
pub const MAX_LANGUAGE_LENGTH: usize = 20;
/// Maximum stored length of the minimum client version.
pub const MAX_MIN_CLIENT_VERSION_LENGTH: usize = 44;

/// A single declared dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub id: String,
    /// Version range in interval notation; `None` accepts any version
    pub version_range: Option<String>,
}

/// Dependencies that apply to one target framework (or all of them).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySet {
    pub target_framework: Option<String>,
    pub dependencies: Vec<Dependency>,
}

/// Metadata parsed from an uploaded archive by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub release_notes: Option<String>,
    pub copyright: Option<String>,
    pub language: Option<String>,
    /// Space-delimited tag list
    pub tags: Option<String>,
    pub authors: Vec<String>,
    pub owners: Vec<String>,
    pub icon_url: Option<Url>,
    pub license_url: Option<Url>,
    pub project_url: Option<Url>,
    pub report_abuse_url: Option<Url>,
    pub min_client_version: Option<String>,
    pub require_license_acceptance: bool,
    pub development_dependency: bool,
    pub dependency_sets: Vec<DependencySet>,
    pub supported_frameworks: Vec<String>,
    /// Archive entry paths, used to classify symbols packages
    pub files: Vec<String>,
    pub published: Option<Timestamp>,
}

impl PackageMetadata {
    /// True iff the archive carries debug symbols together with sources.
    pub fn is_symbols_package(&self) -> bool {
        let has_symbols = self
            .files
            .iter()
            .any(|f| f.to_ascii_lowercase().ends_with(".pdb"));
        let has_sources = self.files.iter().any(|f| {
            let normalized = f.replace('\\', "/").to_ascii_lowercase();
            normalized.starts_with("src/")
        });
        has_symbols && has_sources
    }

    /// Checks the column limits of the package tables.
    ///
    /// `add` performs the same check when projecting the record; callers
    /// that want to reject oversized input before uploading call this first.
    pub fn validate(&self, version: &PackageVersion) -> Result<(), StorageError> {
        check_length("version", &version.to_string(), MAX_VERSION_LENGTH)?;
        check_optional_length("title", self.title.as_deref(), MAX_TITLE_LENGTH)?;
        check_optional_length("tags", self.tags.as_deref(), MAX_TAGS_LENGTH)?;
        check_optional_length("language", self.language.as_deref(), MAX_LANGUAGE_LENGTH)?;
        check_optional_length(
            "min_client_version",
            self.min_client_version.as_deref(),
            MAX_MIN_CLIENT_VERSION_LENGTH,
        )
    }
}

pub(crate) fn check_length(column: &'static str, value: &str, max: usize) -> Result<(), StorageError> {
    let actual = value.chars().count();
    if actual > max {
        return Err(StorageError::ColumnLimit {
            column,
            max,
            actual,
        });
    }
    Ok(())
}

pub(crate) fn check_optional_length(
    column: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), StorageError> {
    match value {
        Some(value) => check_length(column, value, max),
        None => Ok(()),
    }
}

/// The `(id, version)` identity of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageIdentity {
    pub id: String,
    pub version: PackageVersion,
}

impl PackageIdentity {
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version,
        }
    }
}

/// One stored package version with its derived flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: String,
    pub version: PackageVersion,
    pub title: Option<String>,
    pub description: Option<String>,
    pub summary: Option<String>,
    pub release_notes: Option<String>,
    pub copyright: Option<String>,
    pub language: Option<String>,
    pub tags: Option<String>,
    pub authors: Vec<String>,
    pub owners: Vec<String>,
    pub icon_url: Option<Url>,
    pub license_url: Option<Url>,
    pub project_url: Option<Url>,
    pub report_abuse_url: Option<Url>,
    pub min_client_version: Option<String>,
    pub require_license_acceptance: bool,
    pub development_dependency: bool,
    pub dependency_sets: Vec<DependencySet>,
    pub supported_frameworks: Vec<String>,
    pub listed: bool,
    pub is_latest_version: bool,
    pub is_absolute_latest_version: bool,
    pub package_size: i64,
    pub package_hash: String,
    pub package_hash_algorithm: String,
    pub created: Timestamp,
    pub last_updated: Timestamp,
    pub published: Option<Timestamp>,
}

impl Package {
    /// Builds the record for a fresh upload. Latest flags start cleared; the
    /// resolver sets them once the record is stored.
    pub fn from_upload(
        id: &str,
        version: &PackageVersion,
        metadata: PackageMetadata,
        payload: &[u8],
        now: Timestamp,
    ) -> Self {
        let digest = Sha512::digest(payload);

        Self {
            id: id.to_string(),
            version: version.clone(),
            title: metadata.title,
            description: metadata.description,
            summary: metadata.summary,
            release_notes: metadata.release_notes,
            copyright: metadata.copyright,
            language: metadata.language,
            tags: metadata.tags,
            authors: metadata.authors,
            owners: metadata.owners,
            icon_url: metadata.icon_url,
            license_url: metadata.license_url,
            project_url: metadata.project_url,
            report_abuse_url: metadata.report_abuse_url,
            min_client_version: metadata.min_client_version,
            require_license_acceptance: metadata.require_license_acceptance,
            development_dependency: metadata.development_dependency,
            dependency_sets: metadata.dependency_sets,
            supported_frameworks: metadata.supported_frameworks,
            listed: true,
            is_latest_version: false,
            is_absolute_latest_version: false,
            package_size: payload.len() as i64,
            package_hash: BASE64.encode(digest),
            package_hash_algorithm: PACKAGE_HASH_ALGORITHM.to_string(),
            created: now,
            last_updated: now,
            published: metadata.published.or(Some(now)),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }

    pub fn is_semver2(&self) -> bool {
        self.version.is_semver2()
    }

    pub fn identity(&self) -> PackageIdentity {
        PackageIdentity::new(self.id.clone(), self.version.clone())
    }
}
