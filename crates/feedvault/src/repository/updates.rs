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

//! Update discovery for installed packages.

use crate::compatibility::ClientCompatibility;
use crate::framework::FrameworkCompatibility;
use crate::models::package::Package;
use crate::version::{PackageVersion, VersionRange};

/// A package a client has installed, with an optional allowed version range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledPackage {
    pub id: String,
    pub version: PackageVersion,
    pub constraint: Option<VersionRange>,
}

impl InstalledPackage {
    pub fn new(id: impl Into<String>, version: PackageVersion) -> Self {
        Self {
            id: id.into(),
            version,
            constraint: None,
        }
    }

    pub fn with_constraint(mut self, constraint: VersionRange) -> Self {
        self.constraint = Some(constraint);
        self
    }
}

/// Parameters of an update check.
#[derive(Debug, Clone, Default)]
pub struct UpdateQuery {
    pub installed: Vec<InstalledPackage>,
    pub include_prerelease: bool,
    /// Return every newer version instead of only the highest
    pub include_all_versions: bool,
    pub target_frameworks: Vec<String>,
    pub compatibility: ClientCompatibility,
}

impl UpdateQuery {
    pub fn new(installed: Vec<InstalledPackage>) -> Self {
        Self {
            installed,
            ..Default::default()
        }
    }

    pub fn include_prerelease(mut self, value: bool) -> Self {
        self.include_prerelease = value;
        self
    }

    pub fn include_all_versions(mut self, value: bool) -> Self {
        self.include_all_versions = value;
        self
    }

    pub fn target_frameworks<I, S>(mut self, frameworks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_frameworks = frameworks.into_iter().map(Into::into).collect();
        self
    }

    pub fn compatibility(mut self, compatibility: ClientCompatibility) -> Self {
        self.compatibility = compatibility;
        self
    }

    /// Distinct ids in the order they were first listed.
    pub fn package_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = Vec::new();
        for installed in &self.installed {
            if !ids.contains(&installed.id) {
                ids.push(installed.id.clone());
            }
        }
        ids
    }
}

/// Picks the updates for each installed package from `candidates`.
///
/// Results follow the order of `query.installed`; the versions for one
/// installed package are ascending.
pub fn select_updates(
    query: &UpdateQuery,
    candidates: &[Package],
    frameworks: &dyn FrameworkCompatibility,
) -> Vec<Package> {
    let mut updates = Vec::new();

    for installed in &query.installed {
        let mut newer: Vec<&Package> = candidates
            .iter()
            .filter(|p| p.id == installed.id)
            .filter(|p| p.version > installed.version)
            .filter(|p| p.listed)
            .filter(|p| query.include_prerelease || !p.is_prerelease())
            .filter(|p| query.compatibility.can_see(p.is_semver2()))
            .filter(|p| {
                installed
                    .constraint
                    .as_ref()
                    .map_or(true, |range| range.satisfies(&p.version))
            })
            .filter(|p| {
                query.target_frameworks.is_empty()
                    || query
                        .target_frameworks
                        .iter()
                        .any(|t| frameworks.is_compatible(t, &p.supported_frameworks))
            })
            .collect();

        newer.sort_by(|a, b| a.version.cmp(&b.version));

        if query.include_all_versions {
            updates.extend(newer.into_iter().cloned());
        } else if let Some(highest) = newer.pop() {
            updates.push(highest.clone());
        }
    }

    updates
}
