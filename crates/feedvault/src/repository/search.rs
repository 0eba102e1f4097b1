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

//! Search and filtering over package records.
//!
//! A search applies five predicates: text match, prerelease, delisting,
//! framework compatibility and version-scheme visibility. The prerelease,
//! delisting and visibility predicates are also pushed down to SQL through
//! [`SearchFilter::package_filter`]; text and framework matching run in
//! process. [`SearchFilter::matches`] evaluates all five and never touches
//! storage.

use crate::compatibility::ClientCompatibility;
use crate::config::RepositoryPolicy;
use crate::dal::PackageFilter;
use crate::framework::FrameworkCompatibility;
use crate::models::package::Package;

/// Caller-supplied search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Substring matched against id, description, summary and tags. Empty
    /// matches everything.
    pub term: String,
    pub target_frameworks: Vec<String>,
    pub allow_prerelease: bool,
    pub compatibility: ClientCompatibility,
}

impl SearchQuery {
    pub fn new(term: impl Into<String>) -> Self {
        Self {
            term: term.into(),
            ..Default::default()
        }
    }

    pub fn target_frameworks<I, S>(mut self, frameworks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.target_frameworks = frameworks.into_iter().map(Into::into).collect();
        self
    }

    pub fn allow_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    pub fn compatibility(mut self, compatibility: ClientCompatibility) -> Self {
        self.compatibility = compatibility;
        self
    }
}

/// A query bound to the policy snapshot it runs under.
pub struct SearchFilter<'a> {
    query: &'a SearchQuery,
    policy: RepositoryPolicy,
    frameworks: &'a dyn FrameworkCompatibility,
    // lowercased once when matching case-insensitively
    folded_term: Option<String>,
}

impl<'a> SearchFilter<'a> {
    pub fn new(
        query: &'a SearchQuery,
        policy: RepositoryPolicy,
        frameworks: &'a dyn FrameworkCompatibility,
    ) -> Self {
        let folded_term = (!policy.search_case_sensitive).then(|| query.term.to_lowercase());
        Self {
            query,
            policy,
            frameworks,
            folded_term,
        }
    }

    /// The subset of predicates evaluated by the database.
    pub fn package_filter(&self) -> PackageFilter {
        PackageFilter {
            package_id: None,
            include_prerelease: self.query.allow_prerelease,
            listed_only: self.policy.enable_delisting,
            compatibility: self.query.compatibility,
        }
    }

    pub fn matches(&self, package: &Package) -> bool {
        self.matches_term(package)
            && (self.query.allow_prerelease || !package.is_prerelease())
            && (!self.policy.enable_delisting || package.listed)
            && self.matches_frameworks(package)
            && self.query.compatibility.can_see(package.is_semver2())
    }

    pub fn apply(&self, packages: Vec<Package>) -> Vec<Package> {
        packages.into_iter().filter(|p| self.matches(p)).collect()
    }

    fn matches_term(&self, package: &Package) -> bool {
        if self.query.term.is_empty() {
            return true;
        }
        let fields = [
            Some(package.id.as_str()),
            package.description.as_deref(),
            package.summary.as_deref(),
            package.tags.as_deref(),
        ];
        match &self.folded_term {
            Some(term) => fields
                .iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(term.as_str())),
            None => fields
                .iter()
                .flatten()
                .any(|field| field.contains(self.query.term.as_str())),
        }
    }

    fn matches_frameworks(&self, package: &Package) -> bool {
        if !self.policy.enable_framework_filtering || self.query.target_frameworks.is_empty() {
            return true;
        }
        self.query
            .target_frameworks
            .iter()
            .any(|target| self.frameworks.is_compatible(target, &package.supported_frameworks))
    }
}
