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

//! Package version identifiers.
//!
//! A [`PackageVersion`] is a numeric triple with an optional fourth revision
//! part, optional dot-separated pre-release labels and optional build
//! metadata. Two schemes share this representation:
//!
//! - **legacy**: at most one pre-release label and no build metadata
//!   (`1.0.0`, `1.0.0.3`, `2.1.0-beta`)
//! - **extended** (SemVer 2): several pre-release labels or any build metadata
//!   (`1.0.0-rc.1`, `1.0.0+sha.5114f85`)
//!
//! Ordering ignores build metadata entirely, so `1.0.0+a` and `1.0.0+b` are
//! equal even though their text differs. The text supplied at parse time is
//! preserved by [`fmt::Display`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::VersionError;

mod range;

pub use range::VersionRange;

static VERSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<major>0|[1-9][0-9]*)\.(?P<minor>0|[1-9][0-9]*)\.(?P<patch>0|[1-9][0-9]*)(?:\.(?P<revision>0|[1-9][0-9]*))?(?:-(?P<release>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?(?:\+(?P<metadata>[0-9A-Za-z-]+(?:\.[0-9A-Za-z-]+)*))?$",
    )
    .expect("version pattern is a valid regex")
});

/// The versioning dialect a version is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionScheme {
    /// Legacy scheme: single special-version suffix, no build metadata
    Legacy,
    /// Extended (SemVer 2) scheme
    Extended,
}

/// A parsed package version.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    major: u64,
    minor: u64,
    patch: u64,
    revision: Option<u64>,
    release_labels: Vec<String>,
    metadata: Option<String>,
}

impl PackageVersion {
    /// Creates a release version `major.minor.patch`.
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: None,
            release_labels: Vec::new(),
            metadata: None,
        }
    }

    /// Parses version text.
    ///
    /// Accepts three or four numeric parts without leading zeros, an optional
    /// `-` pre-release suffix of dot-separated labels and an optional `+`
    /// build metadata suffix. Surrounding whitespace is not accepted.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = |reason: &str| VersionError::InvalidVersion {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.is_empty() {
            return Err(invalid("version text is empty"));
        }

        let captures = VERSION_PATTERN
            .captures(input)
            .ok_or_else(|| invalid("expected major.minor.patch[.revision][-release][+metadata]"))?;

        let number = |name: &str| -> Result<Option<u64>, VersionError> {
            captures
                .name(name)
                .map(|m| {
                    m.as_str()
                        .parse::<u64>()
                        .map_err(|_| invalid("numeric component is out of range"))
                })
                .transpose()
        };

        let major = number("major")?.ok_or_else(|| invalid("missing major component"))?;
        let minor = number("minor")?.ok_or_else(|| invalid("missing minor component"))?;
        let patch = number("patch")?.ok_or_else(|| invalid("missing patch component"))?;
        let revision = number("revision")?;

        let release_labels: Vec<String> = match captures.name("release") {
            Some(release) => release.as_str().split('.').map(str::to_string).collect(),
            None => Vec::new(),
        };

        for label in &release_labels {
            if is_numeric_label(label) {
                if label.len() > 1 && label.starts_with('0') {
                    return Err(invalid("numeric release labels must not have leading zeros"));
                }
                if label.parse::<u64>().is_err() {
                    return Err(invalid("numeric release label is out of range"));
                }
            }
        }

        Ok(Self {
            major,
            minor,
            patch,
            revision,
            release_labels,
            metadata: captures.name("metadata").map(|m| m.as_str().to_string()),
        })
    }

    pub fn major(&self) -> u64 {
        self.major
    }

    pub fn minor(&self) -> u64 {
        self.minor
    }

    pub fn patch(&self) -> u64 {
        self.patch
    }

    /// The fourth numeric part, when the text had one.
    pub fn revision(&self) -> Option<u64> {
        self.revision
    }

    pub fn release_labels(&self) -> &[String] {
        &self.release_labels
    }

    /// The pre-release suffix without its leading `-`.
    pub fn release(&self) -> Option<String> {
        if self.release_labels.is_empty() {
            None
        } else {
            Some(self.release_labels.join("."))
        }
    }

    /// Build metadata without its leading `+`.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    /// True iff the version carries a pre-release suffix.
    pub fn is_prerelease(&self) -> bool {
        !self.release_labels.is_empty()
    }

    /// True iff the version can only be expressed in the extended scheme.
    pub fn is_semver2(&self) -> bool {
        self.release_labels.len() > 1 || self.metadata.is_some()
    }

    pub fn scheme(&self) -> VersionScheme {
        if self.is_semver2() {
            VersionScheme::Extended
        } else {
            VersionScheme::Legacy
        }
    }

    /// Comparison key: equal keys if and only if the versions compare equal.
    ///
    /// Drops build metadata and a zero revision and lowercases release labels.
    pub fn normalized(&self) -> String {
        let mut key = format!("{}.{}.{}", self.major, self.minor, self.patch);
        if let Some(revision) = self.revision.filter(|r| *r != 0) {
            key.push_str(&format!(".{}", revision));
        }
        if !self.release_labels.is_empty() {
            key.push('-');
            key.push_str(&self.release_labels.join(".").to_ascii_lowercase());
        }
        key
    }

    fn numeric_parts(&self) -> (u64, u64, u64, u64) {
        (
            self.major,
            self.minor,
            self.patch,
            self.revision.unwrap_or(0),
        )
    }
}

fn is_numeric_label(label: &str) -> bool {
    !label.is_empty() && label.bytes().all(|b| b.is_ascii_digit())
}

fn compare_label(a: &str, b: &str) -> Ordering {
    match (is_numeric_label(a), is_numeric_label(b)) {
        (true, true) => {
            let left = a.parse::<u64>().unwrap_or(u64::MAX);
            let right = b.parse::<u64>().unwrap_or(u64::MAX);
            left.cmp(&right)
        }
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()),
    }
}

fn compare_release_labels(a: &[String], b: &[String]) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        // A release sorts after any of its pre-releases
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a
            .iter()
            .zip(b.iter())
            .map(|(x, y)| compare_label(x, y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.len().cmp(&b.len())),
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric_parts()
            .cmp(&other.numeric_parts())
            .then_with(|| compare_release_labels(&self.release_labels, &other.release_labels))
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(revision) = self.revision {
            write!(f, ".{}", revision)?;
        }
        if !self.release_labels.is_empty() {
            write!(f, "-{}", self.release_labels.join("."))?;
        }
        if let Some(metadata) = &self.metadata {
            write!(f, "+{}", metadata)?;
        }
        Ok(())
    }
}

impl FromStr for PackageVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PackageVersion::parse(s)
    }
}

impl Serialize for PackageVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for PackageVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        PackageVersion::parse(&text).map_err(serde::de::Error::custom)
    }
}
