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

//! Client compatibility markers.
//!
//! Legacy clients cannot read extended-scheme (SemVer 2) versions and must
//! never be shown such records. The marker travels with every read so the
//! query layer can shape its predicates.

use crate::version::PackageVersion;

/// Which versioning features the calling client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientCompatibility {
    allow_semver2: bool,
}

impl ClientCompatibility {
    /// What a client that sends no compatibility information gets.
    pub const DEFAULT: ClientCompatibility = ClientCompatibility {
        allow_semver2: false,
    };

    /// Sees every record regardless of scheme. Used by latest-version tracking.
    pub const MAX: ClientCompatibility = ClientCompatibility {
        allow_semver2: true,
    };

    pub fn new(allow_semver2: bool) -> Self {
        Self { allow_semver2 }
    }

    /// Builds a marker from a client-supplied `semVerLevel` value.
    ///
    /// Levels of `2.0.0` and above unlock extended-scheme packages. Short
    /// levels such as `2` or `2.0` are padded with zero components. A missing
    /// or unparseable level means a legacy client.
    pub fn from_sem_ver_level(level: Option<&str>) -> Self {
        let threshold = PackageVersion::new(2, 0, 0);
        let allow_semver2 = level
            .map(str::trim)
            .and_then(|text| PackageVersion::parse(&pad_level(text)).ok())
            .map(|version| version >= threshold)
            .unwrap_or(false);
        Self { allow_semver2 }
    }

    pub fn allow_semver2(&self) -> bool {
        self.allow_semver2
    }

    /// True iff a record with the given scheme flag is visible to this client.
    pub fn can_see(&self, is_semver2: bool) -> bool {
        self.allow_semver2 || !is_semver2
    }
}

/// Pads the numeric core of `text` to three components.
fn pad_level(text: &str) -> String {
    let core_end = text.find(['-', '+']).unwrap_or(text.len());
    let (core, suffix) = text.split_at(core_end);
    let missing = 2usize.saturating_sub(core.matches('.').count());
    let mut padded = core.to_string();
    for _ in 0..missing {
        padded.push_str(".0");
    }
    padded.push_str(suffix);
    padded
}

impl Default for ClientCompatibility {
    fn default() -> Self {
        Self::DEFAULT
    }
}
