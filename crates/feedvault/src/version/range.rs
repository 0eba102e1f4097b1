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

//! Version ranges in interval notation.
//!
//! | Text              | Meaning               |
//! |-------------------|-----------------------|
//! | `1.0.0`           | `1.0.0 <= x`          |
//! | `[1.0.0]`         | `x == 1.0.0`          |
//! | `(1.0.0,)`        | `1.0.0 < x`           |
//! | `(,2.0.0]`        | `x <= 2.0.0`          |
//! | `[1.0.0,2.0.0)`   | `1.0.0 <= x < 2.0.0`  |

use std::fmt;
use std::str::FromStr;

use super::PackageVersion;
use crate::error::VersionError;

/// A contiguous range of versions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    min: Option<PackageVersion>,
    min_inclusive: bool,
    max: Option<PackageVersion>,
    max_inclusive: bool,
}

impl VersionRange {
    /// A range containing exactly one version.
    pub fn exact(version: PackageVersion) -> Self {
        Self {
            min: Some(version.clone()),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// A range containing `version` and everything above it.
    pub fn at_least(version: PackageVersion) -> Self {
        Self {
            min: Some(version),
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let invalid = |reason: &str| VersionError::InvalidVersionRange {
            input: input.to_string(),
            reason: reason.to_string(),
        };
        let bound = |text: &str| -> Result<Option<PackageVersion>, VersionError> {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                PackageVersion::parse(text)
                    .map(Some)
                    .map_err(|_| invalid(&format!("'{}' is not a valid version", text)))
            }
        };

        let text = input.trim();
        if text.is_empty() {
            return Err(invalid("range text is empty"));
        }

        let min_inclusive = match text.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => {
                // Bare version: minimum inclusive, no upper bound
                let version = bound(text)?.ok_or_else(|| invalid("range text is empty"))?;
                return Ok(Self::at_least(version));
            }
        };
        let max_inclusive = match text.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("range must end with ']' or ')'")),
        };
        if text.len() < 2 {
            return Err(invalid("range is missing its bounds"));
        }

        let inner = &text[1..text.len() - 1];
        let parts: Vec<&str> = inner.split(',').collect();

        match parts.as_slice() {
            [single] => {
                if !(min_inclusive && max_inclusive) {
                    return Err(invalid("a single-version range must use '[' and ']'"));
                }
                let version = bound(single)?.ok_or_else(|| invalid("range has no bounds"))?;
                Ok(Self::exact(version))
            }
            [low, high] => {
                let min = bound(low)?;
                let max = bound(high)?;
                if min.is_none() && max.is_none() {
                    return Err(invalid("range has no bounds"));
                }
                if let (Some(low), Some(high)) = (&min, &max) {
                    if low > high {
                        return Err(invalid("minimum is greater than maximum"));
                    }
                    if low == high && !(min_inclusive && max_inclusive) {
                        return Err(invalid("range is empty"));
                    }
                }
                Ok(Self {
                    min,
                    min_inclusive,
                    max,
                    max_inclusive,
                })
            }
            _ => Err(invalid("range has more than two bounds")),
        }
    }

    pub fn min(&self) -> Option<&PackageVersion> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&PackageVersion> {
        self.max.as_ref()
    }

    /// True iff `version` lies inside the range.
    pub fn satisfies(&self, version: &PackageVersion) -> bool {
        let above_min = match &self.min {
            Some(min) if self.min_inclusive => version >= min,
            Some(min) => version > min,
            None => true,
        };
        let below_max = match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        };
        above_min && below_max
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.min, &self.max) {
            (Some(min), None) if self.min_inclusive => write!(f, "{}", min),
            (Some(min), Some(max)) if min == max => write!(f, "[{}]", min),
            _ => {
                write!(f, "{}", if self.min_inclusive { '[' } else { '(' })?;
                if let Some(min) = &self.min {
                    write!(f, "{}", min)?;
                }
                write!(f, ",")?;
                if let Some(max) = &self.max {
                    write!(f, "{}", max)?;
                }
                write!(f, "{}", if self.max_inclusive { ']' } else { ')' })
            }
        }
    }
}
