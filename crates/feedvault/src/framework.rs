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

//! Target framework compatibility.
//!
//! Framework naming is owned by the package format, not by this crate; the
//! search engine only needs a yes/no answer to "can a project targeting X
//! consume a package that supports Y". [`FrameworkCompatibility`] is that
//! seam. [`FrameworkNameCompatibility`] is the built-in relation covering the
//! common .NET framework monikers.

use std::cmp::Ordering;
use std::fmt;

/// Decides whether a requested target framework can consume a package.
pub trait FrameworkCompatibility: Send + Sync + fmt::Debug {
    /// True iff a project targeting `target` can use a package declaring the
    /// `supported` frameworks. A package with no declared frameworks supports
    /// everything.
    fn is_compatible(&self, target: &str, supported: &[String]) -> bool;
}

/// A parsed framework moniker such as `net45` or `netstandard2.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkName {
    family: String,
    version: Vec<u32>,
}

impl FrameworkName {
    /// Parses short (`net461`, `netcoreapp3.1`) and long
    /// (`.NETFramework,Version=v4.5`) monikers. Returns `None` for `any`,
    /// empty or unrecognised text.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("any") {
            return None;
        }
        if let Some((identifier, version)) = text.split_once(',') {
            return Self::parse_long(identifier, version);
        }
        Self::parse_short(text)
    }

    fn parse_long(identifier: &str, version: &str) -> Option<Self> {
        let family = match identifier.trim().to_ascii_lowercase().as_str() {
            ".netframework" => "net".to_string(),
            ".netstandard" => "netstandard".to_string(),
            ".netcoreapp" => "netcoreapp".to_string(),
            other => other.trim_start_matches('.').to_string(),
        };
        let version = version
            .trim()
            .strip_prefix("Version=")
            .or_else(|| version.trim().strip_prefix("version="))?;
        let version = version.trim_start_matches(['v', 'V']);
        Some(Self {
            family,
            version: parse_dotted(version)?,
        })
    }

    fn parse_short(text: &str) -> Option<Self> {
        let lower = text.to_ascii_lowercase();
        let split = lower.find(|c: char| c.is_ascii_digit())?;
        let (family, digits) = lower.split_at(split);
        if family.is_empty() {
            return None;
        }

        let version = if digits.contains('.') {
            parse_dotted(digits)?
        } else {
            digits
                .chars()
                .map(|c| c.to_digit(10))
                .collect::<Option<Vec<u32>>>()?
        };

        // net5.0 and later continue the netcoreapp line
        let family = if family == "net" && version.first().copied().unwrap_or(0) >= 5 {
            "netcoreapp".to_string()
        } else {
            family.to_string()
        };

        Some(Self { family, version })
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn version(&self) -> &[u32] {
        &self.version
    }
}

impl fmt::Display for FrameworkName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let version: Vec<String> = self.version.iter().map(u32::to_string).collect();
        write!(f, "{}{}", self.family, version.join("."))
    }
}

fn parse_dotted(text: &str) -> Option<Vec<u32>> {
    text.split('.')
        .map(|part| part.parse::<u32>().ok())
        .collect()
}

fn compare_parts(a: &[u32], b: &[u32]) -> Ordering {
    let len = a.len().max(b.len());
    (0..len)
        .map(|i| {
            a.get(i)
                .copied()
                .unwrap_or(0)
                .cmp(&b.get(i).copied().unwrap_or(0))
        })
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}

/// Highest netstandard version a target framework implements.
fn netstandard_ceiling(target: &FrameworkName) -> Option<&'static [u32]> {
    match target.family() {
        "netcoreapp" if compare_parts(target.version(), &[3, 0]) != Ordering::Less => {
            Some(&[2, 1])
        }
        "netcoreapp" if compare_parts(target.version(), &[2, 0]) != Ordering::Less => {
            Some(&[2, 0])
        }
        "netcoreapp" => Some(&[1, 6]),
        "net" if compare_parts(target.version(), &[4, 6, 1]) != Ordering::Less => Some(&[2, 0]),
        "net" if compare_parts(target.version(), &[4, 5]) != Ordering::Less => Some(&[1, 1]),
        _ => None,
    }
}

/// Built-in compatibility relation for .NET framework monikers.
///
/// A target can consume a package built for the same family at an equal or
/// lower version, or for a netstandard version the target implements.
/// Monikers that cannot be parsed only match themselves (case-insensitive).
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameworkNameCompatibility;

impl FrameworkNameCompatibility {
    fn single(target: &str, supported: &str) -> bool {
        let supported_name = match FrameworkName::parse(supported) {
            Some(name) => name,
            // `any` and empty entries support everything
            None if supported.trim().is_empty() || supported.trim().eq_ignore_ascii_case("any") => {
                return true
            }
            None => return target.trim().eq_ignore_ascii_case(supported.trim()),
        };
        let target_name = match FrameworkName::parse(target) {
            Some(name) => name,
            None => return target.trim().eq_ignore_ascii_case(supported.trim()),
        };

        if target_name.family() == supported_name.family() {
            return compare_parts(supported_name.version(), target_name.version())
                != Ordering::Greater;
        }

        if supported_name.family() == "netstandard" {
            if let Some(ceiling) = netstandard_ceiling(&target_name) {
                return compare_parts(supported_name.version(), ceiling) != Ordering::Greater;
            }
        }

        false
    }
}

impl FrameworkCompatibility for FrameworkNameCompatibility {
    fn is_compatible(&self, target: &str, supported: &[String]) -> bool {
        supported.is_empty() || supported.iter().any(|s| Self::single(target, s))
    }
}
