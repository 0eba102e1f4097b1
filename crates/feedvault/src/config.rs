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

//! Repository configuration.
//!
//! [`RepositoryPolicy`] holds the behavioural switches the repository reads on
//! every operation. [`RepositoryConfig`] adds the connection and cache
//! settings needed to open a repository.
//!
//! ```rust,ignore
//! let config = RepositoryConfig::builder()
//!     .database_url("sqlite:///var/lib/feedvault/feed.db")
//!     .operation_timeout(Some(Duration::from_secs(10)))
//!     .policy(RepositoryPolicy {
//!         enable_delisting: true,
//!         ..Default::default()
//!     })
//!     .build();
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

pub const ENV_DATABASE_URL: &str = "FEEDVAULT_DATABASE_URL";
pub const ENV_DB_POOL_SIZE: &str = "FEEDVAULT_DB_POOL_SIZE";
pub const ENV_OPERATION_TIMEOUT_MS: &str = "FEEDVAULT_OPERATION_TIMEOUT_MS";
pub const ENV_PAYLOAD_CACHE_CAPACITY: &str = "FEEDVAULT_PAYLOAD_CACHE_CAPACITY";
pub const ENV_ALLOW_OVERRIDE: &str = "FEEDVAULT_ALLOW_OVERRIDE_EXISTING_PACKAGE_ON_PUSH";
pub const ENV_IGNORE_SYMBOLS: &str = "FEEDVAULT_IGNORE_SYMBOLS_PACKAGES";
pub const ENV_ENABLE_DELISTING: &str = "FEEDVAULT_ENABLE_DELISTING";
pub const ENV_ENABLE_FRAMEWORK_FILTERING: &str = "FEEDVAULT_ENABLE_FRAMEWORK_FILTERING";
pub const ENV_SEARCH_CASE_SENSITIVE: &str = "FEEDVAULT_SEARCH_CASE_SENSITIVE";

/// Behavioural switches, read at the start of each repository operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryPolicy {
    /// Replace an existing package on push instead of rejecting it
    pub allow_override_existing_package_on_push: bool,
    /// Reject symbols packages on push
    pub ignore_symbols_packages: bool,
    /// `remove` unlists instead of deleting, and search hides unlisted packages
    pub enable_delisting: bool,
    /// Search honours the requested target frameworks
    pub enable_framework_filtering: bool,
    /// Text search matches case-sensitively
    pub search_case_sensitive: bool,
}

impl Default for RepositoryPolicy {
    fn default() -> Self {
        Self {
            allow_override_existing_package_on_push: true,
            ignore_symbols_packages: false,
            enable_delisting: false,
            enable_framework_filtering: false,
            search_case_sensitive: false,
        }
    }
}

impl RepositoryPolicy {
    /// Reads policy flags from any key/value source. Missing or unparseable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let flag = |key: &str, default: bool| match lookup(key) {
            Some(raw) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(key = key, value = %raw, default = default, "Ignoring unparseable boolean setting");
                default
            }),
            None => default,
        };

        Self {
            allow_override_existing_package_on_push: flag(
                ENV_ALLOW_OVERRIDE,
                defaults.allow_override_existing_package_on_push,
            ),
            ignore_symbols_packages: flag(ENV_IGNORE_SYMBOLS, defaults.ignore_symbols_packages),
            enable_delisting: flag(ENV_ENABLE_DELISTING, defaults.enable_delisting),
            enable_framework_filtering: flag(
                ENV_ENABLE_FRAMEWORK_FILTERING,
                defaults.enable_framework_filtering,
            ),
            search_case_sensitive: flag(ENV_SEARCH_CASE_SENSITIVE, defaults.search_case_sensitive),
        }
    }

    /// Reads policy flags from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Settings needed to open a [`PackageRepository`](crate::PackageRepository).
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct RepositoryConfig {
    database_url: String,
    db_pool_size: u32,
    operation_timeout: Option<Duration>,
    payload_cache_capacity: usize,
    policy: RepositoryPolicy,
}

impl RepositoryConfig {
    pub fn builder() -> RepositoryConfigBuilder {
        RepositoryConfigBuilder::default()
    }

    /// Builds a configuration from `FEEDVAULT_*` environment variables,
    /// loading a `.env` file first when one exists.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from any key/value source using the
    /// `FEEDVAULT_*` key names.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder().policy(RepositoryPolicy::from_lookup(&lookup));

        if let Some(url) = lookup(ENV_DATABASE_URL) {
            builder = builder.database_url(url);
        }
        if let Some(size) = parse_number::<u32>(&lookup, ENV_DB_POOL_SIZE) {
            builder = builder.db_pool_size(size);
        }
        if let Some(millis) = parse_number::<u64>(&lookup, ENV_OPERATION_TIMEOUT_MS) {
            // zero disables the timeout
            let timeout = (millis > 0).then(|| Duration::from_millis(millis));
            builder = builder.operation_timeout(timeout);
        }
        if let Some(capacity) = parse_number::<usize>(&lookup, ENV_PAYLOAD_CACHE_CAPACITY) {
            builder = builder.payload_cache_capacity(capacity);
        }

        builder.build()
    }

    /// Database location: a file path, `sqlite://` URL or `:memory:`.
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn db_pool_size(&self) -> u32 {
        self.db_pool_size
    }

    /// Bound on connection checkout and on each transaction.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.operation_timeout
    }

    /// Number of payloads kept in the in-process cache; zero disables it.
    pub fn payload_cache_capacity(&self) -> usize {
        self.payload_cache_capacity
    }

    pub fn policy(&self) -> RepositoryPolicy {
        self.policy
    }
}

fn parse_number<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(key = key, value = %raw, "Ignoring unparseable numeric setting");
            None
        }
    }
}

/// Builder for [`RepositoryConfig`].
#[derive(Debug, Clone)]
pub struct RepositoryConfigBuilder {
    config: RepositoryConfig,
}

impl Default for RepositoryConfigBuilder {
    fn default() -> Self {
        Self {
            config: RepositoryConfig {
                database_url: "feedvault.db".to_string(),
                db_pool_size: 1,
                operation_timeout: Some(Duration::from_secs(30)),
                payload_cache_capacity: 64,
                policy: RepositoryPolicy::default(),
            },
        }
    }
}

impl RepositoryConfigBuilder {
    pub fn database_url(mut self, value: impl Into<String>) -> Self {
        self.config.database_url = value.into();
        self
    }

    /// Sets the requested connection pool size. SQLite stores clamp it to
    /// one connection.
    pub fn db_pool_size(mut self, value: u32) -> Self {
        self.config.db_pool_size = value;
        self
    }

    pub fn operation_timeout(mut self, value: Option<Duration>) -> Self {
        self.config.operation_timeout = value;
        self
    }

    pub fn payload_cache_capacity(mut self, value: usize) -> Self {
        self.config.payload_cache_capacity = value;
        self
    }

    pub fn policy(mut self, value: RepositoryPolicy) -> Self {
        self.config.policy = value;
        self
    }

    pub fn build(self) -> RepositoryConfig {
        self.config
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        RepositoryConfigBuilder::default().build()
    }
}
