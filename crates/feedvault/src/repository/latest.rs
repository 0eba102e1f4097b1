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

//! Latest-version resolution.
//!
//! For one package id, `is_absolute_latest_version` marks the highest version
//! of all, and `is_latest_version` marks the highest stable version. Unlisted
//! versions take part. The resolver always sees every version scheme.

use diesel::sqlite::SqliteConnection;
use tracing::debug;

use crate::compatibility::ClientCompatibility;
use crate::dal::models::{parse_timestamp, parse_version, LatestFlagsRow};
use crate::dal::packages;
use crate::database::Timestamp;
use crate::error::RepositoryError;
use crate::version::PackageVersion;

/// One version of a package as seen by the resolver.
#[derive(Debug, Clone)]
pub struct LatestCandidate {
    pub version_key: String,
    pub version: PackageVersion,
    pub created: Timestamp,
}

/// Which version keys carry the two flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LatestAssignment {
    pub latest: Option<String>,
    pub absolute_latest: Option<String>,
}

impl LatestAssignment {
    pub fn flags_for(&self, version_key: &str) -> (bool, bool) {
        (
            self.latest.as_deref() == Some(version_key),
            self.absolute_latest.as_deref() == Some(version_key),
        )
    }
}

/// Picks the latest and absolute-latest versions. Equal versions fall back to
/// the most recently created record.
pub fn resolve_latest(candidates: &[LatestCandidate]) -> LatestAssignment {
    let rank = |c: &&LatestCandidate| (c.version.clone(), c.created);

    let absolute_latest = candidates.iter().max_by_key(rank);
    let latest = candidates
        .iter()
        .filter(|c| !c.version.is_prerelease())
        .max_by_key(rank);

    LatestAssignment {
        latest: latest.map(|c| c.version_key.clone()),
        absolute_latest: absolute_latest.map(|c| c.version_key.clone()),
    }
}

fn candidate_from_row(id: &str, row: &LatestFlagsRow) -> Result<LatestCandidate, RepositoryError> {
    Ok(LatestCandidate {
        version_key: row.version_key.clone(),
        version: parse_version(id, &row.version)?,
        created: parse_timestamp("created", &row.created)?,
    })
}

/// Recomputes and stores the flags for `id`. Only rows whose flags change are
/// written, so a second run on an unchanged set writes nothing.
pub(crate) fn update_latest_versions(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<LatestAssignment, RepositoryError> {
    let rows = packages::load_latest_flags(conn, id, ClientCompatibility::MAX)?;
    let candidates = rows
        .iter()
        .map(|row| candidate_from_row(id, row))
        .collect::<Result<Vec<_>, _>>()?;

    let assignment = resolve_latest(&candidates);

    let mut changed = 0;
    for row in &rows {
        let (is_latest, is_absolute_latest) = assignment.flags_for(&row.version_key);
        if row.is_latest_version != is_latest || row.is_absolute_latest_version != is_absolute_latest {
            packages::set_latest_flags(conn, id, &row.version_key, is_latest, is_absolute_latest)?;
            changed += 1;
        }
    }

    debug!(
        package_id = id,
        versions = rows.len(),
        changed = changed,
        latest = ?assignment.latest,
        absolute_latest = ?assignment.absolute_latest,
        "Latest versions resolved"
    );

    Ok(assignment)
}
