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

//! The blob store: package payload bytes in `package_data`.
//!
//! Payload rows pair one-to-one with `packages` rows on
//! `(package_id, version_key)`. The pairing is maintained by the repository,
//! which always writes or deletes both rows in the same transaction.

use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::sqlite::SqliteConnection;

use super::models::PackageDataRow;
use super::DAL;
use crate::database::schema::package_data;
use crate::error::RepositoryError;
use crate::version::PackageVersion;

pub(crate) fn insert(conn: &mut SqliteConnection, row: &PackageDataRow) -> QueryResult<usize> {
    diesel::insert_into(package_data::table)
        .values(row)
        .execute(conn)
}

pub(crate) fn delete(
    conn: &mut SqliteConnection,
    id: &str,
    version: &PackageVersion,
) -> QueryResult<usize> {
    diesel::delete(
        package_data::table
            .filter(package_data::package_id.eq(id))
            .filter(package_data::version_key.eq(version.normalized())),
    )
    .execute(conn)
}

pub(crate) fn retrieve(
    conn: &mut SqliteConnection,
    id: &str,
    version: &PackageVersion,
) -> QueryResult<Option<Vec<u8>>> {
    package_data::table
        .filter(package_data::package_id.eq(id))
        .filter(package_data::version_key.eq(version.normalized()))
        .select(package_data::data)
        .first(conn)
        .optional()
}

/// A key present in one table but not the other.
#[derive(Debug, Clone, PartialEq, Eq, QueryableByName)]
pub struct UnpairedKey {
    #[diesel(sql_type = Text)]
    pub table_name: String,
    #[diesel(sql_type = Text)]
    pub package_id: String,
    #[diesel(sql_type = Text)]
    pub version: String,
}

const UNPAIRED_KEYS_SQL: &str = "\
    SELECT 'packages' AS table_name, p.package_id, p.version \
    FROM packages p LEFT JOIN package_data d \
      ON d.package_id = p.package_id AND d.version_key = p.version_key \
    WHERE d.package_id IS NULL \
    UNION ALL \
    SELECT 'package_data' AS table_name, d.package_id, d.version \
    FROM package_data d LEFT JOIN packages p \
      ON p.package_id = d.package_id AND p.version_key = d.version_key \
    WHERE p.package_id IS NULL";

/// Access to stored payloads.
#[derive(Clone)]
pub struct PackageDataDAL<'a> {
    pub(super) dal: &'a DAL,
}

impl<'a> PackageDataDAL<'a> {
    pub async fn retrieve(
        &self,
        id: &str,
        version: &PackageVersion,
    ) -> Result<Option<Vec<u8>>, RepositoryError> {
        let id = id.to_string();
        let version = version.clone();
        self.dal
            .read("retrieve_payload", move |conn| {
                Ok(retrieve(conn, &id, &version)?)
            })
            .await
    }

    /// Lists metadata rows without a payload and payloads without metadata.
    /// An empty result means the store is consistent.
    pub async fn unpaired_keys(&self) -> Result<Vec<UnpairedKey>, RepositoryError> {
        self.dal
            .read("unpaired_keys", |conn| {
                Ok(diesel::sql_query(UNPAIRED_KEYS_SQL).load::<UnpairedKey>(conn)?)
            })
            .await
    }
}
