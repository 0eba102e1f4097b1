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

//! Diesel table definitions for the package store.

diesel::table! {
    packages (package_id, version_key) {
        package_id -> Text,
        version_key -> Text,
        version -> Text,
        title -> Nullable<Text>,
        description -> Nullable<Text>,
        summary -> Nullable<Text>,
        release_notes -> Nullable<Text>,
        copyright -> Nullable<Text>,
        language -> Nullable<Text>,
        tags -> Nullable<Text>,
        authors -> Text,
        owners -> Text,
        icon_url -> Nullable<Text>,
        license_url -> Nullable<Text>,
        project_url -> Nullable<Text>,
        report_abuse_url -> Nullable<Text>,
        min_client_version -> Nullable<Text>,
        require_license_acceptance -> Bool,
        development_dependency -> Bool,
        dependency_sets -> Text,
        supported_frameworks -> Text,
        listed -> Bool,
        is_prerelease -> Bool,
        is_semver2 -> Bool,
        is_latest_version -> Bool,
        is_absolute_latest_version -> Bool,
        package_size -> BigInt,
        package_hash -> Text,
        package_hash_algorithm -> Text,
        created -> Text,
        last_updated -> Text,
        published -> Nullable<Text>,
    }
}

diesel::table! {
    package_data (package_id, version_key) {
        package_id -> Text,
        version_key -> Text,
        version -> Text,
        data -> Binary,
        created -> Text,
        last_updated -> Text,
    }
}

diesel::allow_tables_to_appear_in_same_query!(packages, package_data);
