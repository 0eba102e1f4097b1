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


use feedvault::models::package::MAX_TITLE_LENGTH;
use feedvault::{PackageMetadata, RepositoryError, RepositoryPolicy, StorageError};

use crate::fixtures::{metadata, payload, v, TestFixture};

fn symbols_metadata() -> PackageMetadata {
    PackageMetadata {
        files: vec![
            "lib/net45/Foo.dll".to_string(),
            "lib/net45/Foo.pdb".to_string(),
            "src/Foo/Class1.cs".to_string(),
        ],
        ..metadata("Foo symbols")
    }
}

#[tokio::test]
async fn test_add_returns_stored_record() {
    let fixture = TestFixture::new().await;
    let repository = fixture.repository();

    let record = repository
        .add("Foo", &v("1.0.0"), metadata("Foo package"), payload("Foo", "1.0.0"))
        .await
        .unwrap();

    assert_eq!(record.id, "Foo");
    assert_eq!(record.version.to_string(), "1.0.0");
    assert!(record.listed);
    assert!(record.is_latest_version);
    assert!(record.is_absolute_latest_version);
    assert_eq!(record.package_size, payload("Foo", "1.0.0").len() as i64);
    assert_eq!(record.package_hash_algorithm, "SHA512");
    assert!(!record.package_hash.is_empty());
    assert_eq!(record.authors, vec!["Test Author"]);
    assert_eq!(record.created, record.last_updated);

    assert!(repository.exists("Foo", &v("1.0.0")).await.unwrap());
    let found = repository.find("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(found.description.as_deref(), Some("Foo package"));
    assert_eq!(found.package_hash, record.package_hash);
}

#[tokio::test]
async fn test_ids_are_case_sensitive() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;

    let repository = fixture.repository();
    assert!(!repository.exists("foo", &v("1.0.0")).await.unwrap());
    assert!(repository.find("FOO", &v("1.0.0")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_rejected_without_override() {
    let fixture = TestFixture::with_policy(RepositoryPolicy {
        allow_override_existing_package_on_push: false,
        ..Default::default()
    })
    .await;
    let repository = fixture.repository();

    repository
        .add("X", &v("1.0.0"), metadata("first"), b"first".to_vec())
        .await
        .unwrap();
    let err = repository
        .add("X", &v("1.0.0"), metadata("second"), b"second".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicatePackage { .. }));
    assert!(err.is_policy_rejection());
    let message = err.to_string();
    assert!(message.contains("X"));
    assert!(message.contains("1.0.0"));

    let payload = repository.get_payload("X", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(&payload[..], b"first");
}

#[tokio::test]
async fn test_override_replaces_payload_and_metadata() {
    let fixture = TestFixture::new().await;
    let repository = fixture.repository();

    repository
        .add("X", &v("1.0.0"), metadata("first"), b"first".to_vec())
        .await
        .unwrap();
    let replaced = repository
        .add("X", &v("1.0.0"), metadata("second"), b"second".to_vec())
        .await
        .unwrap();

    assert_eq!(replaced.description.as_deref(), Some("second"));
    assert!(replaced.is_latest_version);
    assert_eq!(repository.find_all_by_id("X", Default::default()).await.unwrap().len(), 1);

    let payload = repository.get_payload("X", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(&payload[..], b"second");
}

#[tokio::test]
async fn test_build_metadata_does_not_create_a_new_version() {
    let fixture = TestFixture::with_policy(RepositoryPolicy {
        allow_override_existing_package_on_push: false,
        ..Default::default()
    })
    .await;
    let repository = fixture.repository();

    repository
        .add("Foo", &v("1.0.0+build.1"), metadata("built"), b"a".to_vec())
        .await
        .unwrap();

    // same version for uniqueness, supplied text kept
    assert!(repository.exists("Foo", &v("1.0.0")).await.unwrap());
    let found = repository.find("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(found.version.to_string(), "1.0.0+build.1");

    let err = repository
        .add("Foo", &v("1.0.0+build.2"), metadata("built"), b"b".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicatePackage { .. }));
}

#[tokio::test]
async fn test_symbols_package_rejected_when_ignored() {
    let fixture = TestFixture::with_policy(RepositoryPolicy {
        ignore_symbols_packages: true,
        ..Default::default()
    })
    .await;
    let repository = fixture.repository();

    let err = repository
        .add("Foo", &v("1.0.0"), symbols_metadata(), b"symbols".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::SymbolsPackageRejected { .. }));
    assert!(err.to_string().contains("Foo"));
    assert!(!repository.exists("Foo", &v("1.0.0")).await.unwrap());
}

#[tokio::test]
async fn test_symbols_check_precedes_duplicate_check() {
    let fixture = TestFixture::with_policy(RepositoryPolicy {
        ignore_symbols_packages: true,
        allow_override_existing_package_on_push: false,
        ..Default::default()
    })
    .await;
    fixture.add("Foo", "1.0.0").await;

    let err = fixture
        .repository()
        .add("Foo", &v("1.0.0"), symbols_metadata(), b"symbols".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::SymbolsPackageRejected { .. }));
}

#[tokio::test]
async fn test_symbols_package_accepted_by_default() {
    let fixture = TestFixture::new().await;
    let record = fixture
        .repository()
        .add("Foo", &v("1.0.0"), symbols_metadata(), b"symbols".to_vec())
        .await
        .unwrap();
    assert_eq!(record.id, "Foo");
}

#[tokio::test]
async fn test_oversized_title_is_rejected_and_nothing_stored() {
    let fixture = TestFixture::new().await;
    let repository = fixture.repository();

    let metadata = PackageMetadata {
        title: Some("t".repeat(MAX_TITLE_LENGTH + 1)),
        ..metadata("long title")
    };
    let err = repository
        .add("Foo", &v("1.0.0"), metadata, b"data".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RepositoryError::Storage(StorageError::ColumnLimit { column: "title", .. })
    ));
    assert!(!repository.exists("Foo", &v("1.0.0")).await.unwrap());
    assert!(repository.unpaired_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_policy_changes_apply_to_next_operation() {
    let fixture = TestFixture::new().await;
    fixture.add("X", "1.0.0").await;

    fixture
        .repository()
        .update_policy(|p| p.allow_override_existing_package_on_push = false);

    let err = fixture
        .repository()
        .add("X", &v("1.0.0"), metadata("again"), b"again".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::DuplicatePackage { .. }));
}
