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


use feedvault::{RepositoryError, StorageError};
use std::time::Duration;

use crate::fixtures::{metadata, v, TestFixture};

#[tokio::test]
async fn test_records_and_payloads_stay_paired() {
    let fixture = TestFixture::new().await;
    let repository = fixture.repository();

    fixture.add("Foo", "1.0.0").await;
    fixture.add("Foo", "1.0.0").await;
    fixture.add("Foo", "2.0.0").await;
    fixture.add("Bar", "1.0.0").await;
    repository.remove("Foo", &v("2.0.0")).await.unwrap();

    assert!(repository.unpaired_keys().await.unwrap().is_empty());
    assert_eq!(repository.dal().packages().count().await.unwrap(), 2);
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;

    let reopened = fixture.reopen(Some(Duration::from_secs(30))).await;
    let found = reopened.find("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert!(found.is_latest_version);
    assert_eq!(found.authors, vec!["Test Author"]);
}

#[tokio::test]
async fn test_timed_out_add_is_not_applied() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;

    let impatient = fixture.reopen(Some(Duration::from_nanos(1))).await;
    let err = impatient
        .add("Foo", &v("2.0.0"), metadata("late"), b"late".to_vec())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Storage(StorageError::Timeout { .. })
    ));

    let repository = fixture.repository();
    assert!(!repository.exists("Foo", &v("2.0.0")).await.unwrap());
    let current = repository.find("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert!(current.is_absolute_latest_version);
    assert!(repository.unpaired_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_timed_out_remove_is_not_applied() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;

    let impatient = fixture.reopen(Some(Duration::from_nanos(1))).await;
    let err = impatient.remove("Foo", &v("1.0.0")).await.unwrap_err();
    assert!(matches!(
        err,
        RepositoryError::Storage(StorageError::Timeout { .. })
    ));

    assert!(fixture.repository().exists("Foo", &v("1.0.0")).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_with_larger_pool() {
    let fixture = TestFixture::new().await;
    let repository = fixture.reopen_with_pool_size(4).await;

    let mut handles = Vec::new();
    for n in 0..32 {
        let repository = repository.clone();
        handles.push(tokio::spawn(async move {
            let id = format!("Pkg{}", n % 4);
            let version = v(&format!("1.{}.0", n / 4));
            repository
                .add(&id, &version, metadata("concurrent"), vec![n as u8])
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(repository.dal().packages().count().await.unwrap(), 32);
    for n in 0..4 {
        let id = format!("Pkg{}", n);
        let all = repository
            .find_all_by_id(&id, feedvault::ClientCompatibility::MAX)
            .await
            .unwrap();
        assert_eq!(all.len(), 8);
        let absolute: Vec<_> = all.iter().filter(|p| p.is_absolute_latest_version).collect();
        assert_eq!(absolute.len(), 1);
        assert_eq!(absolute[0].version.to_string(), "1.7.0");
    }
    assert!(repository.unpaired_keys().await.unwrap().is_empty());
}
