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


use std::sync::Arc;

use crate::fixtures::{metadata, payload, v, TestFixture};

#[tokio::test]
async fn test_get_payload_returns_stored_bytes() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    let repository = fixture.repository();

    let bytes = repository.get_payload("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(&bytes[..], &payload("Foo", "1.0.0")[..]);
    assert!(repository.get_payload("Foo", &v("2.0.0")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_payload_cache_is_filled_and_cleared() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    let repository = fixture.repository();

    assert!(repository.payload_cache().is_empty());
    let first = repository.get_payload("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(repository.payload_cache().len(), 1);

    let second = repository.get_payload("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    repository.clear_payload_cache();
    assert!(repository.payload_cache().is_empty());

    // records are untouched
    assert!(repository.exists("Foo", &v("1.0.0")).await.unwrap());
    let third = repository.get_payload("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(first, third);
}

#[tokio::test]
async fn test_override_invalidates_cached_payload() {
    let fixture = TestFixture::new().await;
    let repository = fixture.repository();

    repository
        .add("Foo", &v("1.0.0"), metadata("old"), b"old".to_vec())
        .await
        .unwrap();
    repository.get_payload("Foo", &v("1.0.0")).await.unwrap();

    repository
        .add("Foo", &v("1.0.0"), metadata("new"), b"new".to_vec())
        .await
        .unwrap();
    let bytes = repository.get_payload("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert_eq!(&bytes[..], b"new");
}

#[tokio::test]
async fn test_delete_invalidates_cached_payload() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    let repository = fixture.repository();

    repository.get_payload("Foo", &v("1.0.0")).await.unwrap();
    repository.remove("Foo", &v("1.0.0")).await.unwrap();

    assert!(repository.get_payload("Foo", &v("1.0.0")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_payload_lookup_ignores_build_metadata() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0+build.7").await;

    let bytes = fixture
        .repository()
        .get_payload("Foo", &v("1.0.0"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&bytes[..], &payload("Foo", "1.0.0+build.7")[..]);
}
