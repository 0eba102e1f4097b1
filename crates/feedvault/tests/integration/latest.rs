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


use feedvault::{ClientCompatibility, Package, SearchQuery};
use std::collections::HashMap;

use crate::fixtures::{keys, v, TestFixture};

async fn flags(fixture: &TestFixture, id: &str) -> HashMap<String, (bool, bool)> {
    fixture
        .repository()
        .find_all_by_id(id, ClientCompatibility::MAX)
        .await
        .unwrap()
        .into_iter()
        .map(|p: Package| {
            (
                p.version.to_string(),
                (p.is_latest_version, p.is_absolute_latest_version),
            )
        })
        .collect()
}

#[tokio::test]
async fn test_stable_and_prerelease_scenario() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    fixture.add("Foo", "2.0.0-beta").await;
    let repository = fixture.repository();

    let stable_only = repository.search(&SearchQuery::new("Foo")).await.unwrap();
    assert_eq!(keys(&stable_only), vec!["Foo 1.0.0"]);

    let with_prerelease = repository
        .search(&SearchQuery::new("Foo").allow_prerelease(true))
        .await
        .unwrap();
    assert_eq!(keys(&with_prerelease), vec!["Foo 1.0.0", "Foo 2.0.0-beta"]);

    let stable = repository.find("Foo", &v("1.0.0")).await.unwrap().unwrap();
    assert!(stable.is_latest_version);
    assert!(!stable.is_absolute_latest_version);

    let beta = repository.find("Foo", &v("2.0.0-beta")).await.unwrap().unwrap();
    assert!(!beta.is_latest_version);
    assert!(beta.is_absolute_latest_version);
}

#[tokio::test]
async fn test_exactly_one_absolute_latest() {
    let fixture = TestFixture::new().await;
    for version in ["1.0.0", "1.2.0", "1.10.0", "1.9.0-rc.1", "0.5.0"] {
        fixture.add("Foo", version).await;
    }

    let flags = flags(&fixture, "Foo").await;
    let absolute: Vec<_> = flags.iter().filter(|(_, f)| f.1).map(|(k, _)| k.clone()).collect();
    let latest: Vec<_> = flags.iter().filter(|(_, f)| f.0).map(|(k, _)| k.clone()).collect();
    assert_eq!(absolute, vec!["1.10.0"]);
    assert_eq!(latest, vec!["1.10.0"]);
}

#[tokio::test]
async fn test_prerelease_add_leaves_stable_latest() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    fixture.add("Foo", "2.0.0").await;
    fixture.add("Foo", "1.5.0-alpha").await;

    let flags = flags(&fixture, "Foo").await;
    assert_eq!(flags["2.0.0"], (true, true));
    assert_eq!(flags["1.5.0-alpha"], (false, false));
    assert_eq!(flags["1.0.0"], (false, false));
}

#[tokio::test]
async fn test_only_prereleases_have_no_latest() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0-alpha").await;
    fixture.add("Foo", "1.0.0-beta").await;

    let flags = flags(&fixture, "Foo").await;
    assert!(flags.values().all(|f| !f.0));
    assert_eq!(flags["1.0.0-beta"], (false, true));
}

#[tokio::test]
async fn test_resolver_is_idempotent() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    fixture.add("Foo", "2.0.0-beta").await;
    let repository = fixture.repository();

    let first = repository.update_latest_versions("Foo").await.unwrap();
    let before = flags(&fixture, "Foo").await;
    let second = repository.update_latest_versions("Foo").await.unwrap();
    let after = flags(&fixture, "Foo").await;

    assert_eq!(first, second);
    assert_eq!(before, after);
    assert_eq!(first.latest.as_deref(), Some("1.0.0"));
    assert_eq!(first.absolute_latest.as_deref(), Some("2.0.0-beta"));
}

#[tokio::test]
async fn test_resolver_sees_extended_scheme_versions() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    fixture.add("Foo", "1.1.0+build.5").await;

    let flags = flags(&fixture, "Foo").await;
    assert_eq!(flags["1.1.0+build.5"], (true, true));
    assert_eq!(flags["1.0.0"], (false, false));
}

#[tokio::test]
async fn test_ids_resolve_independently() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    fixture.add("Bar", "3.0.0").await;
    fixture.add("Foo", "2.0.0").await;

    assert_eq!(flags(&fixture, "Bar").await["3.0.0"], (true, true));
    assert_eq!(flags(&fixture, "Foo").await["2.0.0"], (true, true));
}

#[tokio::test]
async fn test_update_latest_versions_for_unknown_id() {
    let fixture = TestFixture::new().await;
    let assignment = fixture
        .repository()
        .update_latest_versions("Nothing")
        .await
        .unwrap();
    assert!(assignment.latest.is_none());
    assert!(assignment.absolute_latest.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_adds_leave_one_latest() {
    let fixture = TestFixture::new().await;
    let mut handles = Vec::new();
    for minor in 0..8 {
        let repository = fixture.repository().clone();
        handles.push(tokio::spawn(async move {
            let version = v(&format!("1.{}.0", minor));
            repository
                .add("Foo", &version, Default::default(), vec![minor as u8])
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let flags = flags(&fixture, "Foo").await;
    assert_eq!(flags.len(), 8);
    assert_eq!(flags.values().filter(|f| f.1).count(), 1);
    assert_eq!(flags["1.7.0"], (true, true));
}
