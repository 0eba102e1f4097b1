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


use feedvault::{ClientCompatibility, InstalledPackage, PackageMetadata, UpdateQuery, VersionRange};

use crate::fixtures::{v, TestFixture};

async fn seed(fixture: &TestFixture) {
    for version in ["1.0.0", "1.1.0", "2.0.0", "3.0.0-beta", "3.1.0-beta.2"] {
        fixture.add("Foo", version).await;
    }
    fixture.add("Bar", "1.0.0").await;
}

fn versions(packages: &[feedvault::Package]) -> Vec<String> {
    packages.iter().map(|p| format!("{} {}", p.id, p.version)).collect()
}

#[tokio::test]
async fn test_updates_return_highest_newer_version() {
    let fixture = TestFixture::new().await;
    seed(&fixture).await;

    let query = UpdateQuery::new(vec![
        InstalledPackage::new("Foo", v("1.0.0")),
        InstalledPackage::new("Bar", v("1.0.0")),
    ]);
    let updates = fixture.repository().get_updates(&query).await.unwrap();
    assert_eq!(versions(&updates), vec!["Foo 2.0.0"]);
}

#[tokio::test]
async fn test_updates_with_prerelease_and_all_versions() {
    let fixture = TestFixture::new().await;
    seed(&fixture).await;

    let query = UpdateQuery::new(vec![InstalledPackage::new("Foo", v("1.0.0"))])
        .include_prerelease(true)
        .include_all_versions(true);
    let updates = fixture.repository().get_updates(&query).await.unwrap();
    assert_eq!(versions(&updates), vec!["Foo 1.1.0", "Foo 2.0.0", "Foo 3.0.0-beta"]);

    let query = query.compatibility(ClientCompatibility::MAX);
    let updates = fixture.repository().get_updates(&query).await.unwrap();
    assert_eq!(updates.len(), 4);
}

#[tokio::test]
async fn test_updates_honour_constraints() {
    let fixture = TestFixture::new().await;
    seed(&fixture).await;

    let installed = InstalledPackage::new("Foo", v("1.0.0"))
        .with_constraint(VersionRange::parse("[1.0.0,2.0.0)").unwrap());
    let updates = fixture
        .repository()
        .get_updates(&UpdateQuery::new(vec![installed]))
        .await
        .unwrap();
    assert_eq!(versions(&updates), vec!["Foo 1.1.0"]);
}

#[tokio::test]
async fn test_updates_skip_unlisted_and_incompatible() {
    let fixture = TestFixture::new().await;
    fixture.add("Foo", "1.0.0").await;
    fixture
        .repository()
        .add(
            "Foo",
            &v("1.5.0"),
            PackageMetadata {
                supported_frameworks: vec!["net45".to_string()],
                ..Default::default()
            },
            b"x".to_vec(),
        )
        .await
        .unwrap();
    fixture.add("Foo", "2.0.0").await;
    fixture
        .repository()
        .update_policy(|p| p.enable_delisting = true);
    fixture.repository().remove("Foo", &v("2.0.0")).await.unwrap();

    let query = UpdateQuery::new(vec![InstalledPackage::new("Foo", v("1.0.0"))]);
    let updates = fixture.repository().get_updates(&query).await.unwrap();
    assert_eq!(versions(&updates), vec!["Foo 1.5.0"]);

    let query = query.target_frameworks(["net40"]);
    assert!(fixture.repository().get_updates(&query).await.unwrap().is_empty());
}
