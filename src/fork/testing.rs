//! Shared fixtures for fork tests.

use serde_json::json;
use uuid::Uuid;

use crate::context::CallerContext;
use crate::host::{CatalogActions, MemoryCatalog};
use crate::model::{Dataset, Organization, Resource, TrackedFields};

pub struct SourceFixture {
    pub dataset_id: String,
    pub dataset_name: String,
    pub resource_id: String,
    pub resource: Resource,
    pub activity_id: String,
}

pub fn giftless_metadata() -> TrackedFields {
    TrackedFields {
        lfs_prefix: Some("test/resource".into()),
        size: Some(999),
        sha256: Some("dummysha".into()),
        url_type: Some("upload".into()),
        name: Some("Source resource".into()),
    }
}

async fn source(catalog: &MemoryCatalog, private: bool) -> SourceFixture {
    let ctx = CallerContext::ignoring_auth();
    let organization = catalog.add_organization(Organization {
        name: format!("org-{}", Uuid::new_v4()),
        title: "Test Organization".into(),
        ..Default::default()
    });
    let dataset = catalog
        .package_create(
            &ctx,
            Dataset {
                name: format!("source-{}", Uuid::new_v4()),
                title: "Source dataset".into(),
                private,
                owner_org: Some(organization.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let resource = catalog
        .resource_create(
            &ctx,
            Resource {
                package_id: dataset.id.clone(),
                tracked: giftless_metadata(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    catalog
        .package_patch(&ctx, &dataset.id, json!({ "notes": "An activity" }).as_object().unwrap())
        .unwrap();
    let activity_id = catalog
        .package_activity_list(&ctx, &dataset.id)
        .await
        .unwrap()[0]
        .id
        .clone();

    SourceFixture {
        dataset_id: dataset.id,
        dataset_name: dataset.name,
        resource_id: resource.id.clone(),
        resource,
        activity_id,
    }
}

/// A public dataset holding one LFS-backed resource, plus one later activity
pub async fn forked_data(catalog: &MemoryCatalog) -> SourceFixture {
    source(catalog, false).await
}

pub async fn private_source(catalog: &MemoryCatalog) -> SourceFixture {
    source(catalog, true).await
}

/// An empty dataset to create forks in
pub async fn target_dataset(catalog: &MemoryCatalog) -> Dataset {
    catalog
        .package_create(
            &CallerContext::ignoring_auth(),
            Dataset {
                name: format!("target-{}", Uuid::new_v4()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
}

pub async fn patch_source(catalog: &MemoryCatalog, resource_id: &str, sha256: &str) -> Resource {
    catalog
        .resource_patch(
            &CallerContext::ignoring_auth(),
            resource_id,
            json!({ "sha256": sha256 }).as_object().unwrap(),
        )
        .unwrap()
}
