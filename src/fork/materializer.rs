//! Apply a resolved snapshot onto resource payloads headed for the host.

use super::resolver::resolve_reference;
use super::ForkReference;
use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::host::CatalogActions;
use crate::model::Resource;

/// Copy the forked fields from the source and pin the reference.
///
/// Forked values replace anything the caller supplied for the same fields.
/// Nothing is persisted here.
pub async fn materialize_for_create(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    mut resource: Resource,
) -> Result<Resource> {
    let reference = resource.fork_reference().ok_or_else(|| {
        ForkError::InvalidReference("resource does not carry a fork reference".to_string())
    })?;
    let snapshot = resolve_reference(host, ctx, &reference).await?;

    resource.tracked.apply_forked(&snapshot.resource_fields);
    resource.fork = ForkReference::pinned(&reference.source_id, &snapshot.revision_id).to_string();

    tracing::debug!("Materialized fork {} onto resource {:?}", resource.fork, resource.id);
    Ok(resource)
}

/// Refresh the fork of an updated resource, or drop it if the caller edited
/// the forked fields by hand.
pub async fn materialize_for_update(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    mut incoming: Resource,
) -> Result<Resource> {
    let previous = previous_resource(host, ctx, &incoming.id).await?;

    if incoming.is_fork() && !metadata_changed(&incoming, previous.as_ref()) {
        return materialize_for_create(host, ctx, incoming).await;
    }

    if previous.as_ref().is_some_and(Resource::is_fork) {
        tracing::info!("Clearing fork of resource {}", incoming.id);
    }
    incoming.fork.clear();
    Ok(incoming)
}

/// Whether the payload manually changes forked fields of a forked resource
pub fn metadata_changed(incoming: &Resource, previous: Option<&Resource>) -> bool {
    let forked = incoming.is_fork() || previous.is_some_and(Resource::is_fork);
    if !forked {
        return false;
    }
    match previous {
        Some(previous) => incoming.tracked.overrides(&previous.tracked),
        None => incoming.tracked.overrides(&Default::default()),
    }
}

async fn previous_resource(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    id: &str,
) -> Result<Option<Resource>> {
    if id.is_empty() {
        return Ok(None);
    }
    match host.resource_show(ctx, id).await {
        Ok(resource) => Ok(Some(resource)),
        Err(ForkError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fork::testing::{forked_data, giftless_metadata, patch_source, target_dataset};
    use crate::host::MemoryCatalog;
    use crate::model::TrackedFields;

    fn fork_of(package_id: &str, fork: &str) -> Resource {
        Resource {
            package_id: package_id.to_string(),
            fork: fork.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_without_revision_pins_current() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let resource = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();

        assert_eq!(resource.fork, format!("{}@{}", source.resource_id, source.activity_id));
        let expected = giftless_metadata();
        assert_eq!(resource.tracked.sha256, expected.sha256);
        assert_eq!(resource.tracked.size, expected.size);
        assert_eq!(resource.tracked.lfs_prefix, expected.lfs_prefix);
        assert_eq!(resource.tracked.url_type, expected.url_type);
    }

    #[tokio::test]
    async fn test_create_is_idempotent_for_unchanged_source() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let first = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();
        let second = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();
        assert_eq!(first.fork, second.fork);
    }

    #[tokio::test]
    async fn test_create_with_revision_copies_historical_fields() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;
        patch_source(&catalog, &source.resource_id, "newsha").await;

        let pinned = format!("{}@{}", source.resource_id, source.activity_id);
        let resource = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &pinned))
            .await
            .unwrap();
        assert_eq!(resource.tracked.sha256.as_deref(), Some("dummysha"));
        assert_eq!(resource.fork, pinned);
    }

    #[tokio::test]
    async fn test_forked_values_win_over_supplied_values() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let mut payload = fork_of(&target.id, &source.resource_id);
        payload.tracked = TrackedFields {
            sha256: Some("manual".into()),
            name: Some("My copy".into()),
            ..Default::default()
        };
        let resource = materialize_for_create(&catalog, &ctx, payload).await.unwrap();
        assert_eq!(resource.tracked.sha256.as_deref(), Some("dummysha"));
        // `name` is not a forked field
        assert_eq!(resource.tracked.name.as_deref(), Some("My copy"));
    }

    #[tokio::test]
    async fn test_create_rejects_missing_source_id() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();

        for fork in ["", "@some-activity"] {
            let result = materialize_for_create(&catalog, &ctx, fork_of("d", fork)).await;
            assert!(matches!(result, Err(ForkError::InvalidReference(_))), "fork {:?}", fork);
        }
        let result = materialize_for_create(&catalog, &ctx, fork_of("d", "missing")).await;
        assert!(matches!(result, Err(ForkError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_with_changed_sha_clears_fork() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let fork = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();
        let stored = catalog.resource_create(&ctx, fork).await.unwrap();

        let mut incoming = stored.clone();
        incoming.tracked.sha256 = Some("edited".into());
        let updated = materialize_for_update(&catalog, &ctx, incoming).await.unwrap();
        assert_eq!(updated.fork, "");
        assert_eq!(updated.tracked.sha256.as_deref(), Some("edited"));
    }

    #[tokio::test]
    async fn test_update_without_tracked_changes_refreshes_fork() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let fork = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();
        let stored = catalog.resource_create(&ctx, fork).await.unwrap();

        let patched = patch_source(&catalog, &source.resource_id, "newsha").await;
        let latest = catalog.package_activity_list(&ctx, &source.dataset_id).await.unwrap()[0]
            .id
            .clone();

        let incoming = Resource {
            id: stored.id.clone(),
            fork: source.resource_id.clone(),
            ..Default::default()
        };
        let updated = materialize_for_update(&catalog, &ctx, incoming).await.unwrap();
        assert_eq!(updated.fork, format!("{}@{}", source.resource_id, latest));
        assert_eq!(updated.tracked.sha256, patched.tracked.sha256);
    }

    #[tokio::test]
    async fn test_update_keeps_pin_when_other_fields_change() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let fork = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();
        let mut incoming = catalog.resource_create(&ctx, fork).await.unwrap();
        incoming
            .extras
            .insert("description".into(), serde_json::json!("New description"));

        let updated = materialize_for_update(&catalog, &ctx, incoming).await.unwrap();
        assert_eq!(updated.fork, format!("{}@{}", source.resource_id, source.activity_id));
        assert_eq!(updated.extras["description"], serde_json::json!("New description"));
    }

    #[tokio::test]
    async fn test_update_without_fork_clears_binding() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let target = target_dataset(&catalog).await;

        let fork = materialize_for_create(&catalog, &ctx, fork_of(&target.id, &source.resource_id))
            .await
            .unwrap();
        let stored = catalog.resource_create(&ctx, fork).await.unwrap();

        let incoming = Resource {
            id: stored.id,
            url: Some("http://link.to.some.data".into()),
            ..Default::default()
        };
        let updated = materialize_for_update(&catalog, &ctx, incoming).await.unwrap();
        assert_eq!(updated.fork, "");
    }

    #[tokio::test]
    async fn test_update_of_unsaved_resource_adds_fork() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;

        let incoming = Resource {
            id: "brand-new".into(),
            fork: source.resource_id.clone(),
            ..Default::default()
        };
        let updated = materialize_for_update(&catalog, &ctx, incoming).await.unwrap();
        assert_eq!(updated.fork, format!("{}@{}", source.resource_id, source.activity_id));
        assert_eq!(updated.tracked.sha256.as_deref(), Some("dummysha"));
    }

    #[test]
    fn test_metadata_changed_needs_a_fork_on_either_side() {
        let plain = Resource {
            tracked: TrackedFields {
                sha256: Some("a".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let edited = Resource {
            tracked: TrackedFields {
                sha256: Some("b".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(!metadata_changed(&edited, Some(&plain)));

        let forked_previous = Resource {
            fork: "src@act".into(),
            ..plain.clone()
        };
        assert!(metadata_changed(&edited, Some(&forked_previous)));
        assert!(!metadata_changed(&plain, Some(&forked_previous)));
    }
}
