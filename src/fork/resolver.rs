//! Resolve a fork reference to the source's metadata at a point in time.

use serde::Serialize;

use super::ForkReference;
use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::host::CatalogActions;
use crate::model::{DatasetIdentity, TrackedFields};

/// Source metadata at the resolved revision
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResolvedSnapshot {
    pub resource_id: String,
    pub resource_fields: TrackedFields,
    pub dataset: DatasetIdentity,
    /// Always concrete; an unpinned reference resolves to the latest revision
    pub revision_id: String,
}

pub async fn resolve_reference(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    reference: &ForkReference,
) -> Result<ResolvedSnapshot> {
    reference.validate()?;
    resolve(host, ctx, &reference.source_id, reference.revision()).await
}

/// Current state when `revision_id` is absent, otherwise the state recorded
/// in that dataset activity.
pub async fn resolve(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    source_id: &str,
    revision_id: Option<&str>,
) -> Result<ResolvedSnapshot> {
    if source_id.is_empty() {
        return Err(ForkError::InvalidReference(
            "a source resource id is required".to_string(),
        ));
    }

    match revision_id.filter(|revision| !revision.is_empty()) {
        Some(revision) => resolve_historical(host, ctx, source_id, revision).await,
        None => resolve_current(host, ctx, source_id).await,
    }
}

async fn resolve_current(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    source_id: &str,
) -> Result<ResolvedSnapshot> {
    let resource = host.resource_show(ctx, source_id).await?;
    let dataset = host.package_show(ctx, &resource.package_id).await?;
    let latest = host
        .package_activity_list(ctx, &dataset.id)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ForkError::NotFound(format!("Activity for dataset {}", dataset.id)))?;

    tracing::debug!(
        "Resolved {} to current revision {} of dataset {}",
        source_id,
        latest.id,
        dataset.id
    );

    Ok(ResolvedSnapshot {
        resource_id: resource.id,
        resource_fields: resource.tracked,
        dataset: DatasetIdentity::from(&dataset),
        revision_id: latest.id,
    })
}

async fn resolve_historical(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    source_id: &str,
    revision_id: &str,
) -> Result<ResolvedSnapshot> {
    let history_ctx = ctx.for_history_lookup();
    let dataset = host.activity_data_show(&history_ctx, revision_id).await?;
    let resource = dataset
        .resource(source_id)
        .ok_or_else(|| ForkError::ResourceNotInRevision {
            resource_id: source_id.to_string(),
            revision_id: revision_id.to_string(),
        })?;

    tracing::debug!(
        "Resolved {} at revision {} of dataset {}",
        source_id,
        revision_id,
        dataset.id
    );

    Ok(ResolvedSnapshot {
        resource_id: resource.id.clone(),
        resource_fields: resource.tracked.clone(),
        dataset: DatasetIdentity::from(&dataset),
        revision_id: revision_id.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fork::testing::{forked_data, patch_source};
    use crate::host::MemoryCatalog;

    #[tokio::test]
    async fn test_resolve_current_uses_latest_activity() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;

        let snapshot = resolve(&catalog, &ctx, &source.resource_id, None).await.unwrap();
        assert_eq!(snapshot.revision_id, source.activity_id);
        assert_eq!(snapshot.resource_fields.sha256.as_deref(), Some("dummysha"));
        assert_eq!(snapshot.dataset.id, source.dataset_id);

        patch_source(&catalog, &source.resource_id, "newsha").await;
        let snapshot = resolve(&catalog, &ctx, &source.resource_id, None).await.unwrap();
        assert_ne!(snapshot.revision_id, source.activity_id);
        assert_eq!(snapshot.resource_fields.sha256.as_deref(), Some("newsha"));
    }

    #[tokio::test]
    async fn test_resolve_historical_ignores_later_changes() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        patch_source(&catalog, &source.resource_id, "newsha").await;

        let snapshot = resolve(&catalog, &ctx, &source.resource_id, Some(&source.activity_id))
            .await
            .unwrap();
        assert_eq!(snapshot.revision_id, source.activity_id);
        assert_eq!(snapshot.resource_fields.sha256.as_deref(), Some("dummysha"));
        assert_eq!(snapshot.resource_fields.size, Some(999));
        // Context normalization never leaks into the caller's context
        assert!(ctx.identity.is_none());
    }

    #[tokio::test]
    async fn test_resolve_missing_source() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();

        assert!(matches!(
            resolve(&catalog, &ctx, "missing", None).await,
            Err(ForkError::NotFound(_))
        ));
        assert!(matches!(
            resolve(&catalog, &ctx, "", Some("act")).await,
            Err(ForkError::InvalidReference(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_resource_absent_from_revision() {
        let catalog = MemoryCatalog::new();
        let ctx = CallerContext::ignoring_auth();
        let source = forked_data(&catalog).await;
        let other = forked_data(&catalog).await;

        let result = resolve(&catalog, &ctx, &other.resource_id, Some(&source.activity_id)).await;
        assert!(matches!(result, Err(ForkError::ResourceNotInRevision { .. })));
    }

    #[tokio::test]
    async fn test_resolve_unauthorized_source() {
        let catalog = MemoryCatalog::new();
        let source = crate::fork::testing::private_source(&catalog).await;

        let visitor = CallerContext::user("visitor");
        assert!(matches!(
            resolve(&catalog, &visitor, &source.resource_id, None).await,
            Err(ForkError::Unauthorized(_))
        ));
        assert!(matches!(
            resolve(&catalog, &visitor, &source.resource_id, Some(&source.activity_id)).await,
            Err(ForkError::Unauthorized(_))
        ));
    }
}
