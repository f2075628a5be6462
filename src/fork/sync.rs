//! Has a fork drifted from its source?

use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::host::CatalogActions;
use crate::model::Resource;

/// Compare the fork's fingerprint with the source's *current* fingerprint.
///
/// The pinned revision plays no part. A missing source reads as out of sync;
/// two resources without a sha256 are in sync.
pub async fn is_synced(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    resource: &Resource,
) -> Result<bool> {
    let Some(reference) = resource.fork_reference() else {
        return Ok(false);
    };
    if reference.source_id.is_empty() {
        return Ok(false);
    }

    let source = match host.resource_show(ctx, &reference.source_id).await {
        Ok(source) => source,
        Err(ForkError::NotFound(_)) => {
            tracing::debug!(
                "Fork source {} of resource {} no longer exists",
                reference.source_id,
                resource.id
            );
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    Ok(source.tracked.sha256 == resource.tracked.sha256)
}
