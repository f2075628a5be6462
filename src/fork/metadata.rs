//! Lineage details shown alongside a forked resource.

use serde::{Deserialize, Serialize};

use super::resolver::resolve_reference;
use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::host::CatalogActions;
use crate::model::Resource;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForkMetadata {
    NotForked,
    Available {
        resource_id: String,
        resource_name: Option<String>,
        dataset_id: String,
        dataset_name: String,
        dataset_title: String,
        activity_id: String,
    },
    /// The caller may not read the source
    Inaccessible,
    /// The source or its pinned revision is gone
    Missing,
}

/// Describe where a resource was forked from.
///
/// Unauthorized and missing sources degrade to a status instead of failing,
/// so a dangling fork never breaks the page showing it.
pub async fn fork_metadata(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    resource: &Resource,
) -> Result<ForkMetadata> {
    let Some(reference) = resource.fork_reference() else {
        return Ok(ForkMetadata::NotForked);
    };

    match resolve_reference(host, ctx, &reference).await {
        Ok(snapshot) => Ok(ForkMetadata::Available {
            resource_id: snapshot.resource_id,
            resource_name: snapshot.resource_fields.name,
            dataset_id: snapshot.dataset.id,
            dataset_name: snapshot.dataset.name,
            dataset_title: snapshot.dataset.title,
            activity_id: snapshot.revision_id,
        }),
        Err(ForkError::Unauthorized(_)) => Ok(ForkMetadata::Inaccessible),
        Err(e) if e.is_not_found() => Ok(ForkMetadata::Missing),
        Err(ForkError::InvalidReference(_)) => Ok(ForkMetadata::Missing),
        Err(e) => Err(e),
    }
}
