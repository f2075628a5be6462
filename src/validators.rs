//! Schema validators for fork fields on incoming payloads.

use std::fmt;

use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::fork::ForkReference;
use crate::host::CatalogActions;
use crate::model::{Dataset, Resource};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Resource,
    Dataset,
    Activity,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ObjectKind::Resource => "Resource",
            ObjectKind::Dataset => "Dataset",
            ObjectKind::Activity => "Activity",
        };
        f.write_str(label)
    }
}

/// Check that an object referred to by `field` exists. Empty ids pass.
pub async fn object_exists(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    field: &str,
    kind: ObjectKind,
    id: &str,
) -> Result<()> {
    if id.is_empty() {
        return Ok(());
    }

    let lookup = match kind {
        ObjectKind::Resource => host.resource_show(ctx, id).await.map(|_| ()),
        ObjectKind::Dataset => host.package_show(ctx, id).await.map(|_| ()),
        ObjectKind::Activity => host.activity_show(ctx, id, false).await.map(|_| ()),
    };

    match lookup {
        Ok(()) => Ok(()),
        Err(ForkError::NotFound(_)) => {
            Err(ForkError::invalid(field, format!("{} {} does not exist", kind, id)))
        }
        Err(e) => Err(e),
    }
}

/// Check a fork value: the source resource and pinned revision must exist
pub async fn valid_fork(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    field: &str,
    value: &str,
) -> Result<()> {
    let Some(reference) = ForkReference::decode(value) else {
        return Ok(());
    };
    if reference.source_id.is_empty() {
        return Err(ForkError::invalid(field, "A source resource id is required"));
    }

    object_exists(host, ctx, field, ObjectKind::Resource, &reference.source_id).await?;
    if let Some(revision) = reference.revision() {
        object_exists(host, ctx, field, ObjectKind::Activity, revision).await?;
    }
    Ok(())
}

pub async fn validate_resource(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    resource: &Resource,
) -> Result<()> {
    valid_fork(host, ctx, "fork", &resource.fork).await
}

pub async fn validate_dataset(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    dataset: &Dataset,
) -> Result<()> {
    for (i, resource) in dataset.resources.iter().enumerate() {
        valid_fork(host, ctx, &format!("resources.{}.fork", i), &resource.fork).await?;
    }
    Ok(())
}
