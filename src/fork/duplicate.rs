//! Copy a resource or a whole dataset as new forks.
//!
//! Both operations build a payload from the source and hand it to the
//! intercepted create action, so materialization happens exactly as it does
//! for a hand-written fork.

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::chain::ActionRegistry;
use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::model::{Dataset, Resource, TrackedFields};
use crate::util::apply_overrides;

/// Body of a fork request: the source id plus fields to override on the copy
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ForkRequest {
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub overrides: Map<String, Value>,
}

/// A fresh resource forked from `source`, without an id of its own
fn fork_copy(source: &Resource) -> Resource {
    Resource {
        package_id: source.package_id.clone(),
        fork: source.id.clone(),
        tracked: TrackedFields {
            name: source.tracked.name.clone(),
            ..Default::default()
        },
        format: source.format.clone(),
        url: source.url.clone(),
        extras: source.extras.clone(),
        ..Default::default()
    }
}

/// Fork a single resource, into its own dataset unless `package_id` is overridden
pub async fn resource_fork(
    actions: &ActionRegistry,
    ctx: CallerContext,
    request: ForkRequest,
) -> Result<Resource> {
    if request.id.is_empty() {
        return Err(ForkError::invalid("id", "Missing value"));
    }
    let source = (actions.resource_show)(ctx.clone().with_check_synced(false), request.id).await?;

    let copy = apply_overrides(&fork_copy(&source), &request.overrides)?;
    tracing::info!("Forking resource {} into dataset {}", source.id, copy.package_id);
    (actions.resource_create)(ctx, copy).await
}

/// Fork every resource of a dataset into a new dataset named by the request
pub async fn dataset_fork(
    actions: &ActionRegistry,
    ctx: CallerContext,
    request: ForkRequest,
) -> Result<Dataset> {
    if request.id.is_empty() {
        return Err(ForkError::invalid("id", "Missing value"));
    }
    let source = (actions.package_show)(ctx.clone().with_check_synced(false), request.id).await?;

    let copy = Dataset {
        title: source.title.clone(),
        notes: source.notes.clone(),
        private: source.private,
        owner_org: source.owner_org.clone(),
        resources: source
            .resources
            .iter()
            .map(|resource| Resource {
                package_id: String::new(),
                ..fork_copy(resource)
            })
            .collect(),
        extras: source.extras.clone(),
        ..Default::default()
    };
    let copy = apply_overrides(&copy, &request.overrides)?;
    if copy.name.is_empty() {
        return Err(ForkError::invalid("name", "Missing value"));
    }

    tracing::info!(
        "Forking dataset {} as {} with {} resources",
        source.name,
        copy.name,
        copy.resources.len()
    );
    (actions.package_create)(ctx, copy).await
}
