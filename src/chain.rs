//! Named catalog actions and the fork interceptors wrapped around them.
//!
//! An action is a boxed async function of `(context, input)`. An interceptor
//! takes the next action in the chain and returns a new action, so extending
//! a host action never needs more than composition.

use std::future::Future;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};

use crate::context::CallerContext;
use crate::error::Result;
use crate::fork::{
    fork_metadata, is_synced, materialize_for_create, materialize_for_update, ForkMetadata,
};
use crate::host::CatalogActions;
use crate::model::{Dataset, Resource};

pub type Action<I, O> = Arc<dyn Fn(CallerContext, I) -> BoxFuture<'static, Result<O>> + Send + Sync>;

/// Box an async function as an [`Action`]
pub fn action<I, O, F, Fut>(f: F) -> Action<I, O>
where
    I: 'static,
    O: 'static,
    F: Fn(CallerContext, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O>> + Send + 'static,
{
    Arc::new(move |ctx: CallerContext, input: I| f(ctx, input).boxed())
}

/// The actions this crate extends, by name
#[derive(Clone)]
pub struct ActionRegistry {
    pub resource_show: Action<String, Resource>,
    pub package_show: Action<String, Dataset>,
    pub resource_create: Action<Resource, Resource>,
    pub resource_update: Action<Resource, Resource>,
    pub package_create: Action<Dataset, Dataset>,
    pub package_update: Action<Dataset, Dataset>,
}

impl ActionRegistry {
    /// Default actions that call straight into the host
    pub fn from_host(host: Arc<dyn CatalogActions>) -> Self {
        Self {
            resource_show: {
                let host = host.clone();
                action(move |ctx, id: String| {
                    let host = host.clone();
                    async move { host.resource_show(&ctx, &id).await }
                })
            },
            package_show: {
                let host = host.clone();
                action(move |ctx, id: String| {
                    let host = host.clone();
                    async move { host.package_show(&ctx, &id).await }
                })
            },
            resource_create: {
                let host = host.clone();
                action(move |ctx, resource: Resource| {
                    let host = host.clone();
                    async move { host.resource_create(&ctx, resource).await }
                })
            },
            resource_update: {
                let host = host.clone();
                action(move |ctx, resource: Resource| {
                    let host = host.clone();
                    async move { host.resource_update(&ctx, resource).await }
                })
            },
            package_create: {
                let host = host.clone();
                action(move |ctx, dataset: Dataset| {
                    let host = host.clone();
                    async move { host.package_create(&ctx, dataset).await }
                })
            },
            package_update: {
                let host = host.clone();
                action(move |ctx, dataset: Dataset| {
                    let host = host.clone();
                    async move { host.package_update(&ctx, dataset).await }
                })
            },
        }
    }

    /// Wrap every action with its fork interceptor
    pub fn with_fork_interceptors(self, host: Arc<dyn CatalogActions>) -> Self {
        Self {
            resource_show: fork_resource_show(host.clone(), self.resource_show),
            package_show: fork_package_show(host.clone(), self.package_show),
            resource_create: fork_resource_create(host.clone(), self.resource_create),
            resource_update: fork_resource_update(host.clone(), self.resource_update),
            package_create: fork_package_create(host.clone(), self.package_create),
            package_update: fork_package_update(host, self.package_update),
        }
    }
}

/// Materialize forked resources before they are created
pub fn fork_resource_create(
    host: Arc<dyn CatalogActions>,
    next: Action<Resource, Resource>,
) -> Action<Resource, Resource> {
    action(move |ctx: CallerContext, resource: Resource| {
        let host = host.clone();
        let next = next.clone();
        async move {
            let resource = if resource.is_fork() {
                materialize_for_create(host.as_ref(), &ctx, resource).await?
            } else {
                resource
            };
            next(ctx, resource).await
        }
    })
}

pub fn fork_resource_update(
    host: Arc<dyn CatalogActions>,
    next: Action<Resource, Resource>,
) -> Action<Resource, Resource> {
    action(move |ctx: CallerContext, resource: Resource| {
        let host = host.clone();
        let next = next.clone();
        async move {
            let resource = materialize_for_update(host.as_ref(), &ctx, resource).await?;
            next(ctx, resource).await
        }
    })
}

pub fn fork_package_create(
    host: Arc<dyn CatalogActions>,
    next: Action<Dataset, Dataset>,
) -> Action<Dataset, Dataset> {
    action(move |ctx: CallerContext, mut dataset: Dataset| {
        let host = host.clone();
        let next = next.clone();
        async move {
            let mut resources = Vec::with_capacity(dataset.resources.len());
            for resource in dataset.resources.drain(..) {
                resources.push(if resource.is_fork() {
                    materialize_for_create(host.as_ref(), &ctx, resource).await?
                } else {
                    resource
                });
            }
            dataset.resources = resources;
            next(ctx, dataset).await
        }
    })
}

pub fn fork_package_update(
    host: Arc<dyn CatalogActions>,
    next: Action<Dataset, Dataset>,
) -> Action<Dataset, Dataset> {
    action(move |ctx: CallerContext, mut dataset: Dataset| {
        let host = host.clone();
        let next = next.clone();
        async move {
            let mut resources = Vec::with_capacity(dataset.resources.len());
            for resource in dataset.resources.drain(..) {
                resources.push(materialize_for_update(host.as_ref(), &ctx, resource).await?);
            }
            dataset.resources = resources;
            next(ctx, dataset).await
        }
    })
}

/// Add sync status and lineage to a shown resource
pub fn fork_resource_show(
    host: Arc<dyn CatalogActions>,
    next: Action<String, Resource>,
) -> Action<String, Resource> {
    action(move |ctx: CallerContext, id: String| {
        let host = host.clone();
        let next = next.clone();
        async move {
            let mut resource = next(ctx.clone(), id).await?;
            if ctx.check_synced {
                decorate(host.as_ref(), &ctx, &mut resource).await;
            }
            Ok(resource)
        }
    })
}

pub fn fork_package_show(
    host: Arc<dyn CatalogActions>,
    next: Action<String, Dataset>,
) -> Action<String, Dataset> {
    action(move |ctx: CallerContext, id: String| {
        let host = host.clone();
        let next = next.clone();
        async move {
            let mut dataset = next(ctx.clone(), id).await?;
            if ctx.check_synced {
                for resource in dataset.resources.iter_mut() {
                    decorate(host.as_ref(), &ctx, resource).await;
                }
            }
            Ok(dataset)
        }
    })
}

/// Read decorations never fail the show they decorate
async fn decorate(host: &dyn CatalogActions, ctx: &CallerContext, resource: &mut Resource) {
    let synced = match is_synced(host, ctx, resource).await {
        Ok(synced) => synced,
        Err(e) => {
            tracing::warn!("Sync check failed for resource {}: {}", resource.id, e);
            false
        }
    };
    resource.fork_synced = Some(synced);

    if resource.is_fork() {
        let metadata = match fork_metadata(host, ctx, resource).await {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!("Fork metadata unavailable for resource {}: {}", resource.id, e);
                ForkMetadata::Missing
            }
        };
        resource.fork_metadata = Some(metadata);
    }
}
