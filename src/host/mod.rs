//! Host catalog collaborator.
//!
//! The catalog owns storage of datasets, resources and their activity
//! history. Fork logic only ever reaches it through [`CatalogActions`].

mod memory;
mod seed;

pub use memory::MemoryCatalog;
pub use seed::{load_seed, Seed};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::context::CallerContext;
use crate::error::Result;
use crate::model::{Activity, Dataset, Resource};

/// Dataset search request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub rows: usize,
    #[serde(default)]
    pub include_private: bool,
}

/// Dataset search response
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchResults {
    pub count: usize,
    pub results: Vec<Dataset>,
}

/// Named actions of the host catalog.
///
/// Every call takes the caller context and fails with `NotFound` or
/// `Unauthorized` when the object is missing or not visible to the caller.
#[async_trait]
pub trait CatalogActions: Send + Sync {
    async fn resource_show(&self, ctx: &CallerContext, id: &str) -> Result<Resource>;

    /// Dataset by id or name, including its resources and organization
    async fn package_show(&self, ctx: &CallerContext, id: &str) -> Result<Dataset>;

    /// Activities of a dataset, newest first
    async fn package_activity_list(&self, ctx: &CallerContext, id: &str) -> Result<Vec<Activity>>;

    /// Full dataset snapshot as of a package activity
    async fn activity_data_show(&self, ctx: &CallerContext, activity_id: &str) -> Result<Dataset>;

    async fn activity_show(
        &self,
        ctx: &CallerContext,
        activity_id: &str,
        include_data: bool,
    ) -> Result<Activity>;

    async fn resource_create(&self, ctx: &CallerContext, resource: Resource) -> Result<Resource>;

    async fn resource_update(&self, ctx: &CallerContext, resource: Resource) -> Result<Resource>;

    async fn package_create(&self, ctx: &CallerContext, dataset: Dataset) -> Result<Dataset>;

    async fn package_update(&self, ctx: &CallerContext, dataset: Dataset) -> Result<Dataset>;

    async fn package_search(&self, ctx: &CallerContext, query: &SearchQuery) -> Result<SearchResults>;
}
