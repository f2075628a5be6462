//! JSON seed file for bootstrapping a catalog.

use std::path::Path;

use serde::Deserialize;

use super::{CatalogActions, MemoryCatalog};
use crate::context::CallerContext;
use crate::error::Result;
use crate::model::{Dataset, Organization};

/// Seed file contents
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub organizations: Vec<Organization>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

/// Load a seed file into the catalog, returns the number of datasets created
pub async fn load_seed(catalog: &MemoryCatalog, path: &Path) -> Result<usize> {
    let raw = tokio::fs::read_to_string(path).await?;
    let seed: Seed = serde_json::from_str(&raw)?;
    let ctx = CallerContext::ignoring_auth();

    for organization in seed.organizations {
        catalog.add_organization(organization);
    }

    let count = seed.datasets.len();
    for dataset in seed.datasets {
        let created = catalog.package_create(&ctx, dataset).await?;
        tracing::debug!("Seeded dataset {} ({})", created.name, created.id);
    }

    tracing::info!("Loaded {} datasets from {:?}", count, path);
    Ok(count)
}
