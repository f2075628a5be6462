//! In-memory catalog.
//!
//! Stores datasets with their resources and keeps a full dataset snapshot
//! for every mutation, newest first, so historical lookups behave like the
//! real activity stream.

use std::collections::HashMap;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{CatalogActions, SearchQuery, SearchResults};
use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::model::{Activity, Dataset, Organization, Resource};
use crate::util::{apply_overrides, now_unix};

const NEW_PACKAGE: &str = "new package";
const CHANGED_PACKAGE: &str = "changed package";

/// Catalog host backed by concurrent maps
pub struct MemoryCatalog {
    /// dataset id -> dataset
    datasets: DashMap<String, Dataset>,
    /// dataset name -> dataset id
    names: DashMap<String, String>,
    /// resource id -> dataset id
    resource_index: DashMap<String, String>,
    /// dataset id -> activities, newest first
    activities: RwLock<HashMap<String, Vec<Activity>>>,
    /// activity id -> dataset id
    activity_index: DashMap<String, String>,
    organizations: DashMap<String, Organization>,
    /// Serializes mutations so the indexes stay consistent
    write_lock: Mutex<()>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            datasets: DashMap::new(),
            names: DashMap::new(),
            resource_index: DashMap::new(),
            activities: RwLock::new(HashMap::new()),
            activity_index: DashMap::new(),
            organizations: DashMap::new(),
            write_lock: Mutex::new(()),
        }
    }

    /// Register an organization; ids may be referenced by `owner_org`
    pub fn add_organization(&self, mut organization: Organization) -> Organization {
        if organization.id.is_empty() {
            organization.id = Uuid::new_v4().to_string();
        }
        self.organizations
            .insert(organization.id.clone(), organization.clone());
        organization
    }

    pub fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    /// Merge `patch` into an existing resource
    pub fn resource_patch(
        &self,
        ctx: &CallerContext,
        id: &str,
        patch: &Map<String, Value>,
    ) -> Result<Resource> {
        let current = self.show_resource(ctx, id)?;
        let patched = apply_overrides(&current, patch)?;
        self.update_resource(ctx, patched)
    }

    /// Merge `patch` into an existing dataset
    pub fn package_patch(
        &self,
        ctx: &CallerContext,
        id: &str,
        patch: &Map<String, Value>,
    ) -> Result<Dataset> {
        let current = self.show_package(ctx, id)?;
        let patched = apply_overrides(&current, patch)?;
        self.update_package(ctx, patched)
    }

    fn authorize_read(&self, ctx: &CallerContext, dataset: &Dataset) -> Result<()> {
        if !dataset.private || ctx.bypasses_auth() {
            return Ok(());
        }
        Err(ForkError::Unauthorized(format!(
            "User {} not authorized to read package {}",
            ctx.username().unwrap_or("anonymous"),
            dataset.id
        )))
    }

    fn find_dataset(&self, id_or_name: &str) -> Option<Dataset> {
        if let Some(dataset) = self.datasets.get(id_or_name) {
            return Some(dataset.clone());
        }
        let id = self.names.get(id_or_name).map(|entry| entry.value().clone())?;
        self.datasets.get(&id).map(|dataset| dataset.clone())
    }

    fn dataset_for_resource(&self, resource_id: &str) -> Result<Dataset> {
        self.resource_index
            .get(resource_id)
            .map(|entry| entry.value().clone())
            .and_then(|dataset_id| self.find_dataset(&dataset_id))
            .ok_or_else(|| ForkError::NotFound(format!("Resource {}", resource_id)))
    }

    fn dataset_for_activity(&self, activity_id: &str) -> Result<Dataset> {
        self.activity_index
            .get(activity_id)
            .map(|entry| entry.value().clone())
            .and_then(|dataset_id| self.find_dataset(&dataset_id))
            .ok_or_else(|| ForkError::NotFound(format!("Activity {}", activity_id)))
    }

    fn find_activity(&self, dataset_id: &str, activity_id: &str) -> Option<Activity> {
        let activities = self.activities.read();
        activities
            .get(dataset_id)?
            .iter()
            .find(|activity| activity.id == activity_id)
            .cloned()
    }

    /// Fill in ids, links and timestamps of a dataset about to be stored
    fn prepare(&self, dataset: &mut Dataset) -> Result<()> {
        dataset.organization = match dataset.owner_org.as_deref() {
            Some(org) => Some(
                self.organizations
                    .get(org)
                    .map(|entry| entry.value().clone())
                    .ok_or_else(|| ForkError::invalid("owner_org", format!("Organization {} does not exist", org)))?,
            ),
            None => None,
        };

        let now = now_unix();
        for resource in dataset.resources.iter_mut() {
            if resource.id.is_empty() {
                resource.id = Uuid::new_v4().to_string();
            } else if let Some(owner) = self.resource_index.get(&resource.id) {
                if owner.value() != &dataset.id {
                    return Err(ForkError::invalid(
                        "resources",
                        format!("Resource id {} is already in use", resource.id),
                    ));
                }
            }
            resource.package_id = dataset.id.clone();
            resource.last_modified = Some(now);
            resource.clear_derived();
        }
        Ok(())
    }

    /// Write a prepared dataset and its indexes, then snapshot it
    fn store(&self, dataset: Dataset, previous: Option<&Dataset>, activity_type: &str) -> Activity {
        if let Some(previous) = previous {
            if previous.name != dataset.name {
                self.names.remove(&previous.name);
            }
            for resource in &previous.resources {
                self.resource_index.remove(&resource.id);
            }
        }
        for resource in &dataset.resources {
            self.resource_index
                .insert(resource.id.clone(), dataset.id.clone());
        }
        self.names.insert(dataset.name.clone(), dataset.id.clone());

        let activity = Activity {
            id: Uuid::new_v4().to_string(),
            object_id: dataset.id.clone(),
            activity_type: activity_type.to_string(),
            timestamp: now_unix(),
            data: Some(dataset.clone()),
        };
        self.activity_index
            .insert(activity.id.clone(), dataset.id.clone());
        self.activities
            .write()
            .entry(dataset.id.clone())
            .or_default()
            .insert(0, activity.clone());

        tracing::debug!(
            "Recorded activity {} ({}) for dataset {}",
            activity.id,
            activity_type,
            dataset.id
        );
        self.datasets.insert(dataset.id.clone(), dataset);
        activity
    }

    fn show_resource(&self, ctx: &CallerContext, id: &str) -> Result<Resource> {
        let dataset = self.dataset_for_resource(id)?;
        self.authorize_read(ctx, &dataset)?;
        dataset
            .resource(id)
            .cloned()
            .ok_or_else(|| ForkError::NotFound(format!("Resource {}", id)))
    }

    fn show_package(&self, ctx: &CallerContext, id: &str) -> Result<Dataset> {
        let dataset = self
            .find_dataset(id)
            .ok_or_else(|| ForkError::NotFound(format!("Dataset {}", id)))?;
        self.authorize_read(ctx, &dataset)?;
        Ok(dataset)
    }

    fn create_package(&self, ctx: &CallerContext, mut dataset: Dataset) -> Result<Dataset> {
        let _guard = self.write_lock.lock();

        if dataset.name.is_empty() {
            return Err(ForkError::invalid("name", "Missing value"));
        }
        if self.names.contains_key(&dataset.name) {
            return Err(ForkError::invalid("name", "That URL is already in use."));
        }
        if dataset.id.is_empty() {
            dataset.id = Uuid::new_v4().to_string();
        } else if self.datasets.contains_key(&dataset.id) {
            return Err(ForkError::invalid("id", "Dataset id already exists"));
        }
        if dataset.title.is_empty() {
            dataset.title = dataset.name.clone();
        }
        self.prepare(&mut dataset)?;

        tracing::info!(
            "Created dataset {} ({}) for {}",
            dataset.name,
            dataset.id,
            ctx.username().unwrap_or("anonymous")
        );
        self.store(dataset.clone(), None, NEW_PACKAGE);
        Ok(dataset)
    }

    fn update_package(&self, ctx: &CallerContext, mut dataset: Dataset) -> Result<Dataset> {
        let _guard = self.write_lock.lock();

        let previous = self
            .find_dataset(&dataset.id)
            .ok_or_else(|| ForkError::NotFound(format!("Dataset {}", dataset.id)))?;
        self.authorize_read(ctx, &previous)?;
        dataset.id = previous.id.clone();

        if dataset.name.is_empty() {
            dataset.name = previous.name.clone();
        } else if dataset.name != previous.name && self.names.contains_key(&dataset.name) {
            return Err(ForkError::invalid("name", "That URL is already in use."));
        }
        if dataset.title.is_empty() {
            dataset.title = previous.title.clone();
        }
        self.prepare(&mut dataset)?;

        self.store(dataset.clone(), Some(&previous), CHANGED_PACKAGE);
        Ok(dataset)
    }

    fn create_resource(&self, ctx: &CallerContext, mut resource: Resource) -> Result<Resource> {
        let _guard = self.write_lock.lock();

        if resource.package_id.is_empty() {
            return Err(ForkError::invalid("package_id", "Missing value"));
        }
        let previous = self
            .find_dataset(&resource.package_id)
            .ok_or_else(|| ForkError::NotFound(format!("Dataset {}", resource.package_id)))?;
        self.authorize_read(ctx, &previous)?;

        if resource.id.is_empty() {
            resource.id = Uuid::new_v4().to_string();
        } else if self.resource_index.contains_key(&resource.id) {
            return Err(ForkError::invalid("id", "Resource id already exists"));
        }

        let mut dataset = previous.clone();
        dataset.resources.push(resource.clone());
        self.prepare(&mut dataset)?;

        let created = dataset
            .resource(&resource.id)
            .cloned()
            .ok_or_else(|| ForkError::Internal(format!("resource {} vanished on create", resource.id)))?;
        self.store(dataset, Some(&previous), CHANGED_PACKAGE);
        Ok(created)
    }

    fn update_resource(&self, ctx: &CallerContext, resource: Resource) -> Result<Resource> {
        let _guard = self.write_lock.lock();

        let previous = self.dataset_for_resource(&resource.id)?;
        self.authorize_read(ctx, &previous)?;

        let mut dataset = previous.clone();
        let slot = dataset
            .resources
            .iter_mut()
            .find(|r| r.id == resource.id)
            .ok_or_else(|| ForkError::NotFound(format!("Resource {}", resource.id)))?;
        *slot = resource.clone();
        self.prepare(&mut dataset)?;

        let updated = dataset
            .resource(&resource.id)
            .cloned()
            .ok_or_else(|| ForkError::Internal(format!("resource {} vanished on update", resource.id)))?;
        self.store(dataset, Some(&previous), CHANGED_PACKAGE);
        Ok(updated)
    }

    fn search(&self, ctx: &CallerContext, query: &SearchQuery) -> SearchResults {
        let q = query.q.trim().to_lowercase();

        let mut scored: Vec<(u8, Dataset)> = self
            .datasets
            .iter()
            .filter(|entry| {
                let dataset = entry.value();
                !dataset.private || (query.include_private && ctx.bypasses_auth())
            })
            .filter_map(|entry| {
                let dataset = entry.value();
                let score = if q.is_empty()
                    || dataset.name.to_lowercase().contains(&q)
                    || dataset.title.to_lowercase().contains(&q)
                {
                    2
                } else if dataset.resources.iter().any(|r| {
                    r.id.to_lowercase().contains(&q)
                        || r.tracked
                            .name
                            .as_deref()
                            .is_some_and(|name| name.to_lowercase().contains(&q))
                }) {
                    1
                } else {
                    0
                };
                (score > 0).then(|| (score, dataset.clone()))
            })
            .collect();

        scored.sort_by(|(a_score, a), (b_score, b)| {
            b_score.cmp(a_score).then_with(|| a.name.cmp(&b.name))
        });

        let count = scored.len();
        let rows = if query.rows == 0 { usize::MAX } else { query.rows };
        SearchResults {
            count,
            results: scored
                .into_iter()
                .take(rows)
                .map(|(_, dataset)| dataset)
                .collect(),
        }
    }
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogActions for MemoryCatalog {
    async fn resource_show(&self, ctx: &CallerContext, id: &str) -> Result<Resource> {
        self.show_resource(ctx, id)
    }

    async fn package_show(&self, ctx: &CallerContext, id: &str) -> Result<Dataset> {
        self.show_package(ctx, id)
    }

    async fn package_activity_list(&self, ctx: &CallerContext, id: &str) -> Result<Vec<Activity>> {
        let dataset = self.show_package(ctx, id)?;
        let activities = self.activities.read();
        Ok(activities
            .get(&dataset.id)
            .map(|list| {
                list.iter()
                    .map(|activity| Activity {
                        data: None,
                        ..activity.clone()
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn activity_data_show(&self, ctx: &CallerContext, activity_id: &str) -> Result<Dataset> {
        if ctx.identity.is_none() {
            return Err(ForkError::MissingIdentity(format!(
                "activity {} requested without a user",
                activity_id
            )));
        }
        let dataset = self.dataset_for_activity(activity_id)?;
        self.authorize_read(ctx, &dataset)?;
        self.find_activity(&dataset.id, activity_id)
            .and_then(|activity| activity.data)
            .ok_or_else(|| ForkError::NotFound(format!("Activity {}", activity_id)))
    }

    async fn activity_show(
        &self,
        ctx: &CallerContext,
        activity_id: &str,
        include_data: bool,
    ) -> Result<Activity> {
        let dataset = self.dataset_for_activity(activity_id)?;
        self.authorize_read(ctx, &dataset)?;
        let mut activity = self
            .find_activity(&dataset.id, activity_id)
            .ok_or_else(|| ForkError::NotFound(format!("Activity {}", activity_id)))?;
        if !include_data {
            activity.data = None;
        }
        Ok(activity)
    }

    async fn resource_create(&self, ctx: &CallerContext, resource: Resource) -> Result<Resource> {
        self.create_resource(ctx, resource)
    }

    async fn resource_update(&self, ctx: &CallerContext, resource: Resource) -> Result<Resource> {
        self.update_resource(ctx, resource)
    }

    async fn package_create(&self, ctx: &CallerContext, dataset: Dataset) -> Result<Dataset> {
        self.create_package(ctx, dataset)
    }

    async fn package_update(&self, ctx: &CallerContext, dataset: Dataset) -> Result<Dataset> {
        self.update_package(ctx, dataset)
    }

    async fn package_search(&self, ctx: &CallerContext, query: &SearchQuery) -> Result<SearchResults> {
        Ok(self.search(ctx, query))
    }
}
