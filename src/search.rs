//! Resource autocomplete for the fork picker.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::host::{CatalogActions, SearchQuery};
use crate::model::{Dataset, Resource};
use crate::util::{now_unix, time_ago_from_timestamp};

const AUTOCOMPLETE_ROWS: usize = 10;

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AutocompleteQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DatasetMatch {
    pub id: String,
    pub name: String,
    pub title: String,
    /// Title of the owning organization
    pub owner_org: Option<String>,
    #[serde(rename = "match")]
    pub matched: bool,
    pub resources: Vec<ResourceMatch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceMatch {
    pub id: String,
    pub name: Option<String>,
    pub format: Option<String>,
    pub filename: Option<String>,
    #[serde(rename = "match")]
    pub matched: bool,
    pub last_modified: Option<String>,
}

/// Datasets and resources matching `q`, shaped for a picker.
///
/// A query that is a resource id yields only the dataset owning it.
pub async fn resource_autocomplete(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    query: &AutocompleteQuery,
) -> Result<Vec<DatasetMatch>> {
    let q = query.q.trim();
    if q.is_empty() {
        return Err(ForkError::invalid("q", "Missing value"));
    }

    let datasets = match owning_dataset(host, ctx, q).await? {
        Some(dataset) => vec![dataset],
        None => {
            let search = SearchQuery {
                q: q.to_string(),
                rows: AUTOCOMPLETE_ROWS,
                include_private: true,
            };
            host.package_search(ctx, &search).await?.results
        }
    };

    let needle = q.to_lowercase();
    let now = now_unix();
    Ok(datasets
        .iter()
        .map(|dataset| shape_dataset(dataset, &needle, now))
        .collect())
}

async fn owning_dataset(
    host: &dyn CatalogActions,
    ctx: &CallerContext,
    q: &str,
) -> Result<Option<Dataset>> {
    if Uuid::parse_str(q).is_err() {
        return Ok(None);
    }
    let resource = match host.resource_show(ctx, q).await {
        Ok(resource) => resource,
        Err(ForkError::NotFound(_)) | Err(ForkError::Unauthorized(_)) => return Ok(None),
        Err(e) => return Err(e),
    };
    tracing::debug!("Autocomplete query {} is a resource of dataset {}", q, resource.package_id);
    host.package_show(ctx, &resource.package_id).await.map(Some)
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

fn shape_dataset(dataset: &Dataset, needle: &str, now: i64) -> DatasetMatch {
    DatasetMatch {
        id: dataset.id.clone(),
        name: dataset.name.clone(),
        title: dataset.title.clone(),
        owner_org: dataset.organization.as_ref().map(|org| org.title.clone()),
        matched: contains(&dataset.name, needle) || contains(&dataset.title, needle),
        resources: dataset
            .resources
            .iter()
            .map(|resource| shape_resource(resource, needle, now))
            .collect(),
    }
}

fn shape_resource(resource: &Resource, needle: &str, now: i64) -> ResourceMatch {
    ResourceMatch {
        id: resource.id.clone(),
        name: resource.tracked.name.clone(),
        format: resource.format.clone(),
        filename: resource.filename().map(str::to_string),
        matched: resource
            .tracked
            .name
            .as_deref()
            .is_some_and(|name| contains(name, needle)),
        last_modified: resource
            .last_modified
            .map(|timestamp| time_ago_from_timestamp(timestamp, now)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::host::MemoryCatalog;
    use crate::model::{Organization, TrackedFields};

    /// Three public datasets of three resources each, plus a private one
    async fn datasets(catalog: &MemoryCatalog) {
        let ctx = CallerContext::ignoring_auth();
        let organization = catalog.add_organization(Organization {
            name: "test-org".into(),
            title: "Test Organization".into(),
            ..Default::default()
        });

        for d in 0..4u32 {
            let private = d == 3;
            let dataset = Dataset {
                name: format!("test-dataset-{:02}", d),
                title: if private {
                    "Private Dataset".into()
                } else {
                    format!("Test Dataset {:02}", d)
                },
                private,
                owner_org: Some(organization.id.clone()),
                resources: (0..3u32)
                    .map(|r| Resource {
                        id: format!(
                            "{0}{0}{0}{0}{0}{0}{0}{0}-{0}{0}{0}{0}-{0}{0}{0}{0}-{0}{0}{0}{0}-{1}",
                            d,
                            r.to_string().repeat(12)
                        ),
                        tracked: TrackedFields {
                            name: Some(format!("Test Resource {:02}", d * 3 + r)),
                            ..Default::default()
                        },
                        url: Some(format!("http://link.to/data-{}.csv", r)),
                        format: Some("CSV".into()),
                        ..Default::default()
                    })
                    .collect(),
                ..Default::default()
            };
            catalog.package_create(&ctx, dataset).await.unwrap();
        }
    }

    fn names(results: &[DatasetMatch]) -> Vec<&str> {
        results.iter().map(|d| d.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_requires_query() {
        let catalog = MemoryCatalog::new();
        for q in ["", "   "] {
            let err = resource_autocomplete(
                &catalog,
                &CallerContext::ignoring_auth(),
                &AutocompleteQuery { q: q.into() },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, ForkError::Invalid { ref field, .. } if field == "q"));
        }
    }

    #[tokio::test]
    async fn test_resource_id_returns_owning_dataset() {
        let catalog = MemoryCatalog::new();
        datasets(&catalog).await;
        let ctx = CallerContext::ignoring_auth();

        let results = resource_autocomplete(
            &catalog,
            &ctx,
            &AutocompleteQuery {
                q: "22222222-2222-2222-2222-000000000000".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&results), vec!["test-dataset-02"]);
    }

    #[tokio::test]
    async fn test_search_ranks_dataset_matches_first() {
        let catalog = MemoryCatalog::new();
        datasets(&catalog).await;
        let ctx = CallerContext::ignoring_auth();

        let results = resource_autocomplete(&catalog, &ctx, &AutocompleteQuery { q: "02".into() })
            .await
            .unwrap();
        assert_eq!(names(&results), vec!["test-dataset-02", "test-dataset-00"]);
        assert!(results[0].matched);
        assert!(!results[1].matched);
        assert!(results[1].resources[2].matched);
        assert!(!results[1].resources[0].matched);
    }

    #[tokio::test]
    async fn test_private_datasets_included_for_sysadmin() {
        let catalog = MemoryCatalog::new();
        datasets(&catalog).await;

        let query = AutocompleteQuery {
            q: "Private".into(),
        };
        let admin = CallerContext::user("admin").with_sysadmin(true);
        let results = resource_autocomplete(&catalog, &admin, &query).await.unwrap();
        assert_eq!(names(&results), vec!["test-dataset-03"]);

        let visitor = CallerContext::user("visitor");
        let results = resource_autocomplete(&catalog, &visitor, &query).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_output_format() {
        let catalog = MemoryCatalog::new();
        datasets(&catalog).await;

        let results = resource_autocomplete(
            &catalog,
            &CallerContext::ignoring_auth(),
            &AutocompleteQuery {
                q: "Test Resource 08".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(names(&results), vec!["test-dataset-02"]);
        assert_eq!(results[0].owner_org.as_deref(), Some("Test Organization"));

        let value = serde_json::to_value(&results).unwrap();
        for dataset in value.as_array().unwrap() {
            let keys: BTreeSet<&str> = dataset.as_object().unwrap().keys().map(String::as_str).collect();
            assert_eq!(
                keys,
                BTreeSet::from(["id", "name", "title", "owner_org", "match", "resources"])
            );
            for resource in dataset["resources"].as_array().unwrap() {
                let keys: BTreeSet<&str> =
                    resource.as_object().unwrap().keys().map(String::as_str).collect();
                assert_eq!(
                    keys,
                    BTreeSet::from(["id", "name", "format", "filename", "match", "last_modified"])
                );
                assert_eq!(resource["last_modified"], "Just now");
            }
        }
        assert_eq!(value[0]["resources"][2]["filename"], "data-2.csv");
    }
}
