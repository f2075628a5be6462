//! Catalog records exchanged with the host.
//!
//! Fields the fork logic reads or rewrites are typed. Everything else rides
//! along in `extras` and is handed back to the host untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::fork::{ForkMetadata, ForkReference};

/// Resource metadata that is tracked across a fork
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lfs_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl TrackedFields {
    /// Copy the forked subset (everything but `name`) from a source
    pub fn apply_forked(&mut self, source: &TrackedFields) {
        self.lfs_prefix = source.lfs_prefix.clone();
        self.size = source.size;
        self.sha256 = source.sha256.clone();
        self.url_type = source.url_type.clone();
    }

    /// True if any forked field supplied here (and non-empty) differs from `previous`
    pub fn overrides(&self, previous: &TrackedFields) -> bool {
        fn changed(incoming: &Option<String>, previous: &Option<String>) -> bool {
            match incoming.as_deref() {
                Some(value) if !value.is_empty() => previous.as_deref() != Some(value),
                _ => false,
            }
        }

        changed(&self.lfs_prefix, &previous.lfs_prefix)
            || self.size.is_some_and(|size| size != 0 && previous.size != Some(size))
            || changed(&self.sha256, &previous.sha256)
            || changed(&self.url_type, &previous.url_type)
    }
}

/// A resource record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub package_id: String,
    /// Encoded fork reference, empty when the resource is not a fork
    #[serde(default, deserialize_with = "lenient_fork")]
    pub fork: String,
    #[serde(flatten)]
    pub tracked: TrackedFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Unix seconds, maintained by the host
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_synced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_metadata: Option<ForkMetadata>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Resource {
    pub fn is_fork(&self) -> bool {
        !self.fork.is_empty()
    }

    pub fn fork_reference(&self) -> Option<ForkReference> {
        ForkReference::decode(&self.fork)
    }

    /// Drop read-time decorations before a record is stored
    pub fn clear_derived(&mut self) {
        self.fork_synced = None;
        self.fork_metadata = None;
    }

    /// Last path segment of the resource url
    pub fn filename(&self) -> Option<&str> {
        let url = self.url.as_deref()?;
        let path = url.split(['?', '#']).next().unwrap_or(url);
        path.rsplit('/').next().filter(|name| !name.is_empty())
    }
}

/// Owning organization summary
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
}

/// A dataset (package) record
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_org: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organization: Option<Organization>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(flatten)]
    pub extras: Map<String, Value>,
}

impl Dataset {
    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// Identity of a dataset at some point in its history
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetIdentity {
    pub id: String,
    pub name: String,
    pub title: String,
}

impl From<&Dataset> for DatasetIdentity {
    fn from(dataset: &Dataset) -> Self {
        Self {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            title: dataset.title.clone(),
        }
    }
}

/// An entry in a dataset's revision history
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub object_id: String,
    pub activity_type: String,
    pub timestamp: i64,
    /// Full dataset snapshot as of this activity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Dataset>,
}

/// Accept any JSON value for `fork`; non-strings read as no fork
fn lenient_fork<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(ForkReference::decode_value)
        .map(|reference| reference.to_string())
        .unwrap_or_default())
}
