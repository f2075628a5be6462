//! Compact fork reference encoding: `source_id` or `source_id@revision_id`.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::{ForkError, Result};

const SEPARATOR: char = '@';

/// A source resource and, optionally, the dataset revision it is pinned to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ForkReference {
    pub source_id: String,
    pub revision_id: Option<String>,
}

impl ForkReference {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            revision_id: None,
        }
    }

    pub fn pinned(source_id: impl Into<String>, revision_id: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            revision_id: Some(revision_id.into()),
        }
    }

    /// Lenient decode. Empty input is no reference at all; an empty revision
    /// part reads as unpinned. An empty source part is kept so that
    /// [`ForkReference::validate`] can reject it.
    pub fn decode(text: &str) -> Option<Self> {
        if text.is_empty() {
            return None;
        }

        let reference = match text.split_once(SEPARATOR) {
            Some((source, revision)) => Self {
                source_id: source.to_string(),
                revision_id: Some(revision.to_string()).filter(|r| !r.is_empty()),
            },
            None => Self::new(text),
        };
        Some(reference)
    }

    /// Decode from an untyped payload value; anything but a string is absent
    pub fn decode_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(Self::decode)
    }

    pub fn encode(source_id: &str, revision_id: Option<&str>) -> String {
        match revision_id {
            Some(revision) if !revision.is_empty() => {
                format!("{}{}{}", source_id, SEPARATOR, revision)
            }
            _ => source_id.to_string(),
        }
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision_id.as_deref()
    }

    /// A revision pin without a source is meaningless
    pub fn validate(&self) -> Result<()> {
        if self.source_id.is_empty() {
            return Err(ForkError::InvalidReference(format!(
                "'{}' has no source resource",
                self
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ForkReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::encode(&self.source_id, self.revision()))
    }
}

impl FromStr for ForkReference {
    type Err = ForkError;

    fn from_str(s: &str) -> Result<Self> {
        let reference = Self::decode(s)
            .ok_or_else(|| ForkError::InvalidReference("empty reference".to_string()))?;
        reference.validate()?;
        Ok(reference)
    }
}
