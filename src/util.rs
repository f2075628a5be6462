//! Shared helpers.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{ForkError, Result};

/// Current Unix timestamp in seconds
pub fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Format seconds ago as human-readable string
pub fn format_time_ago(seconds: i64) -> String {
    if seconds < 0 {
        return "in the future".to_string();
    }
    if seconds < 60 {
        return "Just now".to_string();
    }
    let minutes = seconds / 60;
    if minutes < 60 {
        return format!("{} minute{} ago", minutes, plural(minutes));
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{} hour{} ago", hours, plural(hours));
    }
    let days = hours / 24;
    if days < 30 {
        return format!("{} day{} ago", days, plural(days));
    }
    let months = days / 30;
    if months < 12 {
        return format!("{} month{} ago", months, plural(months));
    }
    let years = months / 12;
    format!("{} year{} ago", years, plural(years))
}

/// Relative time of a Unix timestamp, measured from `now`
pub fn time_ago_from_timestamp(timestamp: i64, now: i64) -> String {
    format_time_ago(now - timestamp)
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Overlay the keys of `overrides` onto a record and read it back
pub fn apply_overrides<T>(record: &T, overrides: &Map<String, Value>) -> Result<T>
where
    T: Serialize + DeserializeOwned,
{
    let mut value = serde_json::to_value(record)?;
    let object = value
        .as_object_mut()
        .ok_or_else(|| ForkError::Internal("record did not serialize to an object".to_string()))?;
    for (key, field) in overrides {
        object.insert(key.clone(), field.clone());
    }
    Ok(serde_json::from_value(value)?)
}
