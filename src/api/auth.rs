//! Caller context from request headers.

use axum::http::{header, HeaderMap};

use crate::config::ServerConfig;
use crate::context::{CallerContext, Identity};

/// Header that turns off sync decoration on show actions
pub const CHECK_SYNCED_HEADER: &str = "x-check-synced";

/// Username from a `Bearer <username>` header
fn bearer_username(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let username = value.strip_prefix("Bearer ")?.trim();
    (!username.is_empty()).then(|| username.to_string())
}

fn check_synced(headers: &HeaderMap) -> bool {
    match headers.get(CHECK_SYNCED_HEADER).and_then(|v| v.to_str().ok()) {
        Some(value) => !matches!(value.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"),
        None => true,
    }
}

/// Build the context for one request. Callers without credentials are
/// anonymous visitors.
pub fn caller_context(headers: &HeaderMap, config: &ServerConfig) -> CallerContext {
    let context = match bearer_username(headers) {
        Some(username) => {
            let sysadmin = config.is_sysadmin(&username);
            CallerContext::user(username).with_sysadmin(sysadmin)
        }
        None => CallerContext {
            identity: Some(Identity::Anonymous),
            ..CallerContext::default()
        },
    };
    context.with_check_synced(check_synced(headers))
}
