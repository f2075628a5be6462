//! Action API handlers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::auth::caller_context;
use crate::chain::ActionRegistry;
use crate::config::ServerConfig;
use crate::context::CallerContext;
use crate::error::{ForkError, Result};
use crate::fork::{dataset_fork as fork_dataset, resource_fork as fork_resource, ForkRequest};
use crate::host::CatalogActions;
use crate::model::{Dataset, Resource};
use crate::search::{resource_autocomplete as autocomplete, AutocompleteQuery};
use crate::validators::{validate_dataset, validate_resource};

/// Application state shared across handlers
pub struct AppState {
    pub host: Arc<dyn CatalogActions>,
    /// Host actions wrapped with the fork interceptors
    pub actions: ActionRegistry,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(host: Arc<dyn CatalogActions>, config: ServerConfig) -> Self {
        let actions = ActionRegistry::from_host(host.clone()).with_fork_interceptors(host.clone());
        Self {
            host,
            actions,
            config,
        }
    }

    fn context(&self, headers: &HeaderMap) -> CallerContext {
        caller_context(headers, &self.config)
    }
}

#[derive(Serialize)]
struct Envelope<T> {
    success: bool,
    result: T,
}

/// Wrap an action result in the action API envelope
fn respond<T: Serialize>(result: Result<T>) -> Response {
    match result {
        Ok(result) => Json(Envelope {
            success: true,
            result,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    if body.is_empty() {
        return Err(ForkError::invalid("body", "A JSON object is required"));
    }
    Ok(serde_json::from_slice(body)?)
}

#[derive(Debug, Default, Deserialize)]
pub struct IdQuery {
    #[serde(default)]
    pub id: String,
}

fn require_id(query: IdQuery) -> Result<String> {
    if query.id.is_empty() {
        return Err(ForkError::invalid("id", "Missing value"));
    }
    Ok(query.id)
}

/// GET /api/3/action/resource_show
pub async fn resource_show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Response {
    let ctx = state.context(&headers);
    let result = match require_id(query) {
        Ok(id) => (state.actions.resource_show)(ctx, id).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// GET /api/3/action/package_show
pub async fn package_show(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<IdQuery>,
) -> Response {
    let ctx = state.context(&headers);
    let result = match require_id(query) {
        Ok(id) => (state.actions.package_show)(ctx, id).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// GET /api/3/action/resource_autocomplete
pub async fn resource_autocomplete(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AutocompleteQuery>,
) -> Response {
    let ctx = state.context(&headers);
    respond(autocomplete(state.host.as_ref(), &ctx, &query).await)
}

async fn create_resource(state: &AppState, ctx: CallerContext, body: &Bytes) -> Result<Resource> {
    let resource: Resource = parse_body(body)?;
    validate_resource(state.host.as_ref(), &ctx, &resource).await?;
    (state.actions.resource_create)(ctx, resource).await
}

async fn update_resource(state: &AppState, ctx: CallerContext, body: &Bytes) -> Result<Resource> {
    let resource: Resource = parse_body(body)?;
    validate_resource(state.host.as_ref(), &ctx, &resource).await?;
    (state.actions.resource_update)(ctx, resource).await
}

async fn create_package(state: &AppState, ctx: CallerContext, body: &Bytes) -> Result<Dataset> {
    let dataset: Dataset = parse_body(body)?;
    validate_dataset(state.host.as_ref(), &ctx, &dataset).await?;
    (state.actions.package_create)(ctx, dataset).await
}

async fn update_package(state: &AppState, ctx: CallerContext, body: &Bytes) -> Result<Dataset> {
    let dataset: Dataset = parse_body(body)?;
    validate_dataset(state.host.as_ref(), &ctx, &dataset).await?;
    (state.actions.package_update)(ctx, dataset).await
}

/// POST /api/3/action/resource_create
pub async fn resource_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = state.context(&headers);
    respond(create_resource(&state, ctx, &body).await)
}

/// POST /api/3/action/resource_update
pub async fn resource_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = state.context(&headers);
    respond(update_resource(&state, ctx, &body).await)
}

/// POST /api/3/action/package_create
pub async fn package_create(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = state.context(&headers);
    respond(create_package(&state, ctx, &body).await)
}

/// POST /api/3/action/package_update
pub async fn package_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = state.context(&headers);
    respond(update_package(&state, ctx, &body).await)
}

/// POST /api/3/action/resource_fork
pub async fn resource_fork(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = state.context(&headers);
    let result = match parse_body::<ForkRequest>(&body) {
        Ok(request) => fork_resource(&state.actions, ctx, request).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// POST /api/3/action/dataset_fork
pub async fn dataset_fork(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let ctx = state.context(&headers);
    let result = match parse_body::<ForkRequest>(&body) {
        Ok(request) => fork_dataset(&state.actions, ctx, request).await,
        Err(e) => Err(e),
    };
    respond(result)
}

/// GET /health
pub async fn health() -> Response {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION")
    }))
    .into_response()
}
