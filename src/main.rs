use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_fork::api::{self, AppState};
use catalog_fork::config::ServerConfig;
use catalog_fork::host::{load_seed, MemoryCatalog};
use catalog_fork::ForkError;

#[tokio::main]
async fn main() -> Result<(), ForkError> {
    let config = ServerConfig::from_env()?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&config.log_filter)
                .unwrap_or_else(|_| catalog_fork::config::DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let catalog = Arc::new(MemoryCatalog::new());
    if let Some(seed) = &config.seed_path {
        load_seed(&catalog, seed).await?;
    }
    if catalog.dataset_count() == 0 {
        tracing::info!("Catalog is empty. Create datasets with POST /api/3/action/package_create");
    } else {
        tracing::info!("Catalog holds {} datasets", catalog.dataset_count());
    }
    if config.sysadmins.is_empty() {
        tracing::warn!("No sysadmins configured; set CATALOG_FORK_SYSADMINS to grant access to private datasets");
    }

    let addr = config.addr;
    let state = Arc::new(AppState::new(catalog, config));
    let app = api::router(state);

    tracing::info!("Catalog fork server starting on http://{}", addr);
    tracing::info!("  GET  /api/3/action/resource_show?id=<id>");
    tracing::info!("  GET  /api/3/action/resource_autocomplete?q=<query>");
    tracing::info!("  POST /api/3/action/resource_fork");
    tracing::info!("  POST /api/3/action/dataset_fork");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
