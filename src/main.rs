mod catalog;
mod config;
mod entities;
mod error;
mod middleware;
mod models;
mod routes;
mod services;

use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog::{CatalogStore, FlatFileCatalog, SqlCatalog};
use config::{Backend, Cli, Config};
use middleware::auth::AdminGate;
use routes::{create_routes, AppState};
use services::reconcile::ReconcileService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commentary_eval=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_cli(Cli::parse())?;

    let catalog: Arc<dyn CatalogStore> = match config.backend {
        Backend::Flat => Arc::new(FlatFileCatalog::open(&config.data_dir).await?),
        Backend::Sql => Arc::new(SqlCatalog::connect(&config.database_url, &config.data_dir).await?),
    };
    tracing::info!(backend = ?config.backend, "Catalog ready in {:?}", config.data_dir);

    ReconcileService::new(catalog.clone()).log_report().await;

    let state = AppState {
        catalog,
        gate: Arc::new(AdminGate::new(&config)),
    };
    let app = create_routes(state, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on {}", listener.local_addr()?);
    tracing::info!("API docs: http://{}/swagger-ui/", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
