use anyhow::Result;
use axum::Router;
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod s3;
mod services;

use services::session_store::{InMemorySessionStore, SessionStore};
use services::storage_service::StorageService;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting s3-console on {} (signing region {})",
        cfg.addr(),
        cfg.region
    );
    if cfg.session_secret == config::DEFAULT_SESSION_SECRET {
        tracing::warn!(
            "Using the compiled-in session secret; set S3_CONSOLE_SESSION_SECRET before deploying"
        );
    }

    // --- Initialize core service ---
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let service = StorageService::new(sessions, cfg.region.clone(), cfg.session_secret.clone());

    // --- Build router ---
    let app: Router = routes::routes::routes().with_state(service);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
