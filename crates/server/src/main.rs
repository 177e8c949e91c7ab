use std::{net::SocketAddr, sync::Arc};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use retrorewind_server::{
    app,
    config::Config,
    db::{AuditLog, Database},
    services::catalog::CatalogGateway,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real deployments set the environment directly.
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "retrorewind_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    if config.catalog.igdb_client_id.is_none() || config.catalog.igdb_client_secret.is_none() {
        tracing::warn!("IGDB_CLIENT_ID/IGDB_CLIENT_SECRET not set; game search will fail");
    }
    if config.catalog.omdb_api_key.is_none() {
        tracing::warn!("OMDB_API_KEY not set; movie search will fail");
    }

    let db = Database::connect(&config.database_url).await?;
    db.run_migrations().await?;

    let audit = AuditLog::connect(&config.audit_database_url).await?;
    audit.run_migrations().await?;

    let catalog = Arc::new(CatalogGateway::new(config.catalog.clone())?);

    let state = AppState {
        db,
        audit,
        config: config.clone(),
        catalog,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}
