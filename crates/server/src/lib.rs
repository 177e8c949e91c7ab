use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod routes;
pub mod services;

use services::catalog::MediaCatalog;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub audit: db::AuditLog,
    pub config: config::Config,
    pub catalog: Arc<dyn MediaCatalog>,
}

/// Builds the full HTTP API around `state`.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .merge(routes::auth::router())
        .merge(routes::search::router())
        .merge(routes::comments::router())
        .nest("/profile", routes::profile::router())
        .nest("/ratings", routes::ratings::router())
        .nest("/threads", routes::threads::router())
        .fallback(not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> Json<Value> {
    Json(json!({ "ok": true }))
}

async fn not_found() -> error::AppError {
    error::AppError::RouteNotFound
}
