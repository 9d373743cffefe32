pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::cache::SnapshotCache;

pub type SharedCache = Arc<SnapshotCache>;

pub fn create_router(cache: SharedCache) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/coins", get(routes::get_coins))
        .route("/coin/:symbol/latest", get(routes::get_coin_latest))
        .route("/coin/:symbol/history", get(routes::get_coin_history))
        .route("/metrics/aggregate", get(routes::get_aggregate))
        .route("/metrics/top", get(routes::get_top))
        .route("/metrics/compare", get(routes::get_comparison))
        .route("/dashboard", get(routes::get_dashboard))
        .route("/refresh", post(routes::refresh))
        .with_state(cache)
        .layer(CorsLayer::permissive()) // read-only data, any origin
}

pub async fn start_server(cache: SnapshotCache, port: u16) -> anyhow::Result<()> {
    let app = create_router(Arc::new(cache));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    tracing::info!("Dashboard API running on http://localhost:{}", port);
    axum::serve(listener, app).await?;

    Ok(())
}
