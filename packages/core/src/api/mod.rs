//! HTTP hand-off of the rendered widget to the presentation layer.

pub mod health;
pub mod tvl;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;

use crate::metrics::AppMetrics;
use crate::widget::TvlWidget;

/// Shared state for the API routes.
#[derive(Clone)]
pub struct ApiState {
    pub widget: Arc<TvlWidget>,
    pub metrics: Arc<AppMetrics>,
}

/// Assemble the full router. `main.rs` serves exactly this.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/tvl", get(tvl::get_tvl))
        .route("/tvl/display", get(tvl::get_tvl_display))
        .route("/metrics", get(tvl::get_metrics))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
