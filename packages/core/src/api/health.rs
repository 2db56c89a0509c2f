use axum::{
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Json},
};
use serde_json::json;

use super::ApiState;

/// Liveness plus the state of the cached metrics document. Never triggers a fetch.
pub async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let fetcher = state.widget.fetcher();

    (
        [(header::CACHE_CONTROL, HeaderValue::from_static("no-store"))],
        Json(json!({
            "status": "ok",
            "source": fetcher.source_name(),
            "fetching": fetcher.is_fetching(),
            "widget": state.widget.status(),
        })),
    )
}
