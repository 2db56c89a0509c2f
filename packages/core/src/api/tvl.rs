use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::Response,
    Json,
};
use serde_json::{json, Value};

use super::ApiState;
use crate::widget::Rendered;

/// Current widget frame as JSON. Always 200: failures show up as a
/// placeholder display with a non-`value` status.
pub async fn get_tvl(State(state): State<ApiState>) -> Json<Rendered> {
    Json(state.widget.refresh().await)
}

/// Bare display string, ready to drop into the page.
pub async fn get_tvl_display(State(state): State<ApiState>) -> Response {
    let rendered = state.widget.refresh().await;
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"))
        .body(Body::from(rendered.display))
        .expect("display response should be valid")
}

pub async fn get_metrics(
    State(state): State<ApiState>,
) -> Result<Response, (StatusCode, Json<Value>)> {
    let body = state.metrics.render().map_err(|err| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("Failed to render metrics: {}", err) })),
        )
    })?;

    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Body::from(body))
        .expect("metrics response should be valid"))
}
