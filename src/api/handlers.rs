use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::core::metrics;
use crate::core::state::AppState;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let settings = state.settings();
    Json(RootResponse {
        message: settings.api().project_name.clone(),
        version: settings.api().version.clone(),
        environment: settings.runtime().environment.as_str().to_string(),
    })
}

pub(crate) async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();

    let status = match state.store().ping().await {
        Ok(()) => {
            components.insert("store".to_string(), "healthy".to_string());
            StatusCode::OK
        }
        Err(err) => {
            tracing::warn!(error = %err, "store health check failed");
            components.insert("store".to_string(), format!("unhealthy: {err}"));
            StatusCode::SERVICE_UNAVAILABLE
        }
    };

    let label = if status == StatusCode::OK { "healthy" } else { "unhealthy" };
    (
        status,
        Json(HealthResponse {
            service: "examhall".to_string(),
            status: label.to_string(),
            components,
        }),
    )
}

pub(crate) async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    if !state.settings().telemetry().prometheus_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }

    match metrics::render() {
        Some(body) => ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
