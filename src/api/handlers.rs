use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::collections::HashMap;

use crate::core::metrics;
use crate::core::state::AppState;
use crate::db::StoreHealth;
use crate::schemas::{HealthResponse, RootResponse};

pub(crate) async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    let response = RootResponse {
        message: state.settings().api().project_name.clone(),
        version: state.settings().api().version.clone(),
        api_prefix: state.settings().api().api_v1_str.clone(),
    };

    Json(response)
}

pub(crate) async fn healthz(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let mut components = HashMap::new();
    let store_key = format!("store:{}", state.store().backend_name());

    let (code, status) = match state.store().health().await {
        StoreHealth::Healthy => {
            components.insert(store_key, "healthy".to_string());
            (StatusCode::OK, "healthy")
        }
        StoreHealth::Unhealthy(error) => {
            components.insert(store_key, format!("unhealthy: {error}"));
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    let ai_configured = !state.settings().ai().openai_base_url.is_empty();
    components.insert(
        "ai".to_string(),
        if ai_configured { "configured" } else { "not configured" }.to_string(),
    );

    (
        code,
        Json(HealthResponse {
            service: "khtn-grader".to_string(),
            status: status.to_string(),
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
