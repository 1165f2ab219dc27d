// src/api.rs
//! HTTP surface over the insights service.
//!
//! - `GET /health` → `ok`
//! - `GET /insights?q=term` → composite JSON, `X-Insights-Cache: HIT|MISS`

use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::{debug, warn};

use crate::insights::InsightsService;

pub const CACHE_HEADER: &str = "x-insights-cache";

#[derive(Clone)]
pub struct AppState {
    pub insights: InsightsService,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(insights: InsightsService, request_timeout: Duration) -> Self {
        Self {
            insights,
            request_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/insights", get(insights))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct InsightsParams {
    #[serde(default)]
    q: Option<String>,
}

async fn insights(State(state): State<AppState>, Query(params): Query<InsightsParams>) -> Response {
    let term = params.q.as_deref();
    match state
        .insights
        .get_with_timeout(term, state.request_timeout)
        .await
    {
        Ok(Some(lookup)) => {
            debug!(target: "api", status = ?lookup.status, "insights served");
            (
                [(CACHE_HEADER, lookup.status.as_header())],
                Json(lookup.value),
            )
                .into_response()
        }
        Ok(None) => (
            StatusCode::GATEWAY_TIMEOUT,
            Json(json!({ "error": "insights are still being computed; retry shortly" })),
        )
            .into_response(),
        Err(e) => {
            warn!(target: "api", error = %format!("{e:#}"), "insights request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({ "error": "upstream data unavailable" })),
            )
                .into_response()
        }
    }
}
