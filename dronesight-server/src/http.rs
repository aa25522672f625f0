// HTTP router: liveness endpoints plus the analyze WebSocket

use crate::session::AnalysisContext;
use crate::websocket::analyze_handler;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub const SERVICE_NAME: &str = "dronesight";

/// Shared router state
#[derive(Clone)]
pub struct AppState {
    pub context: AnalysisContext,
    pub analyze_path: String,
}

impl AppState {
    pub fn new(context: AnalysisContext, analyze_path: impl Into<String>) -> Self {
        Self {
            context,
            analyze_path: analyze_path.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub analyze_endpoint: String,
}

/// Create the HTTP router
pub fn create_router(state: AppState) -> Router {
    let analyze_path = state.analyze_path.clone();

    Router::new()
        .route("/", get(health_handler))
        .route("/health", get(health_handler))
        .route(&analyze_path, get(analyze_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Liveness endpoint
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "running".to_string(),
        service: SERVICE_NAME.to_string(),
        analyze_endpoint: state.analyze_path.clone(),
    })
}
