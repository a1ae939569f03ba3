use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::Value;
use tower_http::cors::{Any, CorsLayer};

use eventsink_common::{iso_timestamp, AppConfig};
use eventsink_ingest::{IngestDispatcher, SubmitOutcome};

#[derive(Clone)]
pub struct AppState {
    dispatcher: Arc<IngestDispatcher>,
    service_name: Arc<str>,
}

impl AppState {
    pub fn new(dispatcher: Arc<IngestDispatcher>, service_name: &str) -> Self {
        Self {
            dispatcher,
            service_name: Arc::from(service_name),
        }
    }
}

pub fn build_router(state: AppState, config: &AppConfig) -> Router {
    let cors = if config.allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/", get(status).post(ingest))
        .route("/api/events", post(ingest))
        .route("/api/status", get(status))
        .route("/health", get(health))
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_body_bytes))
        .layer(cors)
        // Method + path only; payloads may carry user data.
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

async fn health() -> &'static str {
    "ok"
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
    service: String,
    sheets: Vec<String>,
    timestamp: String,
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online",
        service: state.service_name.to_string(),
        sheets: state
            .dispatcher
            .catalog()
            .domains()
            .map(str::to_string)
            .collect(),
        timestamp: iso_timestamp(state.dispatcher.clock().now()),
    })
}

/// Body is parsed here rather than with `Json<Value>` so malformed JSON gets
/// the same `{success, error}` shape as every other rejection.
async fn ingest(State(state): State<AppState>, body: Bytes) -> Response {
    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected unparseable submission body");
            let outcome = SubmitOutcome {
                success: false,
                processed: None,
                error: Some(format!("Validation error: body is not valid JSON: {e}")),
            };
            return (StatusCode::BAD_REQUEST, Json(outcome)).into_response();
        }
    };

    let result = state.dispatcher.submit(&payload).await;
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(e) if e.is_validation() => StatusCode::BAD_REQUEST,
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (status, Json(SubmitOutcome::from(&result))).into_response()
}
