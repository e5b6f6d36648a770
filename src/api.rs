//! HTTP server for the advisor
//!
//! Serves the browser form (`/`, `/search`) and a JSON API under `/api`.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Form, Path, Query, State,
    },
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::agent::Orchestrator;
use crate::error::AdvisorError;
use crate::html;

const DEFAULT_LOG_LIMIT: usize = 20;

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct SearchForm {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub limit: Option<usize>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn failure(error: AdvisorError) -> ApiResult {
    let status = error.status_code();
    if status.is_server_error() {
        warn!(%status, error = %error, "Request failed");
    }
    (status, Json(ApiResponse::error(error.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
}

/// =============================
/// HTML Endpoints
/// =============================

async fn index() -> Html<String> {
    Html(html::index_page())
}

async fn search(State(state): State<ApiState>, Form(form): Form<SearchForm>) -> Html<String> {
    info!(query_chars = form.query.chars().count(), "Received search form");

    match state.orchestrator.ask(&form.query).await {
        Ok(answer) => Html(html::answer_page(form.query.trim(), &answer)),
        Err(e) => {
            warn!(error = %e, "Search failed");
            Html(html::error_page(form.query.trim(), &e.to_string()))
        }
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// JSON Endpoints
/// =============================

async fn ask(
    State(state): State<ApiState>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> ApiResult {
    let req = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return failure(AdvisorError::InvalidQuery(rejection.body_text())),
    };

    info!(query_chars = req.query.chars().count(), "Received ask request");

    match state.orchestrator.ask(&req.query).await {
        Ok(answer) => (StatusCode::OK, Json(ApiResponse::success(answer))),
        Err(e) => failure(e),
    }
}

async fn list_logs(
    State(state): State<ApiState>,
    params: Result<Query<LogsQuery>, QueryRejection>,
) -> ApiResult {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return failure(AdvisorError::InvalidQuery(rejection.body_text())),
    };
    let limit = params.limit.unwrap_or(DEFAULT_LOG_LIMIT);

    match state.orchestrator.store().recent(limit).await {
        Ok(logs) => (StatusCode::OK, Json(ApiResponse::success(logs))),
        Err(e) => failure(e),
    }
}

async fn get_log(State(state): State<ApiState>, Path(log_id): Path<String>) -> ApiResult {
    let log_id = match Uuid::parse_str(&log_id) {
        Ok(id) => id,
        Err(e) => return failure(AdvisorError::from(e)),
    };

    match state.orchestrator.store().get(log_id).await {
        Ok(Some(log)) => (StatusCode::OK, Json(ApiResponse::success(log))),
        Ok(None) => failure(AdvisorError::NotFound(format!("Q&A log {}", log_id))),
        Err(e) => failure(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(orchestrator: Arc<Orchestrator>) -> Router {
    let state = ApiState { orchestrator };

    Router::new()
        .route("/", get(index))
        .route("/search", post(search))
        .route("/health", get(health))
        .route("/api/ask", post(ask))
        .route("/api/logs", get(list_logs))
        .route("/api/logs/:log_id", get(get_log))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    orchestrator: Arc<Orchestrator>,
    bind_address: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(orchestrator);

    let listener = tokio::net::TcpListener::bind(bind_address).await?;

    info!("API Server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router).await?;

    Ok(())
}
