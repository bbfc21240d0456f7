//! HTTP API server for the course assistant.
//!
//! Provides REST endpoints for queries and the course catalog.

use crate::cli::preflight::{self, Operation};
use crate::cli::setup::build_rag_system;
use crate::cli::Output;
use crate::config::Settings;
use crate::rag::RagSystem;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;

/// Shared application state.
pub struct AppState {
    pub rag: RagSystem,
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/query", post(query))
        .route("/api/courses", get(courses))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<&str>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Query, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or(&settings.server.host).to_string();
    let port = port.unwrap_or(settings.server.port);

    let rag = build_rag_system(&settings).await?;
    let app = router(Arc::new(AppState { rag }));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Coursemate API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Query", "POST /api/query");
    Output::kv("Courses", "GET  /api/courses");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Debug, Deserialize)]
struct QueryRequest {
    query: String,
    #[serde(default)]
    session_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct QueryResponse {
    answer: String,
    /// Rendered citations: `label` or `[label](link)`.
    sources: Vec<String>,
    session_id: String,
}

#[derive(Debug, Serialize)]
struct CourseStats {
    total_courses: usize,
    course_titles: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn internal_error(e: impl std::fmt::Display) -> axum::response::Response {
    error!("Request failed: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QueryRequest>,
) -> impl IntoResponse {
    let session_id = match req.session_id {
        Some(id) if !id.is_empty() => id,
        _ => state.rag.sessions().create_session(),
    };

    match state.rag.query(&req.query, Some(&session_id)).await {
        Ok(response) => Json(QueryResponse {
            answer: response.answer,
            sources: response.sources.iter().map(ToString::to_string).collect(),
            session_id,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn courses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.rag.course_analytics().await {
        Ok(analytics) => Json(CourseStats {
            total_courses: analytics.total_courses,
            course_titles: analytics.course_titles,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}
