//! HTTP API: `POST /ask` routes a query, `GET /health` reports liveness.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sift_runtime::QueryDispatcher;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
struct AppState {
    dispatcher: Arc<QueryDispatcher>,
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    query: Option<String>,
    max_retries: Option<u32>,
}

pub fn build_router(dispatcher: Arc<QueryDispatcher>) -> Router {
    Router::new()
        .route("/ask", post(ask))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { dispatcher })
}

pub async fn serve(addr: SocketAddr, dispatcher: Arc<QueryDispatcher>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "Listening");

    axum::serve(listener, build_router(dispatcher))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutting down");
        })
        .await
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

async fn ask(State(state): State<AppState>, body: Result<Json<AskRequest>, JsonRejection>) -> Response {
    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Rejected /ask body");
            return bad_request("Query not provided");
        }
    };

    let Some(query) = request.query.as_deref().map(str::trim).filter(|q| !q.is_empty()) else {
        return bad_request("Query not provided");
    };

    // 0 means the configured budget.
    let max_retries = request.max_retries.filter(|&n| n > 0);
    let dispatch = state.dispatcher.dispatch(query, max_retries).await;
    tracing::info!(kind = ?dispatch.kind, "Answered /ask");
    Json(dispatch).into_response()
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
