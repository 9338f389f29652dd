//! HTTP server.
//!
//! Exposes the practice page and its JSON API:
//!
//! - `GET /` serves the page
//! - `POST /execute_query` runs a query, optionally comparing it with a question
//! - `GET /get_question/:question_id` returns a prompt and its reference result
//! - `GET /questions` lists the questions
//! - `GET /health` reports liveness

pub mod error;
pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{PracticeError, Result};
use crate::practice::PracticeService;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Creates the Axum router.
pub fn create_router(service: Arc<PracticeService>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/execute_query", post(handlers::execute_query))
        .route("/get_question/:question_id", get(handlers::get_question))
        .route("/questions", get(handlers::list_questions))
        .route("/health", get(handlers::health))
        .layer(Extension(service))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CatchPanicLayer::custom(error::handle_panic))
        .layer(TraceLayer::new_for_http())
}

/// Binds `addr` and serves until SIGINT or SIGTERM.
pub async fn start_server(service: Arc<PracticeService>, addr: SocketAddr) -> Result<()> {
    let app = create_router(service);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| PracticeError::server(format!("Failed to bind {addr}: {e}")))?;

    info!("SQL practice server listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| PracticeError::server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
