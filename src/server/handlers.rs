//! Route handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path},
    response::{Html, IntoResponse, Response},
    Extension, Json,
};
use serde::Serialize;
use tracing::debug;

use crate::practice::{
    ExecuteRequest, ExecuteResponse, PracticeService, QuestionResponse, QuestionSummary,
};

use super::error::{ApiError, NO_JSON_DATA};

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Liveness response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Serves the practice page.
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// Runs a submitted query and compares it with the named question.
pub async fn execute_query(
    Extension(service): Extension<Arc<PracticeService>>,
    payload: Result<Json<ExecuteRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Rejected request body: {rejection}");
            return ApiError::reported(NO_JSON_DATA).into_response();
        }
    };

    let response: ExecuteResponse = service.execute(request).await;
    Json(response).into_response()
}

/// Returns a question and its reference result.
pub async fn get_question(
    Extension(service): Extension<Arc<PracticeService>>,
    Path(question_id): Path<String>,
) -> Json<QuestionResponse> {
    Json(service.question(&question_id).await)
}

/// Lists the available questions.
pub async fn list_questions(
    Extension(service): Extension<Arc<PracticeService>>,
) -> Json<Vec<QuestionSummary>> {
    Json(service.list_questions())
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
