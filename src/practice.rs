//! Request orchestration.
//!
//! `PracticeService` ties the pieces together: it validates a submission,
//! runs it past the guard, executes it, and compares it with the reference
//! answer when a question is named.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::compare::{compare_results, Verdict};
use crate::config::PracticeConfig;
use crate::db::{DatasetScript, QueryEngine, QueryResult, SqliteSandbox};
use crate::error::Result;
use crate::questions::{QuestionBank, QUESTION_NOT_FOUND};
use crate::safety::QueryGuard;

/// Error reported for a missing or blank query.
pub const EMPTY_QUERY: &str = "Query cannot be empty";

/// Body of a query submission.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecuteRequest {
    /// The SQL to run.
    #[serde(default)]
    pub query: Option<String>,

    /// Question to compare against; a string or a number.
    #[serde(default)]
    pub question_id: Option<serde_json::Value>,
}

impl ExecuteRequest {
    /// Creates a request for `query` without a question.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            question_id: None,
        }
    }

    /// Sets the question to compare against.
    pub fn with_question(mut self, id: impl Into<String>) -> Self {
        self.question_id = Some(serde_json::Value::String(id.into()));
        self
    }

    /// Returns the question id as text, if a non-empty one was supplied.
    pub fn question_id(&self) -> Option<String> {
        let id = match self.question_id.as_ref()? {
            serde_json::Value::String(s) => s.trim().to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!id.is_empty()).then_some(id)
    }
}

/// `{success: false, error}` body used for refused requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error body with the given message.
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

/// Outcome of a query submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ExecuteResponse {
    /// The query ran; `comparison` is present when a question was named.
    Executed {
        user_result: QueryResult,
        comparison: Option<Verdict>,
    },

    /// The query was refused before execution.
    Refused(ErrorResponse),
}

impl ExecuteResponse {
    fn refused(error: impl Into<String>) -> Self {
        Self::Refused(ErrorResponse::new(error))
    }
}

/// Outcome of a question lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum QuestionResponse {
    Found {
        question: String,
        expected_result: QueryResult,
    },
    NotFound {
        error: String,
    },
}

/// Entry of the question listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSummary {
    pub id: String,
    pub question: String,
}

/// Handles practice submissions against a query engine.
pub struct PracticeService {
    engine: Arc<dyn QueryEngine>,
    questions: QuestionBank,
    guard: QueryGuard,
}

impl PracticeService {
    /// Creates a service over the given engine, questions and guard.
    pub fn new(engine: Arc<dyn QueryEngine>, questions: QuestionBank, guard: QueryGuard) -> Self {
        Self {
            engine,
            questions,
            guard,
        }
    }

    /// Builds a service backed by the SQLite sandbox from configuration.
    pub fn from_config(config: &PracticeConfig) -> Result<Self> {
        let dataset = match &config.dataset {
            Some(path) => {
                info!("Loading dataset from: {}", path.display());
                DatasetScript::load_from_file(path)?
            }
            None => DatasetScript::bundled(),
        };

        let questions = match &config.questions {
            Some(path) => {
                info!("Loading questions from: {}", path.display());
                QuestionBank::load_from_file(path)?
            }
            None => QuestionBank::builtin(),
        };

        info!(
            "Dataset has {} statements, {} questions, guard mode: {}",
            dataset.len(),
            questions.len(),
            config.guard
        );

        let engine = SqliteSandbox::new(dataset)
            .with_timeout(Duration::from_secs(config.query_timeout_secs));

        Ok(Self::new(
            Arc::new(engine),
            questions,
            QueryGuard::new(config.guard),
        ))
    }

    /// Returns the question bank.
    pub fn questions(&self) -> &QuestionBank {
        &self.questions
    }

    /// Returns the guard in use.
    pub fn guard(&self) -> &QueryGuard {
        &self.guard
    }

    /// Runs a submitted query and compares it with the named question.
    pub async fn execute(&self, request: ExecuteRequest) -> ExecuteResponse {
        let query = request.query.as_deref().map(str::trim).unwrap_or_default();
        if query.is_empty() {
            return ExecuteResponse::refused(EMPTY_QUERY);
        }
        info!("Received query: {query}");

        if let Err(rejection) = self.guard.check(query) {
            warn!("Rejected query ({}): {query}", rejection.reason);
            return ExecuteResponse::refused(rejection.to_string());
        }

        let user_result = self.engine.execute(query).await;
        debug!("User result success: {}", user_result.is_success());

        let comparison = match request.question_id() {
            Some(id) => {
                let expected = self
                    .questions
                    .expected_result(self.engine.as_ref(), &id)
                    .await;
                let verdict = compare_results(&user_result, &expected);
                info!(
                    "Question {id}: {} ({})",
                    if verdict.matches { "match" } else { "no match" },
                    verdict.message
                );
                Some(verdict)
            }
            None => None,
        };

        ExecuteResponse::Executed {
            user_result,
            comparison,
        }
    }

    /// Returns a question's prompt together with its reference result.
    pub async fn question(&self, id: &str) -> QuestionResponse {
        let Some(question) = self.questions.get(id) else {
            debug!("Unknown question requested: {id}");
            return QuestionResponse::NotFound {
                error: QUESTION_NOT_FOUND.to_string(),
            };
        };

        info!("Loading question {id}");
        let expected_result = self.engine.execute(&question.reference_query).await;
        QuestionResponse::Found {
            question: question.prompt.clone(),
            expected_result,
        }
    }

    /// Lists every question in id order.
    pub fn list_questions(&self) -> Vec<QuestionSummary> {
        self.questions
            .iter()
            .map(|q| QuestionSummary {
                id: q.id.clone(),
                question: q.prompt.clone(),
            })
            .collect()
    }
}
