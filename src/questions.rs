//! Practice questions and their reference answers.
//!
//! The bank is plain data: a built-in table of four questions over the
//! bundled dataset, optionally replaced by a TOML file of the form
//!
//! ```toml
//! [[questions]]
//! id = "1"
//! prompt = "Find the names of the products with zero transactions."
//! reference_query = "SELECT ProductName FROM products WHERE ..."
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{QueryEngine, QueryResult};
use crate::error::{PracticeError, Result};

/// Error reported when a question id is not in the bank.
pub const QUESTION_NOT_FOUND: &str = "Question not found";

const BUILTIN_QUESTIONS: &[(&str, &str, &str)] = &[
    (
        "1",
        "Write a SQL query to find the third transaction by date for each product.",
        "SELECT sub.*
            FROM (
                SELECT
                    t.*,
                    ROW_NUMBER() OVER (PARTITION BY t.ProductID ORDER BY t.TransactionDate) AS rn
                FROM transactions t
            ) AS sub
            JOIN customers c ON sub.CustomerID = c.CustomerID
            JOIN products p ON sub.ProductID = p.ProductID
            WHERE rn = 3",
    ),
    (
        "2",
        "Find the total spending for each region and sort the results from highest to lowest, including only those regions with a total spending value greater than 300.",
        "SELECT
                c.Region,
                SUM(t.TotalValue) as total_spending_region
            FROM transactions t
            LEFT JOIN customers c ON c.CustomerID = t.CustomerID
            GROUP BY c.Region
            HAVING SUM(t.TotalValue) > 300
            ORDER BY total_spending_region DESC",
    ),
    (
        "3",
        "Find the names of the products with zero transactions.",
        "SELECT p.ProductName FROM products p
            WHERE NOT EXISTS (
                SELECT 1 FROM transactions t WHERE p.ProductID = t.ProductID
            )",
    ),
    (
        "4",
        "Find the unique product IDs that have an average price higher than the overall average price.",
        "SELECT DISTINCT ProductID
            FROM transactions
            WHERE Price > (
                SELECT AVG(Price) FROM transactions
            )",
    ),
];

/// A practice question with its reference answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier used by the page and the API (e.g. `"3"`).
    pub id: String,

    /// The question shown to the user.
    pub prompt: String,

    /// SQL whose result is the correct answer.
    pub reference_query: String,
}

impl Question {
    /// Creates a new question.
    pub fn new(
        id: impl Into<String>,
        prompt: impl Into<String>,
        reference_query: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            reference_query: reference_query.into(),
        }
    }
}

/// On-disk layout of a question file.
#[derive(Debug, Deserialize)]
struct QuestionFile {
    #[serde(default)]
    questions: Vec<Question>,
}

/// The set of questions a server answers, ordered by id.
#[derive(Debug, Clone)]
pub struct QuestionBank {
    questions: Vec<Question>,
}

impl Default for QuestionBank {
    fn default() -> Self {
        Self::builtin()
    }
}

impl QuestionBank {
    /// Returns the built-in questions over the bundled dataset.
    pub fn builtin() -> Self {
        let questions = BUILTIN_QUESTIONS
            .iter()
            .map(|(id, prompt, query)| Question::new(*id, *prompt, *query))
            .collect();
        Self { questions }
    }

    /// Builds a bank from a list of questions.
    ///
    /// Fails if two questions share an id.
    pub fn from_questions(mut questions: Vec<Question>) -> Result<Self> {
        let mut seen = HashSet::new();
        for question in &questions {
            if !seen.insert(question.id.as_str()) {
                return Err(PracticeError::config(format!(
                    "Duplicate question id '{}'",
                    question.id
                )));
            }
        }

        questions.sort_by(|a, b| sort_key(&a.id).cmp(&sort_key(&b.id)));
        Ok(Self { questions })
    }

    /// Loads questions from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PracticeError::config(format!(
                "Failed to read question file {}: {e}",
                path.display()
            ))
        })?;

        let file: QuestionFile = toml::from_str(&content).map_err(|e| {
            PracticeError::config(format!(
                "Question file error in {}:\n  {}",
                path.display(),
                e
            ))
        })?;

        let bank = Self::from_questions(file.questions)?;
        debug!("Loaded {} questions from {}", bank.len(), path.display());
        Ok(bank)
    }

    /// Looks up a question by id.
    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Iterates over the questions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter()
    }

    /// Returns the number of questions.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Returns true if the bank has no questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Runs the reference answer for `id` through `engine`.
    ///
    /// Unknown ids produce a failed result rather than an error, so callers
    /// can feed the outcome straight into a comparison.
    pub async fn expected_result(&self, engine: &dyn QueryEngine, id: &str) -> QueryResult {
        match self.get(id) {
            Some(question) => {
                debug!("Running reference query for question {id}");
                engine.execute(&question.reference_query).await
            }
            None => QueryResult::failed(QUESTION_NOT_FOUND),
        }
    }
}

/// Numeric ids sort numerically and before any other ids.
fn sort_key(id: &str) -> (bool, u64, &str) {
    match id.parse::<u64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}
