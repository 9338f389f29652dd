//! End-to-end practice flows over the bundled dataset.

use std::io::Write;

use pretty_assertions::assert_eq;
use serde_json::json;
use sql_practice::compare::Verdict;
use sql_practice::config::PracticeConfig;
use sql_practice::practice::{ExecuteRequest, ExecuteResponse, PracticeService};
use sql_practice::safety::GuardMode;

fn service() -> PracticeService {
    PracticeService::from_config(&PracticeConfig::default()).unwrap()
}

fn comparison(response: ExecuteResponse) -> Option<Verdict> {
    match response {
        ExecuteResponse::Executed { comparison, .. } => comparison,
        ExecuteResponse::Refused(error) => panic!("query refused: {}", error.error),
    }
}

#[tokio::test]
async fn test_drop_table_is_rejected_in_every_mode() {
    for guard in [GuardMode::Parser, GuardMode::Keywords] {
        let config = PracticeConfig {
            guard,
            ..PracticeConfig::default()
        };
        let service = PracticeService::from_config(&config).unwrap();
        let response = service
            .execute(ExecuteRequest::new("DROP TABLE products"))
            .await;

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "success": false,
                "error": "For security reasons, only SELECT queries are allowed in this demo"
            })
        );

        // The table is still there.
        let response = service
            .execute(ExecuteRequest::new("SELECT * FROM products"))
            .await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["user_result"]["row_count"], json!(6), "{guard}");
    }
}

#[tokio::test]
async fn test_every_reference_answer_matches_itself() {
    let service = service();
    let queries: Vec<(String, String)> = service
        .questions()
        .iter()
        .map(|q| (q.id.clone(), q.reference_query.clone()))
        .collect();

    for (id, query) in queries {
        let verdict = comparison(
            service
                .execute(ExecuteRequest::new(query).with_question(id.clone()))
                .await,
        )
        .expect("comparison");
        assert_eq!(verdict, Verdict::matched("Perfect match!"), "question {id}");
    }
}

#[tokio::test]
async fn test_question_three_wrong_answer() {
    let verdict = comparison(
        service()
            .execute(
                ExecuteRequest::new("SELECT ProductName FROM products WHERE Category = 'Home Decor'")
                    .with_question("3"),
            )
            .await,
    )
    .expect("comparison");
    assert_eq!(
        verdict,
        Verdict::mismatch("Row count mismatch: User has 2, expected 1")
    );
}

#[tokio::test]
async fn test_question_three_wrong_column_name() {
    let verdict = comparison(
        service()
            .execute(
                ExecuteRequest::new(
                    "SELECT p.ProductName AS name FROM products p
                     LEFT JOIN transactions t ON t.ProductID = p.ProductID
                     WHERE t.TransactionID IS NULL",
                )
                .with_question("3"),
            )
            .await,
    )
    .expect("comparison");
    assert_eq!(
        verdict,
        Verdict::mismatch("Column mismatch: User has {name}, expected {ProductName}")
    );
}

#[tokio::test]
async fn test_question_two_ignores_row_order() {
    let verdict = comparison(
        service()
            .execute(
                ExecuteRequest::new(
                    "SELECT SUM(t.TotalValue) AS total_spending_region, c.Region
                     FROM customers c JOIN transactions t USING (CustomerID)
                     GROUP BY c.Region
                     HAVING total_spending_region > 300
                     ORDER BY c.Region",
                )
                .with_question("2"),
            )
            .await,
    )
    .expect("comparison");
    assert!(verdict.matches, "{}", verdict.message);
}

#[tokio::test]
async fn test_question_four_different_values() {
    let verdict = comparison(
        service()
            .execute(
                ExecuteRequest::new(
                    "SELECT DISTINCT ProductID FROM transactions WHERE Price < 30",
                )
                .with_question("4"),
            )
            .await,
    )
    .expect("comparison");
    assert_eq!(
        verdict,
        Verdict::mismatch("Data content does not match exactly")
    );
}

#[tokio::test]
async fn test_unknown_question() {
    let service = service();

    let lookup = serde_json::to_value(service.question("99").await).unwrap();
    assert_eq!(lookup, json!({"error": "Question not found"}));

    let verdict = comparison(
        service
            .execute(ExecuteRequest::new("SELECT 1").with_question("99"))
            .await,
    )
    .expect("comparison");
    assert_eq!(
        verdict,
        Verdict::mismatch("Expected query failed: Question not found")
    );
}

#[tokio::test]
async fn test_statement_after_unparseable_read_is_refused() {
    let service = service();
    let response = service
        .execute(ExecuteRequest::new("SELECT 1; VACUUM INTO 'copy.db'"))
        .await;

    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "success": false,
            "error": "For security reasons, only SELECT queries are allowed in this demo"
        })
    );
}

#[tokio::test]
async fn test_user_syntax_error() {
    let response = service()
        .execute(ExecuteRequest::new("SELECT * FROM products WHERE").with_question("1"))
        .await;
    let value = serde_json::to_value(&response).unwrap();

    assert_eq!(value["user_result"]["success"], json!(false));
    let error = value["user_result"]["error"].as_str().unwrap();
    assert!(error.starts_with("SQL Error: "), "{error}");
    assert_eq!(value["comparison"]["match"], json!(false));
    assert!(value["comparison"]["message"]
        .as_str()
        .unwrap()
        .starts_with("User query failed: SQL Error: "));
}

#[tokio::test]
async fn test_custom_dataset_and_questions() {
    let dir = tempfile::tempdir().unwrap();

    let dataset_path = dir.path().join("zoo.sql");
    std::fs::write(
        &dataset_path,
        "CREATE TABLE animals (name TEXT, legs INTEGER);
         INSERT INTO animals VALUES ('cat', 4), ('bird', 2), ('snake', 0);",
    )
    .unwrap();

    let questions_path = dir.path().join("questions.toml");
    let mut file = std::fs::File::create(&questions_path).unwrap();
    write!(
        file,
        r#"
[[questions]]
id = "legless"
prompt = "Which animals have no legs?"
reference_query = "SELECT name FROM animals WHERE legs = 0"
"#
    )
    .unwrap();

    let config = PracticeConfig {
        dataset: Some(dataset_path),
        questions: Some(questions_path),
        ..PracticeConfig::default()
    };
    let service = PracticeService::from_config(&config).unwrap();

    let listing = service.list_questions();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].id, "legless");

    let verdict = comparison(
        service
            .execute(
                ExecuteRequest::new("SELECT name FROM animals WHERE legs < 1")
                    .with_question("legless"),
            )
            .await,
    )
    .expect("comparison");
    assert!(verdict.matches, "{}", verdict.message);
}
