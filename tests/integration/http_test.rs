//! HTTP API tests against the real sandbox (tower test utilities, no server needed).

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sql_practice::config::PracticeConfig;
use sql_practice::practice::PracticeService;
use sql_practice::server::create_router;
use tower::ServiceExt;

fn create_test_app() -> Router {
    let service = PracticeService::from_config(&PracticeConfig::default()).unwrap();
    create_router(Arc::new(service))
}

async fn send_json_request(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let req = match method {
        "GET" => Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
        "POST" => Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(
                serde_json::to_string(&body.unwrap_or(json!({}))).unwrap(),
            ))
            .unwrap(),
        _ => panic!("Unsupported method"),
    };

    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap_or(json!({}));
    (status, json)
}

#[tokio::test]
async fn test_question_three_end_to_end() {
    let app = create_test_app();

    let (status, json) = send_json_request(&app, "GET", "/get_question/3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "question": "Find the names of the products with zero transactions.",
            "expected_result": {
                "success": true,
                "columns": ["ProductName"],
                "rows": [{"ProductName": "ComfortLiving Rug"}],
                "row_count": 1
            }
        })
    );

    let (status, json) = send_json_request(
        &app,
        "POST",
        "/execute_query",
        Some(json!({
            "query": "SELECT ProductName FROM products WHERE ProductID NOT IN (SELECT ProductID FROM transactions)",
            "question_id": 3
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["comparison"], json!({"match": true, "message": "Perfect match!"}));
}

#[tokio::test]
async fn test_question_two_expected_result() {
    let app = create_test_app();
    let (_, json) = send_json_request(&app, "GET", "/get_question/2", None).await;

    assert_eq!(
        json["expected_result"]["rows"],
        json!([
            {"Region": "Europe", "total_spending_region": 523.0},
            {"Region": "Asia", "total_spending_region": 350.0}
        ])
    );
}

#[tokio::test]
async fn test_drop_table_rejected() {
    let app = create_test_app();
    let (status, json) = send_json_request(
        &app,
        "POST",
        "/execute_query",
        Some(json!({"query": "DROP TABLE products"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        json,
        json!({
            "success": false,
            "error": "For security reasons, only SELECT queries are allowed in this demo"
        })
    );
}

#[tokio::test]
async fn test_missing_query_field() {
    let app = create_test_app();
    let (_, json) = send_json_request(
        &app,
        "POST",
        "/execute_query",
        Some(json!({"question_id": "1"})),
    )
    .await;
    assert_eq!(json, json!({"success": false, "error": "Query cannot be empty"}));
}

#[tokio::test]
async fn test_free_query_has_null_comparison() {
    let app = create_test_app();
    let (_, json) = send_json_request(
        &app,
        "POST",
        "/execute_query",
        Some(json!({"query": "SELECT CustomerName FROM customers WHERE Region = 'Asia'"})),
    )
    .await;

    assert_eq!(
        json,
        json!({
            "user_result": {
                "success": true,
                "columns": ["CustomerName"],
                "rows": [{"CustomerName": "Chen Wei"}],
                "row_count": 1
            },
            "comparison": null
        })
    );
}

#[tokio::test]
async fn test_list_questions() {
    let app = create_test_app();
    let (_, json) = send_json_request(&app, "GET", "/questions", None).await;
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["1", "2", "3", "4"]);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = create_test_app();
    let (status, _) = send_json_request(&app, "GET", "/admin", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
