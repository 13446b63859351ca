use anyhow::{anyhow, Result};
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

use post_classifier::classifier::Classifier;
use post_classifier::config::default_categories;
use post_classifier::db;
use post_classifier::handlers::{build_router, AppState};

async fn setup_pool() -> sqlx::SqlitePool {
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    db::run_migrations(&pool).await.unwrap();
    pool
}

/// Returns a fixed answer (or an error) and records every prompt it saw.
#[derive(Clone, Default)]
struct StubClassifier {
    answer: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl StubClassifier {
    fn answering(answer: &str) -> Self {
        Self {
            answer: Some(answer.to_string()),
            ..Default::default()
        }
    }

    fn failing() -> Self {
        Self::default()
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Classifier for StubClassifier {
    async fn invoke(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer.clone().ok_or_else(|| anyhow!("ollama: command not found"))
    }
}

fn app(pool: &sqlx::SqlitePool, classifier: StubClassifier) -> Router {
    let state = AppState::new(pool.clone(), Arc::new(classifier), default_categories());
    build_router(state)
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn home_page_lists_endpoints() {
    let pool = setup_pool().await;
    let response = app(&pool, StubClassifier::failing())
        .oneshot(get("/"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("/classify_posts"));
    assert!(html.contains("/get_unclassified_posts"));
    assert!(html.contains("/get_classified_posts"));
}

#[tokio::test]
async fn classify_post_returns_parsed_category() {
    let pool = setup_pool().await;
    let stub = StubClassifier::answering("Categories: Technology, Science");

    let response = app(&pool, stub.clone())
        .oneshot(post_json("/classify_posts", r#"{"post": "test content"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(
        body,
        json!({
            "post": "test content",
            "category": "Technology, Science",
            "response": "Categories: Technology, Science"
        })
    );

    let prompts = stub.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Post: test content"));

    let stored = db::list_classified(&pool).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text, "test content");
    assert_eq!(stored[0].category.as_deref(), Some("Technology, Science"));
}

#[tokio::test]
async fn classify_post_with_failing_classifier_stores_unknown() {
    let pool = setup_pool().await;

    let response = app(&pool, StubClassifier::failing())
        .oneshot(post_json("/classify_posts", r#"{"post": "hello"}"#))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["category"], "Unknown");
    assert!(body["response"].is_null());
}

#[tokio::test]
async fn classify_post_rejects_missing_text() {
    let pool = setup_pool().await;

    for body in ["", "{}", r#"{"post": ""}"#, r#"{"post": "   "}"#, "not json", r#"{"post": 7}"#] {
        let stub = StubClassifier::answering("Categories: Technology");
        let response = app(&pool, stub.clone())
            .oneshot(post_json("/classify_posts", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body {:?}", body);

        let json = extract_json(response.into_body()).await;
        assert_eq!(json["error"], "No post text provided");
        assert!(stub.prompts().is_empty());
    }

    assert_eq!(db::count_posts(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn classify_post_without_content_type_is_bad_request() {
    let pool = setup_pool().await;
    let request = Request::builder()
        .method("POST")
        .uri("/classify_posts")
        .body(Body::empty())
        .unwrap();

    let response = app(&pool, StubClassifier::failing())
        .oneshot(request)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(db::count_posts(&pool).await.unwrap(), 0);
}

#[tokio::test]
async fn listings_split_by_classification() {
    let pool = setup_pool().await;
    let first = db::insert_post(&pool, "first").await.unwrap();
    let second = db::insert_post(&pool, "second").await.unwrap();
    db::update_classification(&pool, second, "Music", Some("Categories: Music"))
        .await
        .unwrap();

    let router = app(&pool, StubClassifier::failing());

    let response = router
        .clone()
        .oneshot(get("/get_unclassified_posts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let unclassified = extract_json(response.into_body()).await;
    assert_eq!(unclassified, json!([{ "id": first, "post": "first" }]));

    // Same answer again with no writes in between.
    let again = router
        .clone()
        .oneshot(get("/get_unclassified_posts"))
        .await
        .unwrap();
    assert_eq!(extract_json(again.into_body()).await, unclassified);

    let response = router
        .oneshot(get("/get_classified_posts"))
        .await
        .unwrap();
    let classified = extract_json(response.into_body()).await;
    assert_eq!(
        classified,
        json!([{
            "id": second,
            "post": "second",
            "category": "Music",
            "response": "Categories: Music"
        }])
    );
}

#[tokio::test]
async fn storage_failure_is_internal_error() {
    let pool = setup_pool().await;
    let router = app(&pool, StubClassifier::failing());
    pool.close().await;

    let response = router
        .oneshot(get("/get_classified_posts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = extract_json(response.into_body()).await;
    assert!(body["error"].is_string());
}
