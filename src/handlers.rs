//! HTTP surface: add a post (classified on the spot) and list posts by
//! classification status.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Static page describing the endpoints |
//! | `POST` | `/classify_posts` | Classify `{"post": "..."}` and store it |
//! | `GET`  | `/get_unclassified_posts` | `[{"id", "post"}]` |
//! | `GET`  | `/get_classified_posts` | `[{"id", "post", "category", "response"}]` |
//!
//! Errors are returned as `{"error": "<message>"}`.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument};

use crate::classifier::{classify_text, Classifier};
use crate::db::{self, PendingPost};
use crate::model::Post;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub classifier: Arc<dyn Classifier>,
    pub categories: Arc<[String]>,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        classifier: Arc<dyn Classifier>,
        categories: impl Into<Arc<[String]>>,
    ) -> Self {
        Self {
            pool,
            classifier,
            categories: categories.into(),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/classify_posts", post(classify_post))
        .route("/get_unclassified_posts", get(get_unclassified_posts))
        .route("/get_classified_posts", get(get_classified_posts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve `router` on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, router: Router, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!(addr = %listener.local_addr()?, "http server listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

const HOME_PAGE: &str = r#"<h1>Welcome to the Post Classification Service!</h1>
<p>Here you can classify your posts into various categories.</p>
<h3>Available Endpoints:</h3>
<ul>
    <li><b>/classify_posts</b> (POST): Classify a given post by sending its text.</li>
    <li><b>/get_unclassified_posts</b> (GET): Retrieve all posts that have not been classified yet.</li>
    <li><b>/get_classified_posts</b> (GET): Retrieve all posts that have been classified.</li>
</ul>
<h3>Usage:</h3>
<p>To classify a post, send a POST request to <code>/classify_posts</code> with a JSON body such as <code>{"post": "your text"}</code>.</p>
"#;

async fn home() -> Html<&'static str> {
    Html(HOME_PAGE)
}

#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    pub post: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClassifyResponse {
    pub post: String,
    pub category: String,
    pub response: Option<String>,
}

#[instrument(skip_all)]
async fn classify_post(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> Result<Json<ClassifyResponse>, ApiError> {
    // Empty, non-JSON and field-less bodies are all the same client error.
    let text = payload
        .ok()
        .and_then(|Json(req)| req.post)
        .filter(|p| !p.trim().is_empty())
        .ok_or(ApiError::MissingPost)?;

    let result = classify_text(state.classifier.as_ref(), &state.categories[..], &text).await;
    let id = db::insert_classified_post(&state.pool, &text, &result).await?;
    info!(post_id = id, category = %result.category, "post classified via api");

    Ok(Json(ClassifyResponse {
        post: text,
        category: result.category,
        response: result.response,
    }))
}

async fn get_unclassified_posts(
    State(state): State<AppState>,
) -> Result<Json<Vec<PendingPost>>, ApiError> {
    Ok(Json(db::list_unclassified(&state.pool).await?))
}

async fn get_classified_posts(State(state): State<AppState>) -> Result<Json<Vec<Post>>, ApiError> {
    Ok(Json(db::list_classified(&state.pool).await?))
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Error type that converts into an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    MissingPost,
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::MissingPost => (StatusCode::BAD_REQUEST, "No post text provided".to_string()),
            ApiError::Internal(err) => {
                error!(?err, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}
