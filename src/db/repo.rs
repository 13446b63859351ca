use super::model::PendingPost;
use crate::model::{Classification, Post, UNKNOWN_CATEGORY};
use anyhow::{ensure, Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    // WAL lets the API read while the poll loop writes.
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {}", normalized))?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full);
    let pool = SqlitePoolOptions::new()
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database {}", normalized))?;
    Ok(pool)
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") {
        return url.to_string();
    }

    // In-memory URLs like sqlite::memory: or sqlite::memory:?cache=shared
    if url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);

    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };

    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match path_part.strip_prefix("~/") {
        Some(rest) => match std::env::var("HOME") {
            Ok(home) => format!("{}/{}", home.trim_end_matches('/'), rest),
            Err(_) => path_part.to_string(),
        },
        None => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn insert_post(pool: &Pool, text: &str) -> Result<i64> {
    ensure!(!text.trim().is_empty(), "post text must be non-empty");
    let rec = sqlx::query("INSERT INTO posts (post) VALUES (?) RETURNING id")
        .bind(text)
        .fetch_one(pool)
        .await?;
    Ok(rec.get::<i64, _>("id"))
}

/// Insert many unclassified posts in one transaction. Any blank entry rejects
/// the whole batch before anything is written.
#[instrument(skip_all)]
pub async fn insert_posts<I, S>(pool: &Pool, texts: I) -> Result<u64>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let texts: Vec<S> = texts.into_iter().collect();
    ensure!(
        texts.iter().all(|t| !t.as_ref().trim().is_empty()),
        "post text must be non-empty"
    );

    let mut tx = pool.begin().await?;
    let mut count = 0;
    for text in &texts {
        count += sqlx::query("INSERT INTO posts (post) VALUES (?)")
            .bind(text.as_ref())
            .execute(&mut *tx)
            .await?
            .rows_affected();
    }
    tx.commit().await?;
    Ok(count)
}

/// Insert a post together with the classification it already received.
#[instrument(skip_all)]
pub async fn insert_classified_post(
    pool: &Pool,
    text: &str,
    classification: &Classification,
) -> Result<i64> {
    ensure!(!text.trim().is_empty(), "post text must be non-empty");
    let rec = sqlx::query(
        "INSERT INTO posts (post, category, response) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(text)
    .bind(&classification.category)
    .bind(classification.response.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(rec.get::<i64, _>("id"))
}

#[instrument(skip_all)]
pub async fn list_unclassified(pool: &Pool) -> Result<Vec<PendingPost>> {
    let rows = sqlx::query_as::<_, PendingPost>(
        "SELECT id, post FROM posts WHERE category IS NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Posts whose classifier invocation failed: labelled unknown with no response.
#[instrument(skip_all)]
pub async fn list_failed(pool: &Pool) -> Result<Vec<PendingPost>> {
    let rows = sqlx::query_as::<_, PendingPost>(
        "SELECT id, post FROM posts WHERE category = ? AND response IS NULL ORDER BY id",
    )
    .bind(UNKNOWN_CATEGORY)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn list_classified(pool: &Pool) -> Result<Vec<Post>> {
    let rows = sqlx::query_as::<_, Post>(
        "SELECT id, post, category, response FROM posts WHERE category IS NOT NULL ORDER BY id",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

#[instrument(skip_all)]
pub async fn fetch_post(pool: &Pool, id: i64) -> Result<Option<Post>> {
    let post = sqlx::query_as::<_, Post>(
        "SELECT id, post, category, response FROM posts WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(post)
}

/// Record the classification for a post. Returns `false` when no such post exists.
#[instrument(skip_all)]
pub async fn update_classification(
    pool: &Pool,
    id: i64,
    category: &str,
    response: Option<&str>,
) -> Result<bool> {
    let done = sqlx::query("UPDATE posts SET category = ?, response = ? WHERE id = ?")
        .bind(category)
        .bind(response)
        .bind(id)
        .execute(pool)
        .await
        .with_context(|| format!("failed to persist classification for post {}", id))?;
    Ok(done.rows_affected() > 0)
}

#[instrument(skip_all)]
pub async fn count_posts(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[instrument(skip_all)]
pub async fn count_unclassified(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE category IS NULL")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
