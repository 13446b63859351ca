use crate::classifier::{classify_text, Classifier};
use crate::config::Config;
use crate::db;
use crate::model::ClassifiedPost;
use anyhow::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Settings for the poll loop.
#[derive(Debug, Clone)]
pub struct PollOptions {
    pub categories: Arc<[String]>,
    pub interval: Duration,
    pub retry_failed: bool,
}

impl PollOptions {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            categories: cfg.classifier.categories.clone().into(),
            interval: cfg.poll_interval(),
            retry_failed: cfg.app.retry_failed,
        }
    }
}

/// One tick: classify every post that has no category yet, one at a time,
/// writing each result as soon as it is known.
#[instrument(skip_all)]
pub async fn classify_pending(
    pool: &SqlitePool,
    classifier: &dyn Classifier,
    options: &PollOptions,
) -> Result<Vec<ClassifiedPost>> {
    let mut pending = db::list_unclassified(pool).await?;
    if options.retry_failed {
        pending.extend(db::list_failed(pool).await?);
    }

    let mut classified = Vec::with_capacity(pending.len());
    for post in pending {
        let result = classify_text(classifier, &options.categories[..], &post.text).await;
        if !db::update_classification(pool, post.id, &result.category, result.response.as_deref())
            .await?
        {
            warn!(post_id = post.id, "post vanished before its classification was stored");
            continue;
        }
        if result.is_failure() {
            warn!(post_id = post.id, "classifier failed; post marked unknown");
        } else {
            info!(post_id = post.id, category = %result.category, "post classified");
        }
        classified.push(ClassifiedPost {
            post_id: post.id,
            category: result.category,
            response: result.response,
        });
    }
    Ok(classified)
}

/// Run ticks forever, sleeping `options.interval` between them. A tick that
/// fails on storage is logged and the next tick starts on schedule.
pub async fn run(pool: SqlitePool, classifier: Arc<dyn Classifier>, options: PollOptions) {
    loop {
        info!("checking for unclassified posts");
        match classify_pending(&pool, classifier.as_ref(), &options).await {
            Ok(done) => info!(count = done.len(), "classification tick finished"),
            Err(err) => error!(?err, "classification tick failed"),
        }
        tokio::time::sleep(options.interval).await;
    }
}
