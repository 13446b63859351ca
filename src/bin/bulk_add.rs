use anyhow::{bail, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use post_classifier::config;
use post_classifier::db;
use post_classifier::seed;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Insert many unclassified posts from a JSON array or a one-post-per-line file"
)]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed file: JSON array of strings or of {"post": "..."} objects, or plain text lines
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    cfg.ensure_dirs()?;

    let posts = seed::load(&args.file).await?;
    if posts.is_empty() {
        bail!("no posts found in {}", args.file.display());
    }

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    let added = db::insert_posts(&pool, &posts).await?;
    info!(added, database_url = %database_url, "posts added");
    println!("{} posts added.", added);

    pool.close().await;
    Ok(())
}
