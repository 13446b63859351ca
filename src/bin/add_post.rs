use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use post_classifier::config;
use post_classifier::db;
use post_classifier::seed::{self, Entry};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Interactively add unclassified posts; type 'exit' to stop"
)]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,
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

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;
    info!(database_url = %database_url, "ready to add posts");

    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(b"Welcome to the Post Adding Service.\nType 'exit' to stop the service.\n")
        .await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"Enter post text: ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = match seed::read_entry(&line) {
            Entry::Exit => break,
            Entry::Blank => continue,
            Entry::Post(text) => text,
        };

        let id = db::insert_post(&pool, text).await?;
        info!(post_id = id, "post added");
    }

    stdout.write_all(b"Exiting the service.\n").await?;
    pool.close().await;
    Ok(())
}
