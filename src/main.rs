use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use post_classifier::classifier::{Classifier, CommandClassifier};
use post_classifier::config;
use post_classifier::db;
use post_classifier::handlers::{self, AppState};
use post_classifier::worker::{self, PollOptions};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Override `server.port`
    #[arg(long)]
    port: Option<u16>,

    /// Print an example config file and exit
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    if args.print_example_config {
        print!("{}", config::example());
        return Ok(());
    }

    let mut cfg = config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        cfg.server.host = host;
    }
    if let Some(port) = args.port {
        cfg.server.port = port;
    }
    config::validate(&cfg)?;
    cfg.ensure_dirs()?;

    let database_url = cfg.database_url();
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;
    info!(
        database_url = %database_url,
        posts = db::count_posts(&pool).await?,
        unclassified = db::count_unclassified(&pool).await?,
        "database ready"
    );

    let classifier: Arc<dyn Classifier> = Arc::new(CommandClassifier::from_config(&cfg.classifier));

    let poll = PollOptions::from_config(&cfg);
    info!(interval = ?poll.interval, retry_failed = poll.retry_failed, "starting classification loop");
    let poller = tokio::spawn(worker::run(pool.clone(), classifier.clone(), poll));

    let state = AppState::new(pool.clone(), classifier, cfg.classifier.categories.clone());
    let listener = tokio::net::TcpListener::bind(cfg.bind_addr()).await?;
    let served = handlers::serve(listener, handlers::build_router(state), shutdown_signal()).await;

    poller.abort();
    pool.close().await;
    info!("shut down");
    served
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(?err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("ctrl-c received, shutting down");
}
