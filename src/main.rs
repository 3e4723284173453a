use anyhow::Result;
use clap::Parser;
use postwheel::http::AppState;
use postwheel::render::BrowserRenderer;
use postwheel::storage::BucketClient;
use postwheel::{config, db, http, render};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/postwheel.db", cfg.app.data_dir));

    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    render::ensure_browser_available(&cfg.renderer.browser_bin).await?;

    let renderer = Arc::new(BrowserRenderer::new(
        &cfg.renderer.browser_bin,
        &cfg.app.data_dir,
    ));
    let store = Arc::new(BucketClient::new(
        &cfg.storage.base_url,
        &cfg.storage.bucket,
        &cfg.storage.token,
    )?);

    let state = AppState {
        pool,
        renderer,
        store,
        key_prefix: cfg.storage.key_prefix.clone(),
    };
    let app = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(&cfg.app.bind_addr).await?;
    info!(addr = %cfg.app.bind_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
