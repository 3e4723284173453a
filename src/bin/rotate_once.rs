//! One-shot rotation for cron `exec` triggers. Exits non-zero on failure so
//! the calling scheduler can apply its own retry policy.

use anyhow::Result;
use clap::Parser;
use postwheel::render::BrowserRenderer;
use postwheel::storage::BucketClient;
use postwheel::{config, db, render, rotate};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
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
    let renderer = BrowserRenderer::new(&cfg.renderer.browser_bin, &cfg.app.data_dir);
    let store = BucketClient::new(&cfg.storage.base_url, &cfg.storage.bucket, &cfg.storage.token)?;

    match rotate::rotate_and_schedule(&pool, &renderer, &store, &cfg.storage.key_prefix).await {
        Ok(outcome) => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("rotation failed: {:#}", anyhow::Error::from(err));
            Ok(ExitCode::FAILURE)
        }
    }
}
