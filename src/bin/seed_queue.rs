//! Seeds the content repository from a YAML file and fills the work queue
//! to capacity with random non-duplicate picks.

use anyhow::{Context, Result};
use clap::Parser;
use postwheel::{config, db, rotate};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    /// Path to YAML seed file with `core_values` and `quotes` lists
    #[arg(long)]
    seed: PathBuf,
}

#[derive(Debug, Deserialize)]
struct SeedFile {
    core_values: Vec<SeedValue>,
    quotes: Vec<SeedQuote>,
}

#[derive(Debug, Deserialize)]
struct SeedValue {
    name: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct SeedQuote {
    text: String,
    author: String,
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

    let content = std::fs::read_to_string(&args.seed)
        .with_context(|| format!("failed to read {}", args.seed.display()))?;
    let seed: SeedFile = serde_yaml::from_str(&content).context("invalid seed file")?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/postwheel.db", cfg.app.data_dir));
    let pool = db::init_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    for value in &seed.core_values {
        db::insert_core_value(&pool, &value.name, &value.description).await?;
    }
    for quote in &seed.quotes {
        db::insert_quote(&pool, &quote.text, &quote.author).await?;
    }
    info!(
        core_values = seed.core_values.len(),
        quotes = seed.quotes.len(),
        "content seeded"
    );

    // Fill the queue up to capacity; stops early if eligible quotes run out.
    let mut appended = 0;
    let mut len = db::queue_len(&pool).await?;
    while len < rotate::QUEUE_CAPACITY {
        let mut tx = pool.begin().await?;
        let Some(pick) = db::pick_replenishment(&mut tx).await? else {
            break;
        };
        db::append_queue_entry(&mut tx, &pick.core_value_id, &pick.quote_id, len + 1).await?;
        tx.commit().await?;
        len += 1;
        appended += 1;
    }
    info!(appended, queue_len = len, "queue filled");

    Ok(())
}
