use super::model::ReplenishmentPick;
use crate::model::{CoreValue, PostStatus, Quote, QueueEntry, ScheduledPost};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, Utc};
use sqlx::{Row, Transaction};
use sqlx::{Sqlite, SqlitePool};
use tracing::instrument;
use uuid::Uuid;

pub type Pool = SqlitePool;

/// Fixed sentinel key of the singleton scheduled-post row.
pub const SCHEDULED_POST_KEY: &str = "current";

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let pool = SqlitePool::connect(&normalized).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For file-backed SQLite URLs, expand a leading `~/` and create the parent
/// directory. In-memory URLs and non-sqlite schemes pass through untouched.
fn prepare_sqlite_url(url: &str) -> String {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return url.to_string();
    };
    if rest.starts_with(":memory") {
        return url.to_string();
    }

    let rest = rest.strip_prefix("//").unwrap_or(rest);
    let (path, query) = match rest.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (rest, None),
    };
    if path.is_empty() {
        return url.to_string();
    }

    let path = match (path.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(tail), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), tail),
        _ => path.to_string(),
    };
    if let Some(parent) = std::path::Path::new(&path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    match query {
        Some(q) => format!("sqlite://{}?{}", path, q),
        None => format!("sqlite://{}", path),
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Zero-padded 2-digit queue ordinal ("01".."10").
pub fn format_position(index: i64) -> String {
    format!("{:02}", index)
}

fn entry_from_row(row: &sqlx::sqlite::SqliteRow) -> QueueEntry {
    QueueEntry {
        id: row.get("id"),
        core_value_id: row.get("core_value_id"),
        quote_id: row.get("quote_id"),
        queue_position: row.get("queue_position"),
        created_at: row.get("created_at"),
    }
}

#[instrument(skip_all)]
pub async fn list_queue(pool: &Pool) -> Result<Vec<QueueEntry>> {
    let rows = sqlx::query(
        "SELECT id, core_value_id, quote_id, queue_position, created_at \
         FROM queue_entries ORDER BY queue_position ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.iter().map(entry_from_row).collect())
}

#[instrument(skip_all)]
pub async fn queue_head(pool: &Pool) -> Result<Option<QueueEntry>> {
    let row = sqlx::query(
        "SELECT id, core_value_id, quote_id, queue_position, created_at \
         FROM queue_entries ORDER BY queue_position ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;
    Ok(row.as_ref().map(entry_from_row))
}

#[instrument(skip_all)]
pub async fn queue_len(pool: &Pool) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_entries")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[instrument(skip_all)]
pub async fn append_queue_entry(
    tx: &mut Transaction<'_, Sqlite>,
    core_value_id: &str,
    quote_id: &str,
    position: i64,
) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO queue_entries (id, core_value_id, quote_id, queue_position, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(core_value_id)
    .bind(quote_id)
    .bind(format_position(position))
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn delete_queue_entry(tx: &mut Transaction<'_, Sqlite>, id: &str) -> Result<()> {
    let res = sqlx::query("DELETE FROM queue_entries WHERE id = ?")
        .bind(id)
        .execute(&mut **tx)
        .await?;
    if res.rows_affected() == 0 {
        return Err(anyhow!("queue entry {} not found", id));
    }
    Ok(())
}

/// Rewrite every remaining entry's position to its contiguous 1-based index,
/// zero-padded. Two passes: park positions in a non-colliding namespace
/// first, since `queue_position` carries a UNIQUE constraint.
#[instrument(skip_all)]
pub async fn renumber_queue(tx: &mut Transaction<'_, Sqlite>) -> Result<()> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT id FROM queue_entries ORDER BY queue_position ASC")
            .fetch_all(&mut **tx)
            .await?;
    for (i, id) in ids.iter().enumerate() {
        sqlx::query("UPDATE queue_entries SET queue_position = ? WHERE id = ?")
            .bind(format!("tmp-{:02}", i + 1))
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    for (i, id) in ids.iter().enumerate() {
        sqlx::query("UPDATE queue_entries SET queue_position = ? WHERE id = ?")
            .bind(format_position(i as i64 + 1))
            .bind(id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}

/// Uniform random (core value, quote) pair whose quote is not already queued.
/// Returns `None` when no eligible quote (or no core value) exists.
#[instrument(skip_all)]
pub async fn pick_replenishment(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<Option<ReplenishmentPick>> {
    let quote_id: Option<String> = sqlx::query_scalar(
        "SELECT id FROM quotes \
         WHERE id NOT IN (SELECT quote_id FROM queue_entries) \
         ORDER BY RANDOM() LIMIT 1",
    )
    .fetch_optional(&mut **tx)
    .await?;
    let Some(quote_id) = quote_id else {
        return Ok(None);
    };
    let core_value_id: Option<String> =
        sqlx::query_scalar("SELECT id FROM core_values ORDER BY RANDOM() LIMIT 1")
            .fetch_optional(&mut **tx)
            .await?;
    let Some(core_value_id) = core_value_id else {
        return Ok(None);
    };
    Ok(Some(ReplenishmentPick {
        core_value_id,
        quote_id,
    }))
}

#[instrument(skip_all)]
pub async fn get_core_value(pool: &Pool, id: &str) -> Result<Option<CoreValue>> {
    let row = sqlx::query("SELECT id, name, description FROM core_values WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| CoreValue {
        id: r.get("id"),
        name: r.get("name"),
        description: r.get("description"),
    }))
}

#[instrument(skip_all)]
pub async fn get_quote(pool: &Pool, id: &str) -> Result<Option<Quote>> {
    let row = sqlx::query("SELECT id, text, author FROM quotes WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| Quote {
        id: r.get("id"),
        text: r.get("text"),
        author: r.get("author"),
    }))
}

#[instrument(skip_all)]
pub async fn insert_core_value(pool: &Pool, name: &str, description: &str) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO core_values (id, name, description) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(description)
        .execute(pool)
        .await?;
    Ok(id)
}

#[instrument(skip_all)]
pub async fn insert_quote(pool: &Pool, text: &str, author: &str) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT INTO quotes (id, text, author) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(text)
        .bind(author)
        .execute(pool)
        .await?;
    Ok(id)
}

/// Sentinel-keyed upsert: overwrites payload, schedule and status, and
/// resets `sent_at`, so at most one pending post ever exists.
#[instrument(skip_all)]
pub async fn upsert_scheduled_post(
    tx: &mut Transaction<'_, Sqlite>,
    payload_json: &str,
    asset_keys_json: &str,
    scheduled_for: DateTime<Utc>,
    created_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO scheduled_post (key, payload, asset_keys, scheduled_for, status, created_at, sent_at) \
         VALUES (?, ?, ?, ?, 'pending', ?, NULL) \
         ON CONFLICT(key) DO UPDATE SET \
           payload = excluded.payload, \
           asset_keys = excluded.asset_keys, \
           scheduled_for = excluded.scheduled_for, \
           status = 'pending', \
           created_at = excluded.created_at, \
           sent_at = NULL",
    )
    .bind(SCHEDULED_POST_KEY)
    .bind(payload_json)
    .bind(asset_keys_json)
    .bind(scheduled_for)
    .bind(created_at)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[instrument(skip_all)]
pub async fn get_scheduled_post(pool: &Pool) -> Result<Option<ScheduledPost>> {
    let row = sqlx::query(
        "SELECT key, payload, asset_keys, scheduled_for, status, created_at, sent_at \
         FROM scheduled_post WHERE key = ?",
    )
    .bind(SCHEDULED_POST_KEY)
    .fetch_optional(pool)
    .await?;
    let Some(row) = row else {
        return Ok(None);
    };

    let payload_json: String = row.get("payload");
    let payload =
        serde_json::from_str(&payload_json).context("scheduled post payload is not valid JSON")?;
    let asset_keys_json: String = row.get("asset_keys");
    let asset_keys: Vec<String> =
        serde_json::from_str(&asset_keys_json).context("asset_keys is not valid JSON")?;
    let status_str: String = row.get("status");
    let status = PostStatus::parse_status(&status_str)
        .ok_or_else(|| anyhow!("scheduled post has unknown status {}", status_str))?;

    Ok(Some(ScheduledPost {
        key: row.get("key"),
        payload,
        asset_keys,
        scheduled_for: row.get("scheduled_for"),
        status,
        created_at: row.get("created_at"),
        sent_at: row.try_get("sent_at").ok(),
    }))
}

/// Compare-and-swap acquire of the single rotation lease. Succeeds when the
/// lease is free or its expiry has passed.
#[instrument(skip_all)]
pub async fn try_acquire_lease(
    pool: &Pool,
    holder: &str,
    now: DateTime<Utc>,
    ttl_secs: i64,
) -> Result<bool> {
    let res = sqlx::query(
        "UPDATE rotation_lease SET holder = ?, locked_until = ? \
         WHERE id = 1 AND (locked_until IS NULL OR locked_until <= ?)",
    )
    .bind(holder)
    .bind(now + Duration::seconds(ttl_secs))
    .bind(now)
    .execute(pool)
    .await?;
    Ok(res.rows_affected() == 1)
}

#[instrument(skip_all)]
pub async fn release_lease(pool: &Pool, holder: &str) -> Result<()> {
    sqlx::query("UPDATE rotation_lease SET holder = NULL, locked_until = NULL WHERE id = 1 AND holder = ?")
        .bind(holder)
        .execute(pool)
        .await?;
    Ok(())
}
