//! Queue Rotator: pops the queue head, renders and uploads the branded
//! cards, commits the scheduled post, and replenishes the queue.

use crate::db;
use crate::model::{ContentSelection, PostMetadata, PostPayload, RotationOutcome};
use crate::render::Renderer;
use crate::storage::AssetStore;
use anyhow::Context;
use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Steady-state queue size; rotation only appends below this bound.
pub const QUEUE_CAPACITY: i64 = 10;
/// Offset between a rotation and the moment the post goes out.
pub const SCHEDULE_DELAY_SECS: i64 = 120;
/// Expiry of the rotation lease; a crashed rotation frees itself after this.
pub const LEASE_TTL_SECS: i64 = 120;

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Error)]
pub enum RotateError {
    /// Another rotation currently holds the lease.
    #[error("rotation already in progress")]
    Busy,
    #[error("Queue is empty")]
    EmptyQueue,
    #[error("content not found: {0}")]
    ContentNotFound(String),
    #[error("render failed: {0}")]
    Render(#[source] anyhow::Error),
    #[error("upload failed: {0}")]
    Upload(#[source] anyhow::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// One full rotation. Acquires the lease, runs the pipeline, and releases
/// the lease on every exit path.
#[instrument(skip_all)]
pub async fn rotate_and_schedule(
    pool: &db::Pool,
    renderer: &dyn Renderer,
    store: &dyn AssetStore,
    key_prefix: &str,
) -> Result<RotationOutcome, RotateError> {
    let now = Utc::now();
    let holder = Uuid::new_v4().to_string();
    if !db::try_acquire_lease(pool, &holder, now, LEASE_TTL_SECS).await? {
        return Err(RotateError::Busy);
    }

    let res = run_rotation(pool, renderer, store, key_prefix, now).await;
    if let Err(err) = db::release_lease(pool, &holder).await {
        warn!(?err, "failed to release rotation lease");
    }
    res
}

/// Pipeline order matters: everything fallible but non-destructive (head
/// lookup, content resolution, render, upload) runs before the single
/// transaction that commits the schedule and rotates the queue. A failure
/// anywhere leaves the database exactly as it was.
async fn run_rotation(
    pool: &db::Pool,
    renderer: &dyn Renderer,
    store: &dyn AssetStore,
    key_prefix: &str,
    now: DateTime<Utc>,
) -> Result<RotationOutcome, RotateError> {
    // 1. Head of the queue.
    let head = db::queue_head(pool).await?.ok_or(RotateError::EmptyQueue)?;
    let pre_len = db::queue_len(pool).await?;

    // 2. Resolve content; the entry is not consumed yet, so a dangling
    //    reference leaves the queue intact.
    let value = db::get_core_value(pool, &head.core_value_id)
        .await?
        .ok_or_else(|| {
            RotateError::ContentNotFound(format!("core value {} not found", head.core_value_id))
        })?;
    let quote = db::get_quote(pool, &head.quote_id).await?.ok_or_else(|| {
        RotateError::ContentNotFound(format!("quote {} not found", head.quote_id))
    })?;
    let selection = ContentSelection { value, quote };

    // 3. Render the three cards.
    let images = renderer
        .render(&selection)
        .await
        .map_err(RotateError::Render)?;

    // 4. Upload under a rotation-unique prefix; the three objects are
    //    independent, so they go up concurrently.
    let keys = rotation_keys(key_prefix, now);
    futures::try_join!(
        store.upload(&keys[0], &images.quote_card, "image/png", CACHE_CONTROL),
        store.upload(&keys[1], &images.value_name_card, "image/png", CACHE_CONTROL),
        store.upload(
            &keys[2],
            &images.value_description_card,
            "image/png",
            CACHE_CONTROL
        ),
    )
    .map_err(RotateError::Upload)?;

    // 5. Outgoing payload, derived deterministically from the selection.
    let urls = keys.clone().map(|k| store.public_url(&k));
    let payload = build_payload(&selection, urls, now);
    let payload_json = serde_json::to_string(&payload).context("failed to serialize payload")?;
    let asset_keys_json =
        serde_json::to_string(&keys.to_vec()).context("failed to serialize asset keys")?;

    // Previous rotation's objects, collected for post-commit cleanup.
    let old_keys = db::get_scheduled_post(pool)
        .await?
        .map(|p| p.asset_keys)
        .unwrap_or_default();

    // 6-8. Commit point: schedule upsert, pop, renumber and replenish are one
    // transaction, so a bookkeeping failure rolls the schedule back too.
    let scheduled_for = now + Duration::seconds(SCHEDULE_DELAY_SECS);
    let mut tx = pool.begin().await.map_err(anyhow::Error::from)?;
    db::upsert_scheduled_post(&mut tx, &payload_json, &asset_keys_json, scheduled_for, now).await?;
    db::delete_queue_entry(&mut tx, &head.id).await?;
    db::renumber_queue(&mut tx).await?;

    let remaining = pre_len - 1;
    let mut replenished = false;
    if remaining < QUEUE_CAPACITY {
        if let Some(pick) = db::pick_replenishment(&mut tx).await? {
            db::append_queue_entry(&mut tx, &pick.core_value_id, &pick.quote_id, remaining + 1)
                .await?;
            replenished = true;
        } else {
            info!("no eligible quote; queue left below capacity");
        }
    }
    tx.commit().await.map_err(anyhow::Error::from)?;

    // 9. Best-effort garbage collection of the superseded objects.
    for key in &old_keys {
        if let Err(err) = store.remove(key).await {
            warn!(?err, key, "failed to remove superseded object");
        }
    }

    let queue_len = remaining + i64::from(replenished);
    info!(
        entry = %head.id,
        quote = %head.quote_id,
        %scheduled_for,
        queue_len,
        replenished,
        "rotation committed"
    );

    Ok(RotationOutcome {
        consumed_entry_id: head.id,
        core_value_id: head.core_value_id,
        quote_id: head.quote_id,
        scheduled_for,
        queue_len,
        replenished,
    })
}

/// Object keys for one rotation, in payload order: quote card, value-name
/// card, value-description card. The timestamp makes the prefix unique per
/// rotation so consumers never race a half-overwritten object.
fn rotation_keys(key_prefix: &str, now: DateTime<Utc>) -> [String; 3] {
    let stamp = now.format("%Y%m%dT%H%M%S%3fZ");
    [
        format!("{}/{}/quote.png", key_prefix, stamp),
        format!("{}/{}/value-name.png", key_prefix, stamp),
        format!("{}/{}/value-description.png", key_prefix, stamp),
    ]
}

fn build_caption(selection: &ContentSelection) -> String {
    format!(
        "{}\n\n{}\n\n\u{201c}{}\u{201d} - {}\n\n#corevalues #dailyquote #motivation",
        selection.value.name,
        selection.value.description,
        selection.quote.text,
        selection.quote.author
    )
}

fn build_payload(
    selection: &ContentSelection,
    [image1, image2, image3]: [String; 3],
    now: DateTime<Utc>,
) -> PostPayload {
    PostPayload {
        image1,
        image2,
        image3,
        caption: build_caption(selection),
        metadata: PostMetadata {
            value_name: selection.value.name.clone(),
            value_description: selection.value.description.clone(),
            quote_text: selection.quote.text.clone(),
            quote_author: selection.quote.author.clone(),
            generated_at: now.to_rfc3339(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CoreValue, Quote};
    use chrono::TimeZone;

    fn sample_selection() -> ContentSelection {
        ContentSelection {
            value: CoreValue {
                id: "v1".into(),
                name: "Craft".into(),
                description: "Do fewer things, better.".into(),
            },
            quote: Quote {
                id: "q1".into(),
                text: "Simplicity is the soul of efficiency.".into(),
                author: "Austin Freeman".into(),
            },
        }
    }

    #[test]
    fn rotation_keys_are_prefixed_and_ordered() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let keys = rotation_keys("rotations", now);
        assert_eq!(keys[0], "rotations/20260102T030405000Z/quote.png");
        assert!(keys[1].ends_with("/value-name.png"));
        assert!(keys[2].ends_with("/value-description.png"));
    }

    #[test]
    fn caption_is_deterministic() {
        let selection = sample_selection();
        let a = build_caption(&selection);
        let b = build_caption(&selection);
        assert_eq!(a, b);
        assert!(a.contains("Craft"));
        assert!(a.contains("Austin Freeman"));
        assert!(a.contains("#corevalues"));
    }

    #[test]
    fn payload_carries_urls_and_metadata() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let payload = build_payload(
            &sample_selection(),
            ["u1".into(), "u2".into(), "u3".into()],
            now,
        );
        assert_eq!(payload.image1, "u1");
        assert_eq!(payload.image3, "u3");
        assert_eq!(payload.metadata.value_name, "Craft");
        assert_eq!(payload.metadata.generated_at, "2026-01-02T03:04:05+00:00");

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json["metadata"]["quoteAuthor"].is_string());
    }
}
