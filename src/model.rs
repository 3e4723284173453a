use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostStatus {
    Pending,
    Sent,
}

impl PostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostStatus::Pending => "pending",
            PostStatus::Sent => "sent",
        }
    }

    pub fn parse_status(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PostStatus::Pending),
            "sent" => Some(PostStatus::Sent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: String,
    pub core_value_id: String,
    pub quote_id: String,
    pub queue_position: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreValue {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    pub text: String,
    pub author: String,
}

/// Ephemeral (value, quote) pair resolved for the queue head at rotation
/// time. Never persisted.
#[derive(Debug, Clone)]
pub struct ContentSelection {
    pub value: CoreValue,
    pub quote: Quote,
}

/// Exactly three raster buffers, in the fixed order the payload references
/// them: quote card, value-name card, value-description card.
pub struct RenderedImages {
    pub quote_card: Vec<u8>,
    pub value_name_card: Vec<u8>,
    pub value_description_card: Vec<u8>,
}

/// Outgoing webhook payload consumed by the external posting automation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostPayload {
    pub image1: String,
    pub image2: String,
    pub image3: String,
    pub caption: String,
    pub metadata: PostMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostMetadata {
    pub value_name: String,
    pub value_description: String,
    pub quote_text: String,
    pub quote_author: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledPost {
    pub key: String,
    pub payload: PostPayload,
    pub asset_keys: Vec<String>,
    pub scheduled_for: DateTime<Utc>,
    pub status: PostStatus,
    pub created_at: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
}

/// Summary of one successful rotation, echoed back to the trigger caller.
#[derive(Debug, Clone, Serialize)]
pub struct RotationOutcome {
    pub consumed_entry_id: String,
    pub core_value_id: String,
    pub quote_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub queue_len: i64,
    pub replenished: bool,
}
