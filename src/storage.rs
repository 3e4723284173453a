use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use std::fmt;
use tracing::info;

/// Durable, publicly addressable object storage. `upload` and `remove` are
/// idempotent so a failed rotation can be retried without cleanup.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        cache_control: &str,
    ) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Deterministic public URL for a key; no network round trip.
    fn public_url(&self, key: &str) -> String;
}

/// Object-storage HTTP client (S3-compatible object API).
#[derive(Clone)]
pub struct BucketClient {
    http: Client,
    base_url: Url,
    bucket: String,
    token: String,
}

impl fmt::Debug for BucketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BucketClient")
            .field("base_url", &self.base_url)
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl BucketClient {
    pub fn new(base_url: &str, bucket: &str, token: &str) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base).context("invalid storage base URL")?;
        let http = Client::builder()
            .user_agent("postwheel/0.1")
            .no_proxy()
            .build()
            .expect("reqwest client");
        Ok(Self {
            http,
            base_url,
            bucket: bucket.to_string(),
            token: token.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> Result<Url> {
        self.base_url
            .join(&format!("object/{}/{}", self.bucket, key))
            .context("invalid object key")
    }
}

#[async_trait]
impl AssetStore for BucketClient {
    async fn upload(
        &self,
        key: &str,
        bytes: &[u8],
        content_type: &str,
        cache_control: &str,
    ) -> Result<()> {
        let url = self.object_url(key)?;
        let res = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", content_type)
            .header("Cache-Control", cache_control)
            // Overwrite-by-key keeps retries idempotent.
            .header("x-upsert", "true")
            .body(bytes.to_vec())
            .send()
            .await
            .context("failed to reach object storage")?;

        let status = res.status();
        if !status.is_success() {
            let detail = res.text().await.unwrap_or_default();
            return Err(anyhow!("upload of {} failed: {} {}", key, status, detail));
        }
        info!(key, size = bytes.len(), "uploaded object");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let res = self
            .http
            .delete(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .context("failed to reach object storage")?;

        let status = res.status();
        // A missing object counts as removed.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let detail = res.text().await.unwrap_or_default();
            return Err(anyhow!("remove of {} failed: {} {}", key, status, detail));
        }
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}object/public/{}/{}",
            self.base_url, self.bucket, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_is_stable() {
        let client = BucketClient::new("https://cdn.example/storage/v1", "posts", "tok").unwrap();
        assert_eq!(
            client.public_url("rotations/20260101T000000Z/quote.png"),
            "https://cdn.example/storage/v1/object/public/posts/rotations/20260101T000000Z/quote.png"
        );
    }

    #[test]
    fn debug_redacts_token() {
        let client = BucketClient::new("https://cdn.example/storage/v1", "posts", "secret").unwrap();
        let debug = format!("{:?}", client);
        assert!(!debug.contains("secret"));
    }
}
