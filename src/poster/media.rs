use super::{MediaFetcher, MediaFile};
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Mastodon's default image size limit.
pub const DEFAULT_MAX_MEDIA_BYTES: u64 = 8 * 1024 * 1024;

pub struct HttpMediaFetcher {
    max_bytes: u64,
    client: reqwest::Client,
}

impl HttpMediaFetcher {
    pub fn new(max_bytes: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("relaybird/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self { max_bytes, client }
    }
}

fn check_size(url: &str, len: u64, max_bytes: u64) -> Result<()> {
    if len > max_bytes {
        return Err(anyhow::anyhow!(
            "{} is {} bytes, over the {} byte limit",
            url,
            len,
            max_bytes
        ));
    }
    Ok(())
}

#[async_trait]
impl MediaFetcher for HttpMediaFetcher {
    async fn fetch(&self, url: &str) -> Result<MediaFile> {
        let mut response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("HTTP {} for {}", response.status(), url));
        }

        // reject early when the server tells us, count while streaming when it doesn't
        let mut bytes = Vec::new();
        if let Some(len) = response.content_length() {
            check_size(url, len, self.max_bytes)?;
            bytes.reserve(len as usize);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        while let Some(chunk) = response.chunk().await? {
            check_size(url, (bytes.len() + chunk.len()) as u64, self.max_bytes)?;
            bytes.extend_from_slice(&chunk);
        }

        Ok(MediaFile {
            file_name: MediaFile::name_from_url(url),
            content_type,
            bytes,
        })
    }
}
