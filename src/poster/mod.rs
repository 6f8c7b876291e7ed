pub mod dry_run;
pub mod mastodon;
pub mod media;

use anyhow::Result;
use async_trait::async_trait;

/// A downloaded media binary ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl MediaFile {
    /// Last path segment of `url`, without query or fragment.
    pub fn name_from_url(url: &str) -> String {
        let path = url.split(&['?', '#'][..]).next().unwrap_or(url);
        match path.rsplit('/').next() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => "media".to_string(),
        }
    }
}

/// Where transformed posts are published.
#[async_trait]
pub trait Destination: Send + Sync {
    /// Upload one attachment, returning the destination's attachment id.
    async fn upload_media(&self, media: MediaFile) -> Result<String>;

    /// Publish a status with the given attachments, returning its id.
    async fn post_status(&self, text: &str, attachment_ids: &[String]) -> Result<String>;
}

/// Downloads media referenced by source posts.
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<MediaFile>;
}
