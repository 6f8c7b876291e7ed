use super::{Destination, MediaFile};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};

/// Logs what would be posted instead of posting it.
#[derive(Debug, Default)]
pub struct DryRunPoster {
    next_id: AtomicU64,
}

impl DryRunPoster {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self, kind: &str) -> String {
        format!("dry-run-{}-{}", kind, self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

#[async_trait]
impl Destination for DryRunPoster {
    async fn upload_media(&self, media: MediaFile) -> Result<String> {
        let id = self.next_id("media");
        tracing::info!(
            file = %media.file_name,
            bytes = media.bytes.len(),
            id = %id,
            "[dry-run] would upload media"
        );
        Ok(id)
    }

    async fn post_status(&self, text: &str, attachment_ids: &[String]) -> Result<String> {
        let id = self.next_id("status");
        tracing::info!(attachments = ?attachment_ids, id = %id, "[dry-run] would post: {}", text);
        Ok(id)
    }
}
