//! Batch relay: fetch new posts, rewrite them and publish them oldest first.

use crate::cursor::Cursor;
use crate::error::{MediaError, RelayError, TransformError};
use crate::feeds::{PostId, SourcePost, TimelineQuery, TimelineSource};
use crate::poster::{Destination, MediaFetcher};
use crate::rewriter::Rewriter;

pub const DEFAULT_PAGE_SIZE: usize = 5;

#[derive(Debug, Clone)]
pub struct RelayOptions {
    pub handle: String,
    pub exclude_replies: bool,
    pub page_size: usize,
}

/// A post published on the destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forwarded {
    pub source_id: PostId,
    pub status_id: String,
    pub attachment_ids: Vec<String>,
    /// Media URLs that could not be fetched or uploaded.
    pub dropped_media: Vec<String>,
}

#[derive(Debug, Default)]
pub struct RelayReport {
    /// Watermark to persist, whether or not the run halted.
    pub cursor: Cursor,
    pub forwarded: Vec<Forwarded>,
    /// Posts that could not be rewritten. The cursor moves past them.
    pub skipped: Vec<TransformError>,
    /// Set when a submission failed; later posts in the batch were not tried.
    pub halted: Option<RelayError>,
}

impl RelayReport {
    /// Forwarded posts that went out missing at least one attachment.
    pub fn degraded(&self) -> impl Iterator<Item = &Forwarded> {
        self.forwarded.iter().filter(|f| !f.dropped_media.is_empty())
    }
}

pub struct Relay<'a> {
    source: &'a dyn TimelineSource,
    destination: &'a dyn Destination,
    media: &'a dyn MediaFetcher,
    rewriter: Rewriter,
    options: RelayOptions,
}

impl<'a> Relay<'a> {
    pub fn new(
        source: &'a dyn TimelineSource,
        destination: &'a dyn Destination,
        media: &'a dyn MediaFetcher,
        rewriter: Rewriter,
        options: RelayOptions,
    ) -> Self {
        Self {
            source,
            destination,
            media,
            rewriter,
            options,
        }
    }

    /// Relay everything newer than `cursor`.
    ///
    /// Only a timeline failure is an `Err`; the cursor is then unchanged.
    /// A failed submission stops the batch at that post and is reported in
    /// [`RelayReport::halted`] with the cursor of the last post that made it,
    /// so the next run picks the failed post up again.
    pub async fn run(&self, cursor: Cursor) -> Result<RelayReport, RelayError> {
        let query = TimelineQuery {
            handle: &self.options.handle,
            since_id: cursor.last_id(),
            page_size: self.options.page_size,
            exclude_replies: self.options.exclude_replies,
        };

        let mut posts = self
            .source
            .fetch_since(&query)
            .await
            .map_err(RelayError::TimelineFetch)?;

        tracing::info!(
            handle = %self.options.handle,
            since_id = ?cursor.last_id(),
            count = posts.len(),
            "Fetched timeline"
        );

        // the source lists newest first
        posts.sort_by_key(|p| p.id);

        let mut report = RelayReport {
            cursor,
            ..Default::default()
        };

        for post in posts {
            if report.cursor.covers(post.id) {
                tracing::debug!(id = post.id, "Already relayed, skipping");
                continue;
            }

            match self.forward(&post).await {
                Ok(forwarded) => {
                    report.cursor.advance(post.id);
                    report.forwarded.push(forwarded);
                }
                Err(RelayOutcome::Skipped(err)) => {
                    tracing::error!(id = post.id, error = %err, "Skipping post that cannot be rewritten");
                    report.cursor.advance(post.id);
                    report.skipped.push(err);
                }
                Err(RelayOutcome::Halted(err)) => {
                    tracing::error!(id = post.id, error = %err, "Stopping batch, post will be retried next run");
                    report.halted = Some(err);
                    break;
                }
            }
        }

        Ok(report)
    }

    async fn forward(&self, post: &SourcePost) -> Result<Forwarded, RelayOutcome> {
        tracing::info!(
            id = post.id,
            repost = post.is_repost(),
            posted_at = ?post.posted_at(),
            "Found new post"
        );

        let transformed = self
            .rewriter
            .transform(post)
            .map_err(RelayOutcome::Skipped)?;

        let mut attachment_ids = Vec::with_capacity(transformed.media_urls.len());
        let mut dropped_media = Vec::new();
        for url in &transformed.media_urls {
            match self.attach(url).await {
                Ok(id) => attachment_ids.push(id),
                Err(err) => {
                    tracing::warn!(id = post.id, error = %err, "Posting without attachment");
                    dropped_media.push(url.clone());
                }
            }
        }

        let status_id = self
            .destination
            .post_status(&transformed.text, &attachment_ids)
            .await
            .map_err(|source| {
                RelayOutcome::Halted(RelayError::PostSubmission {
                    id: post.id,
                    source,
                })
            })?;

        tracing::info!(
            id = post.id,
            status_id = %status_id,
            attachments = attachment_ids.len(),
            "Relayed post"
        );

        Ok(Forwarded {
            source_id: post.id,
            status_id,
            attachment_ids,
            dropped_media,
        })
    }

    async fn attach(&self, url: &str) -> Result<String, MediaError> {
        let media = self
            .media
            .fetch(url)
            .await
            .map_err(|source| MediaError::Fetch {
                url: url.to_string(),
                source,
            })?;

        self.destination
            .upload_media(media)
            .await
            .map_err(|source| MediaError::Upload {
                url: url.to_string(),
                source,
            })
    }
}

enum RelayOutcome {
    Skipped(TransformError),
    Halted(RelayError),
}
