//! Error types for the rewrite and relay pipeline.
//!
//! Collaborators (timeline, destination, media fetcher) report opaque
//! `anyhow::Error`s; the relay classifies them into the variants below.

use crate::feeds::PostId;
use thiserror::Error;

/// A post's text could not be rewritten. Fatal to that post only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    /// Repost without the mention naming its author.
    #[error("post {id}: malformed repost ({reason})")]
    MalformedRepost { id: PostId, reason: &'static str },

    /// Two entity spans claim the same characters.
    #[error("post {id}: entity spans [{first_start},{first_end}) and [{second_start},{second_end}) overlap")]
    OverlappingEntities {
        id: PostId,
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    /// A span is inverted or extends past the end of the text.
    #[error("post {id}: entity span [{start},{end}) is outside text of length {len}")]
    EntityOutOfBounds {
        id: PostId,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// A media attachment was dropped. The post is still forwarded without it.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("failed to download media {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to upload media {url}: {source}")]
    Upload {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Errors that stop a relay run.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Nothing can be relayed without the timeline.
    #[error("failed to fetch timeline: {0}")]
    TimelineFetch(#[source] anyhow::Error),

    /// The destination rejected a post. The batch halts at this post.
    #[error("failed to submit post {id}: {source}")]
    PostSubmission {
        id: PostId,
        #[source]
        source: anyhow::Error,
    },
}
