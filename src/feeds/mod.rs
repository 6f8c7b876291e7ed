pub mod twitter;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

/// Format of the source's `created_at`, e.g. `Wed Oct 10 20:19:24 +0000 2018`.
const CREATED_AT_FORMAT: &str = "%a %b %d %H:%M:%S %z %Y";

/// Platform-assigned post identifier. Strictly increasing over time.
pub type PostId = i64;

/// A post as returned by the source timeline, before any rewriting.
///
/// Entity offsets are codepoint indices into `text` exactly as the source
/// returned it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcePost {
    pub id: PostId,
    pub text: String,
    /// The wrapped post when this one is a repost. The wrapper's own text is
    /// a truncated copy and is never rewritten.
    pub reposted_from: Option<Box<SourcePost>>,
    pub mentions: Vec<Mention>,
    pub urls: Vec<UrlEntity>,
    pub media: Vec<MediaRef>,
    /// Raw `created_at` string, used for logging only.
    pub created_at: Option<String>,
}

impl SourcePost {
    pub fn is_repost(&self) -> bool {
        self.reposted_from.is_some()
    }

    pub fn posted_at(&self) -> Option<DateTime<FixedOffset>> {
        let raw = self.created_at.as_deref()?;
        DateTime::parse_from_str(raw, CREATED_AT_FORMAT).ok()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Mention {
    pub handle: String,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UrlEntity {
    pub short_url: String,
    pub expanded_url: String,
    pub start: usize,
    pub end: usize,
}

/// An attached media item. `inline_url` is the shortened link the source
/// embeds in the text, `source_url` the binary to download.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRef {
    pub source_url: String,
    pub inline_url: String,
}

/// Query for posts newer than a watermark.
#[derive(Debug, Clone)]
pub struct TimelineQuery<'a> {
    pub handle: &'a str,
    pub since_id: Option<PostId>,
    pub page_size: usize,
    pub exclude_replies: bool,
}

/// Source of an account's posts.
///
/// Implementations return posts most-recent-first, the way the source API
/// orders them.
#[async_trait]
pub trait TimelineSource: Send + Sync {
    async fn fetch_since(&self, query: &TimelineQuery<'_>) -> Result<Vec<SourcePost>>;
}
