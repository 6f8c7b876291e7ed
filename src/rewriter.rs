//! Rewrites source post text so it renders correctly on the destination.
//!
//! Mentions get qualified with the source domain, shortened links are
//! expanded, inline media links are dropped and HTML entities decoded.
//! Every offset-bearing rewrite is collected as an [`Edit`] against the
//! original text and applied in a single left-to-right pass, so no entity is
//! ever located inside an already modified string.

use crate::error::TransformError;
use crate::feeds::{PostId, SourcePost};

pub const DEFAULT_SOURCE_DOMAIN: &str = "twitter.com";

/// Result of rewriting one post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedPost {
    pub text: String,
    /// Media binaries to fetch and re-upload, in entity order.
    pub media_urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Rewriter {
    source_domain: String,
}

/// Replace codepoints `[start, end)` of the original text with `replacement`.
/// `start == end` is a pure insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Edit {
    start: usize,
    end: usize,
    replacement: String,
}

impl Default for Rewriter {
    fn default() -> Self {
        Self::new(DEFAULT_SOURCE_DOMAIN)
    }
}

impl Rewriter {
    pub fn new(source_domain: impl Into<String>) -> Self {
        Self {
            source_domain: source_domain.into(),
        }
    }

    pub fn source_domain(&self) -> &str {
        &self.source_domain
    }

    pub fn transform(&self, post: &SourcePost) -> Result<TransformedPost, TransformError> {
        let Some(original) = post.reposted_from.as_deref() else {
            return self.transform_own(post);
        };

        let author = post
            .mentions
            .first()
            .ok_or(TransformError::MalformedRepost {
                id: post.id,
                reason: "no mention naming the reposted author",
            })?;

        let inner = self.transform(original)?;
        Ok(TransformedPost {
            text: format!(
                "RT @{}@{}: {}",
                author.handle, self.source_domain, inner.text
            ),
            media_urls: inner.media_urls,
        })
    }

    fn transform_own(&self, post: &SourcePost) -> Result<TransformedPost, TransformError> {
        let chars: Vec<char> = post.text.chars().collect();
        let qualifier = format!("@{}", self.source_domain);

        let mut edits = Vec::with_capacity(post.mentions.len() + post.urls.len() + post.media.len());
        let mut spans = Vec::with_capacity(edits.capacity());

        for mention in &post.mentions {
            check_bounds(post.id, mention.start, mention.end, chars.len())?;
            spans.push((mention.start, mention.end));
            edits.push(Edit {
                start: mention.end,
                end: mention.end,
                replacement: qualifier.clone(),
            });
        }

        for url in &post.urls {
            check_bounds(post.id, url.start, url.end, chars.len())?;
            spans.push((url.start, url.end));
            edits.push(Edit {
                start: url.start,
                end: url.end,
                replacement: strip_http_scheme(&url.expanded_url).to_string(),
            });
        }

        let mut media_urls = Vec::with_capacity(post.media.len());
        let mut media_spans = Vec::with_capacity(post.media.len());
        for media in &post.media {
            media_urls.push(media.source_url.clone());

            // Several photos share one inline link; remove it once.
            let Some(start) = find_chars(&chars, &media.inline_url) else {
                continue;
            };
            let end = start + media.inline_url.chars().count();
            if media_spans.contains(&(start, end)) {
                continue;
            }
            media_spans.push((start, end));
            spans.push((start, end));
            edits.push(Edit {
                start,
                end,
                replacement: String::new(),
            });
        }

        check_overlaps(post.id, &mut spans)?;

        let rewritten = apply_edits(&chars, edits);
        Ok(TransformedPost {
            text: decode_html_entities(&rewritten),
            media_urls,
        })
    }
}

fn check_bounds(id: PostId, start: usize, end: usize, len: usize) -> Result<(), TransformError> {
    if start > end || end > len {
        return Err(TransformError::EntityOutOfBounds {
            id,
            start,
            end,
            len,
        });
    }
    Ok(())
}

fn check_overlaps(id: PostId, spans: &mut [(usize, usize)]) -> Result<(), TransformError> {
    spans.sort_unstable();
    for pair in spans.windows(2) {
        let (first, second) = (pair[0], pair[1]);
        if second.0 < first.1 {
            return Err(TransformError::OverlappingEntities {
                id,
                first_start: first.0,
                first_end: first.1,
                second_start: second.0,
                second_end: second.1,
            });
        }
    }
    Ok(())
}

/// Assemble the output from kept text and replacements, left to right.
/// Edits must not overlap; insertions sort before a replacement starting at
/// the same position.
fn apply_edits(chars: &[char], mut edits: Vec<Edit>) -> String {
    edits.sort_by_key(|e| (e.start, e.end));

    let mut out = String::with_capacity(chars.len() + edits.len() * 16);
    let mut cursor = 0;
    for edit in edits {
        out.extend(&chars[cursor..edit.start]);
        out.push_str(&edit.replacement);
        cursor = edit.end;
    }
    out.extend(&chars[cursor..]);
    out
}

/// Codepoint index of the first occurrence of `needle`.
fn find_chars(chars: &[char], needle: &str) -> Option<usize> {
    let needle: Vec<char> = needle.chars().collect();
    if needle.is_empty() || needle.len() > chars.len() {
        return None;
    }
    chars.windows(needle.len()).position(|w| w == needle.as_slice())
}

/// The source mis-renders some expanded domains when they carry an
/// `http://` prefix, so plain-http links are posted scheme-less.
fn strip_http_scheme(url: &str) -> &str {
    url.strip_prefix("http://").unwrap_or(url)
}

/// Decode the entities the source escapes in post text. Single pass, so
/// `&amp;lt;` decodes to `&lt;` rather than `<`.
pub fn decode_html_entities(text: &str) -> String {
    const ENTITIES: [(&str, char); 3] = [("&amp;", '&'), ("&lt;", '<'), ("&gt;", '>')];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        match ENTITIES.iter().find(|(name, _)| rest.starts_with(name)) {
            Some((name, decoded)) => {
                out.push(*decoded);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
