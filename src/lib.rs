//! Relay an account's new tweets to Mastodon.
//!
//! [`rewriter`] turns a source post into destination text, [`relay`] drives
//! one batch run against a [`feeds::TimelineSource`] and a
//! [`poster::Destination`], and [`cursor`] persists where the last run
//! stopped.

pub mod config;
pub mod cursor;
pub mod error;
pub mod feeds;
pub mod poster;
pub mod relay;
pub mod rewriter;

pub use config::Config;
pub use cursor::Cursor;
pub use error::{MediaError, RelayError, TransformError};
pub use feeds::{SourcePost, TimelineSource};
pub use poster::{Destination, MediaFetcher};
pub use relay::{Relay, RelayOptions, RelayReport};
pub use rewriter::{Rewriter, TransformedPost};
