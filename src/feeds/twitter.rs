use super::{MediaRef, Mention, SourcePost, TimelineQuery, TimelineSource, UrlEntity};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub const TWITTER_API_BASE: &str = "https://api.twitter.com/1.1";

pub struct TwitterTimeline {
    api_base: String,
    bearer_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ApiTweet {
    id: i64,
    full_text: String,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    entities: ApiEntities,
    #[serde(default)]
    extended_entities: Option<ApiExtendedEntities>,
    #[serde(default)]
    retweeted_status: Option<Box<ApiTweet>>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiEntities {
    #[serde(default)]
    user_mentions: Vec<ApiMention>,
    #[serde(default)]
    urls: Vec<ApiUrl>,
    #[serde(default)]
    media: Vec<ApiMedia>,
}

#[derive(Debug, Deserialize)]
struct ApiExtendedEntities {
    #[serde(default)]
    media: Vec<ApiMedia>,
}

#[derive(Debug, Deserialize)]
struct ApiMention {
    screen_name: String,
    indices: [usize; 2],
}

#[derive(Debug, Deserialize)]
struct ApiUrl {
    url: String,
    expanded_url: Option<String>,
    indices: [usize; 2],
}

#[derive(Debug, Deserialize)]
struct ApiMedia {
    media_url_https: String,
    url: String,
}

impl TwitterTimeline {
    pub fn new(api_base: String, bearer_token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("relaybird/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            bearer_token,
            client,
        }
    }
}

impl From<ApiTweet> for SourcePost {
    fn from(tweet: ApiTweet) -> Self {
        // extended_entities lists every attached photo, entities.media only the first
        let media = match tweet.extended_entities {
            Some(ext) if !ext.media.is_empty() => ext.media,
            _ => tweet.entities.media,
        };

        SourcePost {
            id: tweet.id,
            text: tweet.full_text,
            reposted_from: tweet
                .retweeted_status
                .map(|inner| Box::new(SourcePost::from(*inner))),
            mentions: tweet
                .entities
                .user_mentions
                .into_iter()
                .map(|m| Mention {
                    handle: m.screen_name,
                    start: m.indices[0],
                    end: m.indices[1],
                })
                .collect(),
            urls: tweet
                .entities
                .urls
                .into_iter()
                .map(|u| UrlEntity {
                    expanded_url: u.expanded_url.unwrap_or_else(|| u.url.clone()),
                    short_url: u.url,
                    start: u.indices[0],
                    end: u.indices[1],
                })
                .collect(),
            media: media
                .into_iter()
                .map(|m| MediaRef {
                    source_url: m.media_url_https,
                    inline_url: m.url,
                })
                .collect(),
            created_at: tweet.created_at,
        }
    }
}

fn parse_timeline(body: &str) -> Result<Vec<SourcePost>> {
    let tweets: Vec<ApiTweet> =
        serde_json::from_str(body).context("Failed to parse user timeline response")?;
    Ok(tweets.into_iter().map(SourcePost::from).collect())
}

#[async_trait]
impl TimelineSource for TwitterTimeline {
    async fn fetch_since(&self, query: &TimelineQuery<'_>) -> Result<Vec<SourcePost>> {
        let url = format!("{}/statuses/user_timeline.json", self.api_base);

        let mut params = vec![
            ("screen_name", query.handle.to_string()),
            ("count", query.page_size.to_string()),
            ("exclude_replies", query.exclude_replies.to_string()),
            ("tweet_mode", "extended".to_string()),
        ];
        if let Some(since_id) = query.since_id {
            params.push(("since_id", since_id.to_string()));
        }

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .query(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Twitter API error ({}): {}", status, body));
        }

        let body = response.text().await?;
        parse_timeline(&body)
    }
}
