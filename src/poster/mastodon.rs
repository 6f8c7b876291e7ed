use super::{Destination, MediaFile};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct MastodonPoster {
    server: String,
    access_token: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct NewStatus<'a> {
    status: &'a str,
    #[serde(skip_serializing_if = "no_media")]
    media_ids: &'a [String],
}

fn no_media(ids: &&[String]) -> bool {
    ids.is_empty()
}

/// Both attachments and statuses come back with a string `id`.
#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

impl MastodonPoster {
    pub fn new(server: String, access_token: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("relaybird/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            server: server.trim_end_matches('/').to_string(),
            access_token,
            client,
        }
    }

    async fn read_created(response: reqwest::Response, what: &str) -> Result<String> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Mastodon {} error ({}): {}", what, status, body));
        }

        let created: Created = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Mastodon {} response", what))?;
        Ok(created.id)
    }
}

#[async_trait]
impl Destination for MastodonPoster {
    async fn upload_media(&self, media: MediaFile) -> Result<String> {
        let url = format!("{}/api/v1/media", self.server);

        let mut part = Part::bytes(media.bytes).file_name(media.file_name);
        if let Some(content_type) = media.content_type.as_deref() {
            part = part.mime_str(content_type)?;
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .multipart(Form::new().part("file", part))
            .send()
            .await?;

        Self::read_created(response, "media upload").await
    }

    async fn post_status(&self, text: &str, attachment_ids: &[String]) -> Result<String> {
        let url = format!("{}/api/v1/statuses", self.server);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&NewStatus {
                status: text,
                media_ids: attachment_ids,
            })
            .send()
            .await?;

        Self::read_created(response, "status").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_status_payload_omits_empty_media() {
        let json = serde_json::to_value(NewStatus {
            status: "hello",
            media_ids: &[],
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "hello"}));
    }

    #[test]
    fn test_status_payload_with_media() {
        let ids = vec!["1".to_string(), "2".to_string()];
        let json = serde_json::to_value(NewStatus {
            status: "pics",
            media_ids: &ids,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "pics", "media_ids": ["1", "2"]})
        );
    }

    #[test]
    fn test_created_parses_extra_fields() {
        let created: Created =
            serde_json::from_str(r#"{"id": "10987", "type": "image", "url": "https://x"}"#).unwrap();
        assert_eq!(created.id, "10987");
    }

    #[test]
    fn test_poster_new_trims_server() {
        let poster = MastodonPoster::new("https://mastodon.social/".to_string(), "t".to_string());
        assert_eq!(poster.server, "https://mastodon.social");
    }

    fn jpeg() -> MediaFile {
        MediaFile {
            file_name: "cat.jpg".to_string(),
            content_type: Some("image/jpeg".to_string()),
            bytes: b"jpegdata".to_vec(),
        }
    }

    #[tokio::test]
    async fn test_upload_media_sends_file_part() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/media"))
            .and(header("authorization", "Bearer md-token"))
            .and(body_string_contains("name=\"file\"; filename=\"cat.jpg\""))
            .and(body_string_contains("jpegdata"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "22348641", "type": "image"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let poster = MastodonPoster::new(mock_server.uri(), "md-token".to_string());
        let id = poster.upload_media(jpeg()).await.unwrap();
        assert_eq!(id, "22348641");
    }

    #[tokio::test]
    async fn test_upload_media_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/media"))
            .respond_with(
                ResponseTemplate::new(422).set_body_string(r#"{"error":"File type not supported"}"#),
            )
            .mount(&mock_server)
            .await;

        let poster = MastodonPoster::new(mock_server.uri(), "md-token".to_string());
        let err = poster.upload_media(jpeg()).await.unwrap_err();

        let message = err.to_string();
        assert!(message.contains("Mastodon media upload error"));
        assert!(message.contains("422"));
        assert!(message.contains("File type not supported"));
    }

    #[tokio::test]
    async fn test_post_status_sends_text_and_media() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/statuses"))
            .and(header("authorization", "Bearer md-token"))
            .and(body_json(serde_json::json!({
                "status": "hello @bob@twitter.com",
                "media_ids": ["1", "2"]
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "109"})),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let poster = MastodonPoster::new(format!("{}/", mock_server.uri()), "md-token".to_string());
        let id = poster
            .post_status("hello @bob@twitter.com", &["1".to_string(), "2".to_string()])
            .await
            .unwrap();
        assert_eq!(id, "109");
    }

    #[tokio::test]
    async fn test_post_status_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/statuses"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let poster = MastodonPoster::new(mock_server.uri(), "md-token".to_string());
        let err = poster.post_status("hi", &[]).await.unwrap_err();
        assert!(err.to_string().contains("Mastodon status error (503"));
    }

    #[tokio::test]
    async fn test_post_status_unparseable_response() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/statuses"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
            .mount(&mock_server)
            .await;

        let poster = MastodonPoster::new(mock_server.uri(), "md-token".to_string());
        let err = poster.post_status("hi", &[]).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse Mastodon status response"));
    }
}
