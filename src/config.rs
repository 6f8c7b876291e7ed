use crate::feeds::twitter::TWITTER_API_BASE;
use crate::poster::media::DEFAULT_MAX_MEDIA_BYTES;
use crate::relay::{RelayOptions, DEFAULT_PAGE_SIZE};
use crate::rewriter::DEFAULT_SOURCE_DOMAIN;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest `count` the user timeline endpoint accepts.
const MAX_PAGE_SIZE: usize = 200;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Account whose posts are relayed, without the leading `@`.
    pub handle: String,
    #[serde(default)]
    pub exclude_replies: bool,
    #[serde(default = "default_source_domain")]
    pub source_domain: String,
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    #[serde(default = "default_cursor_path")]
    pub cursor_path: PathBuf,
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: u64,
    pub twitter: TwitterConfig,
    pub mastodon: MastodonConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TwitterConfig {
    pub bearer_token: String,
    #[serde(default = "default_twitter_api_base")]
    pub api_base: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MastodonConfig {
    /// Instance base URL, e.g. `https://mastodon.social`.
    pub server: String,
    pub access_token: String,
}

fn default_source_domain() -> String {
    DEFAULT_SOURCE_DOMAIN.to_string()
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_cursor_path() -> PathBuf {
    PathBuf::from("relaybird.last")
}

fn default_max_media_bytes() -> u64 {
    DEFAULT_MAX_MEDIA_BYTES
}

fn default_twitter_api_base() -> String {
    TWITTER_API_BASE.to_string()
}

impl Config {
    /// `~/.config/relaybird/config.toml` or the platform equivalent.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("relaybird")
            .join("config.toml")
    }

    /// Load from TOML, or JSON when the file ends in `.json`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
        .with_context(|| format!("Invalid config file {}", path.display()))?;

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.handle.trim_start_matches('@').is_empty() {
            bail!("handle must not be empty");
        }
        if self.source_domain.is_empty() {
            bail!("source_domain must not be empty");
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            bail!("page_size must be between 1 and {}", MAX_PAGE_SIZE);
        }
        if self.twitter.bearer_token.is_empty() {
            bail!("twitter.bearer_token must not be empty");
        }
        if self.mastodon.access_token.is_empty() {
            bail!("mastodon.access_token must not be empty");
        }
        if !self.mastodon.server.starts_with("https://") && !self.mastodon.server.starts_with("http://")
        {
            bail!("mastodon.server must be an http(s) URL");
        }
        Ok(())
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            handle: self.handle.trim_start_matches('@').to_string(),
            exclude_replies: self.exclude_replies,
            page_size: self.page_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
handle = "@someone"

[twitter]
bearer_token = "tw"

[mastodon]
server = "https://mastodon.social"
access_token = "md"
"#;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert!(!config.exclude_replies);
        assert_eq!(config.source_domain, "twitter.com");
        assert_eq!(config.page_size, 5);
        assert_eq!(config.cursor_path, PathBuf::from("relaybird.last"));
        assert_eq!(config.max_media_bytes, 8 * 1024 * 1024);
        assert_eq!(config.twitter.api_base, "https://api.twitter.com/1.1");

        let options = config.relay_options();
        assert_eq!(options.handle, "someone");
        assert_eq!(options.page_size, 5);
    }

    #[test]
    fn test_json_config() {
        let json = r#"{
            "handle": "someone",
            "exclude_replies": true,
            "source_domain": "x.com",
            "twitter": {"bearer_token": "tw"},
            "mastodon": {"server": "https://example.social", "access_token": "md"}
        }"#;
        let config = Config::from_json(json).unwrap();
        assert!(config.exclude_replies);
        assert_eq!(config.source_domain, "x.com");
    }

    #[test]
    fn test_load_picks_format_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("config.toml");
        std::fs::write(&toml_path, MINIMAL).unwrap();
        assert_eq!(Config::load(&toml_path).unwrap().handle, "@someone");

        let json_path = dir.path().join("config.json");
        let mut file = std::fs::File::create(&json_path).unwrap();
        write!(
            file,
            r#"{{"handle": "a", "twitter": {{"bearer_token": "t"}}, "mastodon": {{"server": "https://m.example", "access_token": "m"}}}}"#
        )
        .unwrap();
        assert_eq!(Config::load(&json_path).unwrap().handle, "a");
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/relaybird.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_validation() {
        let bad_page = MINIMAL.replace("handle = \"@someone\"", "handle = \"x\"\npage_size = 0");
        assert!(Config::from_toml(&bad_page).is_err());

        let no_handle = MINIMAL.replace("@someone", "@");
        assert!(Config::from_toml(&no_handle).is_err());

        let bad_server = MINIMAL.replace("https://mastodon.social", "mastodon.social");
        assert!(Config::from_toml(&bad_server).is_err());
    }

    #[test]
    fn test_missing_credentials_section() {
        assert!(Config::from_toml("handle = \"x\"").is_err());
    }
}
