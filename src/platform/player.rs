//! Player script retrieval

use crate::error::RytError;
use crate::utils::cache::{new_async_cache_with_capacity, AsyncCache};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, ClientBuilder};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Default origin for embed pages and relative player paths
pub const DEFAULT_BASE_URL: &str = "https://www.youtube.com";

/// First retry delay; doubles on every further attempt
const RETRY_BASE_DELAY: Duration = Duration::from_millis(200);
/// Upper bound for a single retry delay
const RETRY_MAX_DELAY: Duration = Duration::from_secs(10);

/// Player script locators in an embed page, tried in order
const PLAYER_URL_PATTERNS: &[&str] = &[r#""(/[^"<>]*/base\.js)""#, r#""jsUrl":"([^"]+)""#];

/// Where player scripts come from
#[async_trait]
pub trait ScriptSource: Send + Sync {
    /// URL of the player script serving `video_id`
    async fn player_url(&self, video_id: &str) -> Result<String, RytError>;

    /// Full text of the player script at `url`
    async fn fetch_script(&self, url: &str) -> Result<String, RytError>;
}

/// HTTP settings for [`PlayerFetcher`]
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Origin used for embed pages and relative script paths
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Retries for transient network failures
    pub max_retries: u32,
    /// How long a fetched script stays cached
    pub cache_ttl: Duration,
    /// Maximum cached scripts
    pub cache_capacity: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            max_retries: 2,
            cache_ttl: Duration::from_secs(600), // 10 minutes
            cache_capacity: 8,
        }
    }
}

/// Downloads embed pages and player scripts over HTTP
pub struct PlayerFetcher {
    http_client: Client,
    scripts: AsyncCache<String, String>,
    config: FetchConfig,
}

impl PlayerFetcher {
    /// Create a fetcher with default configuration
    pub fn new() -> Result<Self, RytError> {
        Self::with_config(FetchConfig::default())
    }

    /// Create a fetcher with custom configuration
    pub fn with_config(config: FetchConfig) -> Result<Self, RytError> {
        let http_client = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            http_client,
            scripts: new_async_cache_with_capacity(config.cache_ttl, config.cache_capacity),
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Embed page URL for a video
    pub fn embed_url(&self, video_id: &str) -> String {
        format!(
            "{}/embed/{}",
            self.config.base_url.trim_end_matches('/'),
            video_id
        )
    }

    /// Locate the player script URL inside an embed or watch page
    pub fn find_player_url(&self, html: &str) -> Result<String, RytError> {
        for pattern in PLAYER_URL_PATTERNS {
            let Ok(regex) = Regex::new(pattern) else {
                continue;
            };
            if let Some(path) = regex.captures(html).and_then(|captures| captures.get(1)) {
                let path = path.as_str().replace("\\/", "/");
                debug!("Found player script path: {}", path);
                return Ok(self.absolute_url(&path));
            }
        }

        Err(RytError::PlayerNotFound)
    }

    fn absolute_url(&self, path: &str) -> String {
        if path.starts_with("//") {
            format!("https:{}", path)
        } else if path.starts_with('/') {
            format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
        } else {
            path.to_string()
        }
    }

    /// GET `url` as text, retrying transient failures with backoff
    async fn get_text(&self, url: &str) -> Result<String, RytError> {
        let mut attempt = 0;
        loop {
            match self.try_get_text(url).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    let delay = retry_delay(attempt);
                    warn!("Request to {} failed ({}), retrying in {:?}", url, err, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn try_get_text(&self, url: &str) -> Result<String, RytError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(timeout_aware)?;
        let response = response.error_for_status()?;
        response.text().await.map_err(timeout_aware)
    }
}

/// Doubling backoff capped at [`RETRY_MAX_DELAY`]
fn retry_delay(attempt: u32) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| RETRY_BASE_DELAY.checked_mul(factor))
        .map_or(RETRY_MAX_DELAY, |delay| delay.min(RETRY_MAX_DELAY))
}

fn timeout_aware(err: reqwest::Error) -> RytError {
    if err.is_timeout() {
        RytError::TimeoutError(err.to_string())
    } else {
        RytError::DownloadFailed(err)
    }
}

#[async_trait]
impl ScriptSource for PlayerFetcher {
    async fn player_url(&self, video_id: &str) -> Result<String, RytError> {
        let html = self.get_text(&self.embed_url(video_id)).await?;
        self.find_player_url(&html)
    }

    async fn fetch_script(&self, url: &str) -> Result<String, RytError> {
        if let Some(cached) = self.scripts.get(url).await {
            debug!("Player script cache hit: {}", url);
            return Ok(cached);
        }

        let script = self.get_text(url).await?;
        debug!("Fetched player script {} ({} bytes)", url, script.len());
        self.scripts.insert(url.to_string(), script.clone()).await;
        Ok(script)
    }
}

/// Read a player script saved to disk
pub async fn read_script_file(path: impl AsRef<Path>) -> Result<String, RytError> {
    let path = path.as_ref();
    let script = tokio::fs::read_to_string(path).await?;
    debug!("Read player script {} ({} bytes)", path.display(), script.len());
    Ok(script)
}
