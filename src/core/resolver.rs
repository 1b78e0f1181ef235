//! Ties script retrieval, the decipherer cache and media records together

use crate::core::video_info::{DecipherReport, VideoInfo};
use crate::error::RytError;
use crate::platform::cipher::{Decipherer, SessionCache};
use crate::platform::player::ScriptSource;
use crate::utils::url::extract_video_id;
use std::sync::Arc;
use tracing::{info, instrument};

/// Resolves signature ciphers for videos served by a [`ScriptSource`]
pub struct SignatureResolver<S: ScriptSource> {
    source: S,
    cache: Arc<SessionCache>,
}

impl<S: ScriptSource> SignatureResolver<S> {
    /// Create a resolver with its own decipherer cache
    pub fn new(source: S) -> Self {
        Self::with_cache(source, Arc::new(SessionCache::new()))
    }

    /// Create a resolver sharing `cache` with other resolvers
    pub fn with_cache(source: S, cache: Arc<SessionCache>) -> Self {
        Self { source, cache }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// Decipherer for the player script at `player_url`
    pub async fn decipherer_for(&self, player_url: &str) -> Result<Arc<Decipherer>, RytError> {
        let script = self.source.fetch_script(player_url).await?;
        Ok(self.cache.get_or_build(&script)?)
    }

    /// Decipher every format of `info` using the script at `player_url`
    #[instrument(skip(self, info))]
    pub async fn resolve(
        &self,
        info: &mut VideoInfo,
        player_url: &str,
    ) -> Result<DecipherReport, RytError> {
        let decipherer = self.decipherer_for(player_url).await?;
        let report = info.decipher_all(&decipherer);
        info!(
            deciphered = report.deciphered,
            failed = report.failures.len(),
            "resolved signatures"
        );
        Ok(report)
    }

    /// Locate the player for `video` (ID or URL), then resolve `info` with it
    pub async fn resolve_video(
        &self,
        video: &str,
        info: &mut VideoInfo,
    ) -> Result<DecipherReport, RytError> {
        let player_url = self.player_url_for(video).await?;
        self.resolve(info, &player_url).await
    }

    /// Player script URL for a video ID or URL
    pub async fn player_url_for(&self, video: &str) -> Result<String, RytError> {
        let video_id = extract_video_id(video)?;
        self.source.player_url(&video_id).await
    }
}
