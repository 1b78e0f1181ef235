//! Per-script memoization of built decipherers

use super::decipherer::{CipherConfig, Decipherer};
use crate::error::CipherError;
use moka::sync::Cache;
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::{Arc, OnceLock};
use tracing::{debug, info};

/// Distinct player scripts kept alive at once
const DEFAULT_CAPACITY: u64 = 16;

/// SHA-256 of a player script's text
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScriptFingerprint([u8; 32]);

impl ScriptFingerprint {
    pub fn of(script: &str) -> Self {
        let digest = Sha256::digest(script.as_bytes());
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }
}

impl fmt::Display for ScriptFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ScriptFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScriptFingerprint({})", self)
    }
}

/// Builds each distinct script's decipherer at most once.
///
/// Concurrent callers asking for the same script wait on a single build;
/// only the finished `Arc<Decipherer>` is ever published. Failed builds are
/// not cached.
pub struct SessionCache {
    decipherers: Cache<ScriptFingerprint, Arc<Decipherer>>,
    config: CipherConfig,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::with_config(CipherConfig::new())
    }

    pub fn with_config(config: CipherConfig) -> Self {
        Self::with_config_and_capacity(config, DEFAULT_CAPACITY)
    }

    pub fn with_config_and_capacity(config: CipherConfig, max_capacity: u64) -> Self {
        Self {
            decipherers: Cache::builder().max_capacity(max_capacity).build(),
            config,
        }
    }

    /// Process-wide cache with the default configuration
    pub fn global() -> &'static SessionCache {
        static GLOBAL: OnceLock<SessionCache> = OnceLock::new();
        GLOBAL.get_or_init(SessionCache::new)
    }

    pub fn config(&self) -> &CipherConfig {
        &self.config
    }

    /// Return the decipherer for `script`, building it on first demand
    pub fn get_or_build(&self, script: &str) -> Result<Arc<Decipherer>, CipherError> {
        let fingerprint = ScriptFingerprint::of(script);
        if let Some(decipherer) = self.decipherers.get(&fingerprint) {
            debug!(%fingerprint, "decipherer cache hit");
            return Ok(decipherer);
        }

        self.decipherers
            .try_get_with(fingerprint, || {
                info!(%fingerprint, bytes = script.len(), "building decipherer for player script");
                Decipherer::build(script, &self.config).map(Arc::new)
            })
            .map_err(|err| (*err).clone())
    }

    /// Already built decipherer for a fingerprint, if any
    pub fn get(&self, fingerprint: &ScriptFingerprint) -> Option<Arc<Decipherer>> {
        self.decipherers.get(fingerprint)
    }

    pub fn contains(&self, script: &str) -> bool {
        self.decipherers.contains_key(&ScriptFingerprint::of(script))
    }

    /// Forget every built decipherer
    pub fn reset(&self) {
        self.decipherers.invalidate_all();
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::cipher::events::{CipherEvent, MemorySink};
    use crate::platform::cipher::extract::ExtractionStage;
    use crate::platform::cipher::SAMPLE_PLAYER_JS;

    #[test]
    fn test_fingerprint_is_stable() {
        let a = ScriptFingerprint::of("abc");
        assert_eq!(a, ScriptFingerprint::of("abc"));
        assert_ne!(a, ScriptFingerprint::of("abd"));
        assert_eq!(
            a.to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_same_script_returns_same_decipherer() {
        let cache = SessionCache::new();
        let first = cache.get_or_build(SAMPLE_PLAYER_JS).unwrap();
        let second = cache.get_or_build(SAMPLE_PLAYER_JS).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.apply("abcdef").unwrap(), second.apply("abcdef").unwrap());
        assert!(cache.contains(SAMPLE_PLAYER_JS));
    }

    #[test]
    fn test_distinct_scripts_get_their_own_decipherer() {
        let cache = SessionCache::new();
        let other = SAMPLE_PLAYER_JS.replace("Qr.kT(a,2);", "");

        let first = cache.get_or_build(SAMPLE_PLAYER_JS).unwrap();
        let second = cache.get_or_build(&other).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.apply("abcdef").unwrap(), "dfcba");
        // reverse then drop-middle(1) only
        assert_eq!(second.apply("abcdef").unwrap(), "fdcba");
    }

    #[test]
    fn test_failed_build_is_not_cached() {
        let cache = SessionCache::new();
        let err = cache.get_or_build("var nothing = 1;").unwrap_err();
        assert_eq!(
            err,
            CipherError::Extraction {
                stage: ExtractionStage::EntryName
            }
        );
        assert!(!cache.contains("var nothing = 1;"));
    }

    #[test]
    fn test_reset_forces_rebuild() {
        let cache = SessionCache::new();
        let first = cache.get_or_build(SAMPLE_PLAYER_JS).unwrap();
        cache.reset();
        let second = cache.get_or_build(SAMPLE_PLAYER_JS).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let sink = Arc::new(MemorySink::new());
        let cache = Arc::new(SessionCache::with_config(
            CipherConfig::new().with_sink(sink.clone()),
        ));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get_or_build(SAMPLE_PLAYER_JS).unwrap())
            })
            .collect();
        let built: Vec<Arc<Decipherer>> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        assert!(built.iter().all(|d| Arc::ptr_eq(d, &built[0])));
        let entry_lookups = sink
            .events()
            .iter()
            .filter(|event| {
                matches!(
                    event,
                    CipherEvent::PatternTried {
                        stage: ExtractionStage::EntryName,
                        matched: true,
                        ..
                    }
                )
            })
            .count();
        assert_eq!(entry_lookups, 1);
    }

    #[test]
    fn test_global_cache_is_shared() {
        assert!(std::ptr::eq(SessionCache::global(), SessionCache::global()));
    }
}
