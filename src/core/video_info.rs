//! Player response records and signature URL rewriting

use crate::error::RytError;
use crate::platform::cipher::Decipherer;
use crate::utils::url::{append_query_param, query_value};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Query key the signature goes under when `sp` is absent
pub const DEFAULT_SIGNATURE_KEY: &str = "signature";

/// Player response for one video
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoInfo {
    pub playability_status: PlayabilityStatus,
    pub streaming_data: StreamingData,
    pub video_details: VideoDetails,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayabilityStatus {
    pub status: String,
    pub playable_in_embed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingData {
    pub expires_in_seconds: String,
    /// Progressive (audio and video) formats
    pub formats: Vec<Format>,
    /// Audio-only or video-only formats
    pub adaptive_formats: Vec<Format>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VideoDetails {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub length_seconds: String,
}

/// One downloadable stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Format {
    pub itag: u32,
    pub url: String,
    pub mime_type: String,
    pub quality: String,
    pub quality_label: String,
    pub bitrate: u64,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub content_length: String,
    /// Scrambled signature bundle; empty once deciphered
    #[serde(skip_serializing_if = "String::is_empty")]
    pub signature_cipher: String,
}

/// Decoded `signatureCipher` field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureCipher {
    /// Scrambled signature token
    pub signature: String,
    /// Query key the deciphered token goes under
    pub key: String,
    /// Stream URL still missing its signature
    pub url: String,
}

impl SignatureCipher {
    /// Decode an `s=..&sp=..&url=..` query string
    pub fn parse(field: &str) -> Result<Self, RytError> {
        let signature = query_value(field, "s").ok_or(RytError::MissingCipherField("s"))?;
        let url = query_value(field, "url").ok_or(RytError::MissingCipherField("url"))?;
        let key = query_value(field, "sp")
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| DEFAULT_SIGNATURE_KEY.to_string());

        Ok(Self {
            signature,
            key,
            url,
        })
    }

    /// Decipher the token and return the stream URL carrying it
    pub fn signed_url(&self, decipherer: &Decipherer) -> Result<String, RytError> {
        let token = decipherer.apply(&self.signature)?;
        append_query_param(&self.url, &self.key, &token)
    }
}

impl Format {
    /// True when the stream URL cannot be used as is
    pub fn needs_deciphering(&self) -> bool {
        self.url.is_empty() || !self.signature_cipher.is_empty()
    }

    /// Rewrite `url` with the deciphered signature and clear the cipher.
    ///
    /// On error the format is left as it was.
    pub fn decipher(&mut self, decipherer: &Decipherer) -> Result<(), RytError> {
        let cipher = SignatureCipher::parse(&self.signature_cipher)?;
        self.url = cipher.signed_url(decipherer)?;
        self.signature_cipher.clear();
        Ok(())
    }

    /// Top-level media kind, e.g. `video` or `audio`
    pub fn media_type(&self) -> &str {
        self.mime_essence().split('/').next().unwrap_or_default()
    }

    /// File extension derived from the MIME type
    pub fn extension(&self) -> &str {
        if self.media_type() == "audio" {
            if self.mime_type.contains("opus") {
                "opus"
            } else {
                "mp3"
            }
        } else {
            self.mime_essence().rsplit('/').next().unwrap_or_default()
        }
    }

    /// Suggested file name, e.g. `dQw4w9WgXcQ-720p-hd720.mp4`
    pub fn default_filename(&self, video_id: &str) -> String {
        if self.quality_label.is_empty() {
            format!("{}-{}.{}", video_id, self.quality, self.extension())
        } else {
            format!(
                "{}-{}-{}.{}",
                video_id,
                self.quality_label,
                self.quality,
                self.extension()
            )
        }
    }

    /// `video/mp4; codecs="avc1"` gives `video/mp4`
    fn mime_essence(&self) -> &str {
        self.mime_type.split(';').next().unwrap_or_default().trim()
    }
}

/// Outcome of deciphering every format of a video
#[derive(Debug, Default)]
pub struct DecipherReport {
    /// Formats rewritten by this call
    pub deciphered: usize,
    /// Formats that already had a usable URL
    pub untouched: usize,
    /// Itag and reason of every format that could not be deciphered
    pub failures: Vec<(u32, RytError)>,
}

impl DecipherReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

impl VideoInfo {
    /// Progressive formats followed by adaptive formats
    pub fn all_formats(&self) -> impl Iterator<Item = &Format> {
        self.streaming_data
            .formats
            .iter()
            .chain(self.streaming_data.adaptive_formats.iter())
    }

    /// Decipher every format that needs it.
    ///
    /// A failing format is recorded in the report and the rest still proceed.
    pub fn decipher_all(&mut self, decipherer: &Decipherer) -> DecipherReport {
        let mut report = DecipherReport::default();
        let streaming = &mut self.streaming_data;

        for format in streaming
            .formats
            .iter_mut()
            .chain(streaming.adaptive_formats.iter_mut())
        {
            if !format.needs_deciphering() {
                report.untouched += 1;
                continue;
            }
            match format.decipher(decipherer) {
                Ok(()) => {
                    debug!(itag = format.itag, "format deciphered");
                    report.deciphered += 1;
                }
                Err(err) => {
                    warn!(itag = format.itag, error = %err, "failed to decipher format");
                    report.failures.push((format.itag, err));
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CipherError;
    use crate::platform::cipher::{CipherConfig, SAMPLE_PLAYER_JS};

    const RESPONSE: &str = r#"{
        "playabilityStatus": {"status": "OK", "playableInEmbed": true},
        "streamingData": {
            "expiresInSeconds": "21540",
            "formats": [{
                "itag": 18,
                "mimeType": "video/mp4; codecs=\"avc1.42001E, mp4a.40.2\"",
                "quality": "medium",
                "qualityLabel": "360p",
                "bitrate": 503000,
                "signatureCipher": "s=abcdef&sp=sig&url=https%3A%2F%2Fr1.example%2Fvideoplayback%3Fitag%3D18"
            }],
            "adaptiveFormats": [{
                "itag": 251,
                "url": "https://r1.example/videoplayback?itag=251",
                "mimeType": "audio/webm; codecs=\"opus\"",
                "quality": "tiny"
            }, {
                "itag": 140,
                "mimeType": "audio/mp4; codecs=\"mp4a.40.2\"",
                "quality": "tiny",
                "signatureCipher": "sp=sig&url=https%3A%2F%2Fr1.example%2Fvideoplayback%3Fitag%3D140"
            }]
        },
        "videoDetails": {"videoId": "dQw4w9WgXcQ", "title": "Sample"}
    }"#;

    fn decipherer() -> Decipherer {
        Decipherer::build(SAMPLE_PLAYER_JS, &CipherConfig::new()).unwrap()
    }

    #[test]
    fn test_parse_signature_cipher() {
        let cipher =
            SignatureCipher::parse("s=AB%3DC&sp=sig&url=https%3A%2F%2Fr1.example%2Fv%3Fa%3D1")
                .unwrap();
        assert_eq!(cipher.signature, "AB=C");
        assert_eq!(cipher.key, "sig");
        assert_eq!(cipher.url, "https://r1.example/v?a=1");
    }

    #[test]
    fn test_parse_signature_cipher_defaults_key() {
        let cipher = SignatureCipher::parse("s=abc&url=https%3A%2F%2Fr1.example%2Fv").unwrap();
        assert_eq!(cipher.key, DEFAULT_SIGNATURE_KEY);
    }

    #[test]
    fn test_parse_signature_cipher_missing_fields() {
        assert!(matches!(
            SignatureCipher::parse("sp=sig&url=https%3A%2F%2Fr1.example"),
            Err(RytError::MissingCipherField("s"))
        ));
        assert!(matches!(
            SignatureCipher::parse("s=abc&sp=sig"),
            Err(RytError::MissingCipherField("url"))
        ));
    }

    #[test]
    fn test_format_decipher_rewrites_url() {
        let mut format = Format {
            itag: 18,
            signature_cipher: "s=abcdef&sp=sig&url=https%3A%2F%2Fr1.example%2Fv%3Fitag%3D18"
                .to_string(),
            ..Format::default()
        };
        assert!(format.needs_deciphering());

        format.decipher(&decipherer()).unwrap();
        assert_eq!(format.url, "https://r1.example/v?itag=18&sig=dfcba");
        assert!(format.signature_cipher.is_empty());
        assert!(!format.needs_deciphering());
    }

    #[test]
    fn test_format_decipher_failure_leaves_format_untouched() {
        let script = SAMPLE_PLAYER_JS.replace("Qr.Dd(a,1)", "Qr.Dd(a,40)");
        let decipherer = Decipherer::build(&script, &CipherConfig::new()).unwrap();
        let mut format = Format {
            itag: 22,
            signature_cipher: "s=abcdef&url=https%3A%2F%2Fr1.example%2Fv".to_string(),
            ..Format::default()
        };
        let before = format.clone();

        let err = format.decipher(&decipherer).unwrap_err();
        assert!(matches!(
            err,
            RytError::Cipher(CipherError::OutOfRange { .. })
        ));
        assert_eq!(format.url, before.url);
        assert_eq!(format.signature_cipher, before.signature_cipher);
    }

    #[test]
    fn test_decipher_all_collects_failures() {
        let mut info: VideoInfo = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(info.video_details.video_id, "dQw4w9WgXcQ");
        assert_eq!(info.all_formats().count(), 3);

        let report = info.decipher_all(&decipherer());
        assert_eq!(report.deciphered, 1);
        assert_eq!(report.untouched, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, 140);
        assert!(matches!(
            report.failures[0].1,
            RytError::MissingCipherField("s")
        ));
        assert!(!report.is_complete());

        assert_eq!(
            info.streaming_data.formats[0].url,
            "https://r1.example/videoplayback?itag=18&sig=dfcba"
        );
    }

    #[test]
    fn test_media_type_and_filename() {
        let info: VideoInfo = serde_json::from_str(RESPONSE).unwrap();
        let video = &info.streaming_data.formats[0];
        let opus = &info.streaming_data.adaptive_formats[0];
        let aac = &info.streaming_data.adaptive_formats[1];

        assert_eq!(video.media_type(), "video");
        assert_eq!(video.default_filename("dQw4w9WgXcQ"), "dQw4w9WgXcQ-360p-medium.mp4");
        assert_eq!(opus.media_type(), "audio");
        assert_eq!(opus.default_filename("dQw4w9WgXcQ"), "dQw4w9WgXcQ-tiny.opus");
        assert_eq!(aac.extension(), "mp3");
    }

    #[test]
    fn test_serialize_omits_cleared_cipher() {
        let format = Format {
            itag: 18,
            url: "https://r1.example/v".to_string(),
            ..Format::default()
        };
        let json = serde_json::to_value(&format).unwrap();
        assert_eq!(json["itag"], 18);
        assert!(json.get("signatureCipher").is_none());
        assert!(json.get("qualityLabel").is_some());
    }
}
