//! URL utilities for extracting video IDs and editing query strings

use crate::error::RytError;
use url::{form_urlencoded, Url};

/// Length of a bare video ID
const VIDEO_ID_LEN: usize = 11;

/// Extract video ID from various video platform URL formats, or accept a bare ID
pub fn extract_video_id(input: &str) -> Result<String, RytError> {
    let input = input.trim();
    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let parsed = Url::parse(input)?;

    match parsed.host_str() {
        Some("youtu.be") => {
            let path = parsed.path().trim_start_matches('/');
            if path.is_empty() {
                return Err(RytError::InvalidUrl("Missing video ID".to_string()));
            }
            Ok(path.to_string())
        }
        Some("youtube.com") | Some("www.youtube.com") | Some("m.youtube.com") => {
            let path = parsed.path();
            if path.starts_with("/watch") {
                parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.to_string())
                    .ok_or_else(|| RytError::InvalidUrl("Missing v parameter".to_string()))
            } else if let Some(rest) = ["/shorts/", "/embed/", "/v/"]
                .iter()
                .find_map(|prefix| path.strip_prefix(prefix))
            {
                let video_id = rest.split('/').next().unwrap_or_default();
                if video_id.is_empty() {
                    return Err(RytError::InvalidUrl(format!(
                        "Missing video ID in path {}",
                        path
                    )));
                }
                Ok(video_id.to_string())
            } else {
                Err(RytError::InvalidUrl(
                    "Unsupported video URL format".to_string(),
                ))
            }
        }
        _ => Err(RytError::InvalidUrl(
            "Not a supported video platform URL".to_string(),
        )),
    }
}

/// Check whether `input` looks like a bare 11-character video ID
pub fn is_video_id(input: &str) -> bool {
    input.len() == VIDEO_ID_LEN
        && input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// First value of `key` in an `a=1&b=2` query string, percent-decoded
pub fn query_value(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, value)| value.into_owned())
}

/// Append `key=value` to the query of `url`, keeping existing parameters
pub fn append_query_param(url: &str, key: &str, value: &str) -> Result<String, RytError> {
    let mut parsed = Url::parse(url)?;
    parsed.query_pairs_mut().append_pair(key, value);
    Ok(parsed.into())
}
