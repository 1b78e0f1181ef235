//! Error types for ryt-cipher

use crate::platform::cipher::extract::ExtractionStage;
use std::fmt;
use thiserror::Error;

/// Main error type for ryt-cipher operations
#[derive(Debug, Error)]
pub enum RytError {
    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Signature cipher is missing the `{0}` field")]
    MissingCipherField(&'static str),

    #[error("Player script URL not found in page")]
    PlayerNotFound,

    #[error("Download failed: {0}")]
    DownloadFailed(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("Timeout error: {0}")]
    TimeoutError(String),
}

impl RytError {
    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            RytError::DownloadFailed(err) => err
                .status()
                .map_or(true, |status| status.is_server_error()),
            RytError::TimeoutError(_) => true,
            _ => false,
        }
    }

    /// Check if error came out of the decipher pipeline
    pub fn is_cipher_error(&self) -> bool {
        matches!(self, RytError::Cipher(_))
    }
}

/// Why a located fragment failed to decompose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructuralKind {
    /// A statement or table entry lacks a required field
    TooFewFields,
    /// A literal argument is not an integer that fits the token index range
    NotAnInteger,
}

impl fmt::Display for StructuralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuralKind::TooFewFields => write!(f, "too few fields"),
            StructuralKind::NotAnInteger => write!(f, "not an integer"),
        }
    }
}

/// Failures of the extract / build / apply pipeline.
///
/// All of them are deterministic for a given script and token, so none is
/// retryable.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CipherError {
    #[error("no known pattern matched the {stage}")]
    Extraction { stage: ExtractionStage },

    #[error("malformed fragment ({kind}): {fragment:?}")]
    Structural {
        kind: StructuralKind,
        fragment: String,
    },

    #[error("helper body matches no known operation shape: {body:?}")]
    UnknownShape { body: String },

    #[error("plan references unknown helper `{name}`")]
    UnknownHelper { name: String },

    #[error("{op} argument {argument} is out of range for a token of length {len}")]
    OutOfRange {
        op: &'static str,
        argument: usize,
        len: usize,
    },

    #[error("script text is empty")]
    EmptyScript,

    #[error("invalid recognizer pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

impl CipherError {
    pub(crate) fn structural(kind: StructuralKind, fragment: impl Into<String>) -> Self {
        CipherError::Structural {
            kind,
            fragment: fragment.into(),
        }
    }

    /// Nothing in the script matched a stage's pattern list
    pub fn is_extraction(&self) -> bool {
        matches!(self, CipherError::Extraction { .. } | CipherError::EmptyScript)
    }

    /// Text was found but did not have the expected shape
    pub fn is_structural(&self) -> bool {
        matches!(self, CipherError::Structural { .. })
    }

    /// A helper body did not look like any known operation
    pub fn is_classification(&self) -> bool {
        matches!(self, CipherError::UnknownShape { .. })
    }

    /// The plan could not be run against a token
    pub fn is_apply(&self) -> bool {
        matches!(
            self,
            CipherError::UnknownHelper { .. } | CipherError::OutOfRange { .. }
        )
    }
}
