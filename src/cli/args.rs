//! Command line argument parsing

use crate::platform::player::DEFAULT_BASE_URL;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Decipher stream signatures using a video player script
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["script", "player_url", "video"]),
))]
pub struct Args {
    /// signatureCipher query strings or bare scrambled signatures
    #[arg(value_name = "CIPHER")]
    pub ciphers: Vec<String>,

    /// Read the player script from a local file
    #[arg(long, value_name = "PATH")]
    pub script: Option<PathBuf>,

    /// Download the player script from this URL
    #[arg(long, value_name = "URL")]
    pub player_url: Option<String>,

    /// Locate the player script through a video ID or URL
    #[arg(long, value_name = "ID|URL")]
    pub video: Option<String>,

    /// Player response JSON whose formats should be deciphered
    #[arg(long, value_name = "PATH")]
    pub info: Option<PathBuf>,

    /// Print every extraction, classification and apply decision
    #[arg(long)]
    pub trace: bool,

    /// HTTP timeout (e.g., 30s, 1m)
    #[arg(long, value_name = "DURATION", default_value = "30s")]
    pub timeout: humantime::Duration,

    /// Origin used for embed pages and relative player paths
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Override User-Agent header
    #[arg(long, value_name = "USER_AGENT")]
    pub user_agent: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (only errors)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Where the player script comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptLocation {
    File(PathBuf),
    Url(String),
    Video(String),
}

/// One positional cipher argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CipherInput {
    /// Full `signatureCipher` field
    Query(String),
    /// Bare scrambled signature
    Token(String),
}

impl CipherInput {
    /// A value carrying `url=` is treated as a full `signatureCipher` field
    pub fn parse(value: &str) -> Self {
        if value.split('&').any(|pair| pair.starts_with("url=")) {
            CipherInput::Query(value.to_string())
        } else {
            CipherInput::Token(value.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CipherInput::Query(value) | CipherInput::Token(value) => value,
        }
    }
}

impl Args {
    /// Get HTTP timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        self.timeout.into()
    }

    /// The selected script source; clap guarantees exactly one is set
    pub fn script_location(&self) -> Option<ScriptLocation> {
        if let Some(path) = &self.script {
            Some(ScriptLocation::File(path.clone()))
        } else if let Some(url) = &self.player_url {
            Some(ScriptLocation::Url(url.clone()))
        } else {
            self.video.as_ref().map(|video| ScriptLocation::Video(video.clone()))
        }
    }

    /// Positional ciphers, classified
    pub fn cipher_inputs(&self) -> Vec<CipherInput> {
        self.ciphers.iter().map(|value| CipherInput::parse(value)).collect()
    }

    /// True when there is nothing to decipher
    pub fn has_no_inputs(&self) -> bool {
        self.ciphers.is_empty() && self.info.is_none()
    }

    /// Get output verbosity level
    pub fn verbosity_level(&self) -> VerbosityLevel {
        if self.quiet {
            VerbosityLevel::Quiet
        } else if self.verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Output verbosity level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerbosityLevel {
    /// Quiet (only errors)
    Quiet,
    /// Normal
    Normal,
    /// Verbose (debug info)
    Verbose,
}

impl VerbosityLevel {
    /// Default `tracing` filter directive for this level
    pub fn log_directive(&self) -> &'static str {
        match self {
            VerbosityLevel::Quiet => "error",
            VerbosityLevel::Normal => "info",
            VerbosityLevel::Verbose => "debug",
        }
    }
}

impl Default for Args {
    fn default() -> Self {
        Self {
            ciphers: Vec::new(),
            script: None,
            player_url: None,
            video: None,
            info: None,
            trace: false,
            timeout: humantime::Duration::from(Duration::from_secs(30)),
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: None,
            verbose: false,
            quiet: false,
        }
    }
}
