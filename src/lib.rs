//! # ryt-cipher - signature deciphering for video player scripts
//!
//! Streams served by the video platform carry a scrambled signature that
//! must be unscrambled with a routine hidden in the current player script.
//! This crate locates that routine with ordered regex recognizers, turns it
//! into a small plan of reverse / splice / swap steps and runs the plan
//! natively, without a JavaScript engine.
//!
//! ## Example
//!
//! ```rust,no_run
//! use ryt_cipher::core::SignatureResolver;
//! use ryt_cipher::platform::player::PlayerFetcher;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = SignatureResolver::new(PlayerFetcher::new()?);
//!     let player_url = resolver.player_url_for("dQw4w9WgXcQ").await?;
//!     let decipherer = resolver.decipherer_for(&player_url).await?;
//!
//!     println!("{}", decipherer.apply("AOq0QJ8wRAIgXy")?);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod core;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use crate::core::{DecipherReport, Format, SignatureCipher, SignatureResolver, VideoInfo};
pub use error::{CipherError, RytError};
pub use platform::cipher::{CipherConfig, Decipherer, SessionCache};
pub use platform::player::{FetchConfig, PlayerFetcher, ScriptSource};

/// Result type alias for ryt-cipher operations
pub type Result<T> = std::result::Result<T, RytError>;
