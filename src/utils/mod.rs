//! Utility functions for ryt-cipher

pub mod cache;
pub mod url;

pub use cache::*;
pub use url::*;
