//! Core functionality for ryt-cipher

pub mod resolver;
pub mod video_info;

pub use resolver::*;
pub use video_info::*;
