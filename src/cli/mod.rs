//! Command line interface for ryt-cipher

pub mod args;
pub mod output;

pub use args::Args;
