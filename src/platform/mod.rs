//! Video platform player scripts and signature deciphering

pub mod cipher;
pub mod player;

pub use cipher::*;
pub use player::*;
