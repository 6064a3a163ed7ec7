//! # Lyric Player Common Library
//!
//! Shared code for the lyric player service and its tooling:
//! - Error type used across crates
//! - Bootstrap configuration loading
//! - API response envelope

pub mod api;
pub mod config;
pub mod error;

pub use error::{Error, Result};
