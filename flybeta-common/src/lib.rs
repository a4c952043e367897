//! # FlyBeta Common Library
//!
//! Shared code for the FlyBeta services:
//! - Error and result types
//! - TOML bootstrap configuration and config-file resolution
//! - Tracing subscriber setup
//! - Timestamp parsing and formatting

pub mod config;
pub mod error;
pub mod logging;
pub mod time;

pub use error::{Error, Result};
