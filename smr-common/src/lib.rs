//! # SMR Common Library
//!
//! Shared code for the scene metadata resolver crates:
//! - Error and result types
//! - TOML configuration schema, discovery and write-back

pub mod config;
pub mod error;

pub use error::{Error, Result};
