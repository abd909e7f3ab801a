//! Core types and configuration for the footprint system.
//!
//! This crate provides shared types used across all other crates:
//! - Trade, consolidated trade and footprint bar types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ProcessConfig, SymbolConfig, MAX_THREAD_COUNT};
pub use error::{Error, Result};
pub use types::*;
