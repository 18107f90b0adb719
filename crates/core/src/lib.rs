//! Core types and configuration for the meanrev-trader system.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (minute bars, trade sides, indicator rows)
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, IndicatorConfig, SessionConfig, StrategyConfig, WarmupPolicy};
pub use error::{Error, Result};
pub use types::*;
