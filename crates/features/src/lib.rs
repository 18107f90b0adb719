//! Indicator computation for the meanrev-trader system.
//!
//! This crate handles:
//! - Rolling mean and floor-clamped rolling standard deviation of close
//! - Z-score derivation
//! - Average true range with warm-up handling
//! - Intraday session range tracking

pub mod atr;
pub mod engine;
pub mod rolling;
pub mod session_range;

pub use atr::RollingAtr;
pub use engine::IndicatorEngine;
pub use rolling::{RollingMean, RollingStd};
pub use session_range::SessionRange;
