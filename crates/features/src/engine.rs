//! Indicator computation engine.
//!
//! Combines the rolling statistics into one per-bar `IndicatorRow`.

use meanrev_core::{to_pips, IndicatorConfig, IndicatorRow, MinuteBar, WarmupPolicy};
use tracing::trace;

use crate::{atr::RollingAtr, rolling::RollingMean, rolling::RollingStd};

/// Streaming indicator pipeline.
///
/// Feed bars in order; each call yields the derived row for that bar.
pub struct IndicatorEngine {
    /// Rolling mean of close.
    sma: RollingMean,
    /// Rolling standard deviation of close.
    std: RollingStd,
    /// Rolling average true range.
    atr: RollingAtr,
    /// Lower clamp applied to the standard deviation.
    sigma_floor: f64,
}

impl IndicatorEngine {
    /// Create a new indicator engine from configuration.
    pub fn new(config: &IndicatorConfig) -> Self {
        let min_periods = |window: usize| match config.warmup {
            WarmupPolicy::Strict => window,
            WarmupPolicy::Relaxed => 1,
        };

        Self {
            sma: RollingMean::new(config.ma_bars, min_periods(config.ma_bars)),
            std: RollingStd::new(config.sig_bars, min_periods(config.sig_bars)),
            atr: RollingAtr::new(config.atr_bars, min_periods(config.atr_bars)),
            sigma_floor: config.sigma_floor,
        }
    }

    /// Process one bar and return its indicator row.
    pub fn update(&mut self, bar: &MinuteBar) -> IndicatorRow {
        let sma = self.sma.add(bar.close);
        let sigma = self.std.add(bar.close).map(|s| s.max(self.sigma_floor));

        // Sigma is floored above zero, so the division is safe.
        let z = match (sma, sigma) {
            (Some(mean), Some(sig)) => Some((bar.close - mean) / sig),
            _ => None,
        };

        let atr_pips = self.atr.add_bar(bar).map(to_pips);

        trace!(ts = %bar.ts, ?sma, ?z, ?atr_pips, "indicator row");

        IndicatorRow {
            sma,
            sigma,
            z,
            atr_pips,
        }
    }
}
