//! Average true range over a rolling window.
//!
//! The first bar of a feed has no previous close, so it contributes no
//! true range; the ATR warm-up counts only recorded ranges.

use meanrev_core::MinuteBar;

use crate::rolling::RollingMean;

/// Rolling average true range calculator.
pub struct RollingAtr {
    /// Previous bar close, for gap-aware true range.
    prev_close: Option<f64>,
    /// Rolling mean over recorded true ranges.
    ranges: RollingMean,
}

impl RollingAtr {
    /// Create a new ATR calculator.
    ///
    /// `min_periods` counts recorded true ranges, not bars seen.
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            prev_close: None,
            ranges: RollingMean::new(window, min_periods),
        }
    }

    /// Add a bar and return the current ATR in price units, if defined.
    pub fn add_bar(&mut self, bar: &MinuteBar) -> Option<f64> {
        let atr = match self.prev_close {
            Some(prev) => self.ranges.add(bar.true_range(prev)),
            None => None,
        };
        self.prev_close = Some(bar.close);
        atr
    }

    /// Current ATR without adding a bar.
    pub fn atr(&self) -> Option<f64> {
        self.ranges.mean()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.prev_close = None;
        self.ranges.clear();
    }
}
