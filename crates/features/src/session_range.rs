//! Intraday session range tracking.
//!
//! Maintains the running high/low for the current session-local calendar
//! day, resetting on the first bar of each new day.

use chrono::NaiveDate;
use meanrev_core::MinuteBar;

/// Running intraday high/low tracker.
pub struct SessionRange {
    /// Day the current range belongs to.
    day: Option<NaiveDate>,
    /// Running high.
    high: f64,
    /// Running low.
    low: f64,
}

impl SessionRange {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self {
            day: None,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
        }
    }

    /// Fold a bar into the range. Call once per bar, before reading
    /// `pos_pct` for that bar.
    pub fn update(&mut self, bar: &MinuteBar) {
        let day = bar.day();
        if self.day != Some(day) {
            self.day = Some(day);
            self.high = bar.high;
            self.low = bar.low;
        } else {
            self.high = self.high.max(bar.high);
            self.low = self.low.min(bar.low);
        }
    }

    /// Fractional position of a price within the day's range.
    ///
    /// Resolves to 0.5 when the range is zero, which also covers the
    /// day's first bar when high == low.
    pub fn pos_pct(&self, close: f64) -> f64 {
        let range = self.high - self.low;
        if range > 0.0 {
            (close - self.low) / range
        } else {
            0.5
        }
    }

    /// Running high for the current day.
    pub fn high(&self) -> f64 {
        self.high
    }

    /// Running low for the current day.
    pub fn low(&self) -> f64 {
        self.low
    }
}

impl Default for SessionRange {
    fn default() -> Self {
        Self::new()
    }
}
