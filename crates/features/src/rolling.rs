//! Rolling statistics over the close series.
//!
//! Streaming equivalents of trailing-window mean and standard deviation,
//! with a configurable minimum period for warm-up behavior.

use std::collections::VecDeque;

/// Rolling mean over a trailing window.
pub struct RollingMean {
    /// Window size in bars.
    window: usize,
    /// Minimum observations before a value is emitted.
    min_periods: usize,
    /// Values currently in the window.
    values: VecDeque<f64>,
    /// Running sum of windowed values.
    sum: f64,
}

impl RollingMean {
    /// Create a new rolling mean.
    ///
    /// `min_periods` is clamped to at least 1 and at most `window`.
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            window,
            min_periods: min_periods.clamp(1, window.max(1)),
            values: VecDeque::with_capacity(window),
            sum: 0.0,
        }
    }

    /// Add an observation and return the current mean, if defined.
    pub fn add(&mut self, value: f64) -> Option<f64> {
        if self.values.len() >= self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
        self.mean()
    }

    /// Current mean, or `None` during warm-up.
    pub fn mean(&self) -> Option<f64> {
        let n = self.values.len();
        if n < self.min_periods {
            return None;
        }
        Some(self.sum / n as f64)
    }

    /// Number of observations currently in the window.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
    }
}

/// Rolling sample standard deviation over a trailing window.
///
/// Uses the n-1 denominator, so at least two observations are required
/// regardless of the configured minimum period.
pub struct RollingStd {
    window: usize,
    min_periods: usize,
    values: VecDeque<f64>,
    sum: f64,
    sum_sq: f64,
}

impl RollingStd {
    /// Create a new rolling standard deviation.
    pub fn new(window: usize, min_periods: usize) -> Self {
        Self {
            window,
            min_periods: min_periods.clamp(2, window.max(2)),
            values: VecDeque::with_capacity(window),
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Add an observation and return the current std, if defined.
    pub fn add(&mut self, value: f64) -> Option<f64> {
        if self.values.len() >= self.window {
            if let Some(old) = self.values.pop_front() {
                self.sum -= old;
                self.sum_sq -= old * old;
            }
        }
        self.values.push_back(value);
        self.sum += value;
        self.sum_sq += value * value;
        self.std()
    }

    /// Current sample standard deviation, or `None` during warm-up.
    pub fn std(&self) -> Option<f64> {
        let n = self.values.len();
        if n < self.min_periods {
            return None;
        }

        let n_f = n as f64;
        let mean = self.sum / n_f;
        let variance = (self.sum_sq - n_f * mean * mean) / (n_f - 1.0);

        // Guard against small negative values from cancellation
        if variance <= 0.0 {
            Some(0.0)
        } else {
            Some(variance.sqrt())
        }
    }

    /// Number of observations currently in the window.
    pub fn count(&self) -> usize {
        self.values.len()
    }

    /// Clear all state.
    pub fn clear(&mut self) {
        self.values.clear();
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean_warmup_strict() {
        let mut mean = RollingMean::new(3, 3);
        assert!(mean.add(1.0).is_none());
        assert!(mean.add(2.0).is_none());
        let m = mean.add(3.0).unwrap();
        assert_relative_eq!(m, 2.0);
    }

    #[test]
    fn test_mean_warmup_relaxed() {
        let mut mean = RollingMean::new(3, 1);
        assert_relative_eq!(mean.add(4.0).unwrap(), 4.0);
        assert_relative_eq!(mean.add(6.0).unwrap(), 5.0);
    }

    #[test]
    fn test_mean_window_slides() {
        let mut mean = RollingMean::new(3, 1);
        for v in [1.0, 2.0, 3.0, 4.0] {
            mean.add(v);
        }
        // Window now holds 2, 3, 4
        assert_eq!(mean.count(), 3);
        assert_relative_eq!(mean.mean().unwrap(), 3.0);
    }

    #[test]
    fn test_std_needs_two_observations() {
        let mut std = RollingStd::new(5, 1);
        assert!(std.add(1.0).is_none());
        assert!(std.add(1.0).is_some());
    }

    #[test]
    fn test_std_known_value() {
        let mut std = RollingStd::new(5, 1);
        for v in [2.0, 4.0, 4.0, 4.0, 5.0] {
            std.add(v);
        }
        // Sample std of [2, 4, 4, 4, 5] = sqrt(4.8 / 4) ~= 1.0954
        assert_relative_eq!(std.std().unwrap(), 1.0954451, epsilon = 1e-6);
    }

    #[test]
    fn test_std_constant_series_is_zero() {
        let mut std = RollingStd::new(5, 1);
        for _ in 0..8 {
            std.add(0.85);
        }
        assert_relative_eq!(std.std().unwrap(), 0.0);
    }

    #[test]
    fn test_std_strict_warmup() {
        let mut std = RollingStd::new(5, 5);
        for v in [1.0, 2.0, 3.0, 4.0] {
            assert!(std.add(v).is_none());
        }
        assert!(std.add(5.0).is_some());
    }

    #[test]
    fn test_std_window_slides() {
        let mut std = RollingStd::new(3, 3);
        for v in [10.0, 10.0, 10.0, 12.0] {
            std.add(v);
        }
        // Window holds 10, 10, 12: sample std = sqrt(8/3 / 2) = sqrt(4/3)
        assert_relative_eq!(std.std().unwrap(), (4.0f64 / 3.0).sqrt(), epsilon = 1e-12);
    }
}
