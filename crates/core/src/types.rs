//! Core data types for the meanrev-trader system.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One pip in quote-currency price units.
pub const PIP: f64 = 1e-4;

/// Convert a price difference to pips.
#[inline]
pub fn to_pips(price_delta: f64) -> f64 {
    price_delta / PIP
}

/// Convert pips to a price difference.
#[inline]
pub fn from_pips(pips: f64) -> f64 {
    pips * PIP
}

/// A 1-minute OHLC bar in session-local time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinuteBar {
    /// Bar timestamp (session-local, minute resolution).
    pub ts: NaiveDateTime,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
}

impl MinuteBar {
    /// Session-local calendar date of the bar.
    #[inline]
    pub fn day(&self) -> NaiveDate {
        self.ts.date()
    }

    /// True range against the previous close:
    /// max(high - low, |high - prev_close|, |low - prev_close|).
    #[inline]
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// Check that all four prices are finite.
    #[inline]
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
    }
}

/// Trade direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Get sign: +1 for long, -1 for short.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

/// Per-bar derived indicator values.
///
/// A `None` field means the indicator is still warming up on this bar.
/// Rows are computed once per bar and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    /// Rolling mean of close.
    pub sma: Option<f64>,
    /// Floor-clamped rolling standard deviation of close.
    pub sigma: Option<f64>,
    /// Z-score: (close - sma) / sigma.
    pub z: Option<f64>,
    /// Average true range, in pips.
    pub atr_pips: Option<f64>,
}

impl IndicatorRow {
    /// Whether the bar clears the volatility gate.
    ///
    /// An undefined ATR never clears the gate.
    #[inline]
    pub fn vol_ok(&self, atr_gate_pips: f64) -> bool {
        self.atr_pips.map_or(false, |atr| atr >= atr_gate_pips)
    }
}

/// Validate a bar feed before simulation.
///
/// Checks strictly-increasing timestamps, finite prices, and low <= high.
/// The simulator refuses to start on a feed that fails here.
pub fn validate_bars(bars: &[MinuteBar]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(Error::validation(format!(
                "non-finite price in bar {i} at {}",
                bar.ts
            )));
        }
        if bar.low > bar.high {
            return Err(Error::validation(format!(
                "low above high in bar {i} at {}",
                bar.ts
            )));
        }
        if i > 0 && bar.ts <= bars[i - 1].ts {
            return Err(Error::validation(format!(
                "non-monotonic timestamp in bar {i} at {}",
                bar.ts
            )));
        }
    }
    Ok(())
}
