//! Configuration structures for the meanrev-trader system.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Main configuration for the backtest system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Trading session configuration.
    pub session: SessionConfig,
    /// Indicator pipeline configuration.
    pub indicators: IndicatorConfig,
    /// Strategy parameter set.
    pub strategy: StrategyConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate all sub-configurations.
    pub fn validate(&self) -> Result<()> {
        self.indicators.validate()?;
        self.strategy.validate()
    }
}

/// Trading session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Trading symbol (e.g., "EURGBP").
    pub symbol: String,
    /// IANA timezone the session is defined in.
    pub timezone: String,
    /// Session open, local time of day ("HH:MM").
    pub open: String,
    /// Session close, local time of day ("HH:MM"), inclusive.
    pub close: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            symbol: "EURGBP".to_string(),
            timezone: "Europe/London".to_string(),
            open: "07:00".to_string(),
            close: "17:00".to_string(),
        }
    }
}

/// Warm-up policy for rolling indicators.
///
/// Strategy builds disagree on whether indicators emit values before
/// their window is full, so both behaviors are supported explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPolicy {
    /// No value until the full window is populated.
    Strict,
    /// Values from the first observation onward (minimum period 1).
    /// The standard deviation still needs two observations.
    Relaxed,
}

/// Indicator pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Rolling mean window (bars).
    pub ma_bars: usize,
    /// Rolling standard deviation window (bars).
    pub sig_bars: usize,
    /// Average true range window (bars).
    pub atr_bars: usize,
    /// Lower clamp for the rolling standard deviation (price units).
    pub sigma_floor: f64,
    /// Minimum ATR (pips) required before entries are permitted.
    pub atr_gate_pips: f64,
    /// Warm-up policy for all rolling windows.
    pub warmup: WarmupPolicy,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ma_bars: 30,
            sig_bars: 5,
            atr_bars: 5,
            sigma_floor: 0.00030,
            atr_gate_pips: 1.3,
            warmup: WarmupPolicy::Relaxed,
        }
    }
}

impl IndicatorConfig {
    /// Validate indicator settings.
    pub fn validate(&self) -> Result<()> {
        if self.ma_bars == 0 || self.sig_bars == 0 || self.atr_bars == 0 {
            return Err(Error::config("indicator windows must be at least 1 bar"));
        }
        if self.sigma_floor <= 0.0 {
            return Err(Error::config("sigma_floor must be positive"));
        }
        if self.atr_gate_pips < 0.0 {
            return Err(Error::config("atr_gate_pips must be non-negative"));
        }
        Ok(())
    }
}

/// Strategy parameter set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyConfig {
    /// Base z-score threshold for the first layer.
    pub base_z: f64,
    /// Additional z-score required per same-direction open ticket.
    pub step_z: f64,
    /// Minimum fractional distance between close and mean.
    pub drift: f64,
    /// Edge-zone width as a fraction of the session range.
    pub edge_pct: f64,
    /// Maximum concurrently open tickets, both sides combined.
    pub max_tickets: usize,
    /// Hard stop distance in pips.
    pub stop_pips: f64,
    /// Time stop in minutes.
    pub time_min: i64,
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            base_z: 1.95,
            step_z: 0.25,
            drift: 0.001,
            edge_pct: 0.15,
            max_tickets: 5,
            stop_pips: 10.0,
            time_min: 30,
        }
    }
}

impl StrategyConfig {
    /// Validate strategy parameters.
    pub fn validate(&self) -> Result<()> {
        if self.base_z < 0.0 {
            return Err(Error::config("base_z must be non-negative"));
        }
        if self.step_z < 0.0 {
            return Err(Error::config("step_z must be non-negative"));
        }
        if self.drift < 0.0 {
            return Err(Error::config("drift must be non-negative"));
        }
        if !(0.0..0.5).contains(&self.edge_pct) {
            return Err(Error::config("edge_pct must lie in [0, 0.5)"));
        }
        if self.max_tickets == 0 {
            return Err(Error::config("max_tickets must be at least 1"));
        }
        if self.stop_pips <= 0.0 {
            return Err(Error::config("stop_pips must be positive"));
        }
        if self.time_min <= 0 {
            return Err(Error::config("time_min must be positive"));
        }
        Ok(())
    }

    /// Apply a single `key=value` override, with type checking.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn parse_f64(key: &str, value: &str) -> Result<f64> {
            value
                .parse()
                .map_err(|_| Error::config(format!("invalid value for {key}: {value}")))
        }
        fn parse_int<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
            value
                .parse()
                .map_err(|_| Error::config(format!("invalid value for {key}: {value}")))
        }

        match key {
            "base_z" => self.base_z = parse_f64(key, value)?,
            "step_z" => self.step_z = parse_f64(key, value)?,
            "drift" => self.drift = parse_f64(key, value)?,
            "edge_pct" => self.edge_pct = parse_f64(key, value)?,
            "max_tickets" => self.max_tickets = parse_int(key, value)?,
            "stop_pips" => self.stop_pips = parse_f64(key, value)?,
            "time_min" => self.time_min = parse_int(key, value)?,
            _ => return Err(Error::config(format!("unknown strategy parameter: {key}"))),
        }
        Ok(())
    }
}
