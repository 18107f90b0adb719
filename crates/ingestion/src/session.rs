//! Trading-session normalization.
//!
//! Converts UTC bars into the configured session timezone and keeps only
//! bars whose local time-of-day falls inside the trading window. The
//! simulator's day keys derive from the local date produced here.

use chrono::{NaiveTime, TimeZone};
use chrono_tz::Tz;
use meanrev_core::{Error, MinuteBar, Result, SessionConfig};
use tracing::debug;

use crate::loader::UtcBar;

/// Session timezone plus an inclusive intraday trading window.
pub struct SessionWindow {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
}

impl SessionWindow {
    /// Build a window from session configuration.
    pub fn from_config(config: &SessionConfig) -> Result<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| Error::config(format!("unknown timezone: {}", config.timezone)))?;
        let open = parse_hhmm(&config.open)?;
        let close = parse_hhmm(&config.close)?;
        if open >= close {
            return Err(Error::config(format!(
                "session open {} must precede close {}",
                config.open, config.close
            )));
        }
        Ok(Self { tz, open, close })
    }

    /// Convert a UTC bar to session-local time, or `None` if it falls
    /// outside the trading window. Both window boundaries are inclusive.
    pub fn localize(&self, bar: &UtcBar) -> Option<MinuteBar> {
        let local = self.tz.from_utc_datetime(&bar.ts.naive_utc());
        let time = local.time();
        if time < self.open || time > self.close {
            return None;
        }
        Some(MinuteBar {
            ts: local.naive_local(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        })
    }

    /// Filter a UTC bar sequence down to session-local bars.
    pub fn filter(&self, bars: &[UtcBar]) -> Vec<MinuteBar> {
        let kept: Vec<MinuteBar> = bars.iter().filter_map(|b| self.localize(b)).collect();
        debug!(
            total = bars.len(),
            kept = kept.len(),
            "session filter applied"
        );
        kept
    }
}

fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| Error::config(format!("invalid session time: {s}")))
}
