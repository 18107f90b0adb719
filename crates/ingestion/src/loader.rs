//! CSV minute-bar loading.
//!
//! Reads the cached bar files written by the data exporter: one row per
//! minute, `timestamp_utc,open,high,low,close`, timestamps in UTC.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use meanrev_core::{Error, Result};
use serde::Deserialize;
use tracing::{debug, warn};

/// A raw minute bar as loaded from disk, still in UTC.
///
/// Session-local [`meanrev_core::MinuteBar`]s are produced from these by
/// the session window filter.
#[derive(Debug, Clone, PartialEq)]
pub struct UtcBar {
    /// Bar timestamp in UTC.
    pub ts: DateTime<Utc>,
    /// Open price.
    pub open: f64,
    /// High price.
    pub high: f64,
    /// Low price.
    pub low: f64,
    /// Close price.
    pub close: f64,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp_utc: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

/// Parse a UTC timestamp in either RFC 3339 (`2025-03-03T07:00:00Z`) or
/// plain `%Y-%m-%d %H:%M:%S` form.
fn parse_utc(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|_| Error::data(format!("unparseable timestamp: {s}")))
}

/// Loader for one CSV bar file.
pub struct CsvBarLoader {
    path: PathBuf,
}

impl CsvBarLoader {
    /// Create a loader for the given file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Load every bar in the file, in file order.
    pub fn load(&self) -> Result<Vec<UtcBar>> {
        self.load_range(None, None)
    }

    /// Load bars whose UTC date lies within the inclusive bounds.
    pub fn load_range(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<UtcBar>> {
        let mut reader = csv::Reader::from_path(&self.path).map_err(|e| {
            Error::data(format!("cannot open {}: {e}", self.path.display()))
        })?;

        let mut bars = Vec::new();
        for (i, result) in reader.deserialize().enumerate() {
            let row: CsvRow = result.map_err(|e| {
                Error::data(format!(
                    "bad row {} in {}: {e}",
                    i + 1,
                    self.path.display()
                ))
            })?;
            let ts = parse_utc(&row.timestamp_utc)?;

            let date = ts.date_naive();
            if from.is_some_and(|d| date < d) || to.is_some_and(|d| date > d) {
                continue;
            }

            bars.push(UtcBar {
                ts,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
            });
        }

        if bars.is_empty() {
            warn!(path = %self.path.display(), "no bars loaded");
        } else {
            debug!(path = %self.path.display(), bars = bars.len(), "loaded csv bars");
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const SAMPLE: &str = "timestamp_utc,open,high,low,close\n\
        2025-03-03T07:00:00Z,0.8500,0.8503,0.8498,0.8501\n\
        2025-03-03T07:01:00Z,0.8501,0.8505,0.8500,0.8504\n\
        2025-03-04T07:00:00Z,0.8504,0.8506,0.8502,0.8503\n";

    #[test]
    fn test_load_all_rows() {
        let file = write_csv(SAMPLE);
        let bars = CsvBarLoader::new(file.path()).load().unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].ts.to_rfc3339(), "2025-03-03T07:00:00+00:00");
        assert_eq!(bars[0].open, 0.8500);
        assert_eq!(bars[1].close, 0.8504);
    }

    #[test]
    fn test_date_bounds_inclusive() {
        let file = write_csv(SAMPLE);
        let loader = CsvBarLoader::new(file.path());

        let day = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let bars = loader.load_range(Some(day), Some(day)).unwrap();
        assert_eq!(bars.len(), 2);

        let next = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let bars = loader.load_range(Some(next), None).unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn test_space_separated_timestamp() {
        let file = write_csv(
            "timestamp_utc,open,high,low,close\n\
             2025-03-03 07:00:00,0.85,0.85,0.85,0.85\n",
        );
        let bars = CsvBarLoader::new(file.path()).load().unwrap();
        assert_eq!(bars.len(), 1);
    }

    #[test]
    fn test_bad_price_is_error() {
        let file = write_csv(
            "timestamp_utc,open,high,low,close\n\
             2025-03-03T07:00:00Z,0.85,oops,0.85,0.85\n",
        );
        assert!(CsvBarLoader::new(file.path()).load().is_err());
    }

    #[test]
    fn test_bad_timestamp_is_error() {
        let file = write_csv(
            "timestamp_utc,open,high,low,close\n\
             yesterday,0.85,0.85,0.85,0.85\n",
        );
        assert!(CsvBarLoader::new(file.path()).load().is_err());
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(CsvBarLoader::new("/nonexistent/bars.csv").load().is_err());
    }
}
