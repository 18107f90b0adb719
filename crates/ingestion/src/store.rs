//! SQLite bar cache.
//!
//! Persists raw UTC bars per symbol so repeated runs over the same range
//! skip the CSV parse. Timestamps are stored as epoch seconds.

use std::path::Path;

use chrono::{DateTime, Utc};
use meanrev_core::{Error, Result};
use rusqlite::Connection;
use tracing::debug;

use crate::loader::UtcBar;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS bars (
    symbol TEXT NOT NULL,
    ts     INTEGER NOT NULL,
    open   REAL NOT NULL,
    high   REAL NOT NULL,
    low    REAL NOT NULL,
    close  REAL NOT NULL,
    PRIMARY KEY (symbol, ts)
);
";

/// SQLite-backed minute-bar cache.
pub struct BarStore {
    conn: Connection,
}

impl BarStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Open an in-memory store.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(db_err)?;
        conn.execute_batch(SCHEMA).map_err(db_err)?;
        Ok(Self { conn })
    }

    /// Insert or replace a batch of bars for a symbol. Returns the number
    /// of rows written.
    pub fn save_bars(&mut self, symbol: &str, bars: &[UtcBar]) -> Result<usize> {
        let tx = self.conn.transaction().map_err(db_err)?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO bars (symbol, ts, open, high, low, close) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                )
                .map_err(db_err)?;
            for bar in bars {
                stmt.execute((
                    symbol,
                    bar.ts.timestamp(),
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                ))
                .map_err(db_err)?;
            }
        }
        tx.commit().map_err(db_err)?;
        debug!(symbol, bars = bars.len(), "bars cached");
        Ok(bars.len())
    }

    /// Load bars for a symbol, sorted by timestamp, optionally bounded by
    /// an inclusive UTC range.
    pub fn load_bars(
        &self,
        symbol: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<UtcBar>> {
        let lo = from.map_or(i64::MIN, |t| t.timestamp());
        let hi = to.map_or(i64::MAX, |t| t.timestamp());

        let mut stmt = self
            .conn
            .prepare(
                "SELECT ts, open, high, low, close FROM bars \
                 WHERE symbol = ?1 AND ts >= ?2 AND ts <= ?3 ORDER BY ts",
            )
            .map_err(db_err)?;

        let rows = stmt
            .query_map((symbol, lo, hi), |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, f64>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, f64>(4)?,
                ))
            })
            .map_err(db_err)?;

        let mut bars = Vec::new();
        for row in rows {
            let (secs, open, high, low, close) = row.map_err(db_err)?;
            let ts = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| Error::database(format!("bad timestamp in cache: {secs}")))?;
            bars.push(UtcBar {
                ts,
                open,
                high,
                low,
                close,
            });
        }
        Ok(bars)
    }

    /// Number of cached bars for a symbol.
    pub fn count(&self, symbol: &str) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM bars WHERE symbol = ?1",
                [symbol],
                |row| row.get(0),
            )
            .map_err(db_err)?;
        Ok(n as usize)
    }
}

fn db_err(e: rusqlite::Error) -> Error {
    Error::database(e.to_string())
}
