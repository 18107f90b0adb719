//! Entry evaluation.
//!
//! Gates run in a fixed order: book capacity, volatility gate, z defined,
//! drift gate, then the per-side edge-zone veto and layered z threshold.
//! Long is evaluated before short and at most one ticket opens per bar.

use meanrev_core::{IndicatorConfig, IndicatorRow, MinuteBar, Side, StrategyConfig};

use crate::ticket::TicketBook;

/// A permitted entry: direction plus the new ticket's stacking depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySignal {
    pub side: Side,
    pub layer: u32,
}

/// Decide whether a new ticket may open on this bar.
///
/// Call after exit processing so the book reflects this bar's closures.
/// `pos_pct` is the close's fractional position within the day's range.
pub fn evaluate_entry(
    bar: &MinuteBar,
    row: &IndicatorRow,
    pos_pct: f64,
    book: &TicketBook,
    indicators: &IndicatorConfig,
    strategy: &StrategyConfig,
) -> Option<EntrySignal> {
    if !book.has_capacity() {
        return None;
    }
    if !row.vol_ok(indicators.atr_gate_pips) {
        return None;
    }
    let (z, sma) = match (row.z, row.sma) {
        (Some(z), Some(sma)) => (z, sma),
        _ => return None,
    };

    if (bar.close - sma).abs() / sma < strategy.drift {
        return None;
    }

    // Long first; whichever side triggers, only one ticket opens.
    if z <= -strategy.base_z && pos_pct <= 1.0 - strategy.edge_pct {
        let n = book.count(Side::Long);
        if z.abs() >= strategy.base_z + strategy.step_z * n as f64 {
            return Some(EntrySignal {
                side: Side::Long,
                layer: n as u32 + 1,
            });
        }
    }
    if z >= strategy.base_z && pos_pct >= strategy.edge_pct {
        let n = book.count(Side::Short);
        if z.abs() >= strategy.base_z + strategy.step_z * n as f64 {
            return Some(EntrySignal {
                side: Side::Short,
                layer: n as u32 + 1,
            });
        }
    }
    None
}
