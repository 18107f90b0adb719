//! Exit evaluation for open tickets.

use meanrev_core::{MinuteBar, Side, StrategyConfig};

use crate::ticket::{ExitReason, Ticket};

/// Decide whether a ticket closes on this bar.
///
/// Rules run in strict precedence: hard stop, mean cross, time stop. The
/// first match wins, so a ticket never reports more than one reason per
/// bar. Returns the exit price and reason, or `None` if the ticket stays
/// open.
///
/// The mean cross needs `sma`; during a strict warm-up it is skipped
/// while stop and time still apply.
pub fn evaluate_exit(
    ticket: &Ticket,
    bar: &MinuteBar,
    sma: Option<f64>,
    strategy: &StrategyConfig,
) -> Option<(f64, ExitReason)> {
    let stop = ticket.stop_price(strategy.stop_pips);
    let stopped = match ticket.side {
        Side::Long => bar.low <= stop,
        Side::Short => bar.high >= stop,
    };
    if stopped {
        return Some((stop, ExitReason::Stop));
    }

    if let Some(mean) = sma {
        let crossed = match ticket.side {
            Side::Long => bar.close >= mean,
            Side::Short => bar.close <= mean,
        };
        if crossed {
            return Some((bar.close, ExitReason::Mean));
        }
    }

    if ticket.held_minutes(bar.ts) >= strategy.time_min {
        return Some((bar.close, ExitReason::Time));
    }

    None
}
