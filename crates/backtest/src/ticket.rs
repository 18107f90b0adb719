//! Tickets, closed trades, and the position book.
//!
//! A ticket is one open position, a single layer within a stacked entry.
//! The book owns every open ticket for a run and enforces the combined
//! cap across both sides.

use chrono::NaiveDateTime;
use meanrev_core::{from_pips, to_pips, Error, Result, Side};
use serde::{Deserialize, Serialize};

/// One open position.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    /// Trade direction.
    pub side: Side,
    /// Entry price.
    pub entry_price: f64,
    /// Entry timestamp (session-local).
    pub entry_ts: NaiveDateTime,
    /// 1-based stacking depth among same-direction tickets at creation.
    pub layer: u32,
}

impl Ticket {
    /// Whole minutes the ticket has been held as of `now`.
    pub fn held_minutes(&self, now: NaiveDateTime) -> i64 {
        (now - self.entry_ts).num_minutes()
    }

    /// Hard stop level: entry minus `stop_pips` for longs, plus for shorts.
    pub fn stop_price(&self, stop_pips: f64) -> f64 {
        self.entry_price - self.side.sign() * from_pips(stop_pips)
    }

    /// Signed P&L in pips at the given exit price.
    pub fn pips(&self, exit_price: f64) -> f64 {
        self.side.sign() * to_pips(exit_price - self.entry_price)
    }
}

/// Why a ticket closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExitReason {
    /// Hard stop hit.
    Stop,
    /// Close crossed the rolling mean.
    Mean,
    /// Held for the full time stop.
    Time,
}

/// A closed trade, appended to the ledger in closure order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Realized pips.
    pub pips: f64,
    /// Entry timestamp.
    pub entry_time: NaiveDateTime,
    /// Exit timestamp.
    pub exit_time: NaiveDateTime,
    /// Trade direction.
    pub side: Side,
    /// Why the ticket closed.
    pub exit_reason: ExitReason,
    /// Stacking depth at entry.
    pub layer: u32,
}

/// Cumulative realized pips after a closure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    /// Closure timestamp.
    pub ts: NaiveDateTime,
    /// Cumulative pips over the run so far.
    pub equity: f64,
}

/// A ticket still open when the feed ran out, marked to the last close
/// for display. Never folded into realized statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnrealizedTicket {
    /// Trade direction.
    pub side: Side,
    /// Entry price.
    pub entry_price: f64,
    /// Entry timestamp.
    pub entry_time: NaiveDateTime,
    /// Stacking depth at entry.
    pub layer: u32,
    /// Pips if closed at the feed's final close.
    pub mark_pips: f64,
}

/// Open-ticket book with a combined cap across both sides.
pub struct TicketBook {
    tickets: Vec<Ticket>,
    cap: usize,
}

impl TicketBook {
    /// Create an empty book with the given cap.
    pub fn new(cap: usize) -> Self {
        Self {
            tickets: Vec::with_capacity(cap),
            cap,
        }
    }

    /// Currently open tickets, oldest first.
    pub fn open_tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Number of open tickets, both sides combined.
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Whether the book is empty.
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Whether another ticket may open.
    pub fn has_capacity(&self) -> bool {
        self.tickets.len() < self.cap
    }

    /// Number of open tickets on one side.
    pub fn count(&self, side: Side) -> usize {
        self.tickets.iter().filter(|t| t.side == side).count()
    }

    /// Add a ticket. The caller checks capacity first; a full book is
    /// rejected here as a final guard.
    pub fn add(&mut self, ticket: Ticket) -> Result<()> {
        if !self.has_capacity() {
            return Err(Error::validation(format!(
                "ticket cap {} already reached",
                self.cap
            )));
        }
        self.tickets.push(ticket);
        Ok(())
    }

    /// Keep only tickets for which `keep` returns true, preserving order.
    pub fn retain_open<F: FnMut(&Ticket) -> bool>(&mut self, keep: F) {
        self.tickets.retain(keep);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 3)
            .unwrap()
            .and_hms_opt(7, minute, 0)
            .unwrap()
    }

    fn make_ticket(side: Side, entry_price: f64, layer: u32) -> Ticket {
        Ticket {
            side,
            entry_price,
            entry_ts: ts(0),
            layer,
        }
    }

    #[test]
    fn test_stop_price_both_sides() {
        let long = make_ticket(Side::Long, 0.8500, 1);
        assert_relative_eq!(long.stop_price(10.0), 0.8490, epsilon = 1e-12);

        let short = make_ticket(Side::Short, 0.8500, 1);
        assert_relative_eq!(short.stop_price(10.0), 0.8510, epsilon = 1e-12);
    }

    #[test]
    fn test_pips_signs() {
        let long = make_ticket(Side::Long, 0.8500, 1);
        assert_relative_eq!(long.pips(0.8510), 10.0, epsilon = 1e-9);
        assert_relative_eq!(long.pips(0.8495), -5.0, epsilon = 1e-9);

        let short = make_ticket(Side::Short, 0.8500, 1);
        assert_relative_eq!(short.pips(0.8490), 10.0, epsilon = 1e-9);
        assert_relative_eq!(short.pips(0.8505), -5.0, epsilon = 1e-9);
    }

    #[test]
    fn test_held_minutes() {
        let ticket = make_ticket(Side::Long, 0.8500, 1);
        assert_eq!(ticket.held_minutes(ts(0)), 0);
        assert_eq!(ticket.held_minutes(ts(30)), 30);
    }

    #[test]
    fn test_cap_enforced() {
        let mut book = TicketBook::new(2);
        book.add(make_ticket(Side::Long, 0.85, 1)).unwrap();
        book.add(make_ticket(Side::Short, 0.85, 1)).unwrap();

        assert!(!book.has_capacity());
        assert!(book.add(make_ticket(Side::Long, 0.85, 2)).is_err());
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_count_per_side() {
        let mut book = TicketBook::new(5);
        book.add(make_ticket(Side::Long, 0.85, 1)).unwrap();
        book.add(make_ticket(Side::Long, 0.849, 2)).unwrap();
        book.add(make_ticket(Side::Short, 0.852, 1)).unwrap();

        assert_eq!(book.count(Side::Long), 2);
        assert_eq!(book.count(Side::Short), 1);
    }

    #[test]
    fn test_retain_preserves_order() {
        let mut book = TicketBook::new(5);
        book.add(make_ticket(Side::Long, 0.850, 1)).unwrap();
        book.add(make_ticket(Side::Long, 0.849, 2)).unwrap();
        book.add(make_ticket(Side::Long, 0.848, 3)).unwrap();

        book.retain_open(|t| t.layer != 2);

        let layers: Vec<u32> = book.open_tickets().iter().map(|t| t.layer).collect();
        assert_eq!(layers, vec![1, 3]);
    }
}
