//! Backtest engine for the meanrev-trader system.
//!
//! This crate provides:
//! - The layered ticket book
//! - Exit and entry evaluation
//! - The per-bar simulation loop
//! - Result-bundle metrics

pub mod entry;
pub mod exits;
pub mod metrics;
pub mod simulator;
pub mod ticket;

pub use entry::EntrySignal;
pub use metrics::{build_bundle, ResultBundle};
pub use simulator::{run_backtest, BacktestResult};
pub use ticket::{EquityPoint, ExitReason, Ticket, TicketBook, TradeRecord, UnrealizedTicket};
