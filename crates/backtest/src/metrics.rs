//! Result-bundle assembly.
//!
//! A pure function of the finished ledger, equity trace, and parameter
//! set. Everything downstream (dashboards, audit tools, chart renderers)
//! consumes this bundle; unrealized tickets are listed but excluded from
//! every statistic.

use meanrev_core::StrategyConfig;
use serde::Serialize;
use statrs::statistics::Statistics;

use crate::simulator::BacktestResult;
use crate::ticket::{EquityPoint, ExitReason, TradeRecord, UnrealizedTicket};

/// Canonical backtest summary.
///
/// `None` marks a statistic that is undefined for the ledger (no trades,
/// no losses, zero variance) rather than zero.
#[derive(Debug, Clone, Serialize)]
pub struct ResultBundle {
    /// Parameter set the run used.
    pub params: StrategyConfig,
    /// Closed-trade count.
    pub trades: usize,
    /// Percentage of closed trades with positive pips.
    pub win_pct: Option<f64>,
    /// Mean pips per trade.
    pub expect_pips: Option<f64>,
    /// Sum of pips over all closed trades.
    pub total_pips: f64,
    /// Mean pips over winning trades.
    pub avg_win_pips: Option<f64>,
    /// Mean pips over losing trades (negative).
    pub avg_loss_pips: Option<f64>,
    /// Gross wins over gross losses; `None` without losses.
    pub profit_factor: Option<f64>,
    /// Mean over standard deviation of per-trade pips.
    pub sharpe: Option<f64>,
    /// Deepest peak-to-trough fall of cumulative pips.
    pub max_dd_pips: Option<f64>,
    /// Hard-stop exits.
    pub stop_hits: usize,
    pub stop_hit_pct: Option<f64>,
    /// Mean-cross exits.
    pub mean_hits: usize,
    pub mean_hit_pct: Option<f64>,
    /// Time-stop exits.
    pub time_hits: usize,
    pub time_hit_pct: Option<f64>,
    /// Mean holding time in minutes.
    pub avg_trade_len_min: Option<f64>,
    /// Trades entered while at least one other ticket was already open.
    pub sim_trades_gt1: usize,
    /// Peak simultaneously-open tickets observed at any entry.
    pub max_sim_trades: usize,
    /// Longest run of consecutive wins.
    pub win_streak_max: u32,
    /// Longest run of consecutive losses.
    pub loss_streak_max: u32,
    /// Cumulative-pips trace, one point per closure.
    pub equity_curve: Vec<EquityPoint>,
    /// Tickets open at feed end, marked to the last close.
    pub unrealized: Vec<UnrealizedTicket>,
    /// The full closed-trade ledger.
    pub trade_log: Vec<TradeRecord>,
}

/// Build the result bundle from a finished run.
pub fn build_bundle(result: &BacktestResult, params: &StrategyConfig) -> ResultBundle {
    let trades = &result.trades;
    let n = trades.len();

    let pips: Vec<f64> = trades.iter().map(|t| t.pips).collect();
    let wins: Vec<f64> = pips.iter().copied().filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = pips.iter().copied().filter(|p| *p < 0.0).collect();

    let total_pips: f64 = pips.iter().sum();
    let gross_wins: f64 = wins.iter().sum();
    let gross_losses: f64 = -losses.iter().sum::<f64>();

    let sharpe = if n >= 2 {
        let std = pips.iter().std_dev();
        (std > 0.0).then(|| pips.iter().mean() / std)
    } else {
        None
    };

    let max_dd_pips = (!result.equity.is_empty()).then(|| {
        let mut peak = f64::NEG_INFINITY;
        let mut dd = 0.0f64;
        for point in &result.equity {
            peak = peak.max(point.equity);
            dd = dd.max(peak - point.equity);
        }
        dd
    });

    let (win_streak_max, loss_streak_max) = streaks(&pips);
    let (sim_trades_gt1, max_sim_trades) = simultaneous(trades);

    let reason_count =
        |reason: ExitReason| trades.iter().filter(|t| t.exit_reason == reason).count();
    let reason_pct = |hits: usize| (n > 0).then(|| hits as f64 / n as f64 * 100.0);

    let stop_hits = reason_count(ExitReason::Stop);
    let mean_hits = reason_count(ExitReason::Mean);
    let time_hits = reason_count(ExitReason::Time);

    ResultBundle {
        params: params.clone(),
        trades: n,
        win_pct: (n > 0).then(|| wins.len() as f64 / n as f64 * 100.0),
        expect_pips: (n > 0).then(|| pips.iter().mean()),
        total_pips,
        avg_win_pips: (!wins.is_empty()).then(|| wins.iter().mean()),
        avg_loss_pips: (!losses.is_empty()).then(|| losses.iter().mean()),
        profit_factor: (gross_losses > 0.0).then(|| gross_wins / gross_losses),
        sharpe,
        max_dd_pips,
        stop_hits,
        stop_hit_pct: reason_pct(stop_hits),
        mean_hits,
        mean_hit_pct: reason_pct(mean_hits),
        time_hits,
        time_hit_pct: reason_pct(time_hits),
        avg_trade_len_min: (n > 0).then(|| {
            trades
                .iter()
                .map(|t| (t.exit_time - t.entry_time).num_minutes() as f64)
                .sum::<f64>()
                / n as f64
        }),
        sim_trades_gt1,
        max_sim_trades,
        win_streak_max,
        loss_streak_max,
        equity_curve: result.equity.clone(),
        unrealized: result.unrealized.clone(),
        trade_log: trades.clone(),
    }
}

/// Longest win and loss runs over the ledger in closure order.
fn streaks(pips: &[f64]) -> (u32, u32) {
    let mut best_win = 0i32;
    let mut best_loss = 0i32;
    let mut current = 0i32;
    for p in pips {
        if *p > 0.0 {
            current = current.max(0) + 1;
        } else if *p < 0.0 {
            current = current.min(0) - 1;
        } else {
            current = 0;
        }
        best_win = best_win.max(current);
        best_loss = best_loss.min(current);
    }
    (best_win.max(0) as u32, best_loss.unsigned_abs())
}

/// For each trade, how many tickets (itself included) were open at its
/// entry moment. Returns the count of entries with company and the peak.
fn simultaneous(trades: &[TradeRecord]) -> (usize, usize) {
    let mut gt1 = 0;
    let mut max_open = 0;
    for trade in trades {
        let open = trades
            .iter()
            .filter(|o| o.entry_time <= trade.entry_time && trade.entry_time < o.exit_time)
            .count();
        if open > 1 {
            gt1 += 1;
        }
        max_open = max_open.max(open);
    }
    (gt1, max_open)
}
