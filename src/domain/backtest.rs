//! Backtest engine: one forward pass over the bar series.
//!
//! State machine per run is {Flat, Long}, driven only by the signal series.
//! All fills are at the signal bar's close. No entries are taken on the final
//! bar. With `close_at_end` a position still open on the final bar is closed
//! at that bar's close and flagged as a forced exit.

use tracing::{debug, info};

use super::error::BacktestError;
use super::execution::{enter_long, exit_long, EntryResult, Sizing};
use super::ohlcv::PriceBar;
use super::portfolio::Portfolio;
use super::signal::{signal_counts, Signal};
use super::strategy::{EvaluationWindow, Strategy};

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub sizing: Sizing,
    pub close_at_end: bool,
    pub risk_free_rate: f64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_capital: 10_000.0,
            sizing: Sizing::FullCapital,
            close_at_end: true,
            risk_free_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy: String,
    pub window: EvaluationWindow,
    pub signals: Vec<Signal>,
    pub portfolio: Portfolio,
}

/// Simulate `signals` over `bars`, acting only from `window.start` onward.
pub fn run_backtest(
    bars: &[PriceBar],
    signals: &[Signal],
    config: &BacktestConfig,
    window: EvaluationWindow,
) -> Result<Portfolio, BacktestError> {
    if signals.len() != bars.len() {
        return Err(BacktestError::SignalMismatch {
            signals: signals.len(),
            bars: bars.len(),
        });
    }
    if bars.len() <= window.start {
        return Err(BacktestError::InsufficientData {
            strategy: "simulation".to_string(),
            bars: bars.len(),
            minimum: window.start + 1,
        });
    }

    let mut portfolio = Portfolio::new(config.initial_capital);
    let last = bars.len() - 1;

    for (i, bar) in bars.iter().enumerate() {
        if i >= window.start {
            match (signals[i], portfolio.is_long()) {
                (Signal::Long, false) if i < last => {
                    match enter_long(&mut portfolio, i, bar.date, bar.close, config.sizing) {
                        EntryResult::Entered { quantity, .. } => {
                            debug!(index = i, date = %bar.date, price = bar.close, quantity, "open long");
                        }
                        EntryResult::InsufficientCapital => {
                            debug!(index = i, date = %bar.date, price = bar.close, "entry skipped: insufficient capital");
                        }
                        EntryResult::AlreadyLong => {}
                    }
                }
                (Signal::Flat, true) => {
                    if let Some(trade) = exit_long(&mut portfolio, bar.date, bar.close, false) {
                        debug!(index = i, date = %bar.date, price = bar.close, pnl = trade.pnl, "close long");
                    }
                }
                _ => {}
            }
        }

        if i == last && config.close_at_end && portfolio.is_long() {
            if let Some(trade) = exit_long(&mut portfolio, bar.date, bar.close, true) {
                debug!(date = %bar.date, price = bar.close, pnl = trade.pnl, "forced close at end of data");
            }
        }

        let equity = portfolio.total_equity(bar.close);
        portfolio.record_equity(bar.date, equity);
    }

    Ok(portfolio)
}

/// Generate signals for `strategy` and simulate them over `window`.
pub fn run_strategy(
    bars: &[PriceBar],
    strategy: &dyn Strategy,
    config: &BacktestConfig,
    window: EvaluationWindow,
) -> Result<BacktestResult, BacktestError> {
    let signals = strategy.generate(bars)?;
    let (long, flat) = signal_counts(&signals);
    info!(
        strategy = %strategy.name(),
        long,
        flat,
        start = window.start,
        "signals generated"
    );

    let portfolio = run_backtest(bars, &signals, config, window)?;
    Ok(BacktestResult {
        strategy: strategy.name(),
        window,
        signals,
        portfolio,
    })
}

/// Run every strategy from one shared window: the longest warmup among them.
pub fn run_comparison(
    bars: &[PriceBar],
    strategies: &[Box<dyn Strategy>],
    config: &BacktestConfig,
) -> Result<Vec<BacktestResult>, BacktestError> {
    let window = EvaluationWindow::aligned(strategies);
    strategies
        .iter()
        .map(|s| run_strategy(bars, s.as_ref(), config, window))
        .collect()
}
