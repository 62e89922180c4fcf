//! Signal-generating strategies and the shared evaluation window.
//!
//! Each strategy turns a bar series into a same-length `Signal` series using
//! only data at or before each bar. Strategies declare a warmup; a comparison
//! across strategies simulates every one of them from the same
//! `EvaluationWindow` so that no strategy trades on bars another could not.

use std::fmt;

use super::error::BacktestError;
use super::indicator::rsi::{calculate_rsi, RsiSmoothing};
use super::indicator::sma::calculate_sma;
use super::ohlcv::PriceBar;
use super::signal::Signal;

pub trait Strategy {
    fn name(&self) -> String;

    /// Leading bars needed before the first meaningful signal.
    fn warmup(&self) -> usize;

    fn generate(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, BacktestError>;
}

fn ensure_history(strategy: &dyn Strategy, bars: &[PriceBar]) -> Result<(), BacktestError> {
    let minimum = strategy.warmup();
    if bars.is_empty() || bars.len() < minimum {
        return Err(BacktestError::InsufficientData {
            strategy: strategy.name(),
            bars: bars.len(),
            minimum: minimum.max(1),
        });
    }
    Ok(())
}

/// Long when yesterday's close beat the close the day before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Momentum;

impl Strategy for Momentum {
    fn name(&self) -> String {
        "Momentum".to_string()
    }

    fn warmup(&self) -> usize {
        2
    }

    fn generate(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, BacktestError> {
        ensure_history(self, bars)?;

        let mut signals = vec![Signal::Flat; bars.len()];
        for i in self.warmup()..bars.len() {
            if bars[i - 1].close > bars[i - 2].close {
                signals[i] = Signal::Long;
            }
        }
        Ok(signals)
    }
}

/// Golden-cross / death-cross of two simple moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaCrossover {
    pub short_window: usize,
    pub long_window: usize,
}

impl Default for MaCrossover {
    fn default() -> Self {
        MaCrossover {
            short_window: 20,
            long_window: 50,
        }
    }
}

impl Strategy for MaCrossover {
    fn name(&self) -> String {
        format!("MA Crossover({},{})", self.short_window, self.long_window)
    }

    fn warmup(&self) -> usize {
        self.short_window.max(self.long_window)
    }

    fn generate(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, BacktestError> {
        ensure_history(self, bars)?;

        let short = calculate_sma(bars, self.short_window);
        let long = calculate_sma(bars, self.long_window);

        let mut signals = vec![Signal::Flat; bars.len()];
        let mut state = Signal::Flat;

        for i in 1..bars.len() {
            if let (Some(s), Some(l), Some(prev_s), Some(prev_l)) =
                (short.get(i), long.get(i), short.get(i - 1), long.get(i - 1))
            {
                if s > l && prev_s <= prev_l {
                    state = Signal::Long;
                } else if s < l && prev_s >= prev_l {
                    state = Signal::Flat;
                }
            }
            signals[i] = state;
        }
        Ok(signals)
    }
}

/// Mean-reversion on RSI: enter when oversold, leave when overbought.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiReversion {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub smoothing: RsiSmoothing,
}

impl Default for RsiReversion {
    fn default() -> Self {
        RsiReversion {
            period: 14,
            oversold: 35.0,
            overbought: 65.0,
            smoothing: RsiSmoothing::Wilder,
        }
    }
}

impl Strategy for RsiReversion {
    fn name(&self) -> String {
        format!("RSI({})", self.period)
    }

    fn warmup(&self) -> usize {
        self.period
    }

    fn generate(&self, bars: &[PriceBar]) -> Result<Vec<Signal>, BacktestError> {
        ensure_history(self, bars)?;

        let rsi = calculate_rsi(bars, self.period, self.smoothing);

        let mut signals = vec![Signal::Flat; bars.len()];
        let mut state = Signal::Flat;

        for (i, signal) in signals.iter_mut().enumerate() {
            if let Some(value) = rsi.get(i) {
                if value < self.oversold {
                    state = Signal::Long;
                } else if value > self.overbought {
                    state = Signal::Flat;
                }
            }
            *signal = state;
        }
        Ok(signals)
    }
}

/// The strategy variants the tool knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Momentum,
    MaCrossover,
    Rsi,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 3] = [
        StrategyKind::Momentum,
        StrategyKind::MaCrossover,
        StrategyKind::Rsi,
    ];

    pub fn build(self, params: &StrategyParams) -> Box<dyn Strategy> {
        match self {
            StrategyKind::Momentum => Box::new(Momentum),
            StrategyKind::MaCrossover => Box::new(params.ma_crossover),
            StrategyKind::Rsi => Box::new(params.rsi),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Momentum => write!(f, "momentum"),
            StrategyKind::MaCrossover => write!(f, "ma-crossover"),
            StrategyKind::Rsi => write!(f, "rsi"),
        }
    }
}

/// Tunable parameters for every strategy variant.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StrategyParams {
    pub ma_crossover: MaCrossover,
    pub rsi: RsiReversion,
}

pub fn build_strategies(kinds: &[StrategyKind], params: &StrategyParams) -> Vec<Box<dyn Strategy>> {
    kinds.iter().map(|k| k.build(params)).collect()
}

/// First bar index at which simulation may act on signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvaluationWindow {
    pub start: usize,
}

impl EvaluationWindow {
    /// Window starting at the longest warmup among `strategies`.
    pub fn aligned(strategies: &[Box<dyn Strategy>]) -> Self {
        EvaluationWindow {
            start: strategies.iter().map(|s| s.warmup()).max().unwrap_or(0),
        }
    }

    pub fn for_strategy(strategy: &dyn Strategy) -> Self {
        EvaluationWindow {
            start: strategy.warmup(),
        }
    }
}
