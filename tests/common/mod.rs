#![allow(dead_code)]

use chrono::NaiveDate;
use dailybt::domain::backtest::BacktestResult;
use dailybt::domain::error::BacktestError;
pub use dailybt::domain::ohlcv::PriceBar;
use dailybt::ports::data_port::DataPort;
use dailybt::ports::market_data_port::MarketDataPort;
use dailybt::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub struct MockDataPort {
    pub data: RefCell<HashMap<String, Vec<PriceBar>>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: RefCell::new(HashMap::new()),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(self, symbol: &str, bars: Vec<PriceBar>) -> Self {
        self.data.borrow_mut().insert(symbol.to_uppercase(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_uppercase(), reason.to_string());
        self
    }

    pub fn stored(&self, symbol: &str) -> Option<Vec<PriceBar>> {
        self.data.borrow().get(&symbol.to_uppercase()).cloned()
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        let key = symbol.to_uppercase();
        if let Some(reason) = self.errors.get(&key) {
            return Err(BacktestError::integrity(reason.clone()));
        }
        let bars: Vec<PriceBar> = self
            .data
            .borrow()
            .get(&key)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|b| start_date.is_none_or(|s| b.date >= s) && end_date.is_none_or(|e| b.date <= e))
            .collect();
        if bars.is_empty() {
            return Err(BacktestError::NoData { symbol: key });
        }
        Ok(bars)
    }

    fn save_bars(&self, symbol: &str, bars: &[PriceBar]) -> Result<(), BacktestError> {
        self.data
            .borrow_mut()
            .insert(symbol.to_uppercase(), bars.to_vec());
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let mut symbols: Vec<String> = self.data.borrow().keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        match self.data.borrow().get(&symbol.to_uppercase()) {
            Some(bars) if !bars.is_empty() => Ok(Some((
                bars[0].date,
                bars[bars.len() - 1].date,
                bars.len(),
            ))),
            _ => Ok(None),
        }
    }
}

/// Serves canned bars, or a fetch error when none are configured.
pub struct MockMarketData {
    pub bars: Vec<PriceBar>,
    pub requests: RefCell<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl MockMarketData {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self {
            bars,
            requests: RefCell::new(Vec::new()),
        }
    }
}

impl MarketDataPort for MockMarketData {
    fn download_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        self.requests
            .borrow_mut()
            .push((symbol.to_string(), start_date, end_date));
        if symbol == "FAIL" {
            return Err(BacktestError::Fetch {
                reason: "Not Found - symbol may be delisted".to_string(),
            });
        }
        Ok(self
            .bars
            .iter()
            .filter(|b| b.date >= start_date && b.date < end_date)
            .cloned()
            .collect())
    }
}

/// Records which results and paths the pipeline hands over.
pub struct MockReportPort {
    pub trades_calls: RefCell<Vec<(Vec<String>, PathBuf)>>,
    pub equity_calls: RefCell<Vec<(Vec<String>, PathBuf)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            trades_calls: RefCell::new(Vec::new()),
            equity_calls: RefCell::new(Vec::new()),
        }
    }
}

fn strategy_names(results: &[BacktestResult]) -> Vec<String> {
    results.iter().map(|r| r.strategy.clone()).collect()
}

impl ReportPort for MockReportPort {
    fn write_trades(&self, results: &[BacktestResult], output_path: &Path) -> Result<(), BacktestError> {
        self.trades_calls
            .borrow_mut()
            .push((strategy_names(results), output_path.to_path_buf()));
        Ok(())
    }

    fn write_equity(&self, results: &[BacktestResult], output_path: &Path) -> Result<(), BacktestError> {
        self.equity_calls
            .borrow_mut()
            .push((strategy_names(results), output_path.to_path_buf()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> PriceBar {
    PriceBar {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        open: close - 1.0,
        high: close + 1.0,
        low: close - 2.0,
        close,
        volume: 1000,
    }
}

/// Consecutive calendar days from 2024-01-01 with the given closes.
pub fn bars_from_closes(closes: &[f64]) -> Vec<PriceBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar {
            date: start + chrono::Duration::days(i as i64),
            open: c,
            high: c,
            low: c,
            close: c,
            volume: 1000,
        })
        .collect()
}

pub fn constant_bars(count: usize, price: f64) -> Vec<PriceBar> {
    bars_from_closes(&vec![price; count])
}

/// Closes rising by one per bar from `start_price`.
pub fn rising_bars(count: usize, start_price: f64) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count).map(|i| start_price + i as f64).collect();
    bars_from_closes(&closes)
}

/// A first bar that closes below its open, then `up_days` strictly rising closes.
pub fn down_day_then_rising(up_days: usize) -> Vec<PriceBar> {
    let mut bars = rising_bars(up_days + 1, 100.0);
    bars[0].open = 101.0;
    bars[0].high = 101.0;
    bars
}

/// Deterministic oscillating series with an upward drift.
pub fn wavy_bars(count: usize) -> Vec<PriceBar> {
    let closes: Vec<f64> = (0..count)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.2 * t + 8.0 * (t / 6.0).sin()
        })
        .collect();
    bars_from_closes(&closes)
}
