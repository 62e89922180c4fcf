//! Stored price data port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol`, ascending by date, optionally limited to
    /// `start..=end`. A missing or empty series is `NoData`.
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, BacktestError>;

    /// Replace the stored series for `symbol`.
    fn save_bars(&self, symbol: &str, bars: &[PriceBar]) -> Result<(), BacktestError>;

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError>;

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError>;
}
