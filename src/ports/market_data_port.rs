//! Remote market data port trait.

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::PriceBar;
use chrono::NaiveDate;

pub trait MarketDataPort {
    /// Daily bars for `symbol` between `start_date` (inclusive) and
    /// `end_date` (exclusive).
    fn download_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, BacktestError>;
}
