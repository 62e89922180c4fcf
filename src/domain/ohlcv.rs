//! Daily price bar representation and ingestion checks.

use chrono::NaiveDate;

use super::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl PriceBar {
    /// Bar with all prices set to `close`.
    pub fn flat(date: NaiveDate, close: f64) -> Self {
        PriceBar {
            date,
            open: close,
            high: close,
            low: close,
            close,
            volume: 0,
        }
    }
}

/// Reject bars whose dates are not strictly ascending or whose close is
/// not a positive finite number.
pub fn validate_bars(bars: &[PriceBar]) -> Result<(), BacktestError> {
    for (i, bar) in bars.iter().enumerate() {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            return Err(BacktestError::integrity(format!(
                "bar {} ({}) has invalid close price {}",
                i, bar.date, bar.close
            )));
        }
        if i > 0 && bar.date <= bars[i - 1].date {
            return Err(BacktestError::integrity(format!(
                "dates not strictly ascending at bar {}: {} follows {}",
                i,
                bar.date,
                bars[i - 1].date
            )));
        }
    }
    Ok(())
}
