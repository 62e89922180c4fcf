//! Report output port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::BacktestError;

/// Port for writing the trade ledger and equity curves of a run.
pub trait ReportPort {
    fn write_trades(&self, results: &[BacktestResult], output_path: &Path) -> Result<(), BacktestError>;

    fn write_equity(&self, results: &[BacktestResult], output_path: &Path) -> Result<(), BacktestError>;
}
