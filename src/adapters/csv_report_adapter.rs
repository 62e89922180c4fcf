//! CSV report adapter implementing ReportPort.
//!
//! Trades file: one row per closed trade, tagged with its strategy.
//! Equity file: one row per bar, one equity column per strategy. All results
//! of a run share the same bar series, so the first curve supplies the dates.

use std::fs;
use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::config_validation::DATE_FORMAT;
use crate::domain::error::BacktestError;
use crate::ports::report_port::ReportPort;
use tracing::info;

#[derive(Debug, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        CsvReportAdapter
    }
}

fn csv_error(e: csv::Error) -> BacktestError {
    BacktestError::Io(std::io::Error::other(e))
}

fn create_writer(output_path: &Path) -> Result<csv::Writer<fs::File>, BacktestError> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    csv::Writer::from_path(output_path).map_err(csv_error)
}

impl ReportPort for CsvReportAdapter {
    fn write_trades(&self, results: &[BacktestResult], output_path: &Path) -> Result<(), BacktestError> {
        let mut wtr = create_writer(output_path)?;
        wtr.write_record([
            "strategy",
            "entry_date",
            "entry_price",
            "exit_date",
            "exit_price",
            "quantity",
            "pnl",
            "return_pct",
            "holding_days",
            "forced_exit",
        ])
        .map_err(csv_error)?;

        let mut rows = 0usize;
        for result in results {
            for trade in &result.portfolio.closed_trades {
                wtr.write_record([
                    result.strategy.clone(),
                    trade.entry_date.format(DATE_FORMAT).to_string(),
                    format!("{:.4}", trade.entry_price),
                    trade.exit_date.format(DATE_FORMAT).to_string(),
                    format!("{:.4}", trade.exit_price),
                    format!("{:.6}", trade.quantity),
                    format!("{:.2}", trade.pnl),
                    format!("{:.6}", trade.return_pct()),
                    trade.holding_days().to_string(),
                    trade.forced_exit.to_string(),
                ])
                .map_err(csv_error)?;
                rows += 1;
            }
        }
        wtr.flush()?;

        info!(path = %output_path.display(), rows, "wrote trade ledger");
        Ok(())
    }

    fn write_equity(&self, results: &[BacktestResult], output_path: &Path) -> Result<(), BacktestError> {
        let mut wtr = create_writer(output_path)?;

        let mut header = vec!["date".to_string()];
        header.extend(results.iter().map(|r| r.strategy.clone()));
        wtr.write_record(&header).map_err(csv_error)?;

        let Some(first) = results.first() else {
            wtr.flush()?;
            return Ok(());
        };

        for (i, point) in first.portfolio.equity_curve.iter().enumerate() {
            let mut row = vec![point.date.format(DATE_FORMAT).to_string()];
            for result in results {
                let value = result
                    .portfolio
                    .equity_curve
                    .get(i)
                    .map(|p| format!("{:.2}", p.equity))
                    .unwrap_or_default();
                row.push(value);
            }
            wtr.write_record(&row).map_err(csv_error)?;
        }
        wtr.flush()?;

        info!(
            path = %output_path.display(),
            rows = first.portfolio.equity_curve.len(),
            "wrote equity curves"
        );
        Ok(())
    }
}
