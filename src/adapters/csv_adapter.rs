//! Flat per-symbol CSV price store.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, header
//! `date,open,high,low,close,volume`. Columns are located by header name
//! (case-insensitive) so files with a different column order load too.
//! Only `date` and `close` are required; missing price columns fall back to
//! the close and a missing volume to zero.

use crate::domain::config_validation::DATE_FORMAT;
use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{validate_bars, PriceBar};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

pub struct CsvAdapter {
    base_path: PathBuf,
}

struct Columns {
    date: usize,
    open: Option<usize>,
    high: Option<usize>,
    low: Option<usize>,
    close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self, BacktestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        Ok(Columns {
            date: find("date").ok_or_else(|| BacktestError::integrity("missing date column"))?,
            open: find("open"),
            high: find("high"),
            low: find("low"),
            close: find("close").ok_or_else(|| BacktestError::integrity("missing close column"))?,
            volume: find("volume"),
        })
    }
}

fn csv_error(e: csv::Error) -> BacktestError {
    BacktestError::Io(std::io::Error::other(e))
}

fn parse_price(record: &StringRecord, idx: usize, field: &str, line: usize) -> Result<f64, BacktestError> {
    let raw = record.get(idx).map(str::trim).unwrap_or("");
    if raw.is_empty() {
        return Err(BacktestError::integrity(format!("line {}: missing {} price", line, field)));
    }
    raw.parse::<f64>()
        .map_err(|e| BacktestError::integrity(format!("line {}: invalid {} value '{}': {}", line, field, raw, e)))
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol.to_uppercase()))
    }

    fn parse_record(record: &StringRecord, cols: &Columns, line: usize) -> Result<PriceBar, BacktestError> {
        let date_str = record.get(cols.date).map(str::trim).unwrap_or("");
        let date = NaiveDate::parse_from_str(date_str, DATE_FORMAT).map_err(|e| {
            BacktestError::integrity(format!("line {}: invalid date '{}': {}", line, date_str, e))
        })?;

        let close = parse_price(record, cols.close, "close", line)?;
        let optional = |idx: Option<usize>, field: &str| match idx {
            Some(i) => parse_price(record, i, field, line),
            None => Ok(close),
        };

        let volume = match cols.volume.and_then(|i| record.get(i)).map(str::trim) {
            Some(raw) if !raw.is_empty() => raw.parse::<f64>().map_err(|e| {
                BacktestError::integrity(format!("line {}: invalid volume value '{}': {}", line, raw, e))
            })? as i64,
            _ => 0,
        };

        Ok(PriceBar {
            date,
            open: optional(cols.open, "open")?,
            high: optional(cols.high, "high")?,
            low: optional(cols.low, "low")?,
            close,
            volume,
        })
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => BacktestError::NoData {
                symbol: symbol.to_uppercase(),
            },
            _ => BacktestError::Io(e),
        })?;
        debug!(path = %path.display(), "reading price file");

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let cols = Columns::from_headers(rdr.headers().map_err(csv_error)?)?;
        let mut bars = Vec::new();

        for (i, result) in rdr.records().enumerate() {
            // Header is line 1.
            let line = i + 2;
            let record = result.map_err(|e| {
                BacktestError::integrity(format!("line {}: CSV parse error: {}", line, e))
            })?;
            let bar = Self::parse_record(&record, &cols, line)?;

            if start_date.is_some_and(|s| bar.date < s) || end_date.is_some_and(|e| bar.date > e) {
                continue;
            }
            bars.push(bar);
        }

        validate_bars(&bars)?;

        if bars.is_empty() {
            return Err(BacktestError::NoData {
                symbol: symbol.to_uppercase(),
            });
        }
        Ok(bars)
    }

    fn save_bars(&self, symbol: &str, bars: &[PriceBar]) -> Result<(), BacktestError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol);

        let mut wtr = csv::Writer::from_path(&path).map_err(csv_error)?;
        wtr.write_record(["date", "open", "high", "low", "close", "volume"])
            .map_err(csv_error)?;
        for bar in bars {
            wtr.write_record([
                bar.date.format(DATE_FORMAT).to_string(),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        debug!(path = %path.display(), bars = bars.len(), "wrote price file");
        Ok(())
    }

    fn list_symbols(&self) -> Result<Vec<String>, BacktestError> {
        let entries = match fs::read_dir(&self.base_path) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut symbols = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().to_string());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        match self.fetch_bars(symbol, None, None) {
            Ok(bars) => {
                let first = bars[0].date;
                let last = bars[bars.len() - 1].date;
                Ok(Some((first, last, bars.len())))
            }
            Err(BacktestError::NoData { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
