//! Configuration validation.
//!
//! Every key is optional; present keys must parse and satisfy their range.
//! Runs before any price data is loaded.

use chrono::NaiveDate;

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::BacktestError;
use crate::domain::indicator::rsi::RsiSmoothing;
use crate::domain::strategy::{MaCrossover, RsiReversion};
use crate::ports::config_port::ConfigPort;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_backtest_section(config)?;
    validate_ma_crossover_section(config)?;
    validate_rsi_section(config)?;
    validate_fetch_section(config)?;
    Ok(())
}

fn parse_number(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, BacktestError> {
    match config.get_string(section, key) {
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| BacktestError::invalid(section, key, format!("'{}' is not a number", raw))),
        None => Ok(None),
    }
}

fn parse_count(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<i64>, BacktestError> {
    match config.get_string(section, key) {
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| BacktestError::invalid(section, key, format!("'{}' is not an integer", raw))),
        None => Ok(None),
    }
}

fn check_bool(config: &dyn ConfigPort, section: &str, key: &str) -> Result<(), BacktestError> {
    if let Some(raw) = config.get_string(section, key) {
        let ok = matches!(
            raw.trim().to_lowercase().as_str(),
            "true" | "yes" | "1" | "false" | "no" | "0"
        );
        if !ok {
            return Err(BacktestError::invalid(section, key, format!("'{}' is not a boolean", raw)));
        }
    }
    Ok(())
}

pub fn parse_date(value: &str, section: &str, key: &str) -> Result<NaiveDate, BacktestError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| BacktestError::invalid(section, key, "invalid date format (expected YYYY-MM-DD)"))
}

fn validate_backtest_section(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let defaults = BacktestConfig::default();

    let capital = parse_number(config, "backtest", "initial_capital")?.unwrap_or(defaults.initial_capital);
    if capital <= 0.0 || !capital.is_finite() {
        return Err(BacktestError::invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let rf = parse_number(config, "backtest", "risk_free_rate")?.unwrap_or(defaults.risk_free_rate);
    if !(0.0..1.0).contains(&rf) {
        return Err(BacktestError::invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    check_bool(config, "backtest", "whole_shares")?;
    check_bool(config, "backtest", "close_at_end")?;
    Ok(())
}

fn validate_ma_crossover_section(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let defaults = MaCrossover::default();

    let short = parse_count(config, "ma_crossover", "short_window")?.unwrap_or(defaults.short_window as i64);
    if short <= 0 {
        return Err(BacktestError::invalid(
            "ma_crossover",
            "short_window",
            "short_window must be positive",
        ));
    }

    let long = parse_count(config, "ma_crossover", "long_window")?.unwrap_or(defaults.long_window as i64);
    if long <= 0 {
        return Err(BacktestError::invalid(
            "ma_crossover",
            "long_window",
            "long_window must be positive",
        ));
    }

    if short >= long {
        return Err(BacktestError::invalid(
            "ma_crossover",
            "short_window",
            "short_window must be less than long_window",
        ));
    }
    Ok(())
}

fn validate_rsi_section(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let defaults = RsiReversion::default();

    let period = parse_count(config, "rsi", "period")?.unwrap_or(defaults.period as i64);
    if period <= 0 {
        return Err(BacktestError::invalid("rsi", "period", "period must be positive"));
    }

    let oversold = parse_number(config, "rsi", "oversold")?.unwrap_or(defaults.oversold);
    let overbought = parse_number(config, "rsi", "overbought")?.unwrap_or(defaults.overbought);
    if !(0.0..=100.0).contains(&oversold) {
        return Err(BacktestError::invalid("rsi", "oversold", "oversold must be within 0..=100"));
    }
    if !(0.0..=100.0).contains(&overbought) {
        return Err(BacktestError::invalid("rsi", "overbought", "overbought must be within 0..=100"));
    }
    if oversold >= overbought {
        return Err(BacktestError::invalid(
            "rsi",
            "oversold",
            "oversold must be below overbought",
        ));
    }

    if let Some(raw) = config.get_string("rsi", "smoothing") {
        raw.parse::<RsiSmoothing>()
            .map_err(|e| BacktestError::invalid("rsi", "smoothing", e))?;
    }
    Ok(())
}

fn validate_fetch_section(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(days) = parse_count(config, "fetch", "lookback_days")? {
        if days <= 0 {
            return Err(BacktestError::invalid(
                "fetch",
                "lookback_days",
                "lookback_days must be positive",
            ));
        }
    }

    let start = config
        .get_string("fetch", "start_date")
        .map(|s| parse_date(&s, "fetch", "start_date"))
        .transpose()?;
    let end = config
        .get_string("fetch", "end_date")
        .map(|s| parse_date(&s, "fetch", "end_date"))
        .transpose()?;

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(BacktestError::invalid(
                "fetch",
                "start_date",
                "start_date must be before end_date",
            ));
        }
    }
    Ok(())
}
