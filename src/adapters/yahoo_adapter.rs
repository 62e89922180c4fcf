//! Yahoo Finance chart API adapter implementing MarketDataPort.
//!
//! Uses the v8 chart endpoint with `interval=1d`. Rows with a missing close
//! are dropped, missing open/high/low fall back to the close and a missing
//! volume to zero. Timestamps are shifted by the exchange's GMT offset before
//! being truncated to a calendar date.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveTime};
use reqwest::blocking::Client;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::domain::error::BacktestError;
use crate::domain::ohlcv::{validate_bars, PriceBar};
use crate::ports::market_data_port::MarketDataPort;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

fn fetch_error(reason: impl Into<String>) -> BacktestError {
    BacktestError::Fetch {
        reason: reason.into(),
    }
}

fn epoch_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// Decode a chart API body into ascending, de-duplicated daily bars.
pub fn parse_chart(body: &str) -> Result<Vec<PriceBar>, BacktestError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| fetch_error(format!("malformed chart response: {}", e)))?;

    if let Some(error) = response.chart.error {
        return Err(fetch_error(format!("{} - {}", error.code, error.description)));
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| fetch_error("chart response has no result"))?;

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |series: &[Option<f64>], i: usize| series.get(i).copied().flatten();

    let mut bars: Vec<PriceBar> = Vec::with_capacity(data.timestamp.len());
    let mut skipped = 0usize;

    for (i, &ts) in data.timestamp.iter().enumerate() {
        let Some(close) = at(&quote.close, i) else {
            skipped += 1;
            continue;
        };
        let date = DateTime::from_timestamp(ts + data.meta.gmtoffset, 0)
            .ok_or_else(|| fetch_error(format!("timestamp {} out of range", ts)))?
            .date_naive();

        // Intraday refreshes can repeat the latest session.
        if let Some(last) = bars.last_mut() {
            if last.date == date {
                last.close = close;
                last.high = last.high.max(at(&quote.high, i).unwrap_or(close));
                last.low = last.low.min(at(&quote.low, i).unwrap_or(close));
                if let Some(volume) = quote.volume.get(i).copied().flatten() {
                    last.volume = volume as i64;
                }
                continue;
            }
        }

        bars.push(PriceBar {
            date,
            open: at(&quote.open, i).unwrap_or(close),
            high: at(&quote.high, i).unwrap_or(close),
            low: at(&quote.low, i).unwrap_or(close),
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0) as i64,
        });
    }

    if skipped > 0 {
        warn!(skipped, "dropped rows without a close price");
    }

    validate_bars(&bars)?;
    Ok(bars)
}

pub struct YahooAdapter {
    client: Client,
    base_url: String,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, BacktestError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, BacktestError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| fetch_error(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MarketDataPort for YahooAdapter {
    fn download_daily(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        let url = format!("{}/{}", self.base_url, symbol.to_uppercase());
        let period1 = epoch_seconds(start_date).to_string();
        let period2 = epoch_seconds(end_date).to_string();
        debug!(%url, %start_date, %end_date, "requesting daily chart");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("period1", period1.as_str()),
                ("period2", period2.as_str()),
                ("interval", "1d"),
                ("events", "history"),
            ])
            .send()
            .map_err(|e| fetch_error(format!("request for {} failed: {}", symbol, e)))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| fetch_error(format!("reading response for {} failed: {}", symbol, e)))?;

        // Yahoo reports unknown symbols as 404 with a chart.error body.
        if !status.is_success() && !body.contains("\"chart\"") {
            return Err(fetch_error(format!("HTTP {} for {}", status, symbol)));
        }

        let bars: Vec<PriceBar> = parse_chart(&body)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date < end_date)
            .collect();

        info!(symbol = %symbol.to_uppercase(), bars = bars.len(), "downloaded daily bars");
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "AAPL", "gmtoffset": -14400},
                "timestamp": [1704205800, 1704292200, 1704378600, 1704465000],
                "indicators": {
                    "quote": [{
                        "open":   [187.15, 184.22, null, 181.99],
                        "high":   [188.44, 185.88, 183.09, 182.76],
                        "low":    [183.89, 183.43, 180.88, 180.17],
                        "close":  [185.64, 184.25, null, 181.18],
                        "volume": [82488700, 58414500, 71983600, null]
                    }],
                    "adjclose": [{"adjclose": [185.1, 183.7, null, 180.6]}]
                }
            }],
            "error": null
        }
    }"#;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parse_chart_builds_bars() {
        let bars = parse_chart(SAMPLE).unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].date, d(2024, 1, 2));
        assert_eq!(bars[0].open, 187.15);
        assert_eq!(bars[0].close, 185.64);
        assert_eq!(bars[0].volume, 82_488_700);
        assert_eq!(bars[1].date, d(2024, 1, 3));
        // Row without a close is dropped.
        assert_eq!(bars[2].date, d(2024, 1, 5));
        assert_eq!(bars[2].volume, 0);
    }

    #[test]
    fn parse_chart_reports_api_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart(body).unwrap_err();
        assert!(matches!(err, BacktestError::Fetch { ref reason } if reason.contains("delisted")));
    }

    #[test]
    fn parse_chart_rejects_malformed_json() {
        assert!(matches!(parse_chart("<html>"), Err(BacktestError::Fetch { .. })));
    }

    #[test]
    fn parse_chart_empty_result_yields_no_bars() {
        let body = r#"{"chart":{"result":[{"meta":{},"indicators":{"quote":[{}]}}],"error":null}}"#;
        assert!(parse_chart(body).unwrap().is_empty());
    }

    #[test]
    fn parse_chart_merges_repeated_session() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704220000],
            "indicators":{"quote":[{"close":[10.0,10.5]}]}}],"error":null}}"#;
        let bars = parse_chart(body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 10.5);
    }

    #[test]
    fn parse_chart_repeated_session_widens_range() {
        let body = r#"{"chart":{"result":[{"timestamp":[1704205800,1704220000],
            "indicators":{"quote":[{"open":[10.0,10.0],"high":[10.2,11.0],"low":[9.9,9.5],
            "close":[10.1,10.8],"volume":[1000,1500]}]}}],"error":null}}"#;
        let bars = parse_chart(body).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].open, 10.0);
        assert_eq!(bars[0].high, 11.0);
        assert_eq!(bars[0].low, 9.5);
        assert_eq!(bars[0].close, 10.8);
        assert_eq!(bars[0].volume, 1500);
        assert!(bars[0].high >= bars[0].close);
    }

    #[test]
    fn epoch_seconds_is_utc_midnight() {
        assert_eq!(epoch_seconds(d(2024, 1, 2)), 1_704_153_600);
    }
}
