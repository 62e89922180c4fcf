//! Domain error types.

/// Top-level error type for dailybt.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no price data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {strategy}: have {bars} bars, need {minimum}")]
    InsufficientData {
        strategy: String,
        bars: usize,
        minimum: usize,
    },

    #[error("data integrity error: {reason}")]
    DataIntegrity { reason: String },

    #[error("signal series has {signals} entries but price series has {bars} bars")]
    SignalMismatch { signals: usize, bars: usize },

    #[error("market data fetch failed: {reason}")]
    Fetch { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    pub fn integrity(reason: impl Into<String>) -> Self {
        BacktestError::DataIntegrity {
            reason: reason.into(),
        }
    }

    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        BacktestError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::Fetch { .. } => 3,
            BacktestError::SignalMismatch { .. } => 4,
            BacktestError::NoData { .. }
            | BacktestError::InsufficientData { .. }
            | BacktestError::DataIntegrity { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
