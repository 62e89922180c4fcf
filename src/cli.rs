//! CLI definition and dispatch.

use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::backtest::{run_comparison, BacktestConfig, BacktestResult};
use crate::domain::config_validation::{parse_date, validate_config};
use crate::domain::error::BacktestError;
use crate::domain::execution::Sizing;
use crate::domain::indicator::rsi::RsiSmoothing;
use crate::domain::metrics::MetricsReport;
use crate::domain::strategy::{build_strategies, MaCrossover, RsiReversion, StrategyKind, StrategyParams};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::market_data_port::MarketDataPort;
use crate::ports::report_port::ReportPort;

pub const DEFAULT_DATA_DIR: &str = "data/raw";
pub const DEFAULT_LOOKBACK_DAYS: i64 = 365;

#[derive(Parser, Debug)]
#[command(name = "dailybt", about = "Daily-bar single-ticker strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download daily bars and store them as CSV
    Fetch {
        #[arg(short, long)]
        symbol: String,
        /// First date to download (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,
        /// Day after the last date to download (YYYY-MM-DD, exclusive)
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run strategies over stored bars and compare them
    Backtest {
        #[arg(short, long)]
        symbol: String,
        #[arg(long, value_enum, default_value_t = StrategyChoice::All)]
        strategy: StrategyChoice,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
        /// Write the trade ledger as CSV
        #[arg(long)]
        trades_out: Option<PathBuf>,
        /// Write the equity curves as CSV
        #[arg(long)]
        equity_out: Option<PathBuf>,
    },
    /// List stored symbols
    List {
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Show bar count and date range for a stored symbol
    Info {
        #[arg(short, long)]
        symbol: String,
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyChoice {
    Momentum,
    MaCrossover,
    Rsi,
    All,
}

impl StrategyChoice {
    pub fn kinds(self) -> Vec<StrategyKind> {
        match self {
            StrategyChoice::Momentum => vec![StrategyKind::Momentum],
            StrategyChoice::MaCrossover => vec![StrategyKind::MaCrossover],
            StrategyChoice::Rsi => vec![StrategyKind::Rsi],
            StrategyChoice::All => StrategyKind::ALL.to_vec(),
        }
    }
}

/// One strategy's simulation together with its computed metrics.
#[derive(Debug, Clone)]
pub struct StrategyReport {
    pub result: BacktestResult,
    pub metrics: MetricsReport,
}

pub fn run(cli: Cli) -> ExitCode {
    let outcome = match cli.command {
        Command::Fetch {
            symbol,
            start,
            end,
            data_dir,
            config,
        } => run_fetch(&symbol, start, end, data_dir.as_deref(), config.as_deref()),
        Command::Backtest {
            symbol,
            strategy,
            config,
            data_dir,
            trades_out,
            equity_out,
        } => run_backtest(
            &symbol,
            strategy,
            config.as_deref(),
            data_dir.as_deref(),
            trades_out.as_deref(),
            equity_out.as_deref(),
        ),
        Command::List { data_dir } => run_list(data_dir.as_deref()),
        Command::Info { symbol, data_dir } => run_info(&symbol, data_dir.as_deref()),
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load and validate the config file, or fall back to built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<FileConfigAdapter, BacktestError> {
    let adapter = match path {
        Some(p) => {
            info!(path = %p.display(), "loading config");
            FileConfigAdapter::from_file(p)?
        }
        None => FileConfigAdapter::empty(),
    };
    validate_config(&adapter)?;
    Ok(adapter)
}

/// `--data-dir` flag, then `[data] dir`, then the default.
pub fn resolve_data_dir(flag: Option<&Path>, config: &dyn ConfigPort) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.get_string("data", "dir").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> BacktestConfig {
    let defaults = BacktestConfig::default();
    let sizing = if adapter.get_bool("backtest", "whole_shares", false) {
        Sizing::WholeShares
    } else {
        Sizing::FullCapital
    };

    BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", defaults.initial_capital),
        sizing,
        close_at_end: adapter.get_bool("backtest", "close_at_end", defaults.close_at_end),
        risk_free_rate: adapter.get_double("backtest", "risk_free_rate", defaults.risk_free_rate),
    }
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> Result<StrategyParams, BacktestError> {
    let ma = MaCrossover::default();
    let rsi = RsiReversion::default();

    let smoothing = match adapter.get_string("rsi", "smoothing") {
        Some(raw) => raw
            .parse::<RsiSmoothing>()
            .map_err(|e| BacktestError::invalid("rsi", "smoothing", e))?,
        None => rsi.smoothing,
    };

    Ok(StrategyParams {
        ma_crossover: MaCrossover {
            short_window: adapter.get_usize("ma_crossover", "short_window", ma.short_window),
            long_window: adapter.get_usize("ma_crossover", "long_window", ma.long_window),
        },
        rsi: RsiReversion {
            period: adapter.get_usize("rsi", "period", rsi.period),
            oversold: adapter.get_double("rsi", "oversold", rsi.oversold),
            overbought: adapter.get_double("rsi", "overbought", rsi.overbought),
            smoothing,
        },
    })
}

/// Download range: explicit flags, then `[fetch]` dates, then the last
/// `lookback_days` days ending `today`. The end is exclusive.
pub fn resolve_fetch_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), BacktestError> {
    let config_date = |key: &str| {
        config
            .get_string("fetch", key)
            .map(|s| parse_date(&s, "fetch", key))
            .transpose()
    };

    let end = match end {
        Some(d) => d,
        None => config_date("end_date")?.unwrap_or(today),
    };
    let start = match start {
        Some(d) => d,
        None => match config_date("start_date")? {
            Some(d) => d,
            None => {
                let days = config.get_int("fetch", "lookback_days", DEFAULT_LOOKBACK_DAYS);
                Duration::try_days(days)
                    .and_then(|span| end.checked_sub_signed(span))
                    .ok_or_else(|| {
                        BacktestError::invalid(
                            "fetch",
                            "lookback_days",
                            format!("lookback of {} days from {} is out of range", days, end),
                        )
                    })?
            }
        },
    };

    if start >= end {
        return Err(BacktestError::invalid(
            "fetch",
            "start_date",
            format!("start {} must be before end {}", start, end),
        ));
    }
    Ok((start, end))
}

/// Download `[start, end)` for `symbol` and store it. Returns the bar count.
pub fn run_fetch_pipeline(
    market: &dyn MarketDataPort,
    store: &dyn DataPort,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<usize, BacktestError> {
    info!(%symbol, %start, %end, "fetching daily bars");
    let bars = market.download_daily(symbol, start, end)?;
    if bars.is_empty() {
        return Err(BacktestError::NoData {
            symbol: symbol.to_uppercase(),
        });
    }
    store.save_bars(symbol, &bars)?;
    info!(%symbol, bars = bars.len(), "stored daily bars");
    Ok(bars.len())
}

/// Load stored bars, simulate every strategy from the aligned window and
/// compute metrics. Optional ledger and equity files go through `report`.
#[allow(clippy::too_many_arguments)]
pub fn run_backtest_pipeline(
    data_port: &dyn DataPort,
    report: &dyn ReportPort,
    symbol: &str,
    kinds: &[StrategyKind],
    params: &StrategyParams,
    bt_config: &BacktestConfig,
    trades_out: Option<&Path>,
    equity_out: Option<&Path>,
) -> Result<Vec<StrategyReport>, BacktestError> {
    let bars = data_port.fetch_bars(symbol, None, None)?;
    let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
        return Err(BacktestError::NoData {
            symbol: symbol.to_uppercase(),
        });
    };
    info!(%symbol, bars = bars.len(), first = %first.date, last = %last.date, "loaded price data");

    let strategies = build_strategies(kinds, params);
    let results = run_comparison(&bars, &strategies, bt_config)?;

    if let Some(path) = trades_out {
        report.write_trades(&results, path)?;
    }
    if let Some(path) = equity_out {
        report.write_equity(&results, path)?;
    }

    Ok(results
        .into_iter()
        .map(|result| {
            let metrics = MetricsReport::compute(&result.portfolio, bt_config.risk_free_rate);
            if metrics.trade_count == 0 {
                warn!(strategy = %result.strategy, "no trades taken");
            }
            StrategyReport { result, metrics }
        })
        .collect())
}

pub fn format_report(report: &StrategyReport) -> String {
    let m = &report.metrics;
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", report.result.strategy);
    let _ = writeln!(out, "Evaluation Start: bar {}", report.result.window.start);
    let _ = writeln!(out, "Initial Capital:  {:.2}", m.initial_capital);
    let _ = writeln!(out, "Final Equity:     {:.2}", m.final_equity);
    let _ = writeln!(out, "Profit/Loss:      {:.2}", m.profit_loss);
    let _ = writeln!(out, "Total Return:     {:.2}%", m.total_return * 100.0);
    let _ = writeln!(out, "Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    let _ = writeln!(out, "Max Drawdown:     {:.2}%", m.max_drawdown * 100.0);
    let _ = writeln!(out, "Win Rate:         {:.1}%", m.win_rate * 100.0);
    let _ = writeln!(out, "Avg Trade Return: {:.2}%", m.avg_trade_return * 100.0);
    let _ = writeln!(out, "Total Trades:     {}", m.trade_count);
    if m.open_position {
        let _ = writeln!(out, "Open Position:    yes (valued at final close)");
    }
    out
}

pub fn format_comparison(reports: &[StrategyReport]) -> String {
    let width = reports
        .iter()
        .map(|r| r.result.strategy.len())
        .max()
        .unwrap_or(0)
        .max("Strategy".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>9}  {:>7}  {:>9}  {:>8}  {:>6}",
        "Strategy", "Return", "Sharpe", "Max DD", "Win Rate", "Trades"
    );
    for r in reports {
        let m = &r.metrics;
        let _ = writeln!(
            out,
            "{:<width$}  {:>8.2}%  {:>7.2}  {:>8.2}%  {:>7.1}%  {:>6}",
            r.result.strategy,
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.win_rate * 100.0,
            m.trade_count
        );
    }
    out
}

fn run_fetch(
    symbol: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    data_dir: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let today = chrono::Local::now().date_naive();
    let (start, end) = resolve_fetch_range(start, end, &config, today)?;
    let store = CsvAdapter::new(resolve_data_dir(data_dir, &config));

    #[cfg(feature = "yahoo")]
    {
        use crate::adapters::yahoo_adapter::YahooAdapter;

        let market = YahooAdapter::new()?;
        let count = run_fetch_pipeline(&market, &store, symbol, start, end)?;
        println!(
            "{}: {} bars written to {}",
            symbol.to_uppercase(),
            count,
            store.csv_path(symbol).display()
        );
        Ok(())
    }

    #[cfg(not(feature = "yahoo"))]
    {
        let _ = (symbol, start, end, store);
        Err(BacktestError::Fetch {
            reason: "built without the yahoo feature".to_string(),
        })
    }
}

fn run_backtest(
    symbol: &str,
    choice: StrategyChoice,
    config_path: Option<&Path>,
    data_dir: Option<&Path>,
    trades_out: Option<&Path>,
    equity_out: Option<&Path>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let bt_config = build_backtest_config(&config);
    let params = build_strategy_params(&config)?;
    let data_port = CsvAdapter::new(resolve_data_dir(data_dir, &config));

    let reports = run_backtest_pipeline(
        &data_port,
        &CsvReportAdapter::new(),
        symbol,
        &choice.kinds(),
        &params,
        &bt_config,
        trades_out,
        equity_out,
    )?;

    for report in &reports {
        println!("{}", format_report(report));
    }
    if reports.len() > 1 {
        println!("=== Comparison ({}) ===", symbol.to_uppercase());
        print!("{}", format_comparison(&reports));
    }
    Ok(())
}

fn run_list(data_dir: Option<&Path>) -> Result<(), BacktestError> {
    let dir = resolve_data_dir(data_dir, &FileConfigAdapter::empty());
    let symbols = CsvAdapter::new(dir.clone()).list_symbols()?;

    if symbols.is_empty() {
        eprintln!("No symbols found in {}", dir.display());
    } else {
        for symbol in &symbols {
            println!("{}", symbol);
        }
        eprintln!("{} symbols found", symbols.len());
    }
    Ok(())
}

fn run_info(symbol: &str, data_dir: Option<&Path>) -> Result<(), BacktestError> {
    let dir = resolve_data_dir(data_dir, &FileConfigAdapter::empty());
    let adapter = CsvAdapter::new(dir);

    match adapter.get_data_range(symbol)? {
        Some((first, last, count)) => {
            println!("{}: {} bars, {} to {}", symbol.to_uppercase(), count, first, last);
            Ok(())
        }
        None => Err(BacktestError::NoData {
            symbol: symbol.to_uppercase(),
        }),
    }
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    let config = load_config(Some(config_path))?;
    let params = build_strategy_params(&config)?;
    let bt_config = build_backtest_config(&config);

    println!("Configuration is valid: {}", config_path.display());
    println!(
        "  backtest: capital {:.2}, {:?} sizing, close_at_end {}, risk-free {}",
        bt_config.initial_capital, bt_config.sizing, bt_config.close_at_end, bt_config.risk_free_rate
    );
    for strategy in build_strategies(&StrategyKind::ALL, &params) {
        println!("  {} (warmup {})", strategy.name(), strategy.warmup());
    }
    Ok(())
}
