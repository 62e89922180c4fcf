//! Performance metrics and statistics.

use super::portfolio::{EquityPoint, Portfolio};
use super::position::Trade;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Standard deviations below this count as zero variance.
const MIN_STDDEV: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct MetricsReport {
    pub initial_capital: f64,
    pub final_equity: f64,
    pub profit_loss: f64,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Non-positive fraction; -0.25 is a 25% peak-to-trough decline.
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub avg_trade_return: f64,
    pub trade_count: usize,
    pub open_position: bool,
}

impl MetricsReport {
    pub fn compute(portfolio: &Portfolio, risk_free_rate: f64) -> Self {
        let equity_curve = &portfolio.equity_curve;
        let trades = &portfolio.closed_trades;
        let initial_capital = portfolio.initial_capital;
        let final_equity = portfolio.final_equity();

        let total_return = if initial_capital > 0.0 {
            final_equity / initial_capital - 1.0
        } else {
            0.0
        };

        let daily_rf = risk_free_rate / TRADING_DAYS_PER_YEAR;

        MetricsReport {
            initial_capital,
            final_equity,
            profit_loss: final_equity - initial_capital,
            total_return,
            sharpe_ratio: compute_sharpe(&daily_returns(equity_curve), daily_rf),
            max_drawdown: compute_max_drawdown(equity_curve),
            win_rate: compute_win_rate(trades),
            avg_trade_return: compute_avg_trade_return(trades),
            trade_count: trades.len(),
            open_position: portfolio.is_long(),
        }
    }
}

/// Percentage change between consecutive equity points.
pub fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect()
}

/// Annualised Sharpe ratio with population standard deviation.
pub fn compute_sharpe(returns: &[f64], daily_rf: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev < MIN_STDDEV {
        return 0.0;
    }
    (mean - daily_rf) / stddev * TRADING_DAYS_PER_YEAR.sqrt()
}

pub fn compute_max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
        }
    }

    if max_dd > 0.0 { -max_dd } else { 0.0 }
}

pub fn compute_win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    let won = trades.iter().filter(|t| t.pnl > 0.0).count();
    won as f64 / trades.len() as f64
}

pub fn compute_avg_trade_return(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return 0.0;
    }
    trades.iter().map(Trade::return_pct).sum::<f64>() / trades.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| EquityPoint {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                    + chrono::Duration::days(i as i64),
                equity: v,
            })
            .collect()
    }

    fn make_portfolio(equity: &[f64], trades: Vec<Trade>) -> Portfolio {
        let initial = equity.first().copied().unwrap_or(10_000.0);
        let mut portfolio = Portfolio::new(initial);
        for trade in trades {
            portfolio.record_trade(trade);
        }
        for point in make_equity_curve(equity) {
            portfolio.record_equity(point.date, point.equity);
        }
        portfolio
    }

    fn make_trade(entry: f64, exit: f64) -> Trade {
        let entry_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        Trade {
            entry_date,
            entry_price: entry,
            exit_date: entry_date + chrono::Duration::days(3),
            exit_price: exit,
            quantity: 10.0,
            pnl: (exit - entry) * 10.0,
            forced_exit: false,
        }
    }

    #[test]
    fn metrics_empty_portfolio() {
        let metrics = MetricsReport::compute(&Portfolio::new(10_000.0), 0.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.trade_count, 0);
        assert!(!metrics.open_position);
    }

    #[test]
    fn metrics_total_return_and_pnl() {
        let metrics = MetricsReport::compute(&make_portfolio(&[10_000.0, 11_000.0], vec![]), 0.0);
        assert_relative_eq!(metrics.total_return, 0.10, epsilon = 1e-12);
        assert_relative_eq!(metrics.profit_loss, 1_000.0);
        assert_relative_eq!(metrics.final_equity, 11_000.0);
    }

    #[test]
    fn metrics_total_return_negative() {
        let metrics = MetricsReport::compute(&make_portfolio(&[10_000.0, 9_000.0], vec![]), 0.0);
        assert_relative_eq!(metrics.total_return, -0.10, epsilon = 1e-12);
    }

    #[test]
    fn daily_returns_pct_change() {
        let returns = daily_returns(&make_equity_curve(&[100.0, 110.0, 99.0]));
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns[0], 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns[1], -0.10, epsilon = 1e-12);
    }

    #[test]
    fn sharpe_zero_for_too_few_returns() {
        assert_eq!(compute_sharpe(&[], 0.0), 0.0);
        assert_eq!(compute_sharpe(&[0.05], 0.0), 0.0);
    }

    #[test]
    fn sharpe_zero_for_identical_returns() {
        assert_eq!(compute_sharpe(&[0.01; 30], 0.0), 0.0);
        assert_eq!(compute_sharpe(&[0.1; 7], 0.0), 0.0);
    }

    #[test]
    fn sharpe_known_value() {
        // mean 0.01, population stddev 0.01 -> sqrt(252)
        let sharpe = compute_sharpe(&[0.0, 0.02], 0.0);
        assert_relative_eq!(sharpe, 252f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn sharpe_subtracts_risk_free() {
        let returns = [0.0, 0.02];
        let with_rf = compute_sharpe(&returns, 0.005);
        assert_relative_eq!(with_rf, 0.5 * 252f64.sqrt(), epsilon = 1e-9);
    }

    #[test]
    fn sharpe_positive_for_rising_curve() {
        let values: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64).powf(1.5)).collect();
        let portfolio = make_portfolio(&values, vec![]);
        assert!(MetricsReport::compute(&portfolio, 0.0).sharpe_ratio > 0.0);
    }

    #[test]
    fn max_drawdown_is_negative_fraction() {
        let curve = make_equity_curve(&[100.0, 110.0, 90.0, 95.0, 80.0, 100.0]);
        assert_relative_eq!(compute_max_drawdown(&curve), -(30.0 / 110.0), epsilon = 1e-12);
    }

    #[test]
    fn max_drawdown_zero_for_rising_curve() {
        let curve = make_equity_curve(&[100.0, 101.0, 102.0]);
        let dd = compute_max_drawdown(&curve);
        assert_eq!(dd, 0.0);
        assert!(dd.is_sign_positive());
    }

    #[test]
    fn max_drawdown_empty_curve() {
        assert_eq!(compute_max_drawdown(&[]), 0.0);
    }

    #[test]
    fn win_rate_counts_positive_pnl_only() {
        let trades = vec![
            make_trade(100.0, 110.0),
            make_trade(100.0, 90.0),
            make_trade(100.0, 100.0),
            make_trade(100.0, 120.0),
        ];
        assert_relative_eq!(compute_win_rate(&trades), 0.5);
    }

    #[test]
    fn avg_trade_return_is_mean_of_pct_returns() {
        let trades = vec![make_trade(100.0, 110.0), make_trade(50.0, 45.0)];
        assert_relative_eq!(compute_avg_trade_return(&trades), 0.0, epsilon = 1e-12);

        let trades = vec![make_trade(100.0, 110.0), make_trade(50.0, 60.0)];
        assert_relative_eq!(compute_avg_trade_return(&trades), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn metrics_no_trades() {
        let metrics = MetricsReport::compute(&make_portfolio(&[10_000.0, 11_000.0], vec![]), 0.0);
        assert_eq!(metrics.trade_count, 0);
        assert_eq!(metrics.win_rate, 0.0);
        assert_eq!(metrics.avg_trade_return, 0.0);
    }

    #[test]
    fn metrics_with_trades() {
        let trades = vec![make_trade(100.0, 110.0), make_trade(100.0, 95.0)];
        let metrics = MetricsReport::compute(&make_portfolio(&[10_000.0, 10_050.0], trades), 0.0);
        assert_eq!(metrics.trade_count, 2);
        assert_relative_eq!(metrics.win_rate, 0.5);
        assert_relative_eq!(metrics.avg_trade_return, 0.025, epsilon = 1e-12);
    }
}
