//! Open positions and closed trades.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub quantity: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity * (price - self.entry_price)
    }
}

/// A closed position. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    /// Closed by the end-of-data policy rather than by a signal.
    pub forced_exit: bool,
}

impl Trade {
    /// Percentage return of the trade as a fraction (0.05 = +5%).
    pub fn return_pct(&self) -> f64 {
        if self.entry_price > 0.0 {
            self.exit_price / self.entry_price - 1.0
        } else {
            0.0
        }
    }

    pub fn holding_days(&self) -> i64 {
        (self.exit_date - self.entry_date).num_days()
    }
}
