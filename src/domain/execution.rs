//! Fill simulation for the single long position.
//!
//! Fills happen at the given market price with no slippage or fees. The
//! whole cash balance is committed on entry and the whole position is
//! released on exit.

use chrono::NaiveDate;

use super::portfolio::Portfolio;
use super::position::{Position, Trade};

/// How many units an entry buys with the available cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sizing {
    /// cash / price, fractional units allowed.
    #[default]
    FullCapital,
    /// floor(cash / price); leftover cash stays in the account.
    WholeShares,
}

impl Sizing {
    pub fn quantity(self, cash: f64, price: f64) -> f64 {
        if price <= 0.0 || cash <= 0.0 {
            return 0.0;
        }
        match self {
            Sizing::FullCapital => cash / price,
            Sizing::WholeShares => (cash / price).floor(),
        }
    }
}

/// Result of an entry attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered { quantity: f64, cost: f64 },
    AlreadyLong,
    InsufficientCapital,
}

/// Enter a long position.
///
/// 1. Refuse if a position is already open
/// 2. Size the order from current cash
/// 3. If quantity == 0, return InsufficientCapital
/// 4. Deduct cost from cash and open the position
pub fn enter_long(
    portfolio: &mut Portfolio,
    index: usize,
    date: NaiveDate,
    price: f64,
    sizing: Sizing,
) -> EntryResult {
    if portfolio.is_long() {
        return EntryResult::AlreadyLong;
    }

    let quantity = sizing.quantity(portfolio.cash, price);
    if quantity <= 0.0 {
        return EntryResult::InsufficientCapital;
    }

    let cost = quantity * price;
    // Full-capital sizing can round a hair above cash.
    portfolio.cash = (portfolio.cash - cost).max(0.0);
    portfolio.position = Some(Position {
        entry_index: index,
        entry_date: date,
        entry_price: price,
        quantity,
    });

    EntryResult::Entered { quantity, cost }
}

/// Close the open position, credit the proceeds and record the trade.
///
/// Returns `None` when flat.
pub fn exit_long(
    portfolio: &mut Portfolio,
    date: NaiveDate,
    price: f64,
    forced_exit: bool,
) -> Option<Trade> {
    let position = portfolio.position.take()?;

    let proceeds = position.market_value(price);
    let pnl = position.unrealized_pnl(price);
    portfolio.cash += proceeds;

    let trade = Trade {
        entry_date: position.entry_date,
        entry_price: position.entry_price,
        exit_date: date,
        exit_price: price,
        quantity: position.quantity,
        pnl,
        forced_exit,
    };
    portfolio.record_trade(trade.clone());
    Some(trade)
}
