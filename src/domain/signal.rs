//! Per-bar position signals.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Signal {
    Long,
    #[default]
    Flat,
}

impl Signal {
    pub fn is_long(self) -> bool {
        self == Signal::Long
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Long => write!(f, "LONG"),
            Signal::Flat => write!(f, "FLAT"),
        }
    }
}

/// Counts of (long, flat) signals.
pub fn signal_counts(signals: &[Signal]) -> (usize, usize) {
    let long = signals.iter().filter(|s| s.is_long()).count();
    (long, signals.len() - long)
}
