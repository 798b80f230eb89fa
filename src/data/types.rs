use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Contract side of an option quote
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionSide {
    Call,
    Put,
}

impl OptionSide {
    /// Parse exchange side codes (`CE`/`PE`) as well as spelled-out names.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "CE" | "C" | "CALL" => Some(OptionSide::Call),
            "PE" | "P" | "PUT" => Some(OptionSide::Put),
            _ => None,
        }
    }

    /// Payoff direction: +1 for call, -1 for put
    pub fn phi(&self) -> f64 {
        match self {
            OptionSide::Call => 1.0,
            OptionSide::Put => -1.0,
        }
    }
}

/// One cleaned option quote
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub timestamp: NaiveDateTime,
    /// Strike price (positive)
    pub strike: f64,
    /// Last traded price (positive)
    pub ltp: f64,
    /// Best buy (bid) price, if the row carried a usable one
    pub buy_price: Option<f64>,
    pub open_interest: Option<u64>,
    /// Calendar days to expiry
    pub dte: Option<f64>,
    pub side: OptionSide,
    /// Implied volatility supplied by the data vendor, if any
    pub iv: Option<f64>,
}

/// One cleaned equity tick, as consumed by the equity peer builder
#[derive(Debug, Clone, PartialEq)]
pub struct EquityTick {
    pub timestamp: NaiveDateTime,
    pub ltp: f64,
    pub buy_price: f64,
}

/// One underlying price observation used for spot alignment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnderlyingTick {
    pub timestamp: NaiveDateTime,
    pub price: f64,
}

impl From<&EquityTick> for UnderlyingTick {
    fn from(tick: &EquityTick) -> Self {
        Self {
            timestamp: tick.timestamp,
            price: tick.ltp,
        }
    }
}

/// Row accounting for a single load; rows are dropped silently but counted here.
///
/// A row is attributed to the first check it fails, in field order
/// (record decoding, price, buy price, strike, side, timestamp).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadReport {
    pub rows_read: usize,
    pub dropped_malformed: usize,
    pub dropped_missing_price: usize,
    pub dropped_missing_buy_price: usize,
    pub dropped_missing_strike: usize,
    pub dropped_bad_side: usize,
    pub dropped_bad_timestamp: usize,
    pub rows_kept: usize,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_read - self.rows_kept
    }
}
