//! PriceBar — the fundamental market data unit.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One minute-resolution OHLCV observation for a single ticker.
///
/// Bars are created in bulk at load time and never mutated; both storage
/// backends treat (symbol, timestamp) as a unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PriceBar {
    /// Basic OHLCV sanity check: high >= low, all prices positive.
    pub fn is_sane(&self) -> bool {
        self.high >= self.low
            && self.open > 0.0
            && self.high > 0.0
            && self.low > 0.0
            && self.close > 0.0
    }

    /// Calendar date of the bar, used for daily grouping.
    pub fn trade_date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}
