//! Ticker dimension and the symbol → id index used at insert time.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One row of the ticker reference table.
///
/// `ticker_id` is a surrogate key assigned at ingest; `symbol` is unique.
/// Rows are created once at load time and immutable thereafter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub ticker_id: i64,
    pub symbol: String,
    pub name: Option<String>,
    pub exchange: Option<String>,
}

/// Symbol → ticker_id mapping built from the ticker table.
///
/// The relational store resolves each bar's symbol through this index
/// before inserting, so a bar referencing an unknown symbol fails fast.
#[derive(Debug, Clone, Default)]
pub struct TickerIndex {
    by_symbol: HashMap<String, i64>,
}

impl TickerIndex {
    pub fn from_tickers(tickers: &[Ticker]) -> Self {
        Self {
            by_symbol: tickers
                .iter()
                .map(|t| (t.symbol.clone(), t.ticker_id))
                .collect(),
        }
    }

    pub fn get(&self, symbol: &str) -> Option<i64> {
        self.by_symbol.get(symbol).copied()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.by_symbol.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tickers() -> Vec<Ticker> {
        vec![
            Ticker {
                ticker_id: 1,
                symbol: "AAPL".into(),
                name: Some("Apple Inc.".into()),
                exchange: Some("NASDAQ".into()),
            },
            Ticker {
                ticker_id: 2,
                symbol: "TSLA".into(),
                name: Some("Tesla Inc.".into()),
                exchange: None,
            },
        ]
    }

    #[test]
    fn index_resolves_known_symbols() {
        let index = TickerIndex::from_tickers(&sample_tickers());
        assert_eq!(index.get("AAPL"), Some(1));
        assert_eq!(index.get("TSLA"), Some(2));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn index_rejects_unknown_symbol() {
        let index = TickerIndex::from_tickers(&sample_tickers());
        assert_eq!(index.get("ZZZZ"), None);
        assert!(!index.contains("ZZZZ"));
    }
}
