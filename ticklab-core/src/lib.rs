//! TickLab Core — dual-backend storage engines for minute-level OHLCV data.
//!
//! This crate contains the heart of the storage lab:
//! - Domain types (tickers, price bars, the symbol index)
//! - Relational backend: normalized SQLite schema + four analytical queries
//! - Columnar backend: ticker-partitioned Parquet + rolling-window statistics
//! - The shared typed error taxonomy
//!
//! Both stores are explicit objects holding their own connection/path state,
//! built for single-writer, multiple-reader batch use: load once, query many.

pub mod columnar;
pub mod domain;
pub mod error;
pub mod relational;

pub use columnar::{BarColumn, ColumnarStore};
pub use domain::{PriceBar, Ticker, TickerIndex};
pub use error::StoreError;
pub use relational::RelationalStore;
