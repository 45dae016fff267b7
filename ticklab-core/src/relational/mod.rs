//! Normalized relational backend (SQLite).
//!
//! Two tables joined on `ticker_id`: the ticker dimension and the price
//! fact table. Analytical queries are expressed as SQL join/aggregate
//! compositions; bulk loads are single transactions.

pub mod schema;
pub mod store;

pub use store::{AvgDailyVolume, DailyPriceEdges, RelationalStore, TickerReturn};
