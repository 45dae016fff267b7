//! Domain types shared by both storage backends.

pub mod bar;
pub mod ticker;

pub use bar::PriceBar;
pub use ticker::{Ticker, TickerIndex};
