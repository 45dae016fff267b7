//! Deterministic synthetic minute-bar generation.
//!
//! Produces a plausible random walk per symbol, seeded from the symbol
//! name, so demos and benches run without input files and two runs over
//! the same symbols are byte-identical.

use crate::ingest::MarketDataset;
use chrono::{Duration, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ticklab_core::{PriceBar, Ticker};

/// Generate `minutes_per_symbol` consecutive minute bars per symbol,
/// all starting at `start`.
pub fn generate_dataset(
    symbols: &[&str],
    start: NaiveDateTime,
    minutes_per_symbol: usize,
) -> MarketDataset {
    let tickers: Vec<Ticker> = symbols
        .iter()
        .enumerate()
        .map(|(i, symbol)| Ticker {
            ticker_id: (i + 1) as i64,
            symbol: symbol.to_string(),
            name: Some(format!("{symbol} (synthetic)")),
            exchange: Some("SYNTH".into()),
        })
        .collect();

    let mut bars = Vec::with_capacity(symbols.len() * minutes_per_symbol);
    for symbol in symbols {
        bars.extend(generate_symbol_bars(symbol, start, minutes_per_symbol));
    }
    bars.sort_by(|a, b| (a.timestamp, &a.symbol).cmp(&(b.timestamp, &b.symbol)));

    MarketDataset::new(tickers, bars)
}

fn generate_symbol_bars(
    symbol: &str,
    start: NaiveDateTime,
    minutes: usize,
) -> Vec<PriceBar> {
    // Deterministic seed from the symbol name.
    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(minutes);
    let mut price = rng.gen_range(50.0..500.0_f64);

    for i in 0..minutes {
        let minute_return: f64 = rng.gen_range(-0.005..0.005);
        let open = price;
        let close = price * (1.0 + minute_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.002));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.002));
        let volume = rng.gen_range(1_000..100_000u64);

        bars.push(PriceBar {
            timestamp: start + Duration::minutes(i as i64),
            symbol: symbol.to_string(),
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
    }

    bars
}
