//! CSV ingestion and validation of the two input tables.
//!
//! The stores assume validated input; this module is the collaborator that
//! produces it. Headers are normalized (trimmed, lowercased) before
//! deserialization, surrogate ticker ids are assigned in file order, and
//! the bar table is sorted by (timestamp, ticker) for determinism.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::collections::{HashSet, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use ticklab_core::{PriceBar, Ticker};
use tracing::info;

/// Default file names inside a data directory.
pub const TICKERS_FILE: &str = "tickers.csv";
pub const MARKET_DATA_FILE: &str = "market_data_multi.csv";

const TS_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Errors from the ingestion layer.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("input file not found: {}", .path.display())]
    FileNotFound { path: PathBuf },

    #[error("csv error in {}: {message}", .path.display())]
    Csv { path: PathBuf, message: String },

    #[error("unparseable timestamp '{raw}' at row {row}")]
    Timestamp { raw: String, row: usize },

    #[error("data validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two validated tables plus a deterministic content fingerprint.
#[derive(Debug, Clone)]
pub struct MarketDataset {
    pub tickers: Vec<Ticker>,
    pub bars: Vec<PriceBar>,
    pub dataset_hash: String,
}

impl MarketDataset {
    /// Assemble a dataset from already-built tables, computing the hash.
    pub fn new(tickers: Vec<Ticker>, bars: Vec<PriceBar>) -> Self {
        let dataset_hash = dataset_hash(&bars);
        Self {
            tickers,
            bars,
            dataset_hash,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TickerRecord {
    symbol: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exchange: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp: String,
    ticker: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

/// Load the ticker reference table, assigning surrogate ids in file order.
pub fn load_tickers(path: &Path) -> Result<Vec<Ticker>, IngestError> {
    let mut reader = open_normalized(path)?;

    let mut tickers = Vec::new();
    for (i, result) in reader.deserialize::<TickerRecord>().enumerate() {
        let record = result.map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tickers.push(Ticker {
            ticker_id: (i + 1) as i64,
            symbol: record.symbol,
            name: record.name,
            exchange: record.exchange,
        });
    }

    Ok(tickers)
}

/// Load the price-bar table, sorted by (timestamp, ticker).
pub fn load_market_data(path: &Path) -> Result<Vec<PriceBar>, IngestError> {
    let mut reader = open_normalized(path)?;

    let mut bars = Vec::new();
    for (row, result) in reader.deserialize::<BarRecord>().enumerate() {
        let record = result.map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let timestamp = parse_timestamp(&record.timestamp).ok_or_else(|| {
            IngestError::Timestamp {
                raw: record.timestamp.clone(),
                row: row + 1,
            }
        })?;
        bars.push(PriceBar {
            timestamp,
            symbol: record.ticker,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }

    bars.sort_by(|a, b| (a.timestamp, &a.symbol).cmp(&(b.timestamp, &b.symbol)));
    Ok(bars)
}

/// Collect validation issues across both tables. Empty means valid.
pub fn validate(bars: &[PriceBar], tickers: &[Ticker]) -> Vec<String> {
    let mut issues = Vec::new();

    let expected: BTreeSet<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();
    let actual: BTreeSet<&str> = bars.iter().map(|b| b.symbol.as_str()).collect();

    let missing: Vec<&str> = expected.difference(&actual).copied().collect();
    if !missing.is_empty() {
        issues.push(format!("tickers with no bars: {}", missing.join(", ")));
    }
    let extra: Vec<&str> = actual.difference(&expected).copied().collect();
    if !extra.is_empty() {
        issues.push(format!("unexpected tickers in data: {}", extra.join(", ")));
    }

    let insane = bars.iter().filter(|b| !b.is_sane()).count();
    if insane > 0 {
        issues.push(format!(
            "{insane} rows with inverted high/low or non-positive prices"
        ));
    }

    let mut seen = HashSet::new();
    let duplicates = bars
        .iter()
        .filter(|b| !seen.insert((b.symbol.as_str(), b.timestamp)))
        .count();
    if duplicates > 0 {
        issues.push(format!("{duplicates} duplicate (ticker, timestamp) rows"));
    }

    issues
}

/// Load and validate both tables from a data directory.
pub fn load_and_validate(data_dir: &Path) -> Result<MarketDataset, IngestError> {
    let tickers = load_tickers(&data_dir.join(TICKERS_FILE))?;
    let bars = load_market_data(&data_dir.join(MARKET_DATA_FILE))?;

    let issues = validate(&bars, &tickers);
    if !issues.is_empty() {
        return Err(IngestError::Validation(issues));
    }

    info!(
        tickers = tickers.len(),
        bars = bars.len(),
        "dataset loaded and validated"
    );
    Ok(MarketDataset::new(tickers, bars))
}

/// Write a dataset back out as the two CSV files.
pub fn write_csv(dataset: &MarketDataset, data_dir: &Path) -> Result<(), IngestError> {
    std::fs::create_dir_all(data_dir)?;

    let tickers_path = data_dir.join(TICKERS_FILE);
    write_tickers_csv(&dataset.tickers, &tickers_path).map_err(|e| IngestError::Csv {
        path: tickers_path,
        message: e.to_string(),
    })?;

    let market_path = data_dir.join(MARKET_DATA_FILE);
    write_bars_csv(&dataset.bars, &market_path).map_err(|e| IngestError::Csv {
        path: market_path,
        message: e.to_string(),
    })?;

    Ok(())
}

fn write_tickers_csv(tickers: &[Ticker], path: &Path) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["symbol", "name", "exchange"])?;
    for t in tickers {
        wtr.write_record([
            t.symbol.as_str(),
            t.name.as_deref().unwrap_or(""),
            t.exchange.as_deref().unwrap_or(""),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_bars_csv(bars: &[PriceBar], path: &Path) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([
        "timestamp", "ticker", "open", "high", "low", "close", "volume",
    ])?;
    for b in bars {
        wtr.write_record([
            b.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            b.symbol.clone(),
            b.open.to_string(),
            b.high.to_string(),
            b.low.to_string(),
            b.close.to_string(),
            b.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn open_normalized(path: &Path) -> Result<csv::Reader<std::fs::File>, IngestError> {
    if !path.exists() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    // Normalize headers: lowercase, trimmed.
    let normalized: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Csv {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    reader.set_headers(csv::StringRecord::from(normalized));

    Ok(reader)
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    TS_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Deterministic BLAKE3 fingerprint over the sorted bar table.
pub fn dataset_hash(bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.symbol.as_bytes());
        hasher.update(bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}
