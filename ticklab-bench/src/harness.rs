//! The comparison harness: same logical queries, both backends, measured.
//!
//! Loads one dataset into the relational and columnar stores, times the
//! bulk load and each query with wall-clock `Instant`, and collects
//! on-disk sizes. The harness is glue — all query semantics live in
//! ticklab-core.

use crate::config::BenchConfig;
use crate::ingest::MarketDataset;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use thiserror::Error;
use ticklab_core::{BarColumn, ColumnarStore, RelationalStore, StoreError};
use tracing::info;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("empty dataset — nothing to compare")]
    EmptyDataset,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wall-clock measurement of one query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTiming {
    pub name: String,
    pub millis: f64,
    pub rows: usize,
}

/// One backend's measurements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendReport {
    pub backend: String,
    pub load_millis: f64,
    pub storage_bytes: u64,
    pub queries: Vec<QueryTiming>,
}

/// The full comparison: dataset summary plus both backends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub ticker_count: usize,
    pub bar_count: usize,
    pub dataset_hash: String,
    pub relational: BackendReport,
    pub columnar: BackendReport,
}

/// Run the same logical workload against both stores and measure it.
///
/// Any pre-existing stores at the configured paths are replaced, so each
/// comparison measures a fresh load.
pub fn run_comparison(
    dataset: &MarketDataset,
    config: &BenchConfig,
) -> Result<ComparisonReport, HarnessError> {
    if dataset.bars.is_empty() || dataset.tickers.is_empty() {
        return Err(HarnessError::EmptyDataset);
    }

    // Shared query parameters: symbol defaults to the first ticker, the
    // range spans the whole dataset.
    let symbol = config
        .queries
        .range_symbol
        .clone()
        .unwrap_or_else(|| dataset.tickers[0].symbol.clone());
    let start = dataset.bars.iter().map(|b| b.timestamp).min().unwrap();
    let end = dataset.bars.iter().map(|b| b.timestamp).max().unwrap();

    let relational = run_relational(dataset, config, &symbol, start, end)?;
    let columnar = run_columnar(dataset, config, &symbol, start, end)?;

    Ok(ComparisonReport {
        ticker_count: dataset.tickers.len(),
        bar_count: dataset.bars.len(),
        dataset_hash: dataset.dataset_hash.clone(),
        relational,
        columnar,
    })
}

fn run_relational(
    dataset: &MarketDataset,
    config: &BenchConfig,
    symbol: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<BackendReport, HarnessError> {
    // Fresh load: measure from an empty database.
    if config.sqlite_path.exists() {
        std::fs::remove_file(&config.sqlite_path)?;
    }
    let mut store = RelationalStore::open(&config.sqlite_path)?;
    store.create_schema()?;

    let (load_result, load_millis) = timed(|| -> Result<(), StoreError> {
        store.insert_tickers(&dataset.tickers)?;
        let index = store.ticker_index()?;
        store.insert_price_bars(&dataset.bars, &index)?;
        Ok(())
    });
    load_result?;

    let mut queries = Vec::new();

    let (rows, millis) = timed(|| store.query_by_date_range(symbol, start, end));
    queries.push(QueryTiming {
        name: format!("range_query[{symbol}]"),
        millis,
        rows: rows?.len(),
    });

    let (rows, millis) = timed(|| store.query_average_daily_volume());
    queries.push(QueryTiming {
        name: "average_daily_volume".into(),
        millis,
        rows: rows?.len(),
    });

    let (rows, millis) = timed(|| store.query_top_tickers_by_return(config.queries.top_n));
    queries.push(QueryTiming {
        name: format!("top_{}_by_return", config.queries.top_n),
        millis,
        rows: rows?.len(),
    });

    let (rows, millis) = timed(|| store.query_daily_first_last_prices());
    queries.push(QueryTiming {
        name: "daily_first_last_prices".into(),
        millis,
        rows: rows?.len(),
    });

    let report = BackendReport {
        backend: "relational (sqlite)".into(),
        load_millis,
        storage_bytes: store.database_size(),
        queries,
    };
    info!(
        load_ms = report.load_millis,
        bytes = report.storage_bytes,
        "relational backend measured"
    );
    Ok(report)
}

fn run_columnar(
    dataset: &MarketDataset,
    config: &BenchConfig,
    symbol: &str,
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Result<BackendReport, HarnessError> {
    // Fresh load: replace any previous partition tree.
    if config.parquet_dir.exists() {
        std::fs::remove_dir_all(&config.parquet_dir)?;
    }
    let store = ColumnarStore::new(&config.parquet_dir);

    let (write_result, load_millis) =
        timed(|| store.write_partitioned(&dataset.bars, &dataset.tickers));
    write_result?;

    let mut queries = Vec::new();

    let (rows, millis) = timed(|| store.query_by_date_range(symbol, start, end));
    queries.push(QueryTiming {
        name: format!("range_query[{symbol}]"),
        millis,
        rows: rows?.len(),
    });

    let window = config.queries.rolling_window;
    let (rows, millis) =
        timed(|| store.compute_rolling_average(symbol, window, BarColumn::Close));
    queries.push(QueryTiming {
        name: format!("rolling_average[{symbol}, w={window}]"),
        millis,
        rows: rows?.len(),
    });

    let window = config.queries.volatility_window;
    let (rows, millis) = timed(|| store.compute_rolling_volatility(window));
    queries.push(QueryTiming {
        name: format!("rolling_volatility[w={window}]"),
        millis,
        rows: rows?.len(),
    });

    let (rows, millis) = timed(|| store.read_all_data());
    queries.push(QueryTiming {
        name: "read_all_data".into(),
        millis,
        rows: rows?.len(),
    });

    let report = BackendReport {
        backend: "columnar (parquet)".into(),
        load_millis,
        storage_bytes: store.storage_size(),
        queries,
    };
    info!(
        load_ms = report.load_millis,
        bytes = report.storage_bytes,
        "columnar backend measured"
    );
    Ok(report)
}

fn timed<T>(f: impl FnOnce() -> T) -> (T, f64) {
    let t0 = Instant::now();
    let out = f();
    (out, t0.elapsed().as_secs_f64() * 1000.0)
}
