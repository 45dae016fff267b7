//! Partitioned columnar backend (Parquet).
//!
//! Layout: `{root_dir}/ticker={SYMBOL}/data.parquet` plus a `meta.json`
//! sidecar per partition (row count, timestamp range, content hash).
//!
//! Partition files are written to a .tmp path and renamed into place, so a
//! concurrent reader sees either the old file or the new one, never a torn
//! write. The multi-partition batch as a whole is not atomic: a failure
//! partway through `write_partitioned` leaves earlier partitions updated;
//! callers re-run the whole batch.
//!
//! There is no cross-partition join primitive — the ticker dimension is
//! implicit in the partition key, and queries needing dimension attributes
//! beyond the symbol belong to the relational backend.

use crate::columnar::rolling::{pct_change, rolling_mean, rolling_std};
use crate::columnar::schema::BarSchema;
use crate::domain::{PriceBar, Ticker};
use crate::error::StoreError;
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info};

/// Which bar column a rolling statistic runs over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarColumn {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl BarColumn {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarColumn::Open => "open",
            BarColumn::High => "high",
            BarColumn::Low => "low",
            BarColumn::Close => "close",
            BarColumn::Volume => "volume",
        }
    }

    fn value(&self, bar: &PriceBar) -> f64 {
        match self {
            BarColumn::Open => bar.open,
            BarColumn::High => bar.high,
            BarColumn::Low => bar.low,
            BarColumn::Close => bar.close,
            BarColumn::Volume => bar.volume as f64,
        }
    }
}

impl FromStr for BarColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(BarColumn::Open),
            "high" => Ok(BarColumn::High),
            "low" => Ok(BarColumn::Low),
            "close" => Ok(BarColumn::Close),
            "volume" => Ok(BarColumn::Volume),
            other => Err(format!(
                "unknown column '{other}' (expected open, high, low, close, or volume)"
            )),
        }
    }
}

/// Metadata sidecar for one partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMeta {
    pub symbol: String,
    pub row_count: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub data_hash: String,
}

/// Diagnostic summary of one partition on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionInfo {
    pub symbol: String,
    pub file_count: usize,
    pub row_count: usize,
    pub size_bytes: u64,
}

/// One row of a rolling-average result, aligned with its partition.
#[derive(Debug, Clone)]
pub struct RollingAveragePoint {
    pub timestamp: NaiveDateTime,
    pub value: f64,
    /// NaN for the first `window - 1` rows.
    pub rolling_avg: f64,
}

/// One row of a rolling-volatility result, labeled with its ticker.
#[derive(Debug, Clone)]
pub struct VolatilityPoint {
    pub timestamp: NaiveDateTime,
    pub symbol: String,
    pub close: f64,
    /// Close-to-close fractional return; NaN on each ticker's first row.
    pub ret: f64,
    /// Trailing sample stddev of returns; NaN until the window fills.
    pub rolling_volatility: f64,
}

/// The columnar backend.
pub struct ColumnarStore {
    root_dir: PathBuf,
}

impl ColumnarStore {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Directory of one partition: `{root_dir}/ticker={SYMBOL}/`
    fn partition_dir(&self, symbol: &str) -> PathBuf {
        self.root_dir.join(format!("ticker={symbol}"))
    }

    fn data_path(&self, symbol: &str) -> PathBuf {
        self.partition_dir(symbol).join("data.parquet")
    }

    fn meta_path(&self, symbol: &str) -> PathBuf {
        self.partition_dir(symbol).join("meta.json")
    }

    /// Group bars by ticker symbol and write one self-contained,
    /// timestamp-ordered partition per symbol.
    ///
    /// A symbol already on disk that appears in the input is replaced
    /// wholesale. Every bar symbol must exist in `tickers`; otherwise the
    /// call fails with `UnknownTicker` before any partition is touched.
    pub fn write_partitioned(
        &self,
        bars: &[PriceBar],
        tickers: &[Ticker],
    ) -> Result<(), StoreError> {
        let known: HashSet<&str> = tickers.iter().map(|t| t.symbol.as_str()).collect();

        let mut by_symbol: BTreeMap<&str, Vec<&PriceBar>> = BTreeMap::new();
        for bar in bars {
            if !known.contains(bar.symbol.as_str()) {
                return Err(StoreError::UnknownTicker {
                    symbol: bar.symbol.clone(),
                });
            }
            by_symbol.entry(bar.symbol.as_str()).or_default().push(bar);
        }

        fs::create_dir_all(&self.root_dir)
            .map_err(|e| StoreError::PartitionWrite(format!("create root dir: {e}")))?;

        for (symbol, group) in &mut by_symbol {
            group.sort_by_key(|b| b.timestamp);
            self.write_partition(symbol, group)?;
        }

        info!(
            partitions = by_symbol.len(),
            rows = bars.len(),
            "wrote partitioned dataset"
        );
        Ok(())
    }

    fn write_partition(&self, symbol: &str, bars: &[&PriceBar]) -> Result<(), StoreError> {
        let dir = self.partition_dir(symbol);
        fs::create_dir_all(&dir)
            .map_err(|e| StoreError::PartitionWrite(format!("create dir: {e}")))?;

        let df = bars_to_dataframe(bars)?;
        BarSchema::validate(&df)
            .map_err(|e| StoreError::Schema(format!("partition '{symbol}': {e}")))?;

        let path = self.data_path(symbol);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&df, &tmp_path)?;

        // Atomic swap: readers see the old file or the new one, never both.
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            StoreError::PartitionWrite(format!("atomic rename failed: {e}"))
        })?;

        let meta = PartitionMeta {
            symbol: symbol.to_string(),
            row_count: bars.len(),
            start: bars.first().map(|b| b.timestamp).unwrap_or_default(),
            end: bars.last().map(|b| b.timestamp).unwrap_or_default(),
            data_hash: blake3::hash(
                &serde_json::to_vec(bars)
                    .map_err(|e| StoreError::PartitionWrite(format!("hash serialization: {e}")))?,
            )
            .to_hex()
            .to_string(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::PartitionWrite(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol), meta_json)
            .map_err(|e| StoreError::PartitionWrite(format!("meta write: {e}")))?;

        Ok(())
    }

    /// Symbols with a partition on disk, ascending.
    pub fn symbols(&self) -> Result<Vec<String>, StoreError> {
        if !self.root_dir.exists() {
            return Ok(Vec::new());
        }
        let mut symbols = Vec::new();
        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if let Some(symbol) = name.strip_prefix("ticker=") {
                symbols.push(symbol.to_string());
            }
        }
        symbols.sort();
        Ok(symbols)
    }

    /// Load one partition's bars, sorted by timestamp ascending.
    fn load_partition(&self, symbol: &str) -> Result<Vec<PriceBar>, StoreError> {
        let path = self.data_path(symbol);
        if !path.exists() {
            return Err(StoreError::UnknownTicker {
                symbol: symbol.to_string(),
            });
        }

        let file = fs::File::open(&path)
            .map_err(|e| StoreError::Parquet(format!("open {}: {e}", path.display())))?;
        let df = ParquetReader::new(file)
            .finish()
            .map_err(|e| StoreError::Parquet(format!("read {}: {e}", path.display())))?;

        let mut bars = dataframe_to_bars(&df, symbol)?;
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }

    /// Read only `symbol`'s partition and filter to
    /// `start <= timestamp <= end` — other partitions are never opened.
    ///
    /// Fails with `UnknownTicker` if no partition exists: partition
    /// existence is this backend's only notion of the ticker dimension.
    pub fn query_by_date_range(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, StoreError> {
        let bars = self.load_partition(symbol)?;
        let filtered: Vec<PriceBar> = bars
            .into_iter()
            .filter(|b| b.timestamp >= start && b.timestamp <= end)
            .collect();

        debug!(symbol, rows = filtered.len(), "partition range query");
        Ok(filtered)
    }

    /// Trailing simple moving average of `column` over `window` rows of
    /// `symbol`'s partition.
    ///
    /// The result is row-aligned with the partition; the first `window - 1`
    /// averages are NaN because fewer than `window` observations exist yet.
    pub fn compute_rolling_average(
        &self,
        symbol: &str,
        window: usize,
        column: BarColumn,
    ) -> Result<Vec<RollingAveragePoint>, StoreError> {
        let bars = self.load_partition(symbol)?;
        let values: Vec<f64> = bars.iter().map(|b| column.value(b)).collect();
        let averages = rolling_mean(&values, window);

        Ok(bars
            .iter()
            .zip(values.iter().zip(averages.iter()))
            .map(|(bar, (&value, &rolling_avg))| RollingAveragePoint {
                timestamp: bar.timestamp,
                value,
                rolling_avg,
            })
            .collect())
    }

    /// Trailing sample volatility of close-to-close returns over `window`
    /// rows, computed independently per partition.
    ///
    /// Returns never cross ticker boundaries: each partition's first row
    /// has a NaN return, and the first `window - 1` deviations after that
    /// are NaN as well. Rows carry their ticker symbol so concatenated
    /// results stay distinguishable.
    pub fn compute_rolling_volatility(
        &self,
        window: usize,
    ) -> Result<Vec<VolatilityPoint>, StoreError> {
        let mut points = Vec::new();

        for symbol in self.symbols()? {
            let bars = self.load_partition(&symbol)?;
            let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
            let returns = pct_change(&closes);
            let vols = rolling_std(&returns, window);

            for ((bar, &ret), &vol) in bars.iter().zip(returns.iter()).zip(vols.iter()) {
                points.push(VolatilityPoint {
                    timestamp: bar.timestamp,
                    symbol: symbol.clone(),
                    close: bar.close,
                    ret,
                    rolling_volatility: vol,
                });
            }
        }

        Ok(points)
    }

    /// Concatenate all partitions: symbol-sorted across partitions,
    /// timestamp-ordered within each.
    pub fn read_all_data(&self) -> Result<Vec<PriceBar>, StoreError> {
        let mut all = Vec::new();
        for symbol in self.symbols()? {
            all.extend(self.load_partition(&symbol)?);
        }
        Ok(all)
    }

    /// Per-partition row counts and file sizes. Diagnostic only.
    pub fn partition_info(&self) -> Result<Vec<PartitionInfo>, StoreError> {
        let mut infos = Vec::new();

        for symbol in self.symbols()? {
            let dir = self.partition_dir(&symbol);
            let mut file_count = 0;
            let mut size_bytes = 0;
            for entry in fs::read_dir(&dir)? {
                let entry = entry?;
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) == Some("parquet") {
                    file_count += 1;
                    size_bytes += entry.metadata()?.len();
                }
            }

            let row_count = match self.read_meta(&symbol) {
                Some(meta) => meta.row_count,
                None => self.load_partition(&symbol)?.len(),
            };

            infos.push(PartitionInfo {
                symbol,
                file_count,
                row_count,
                size_bytes,
            });
        }

        Ok(infos)
    }

    /// Metadata sidecar for a symbol, if present and parseable.
    pub fn read_meta(&self, symbol: &str) -> Option<PartitionMeta> {
        let content = fs::read_to_string(self.meta_path(symbol)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Total bytes of Parquet data across all partitions.
    pub fn storage_size(&self) -> u64 {
        let Ok(symbols) = self.symbols() else {
            return 0;
        };
        symbols
            .iter()
            .filter_map(|s| fs::metadata(self.data_path(s)).ok())
            .map(|m| m.len())
            .sum()
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

/// Convert bars to a column-oriented DataFrame matching `BarSchema`.
fn bars_to_dataframe(bars: &[&PriceBar]) -> Result<DataFrame, StoreError> {
    let timestamps: Vec<i64> = bars
        .iter()
        .map(|b| b.timestamp.and_utc().timestamp_millis())
        .collect();
    let opens: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volumes: Vec<u64> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), timestamps)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .map_err(|e| StoreError::Parquet(format!("timestamp cast: {e}")))?,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame as snappy-compressed Parquet.
fn write_parquet(df: &DataFrame, path: &Path) -> Result<(), StoreError> {
    let file = fs::File::create(path)
        .map_err(|e| StoreError::PartitionWrite(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut df.clone())
        .map_err(|e| StoreError::PartitionWrite(format!("write parquet: {e}")))?;
    Ok(())
}

/// Convert a partition DataFrame back to bars, restoring the symbol from
/// the partition key.
fn dataframe_to_bars(df: &DataFrame, symbol: &str) -> Result<Vec<PriceBar>, StoreError> {
    let map_err = |e: PolarsError| StoreError::Parquet(format!("column read: {e}"));

    let timestamps = df.column("timestamp").map_err(map_err)?;
    let opens = df.column("open").map_err(map_err)?;
    let highs = df.column("high").map_err(map_err)?;
    let lows = df.column("low").map_err(map_err)?;
    let closes = df.column("close").map_err(map_err)?;
    let volumes = df.column("volume").map_err(map_err)?;

    let ts_ca = timestamps
        .datetime()
        .map_err(|e| StoreError::Parquet(format!("timestamp column type: {e}")))?;
    let open_ca = opens
        .f64()
        .map_err(|e| StoreError::Parquet(format!("open column type: {e}")))?;
    let high_ca = highs
        .f64()
        .map_err(|e| StoreError::Parquet(format!("high column type: {e}")))?;
    let low_ca = lows
        .f64()
        .map_err(|e| StoreError::Parquet(format!("low column type: {e}")))?;
    let close_ca = closes
        .f64()
        .map_err(|e| StoreError::Parquet(format!("close column type: {e}")))?;
    let vol_ca = volumes
        .u64()
        .map_err(|e| StoreError::Parquet(format!("volume column type: {e}")))?;

    let n = df.height();
    let mut bars = Vec::with_capacity(n);

    for i in 0..n {
        let millis = ts_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null timestamp at row {i}")))?;
        let timestamp = chrono::DateTime::from_timestamp_millis(millis)
            .ok_or_else(|| StoreError::Parquet(format!("timestamp out of range at row {i}")))?
            .naive_utc();

        bars.push(PriceBar {
            timestamp,
            symbol: symbol.to_string(),
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            volume: vol_ca.get(i).unwrap_or(0),
        });
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicU64, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_store_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir = std::env::temp_dir().join(format!("ticklab_test_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn ts(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 11, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn bar(symbol: &str, timestamp: NaiveDateTime, close: f64, volume: u64) -> PriceBar {
        PriceBar {
            timestamp,
            symbol: symbol.into(),
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    fn sample_tickers() -> Vec<Ticker> {
        vec![
            Ticker {
                ticker_id: 1,
                symbol: "AAPL".into(),
                name: None,
                exchange: None,
            },
            Ticker {
                ticker_id: 2,
                symbol: "TSLA".into(),
                name: None,
                exchange: None,
            },
        ]
    }

    #[test]
    fn write_and_read_roundtrip() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        let bars = vec![
            bar("AAPL", ts(17, 9, 31), 101.0, 600),
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("TSLA", ts(17, 9, 30), 200.0, 900),
        ];
        store.write_partitioned(&bars, &sample_tickers()).unwrap();

        let all = store.read_all_data().unwrap();
        assert_eq!(all.len(), 3);
        // Symbol-sorted across partitions, timestamp-ordered within.
        assert_eq!(all[0].symbol, "AAPL");
        assert_eq!(all[0].timestamp, ts(17, 9, 30));
        assert_eq!(all[1].timestamp, ts(17, 9, 31));
        assert_eq!(all[2].symbol, "TSLA");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn unknown_bar_symbol_rejected_before_writing() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        let bars = vec![bar("ZZZZ", ts(17, 9, 30), 10.0, 100)];
        let result = store.write_partitioned(&bars, &sample_tickers());
        assert!(matches!(
            result,
            Err(StoreError::UnknownTicker { ref symbol }) if symbol == "ZZZZ"
        ));
        assert!(store.symbols().unwrap().is_empty());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn range_query_prunes_and_filters() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        let bars = vec![
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 9, 31), 101.0, 600),
            bar("AAPL", ts(17, 9, 32), 102.0, 700),
            bar("TSLA", ts(17, 9, 31), 200.0, 900),
        ];
        store.write_partitioned(&bars, &sample_tickers()).unwrap();

        let rows = store
            .query_by_date_range("AAPL", ts(17, 9, 30), ts(17, 9, 31))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|b| b.symbol == "AAPL"));
        assert_eq!(rows[0].timestamp, ts(17, 9, 30));
        assert_eq!(rows[1].timestamp, ts(17, 9, 31));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_partition_is_an_error() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);
        store
            .write_partitioned(
                &[bar("AAPL", ts(17, 9, 30), 100.0, 500)],
                &sample_tickers(),
            )
            .unwrap();

        let result = store.query_by_date_range("ZZZZ", ts(17, 0, 0), ts(18, 0, 0));
        assert!(matches!(result, Err(StoreError::UnknownTicker { .. })));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rewrite_replaces_whole_partition() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);
        let tickers = sample_tickers();

        store
            .write_partitioned(
                &[
                    bar("AAPL", ts(17, 9, 30), 100.0, 500),
                    bar("AAPL", ts(17, 9, 31), 101.0, 600),
                ],
                &tickers,
            )
            .unwrap();
        store
            .write_partitioned(&[bar("AAPL", ts(18, 9, 30), 105.0, 700)], &tickers)
            .unwrap();

        // Replace, not append/merge.
        let rows = store.read_all_data().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].timestamp, ts(18, 9, 30));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rewrite_leaves_other_partitions_alone() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);
        let tickers = sample_tickers();

        store
            .write_partitioned(
                &[
                    bar("AAPL", ts(17, 9, 30), 100.0, 500),
                    bar("TSLA", ts(17, 9, 30), 200.0, 900),
                ],
                &tickers,
            )
            .unwrap();
        store
            .write_partitioned(&[bar("AAPL", ts(18, 9, 30), 105.0, 700)], &tickers)
            .unwrap();

        let tsla = store
            .query_by_date_range("TSLA", ts(17, 0, 0), ts(18, 0, 0))
            .unwrap();
        assert_eq!(tsla.len(), 1);
        assert_eq!(tsla[0].close, 200.0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rolling_average_marks_warmup_missing() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        let bars: Vec<PriceBar> = (0..5)
            .map(|i| bar("AAPL", ts(17, 9, 30 + i), 100.0 + i as f64, 500))
            .collect();
        store.write_partitioned(&bars, &sample_tickers()).unwrap();

        let points = store
            .compute_rolling_average("AAPL", 3, BarColumn::Close)
            .unwrap();
        assert_eq!(points.len(), 5);
        assert!(points[0].rolling_avg.is_nan());
        assert!(points[1].rolling_avg.is_nan());
        // mean(100, 101, 102) = 101
        assert!((points[2].rolling_avg - 101.0).abs() < 1e-10);
        assert!((points[4].rolling_avg - 103.0).abs() < 1e-10);
        // Row-aligned with the partition.
        assert_eq!(points[0].timestamp, ts(17, 9, 30));
        assert!((points[0].value - 100.0).abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rolling_volatility_respects_partition_boundaries() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        // Overlapping timestamp ranges across tickers.
        let bars = vec![
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 9, 31), 110.0, 500),
            bar("AAPL", ts(17, 9, 32), 121.0, 500),
            bar("TSLA", ts(17, 9, 30), 200.0, 900),
            bar("TSLA", ts(17, 9, 31), 100.0, 900),
        ];
        store.write_partitioned(&bars, &sample_tickers()).unwrap();

        let points = store.compute_rolling_volatility(2).unwrap();
        assert_eq!(points.len(), 5);

        let aapl: Vec<_> = points.iter().filter(|p| p.symbol == "AAPL").collect();
        let tsla: Vec<_> = points.iter().filter(|p| p.symbol == "TSLA").collect();

        // First return of each ticker is missing — never computed from the
        // other ticker's last close.
        assert!(aapl[0].ret.is_nan());
        assert!(tsla[0].ret.is_nan());
        assert!((aapl[1].ret - 0.1).abs() < 1e-10);
        assert!((tsla[1].ret - (-0.5)).abs() < 1e-10);

        // Constant +10% returns → volatility 0 once the window fills.
        assert!(aapl[0].rolling_volatility.is_nan());
        assert!(aapl[1].rolling_volatility.is_nan());
        assert!(aapl[2].rolling_volatility.abs() < 1e-10);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn partition_info_reports_counts_and_sizes() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        store
            .write_partitioned(
                &[
                    bar("AAPL", ts(17, 9, 30), 100.0, 500),
                    bar("AAPL", ts(17, 9, 31), 101.0, 600),
                    bar("TSLA", ts(17, 9, 30), 200.0, 900),
                ],
                &sample_tickers(),
            )
            .unwrap();

        let infos = store.partition_info().unwrap();
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].symbol, "AAPL");
        assert_eq!(infos[0].row_count, 2);
        assert_eq!(infos[0].file_count, 1);
        assert!(infos[0].size_bytes > 0);
        assert_eq!(infos[1].symbol, "TSLA");
        assert_eq!(infos[1].row_count, 1);

        assert!(store.storage_size() > 0);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn meta_sidecar_roundtrip() {
        let dir = temp_store_dir();
        let store = ColumnarStore::new(&dir);

        store
            .write_partitioned(
                &[
                    bar("AAPL", ts(17, 9, 30), 100.0, 500),
                    bar("AAPL", ts(17, 9, 31), 101.0, 600),
                ],
                &sample_tickers(),
            )
            .unwrap();

        let meta = store.read_meta("AAPL").unwrap();
        assert_eq!(meta.symbol, "AAPL");
        assert_eq!(meta.row_count, 2);
        assert_eq!(meta.start, ts(17, 9, 30));
        assert_eq!(meta.end, ts(17, 9, 31));
        assert!(!meta.data_hash.is_empty());

        let _ = fs::remove_dir_all(&dir);
    }
}
