//! SQLite-backed relational store: bulk load plus four analytical queries.
//!
//! Each store owns its own connection and path — constructed once per
//! process and passed by reference, never a process-wide singleton. Bulk
//! inserts run inside a single transaction, so readers see either the
//! fully-loaded dataset or the pre-load state, never a partial one.

use crate::domain::{PriceBar, Ticker, TickerIndex};
use crate::error::StoreError;
use crate::relational::schema;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Average of per-calendar-date volume sums for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub struct AvgDailyVolume {
    pub symbol: String,
    pub avg_daily_volume: f64,
}

/// Full-period return for one ticker, from its earliest to latest bar.
#[derive(Debug, Clone, PartialEq)]
pub struct TickerReturn {
    pub symbol: String,
    pub first_price: f64,
    pub last_price: f64,
    pub return_pct: f64,
}

/// Earliest and latest close of one ticker on one calendar date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPriceEdges {
    pub symbol: String,
    pub trade_date: NaiveDate,
    pub first_price: f64,
    pub first_time: NaiveDateTime,
    pub last_price: f64,
    pub last_time: NaiveDateTime,
}

/// The relational backend.
pub struct RelationalStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl RelationalStore {
    /// Open (creating if absent) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn,
            path: Some(path),
        })
    }

    /// Open an in-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self { conn, path: None })
    }

    /// Idempotently create the two-table schema.
    ///
    /// Fails with `StoreError::Schema` if an incompatible table of the same
    /// name already exists.
    pub fn create_schema(&self) -> Result<(), StoreError> {
        schema::ensure_schema(&self.conn)?;
        debug!("relational schema ready");
        Ok(())
    }

    /// Bulk-insert ticker rows in one transaction.
    ///
    /// A repeated symbol — within the batch or against existing rows —
    /// fails the whole call with `DuplicateSymbol`; nothing is committed.
    pub fn insert_tickers(&mut self, tickers: &[Ticker]) -> Result<(), StoreError> {
        let mut seen = HashSet::new();
        for ticker in tickers {
            if !seen.insert(ticker.symbol.as_str()) {
                return Err(StoreError::DuplicateSymbol {
                    symbol: ticker.symbol.clone(),
                });
            }
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO tickers (ticker_id, symbol, name, exchange)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for ticker in tickers {
                stmt.execute(params![
                    ticker.ticker_id,
                    ticker.symbol,
                    ticker.name,
                    ticker.exchange,
                ])
                .map_err(|e| map_constraint_error(e, &ticker.symbol))?;
            }
        }
        tx.commit()?;

        info!(count = tickers.len(), "inserted tickers");
        Ok(())
    }

    /// Bulk-insert price bars in one transaction, resolving each bar's
    /// symbol through `index`.
    ///
    /// All-or-nothing: a bar with an unknown symbol (`UnknownTicker`) or a
    /// uniqueness/FK failure (`ConstraintViolation`) rolls the entire batch
    /// back.
    pub fn insert_price_bars(
        &mut self,
        bars: &[PriceBar],
        index: &TickerIndex,
    ) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO prices (timestamp, ticker_id, open, high, low, close, volume)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for bar in bars {
                let ticker_id =
                    index
                        .get(&bar.symbol)
                        .ok_or_else(|| StoreError::UnknownTicker {
                            symbol: bar.symbol.clone(),
                        })?;
                stmt.execute(params![
                    fmt_ts(&bar.timestamp),
                    ticker_id,
                    bar.open,
                    bar.high,
                    bar.low,
                    bar.close,
                    bar.volume as i64,
                ])
                .map_err(|e| map_constraint_error(e, &bar.symbol))?;
            }
        }
        tx.commit()?;

        info!(count = bars.len(), "inserted price bars");
        Ok(())
    }

    /// All ticker rows, ordered by ticker_id.
    pub fn tickers(&self) -> Result<Vec<Ticker>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT ticker_id, symbol, name, exchange FROM tickers ORDER BY ticker_id",
        )?;
        let tickers = stmt
            .query_map([], |row| {
                Ok(Ticker {
                    ticker_id: row.get(0)?,
                    symbol: row.get(1)?,
                    name: row.get(2)?,
                    exchange: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tickers)
    }

    /// Build the symbol → ticker_id index from the ticker table.
    pub fn ticker_index(&self) -> Result<TickerIndex, StoreError> {
        Ok(TickerIndex::from_tickers(&self.tickers()?))
    }

    /// Query 1: all bars for `symbol` with `start <= timestamp <= end`,
    /// ascending by timestamp.
    ///
    /// An unknown symbol yields an empty Vec, not an error — the relational
    /// join simply matches nothing.
    pub fn query_by_date_range(
        &self,
        symbol: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<PriceBar>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT p.timestamp, t.symbol, p.open, p.high, p.low, p.close, p.volume
             FROM prices p
             JOIN tickers t ON p.ticker_id = t.ticker_id
             WHERE t.symbol = ?1
               AND p.timestamp >= ?2
               AND p.timestamp <= ?3
             ORDER BY p.timestamp",
        )?;
        let bars = stmt
            .query_map(params![symbol, fmt_ts(&start), fmt_ts(&end)], |row| {
                Ok(PriceBar {
                    timestamp: ts_from_sql(0, row.get::<_, String>(0)?)?,
                    symbol: row.get(1)?,
                    open: row.get(2)?,
                    high: row.get(3)?,
                    low: row.get(4)?,
                    close: row.get(5)?,
                    volume: row.get::<_, i64>(6)? as u64,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(symbol, rows = bars.len(), "range query");
        Ok(bars)
    }

    /// Query 2: per ticker, the mean of per-calendar-date volume sums,
    /// descending by the average (symbol ascending on ties).
    ///
    /// Tickers with zero bars are omitted.
    pub fn query_average_daily_volume(&self) -> Result<Vec<AvgDailyVolume>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.symbol, AVG(daily.daily_volume) AS avg_daily_volume
             FROM (
                 SELECT ticker_id, DATE(timestamp) AS trade_date, SUM(volume) AS daily_volume
                 FROM prices
                 GROUP BY ticker_id, DATE(timestamp)
             ) daily
             JOIN tickers t ON daily.ticker_id = t.ticker_id
             GROUP BY t.symbol
             ORDER BY avg_daily_volume DESC, t.symbol ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(AvgDailyVolume {
                    symbol: row.get(0)?,
                    avg_daily_volume: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Query 3: top `top_n` tickers by full-period return.
    ///
    /// For each ticker, first/last are the bars at its minimum and maximum
    /// timestamps; `return_pct = (last - first) / first * 100`. Equal
    /// returns tie-break on ascending symbol. A single-bar ticker returns
    /// 0.0 (first and last coincide).
    pub fn query_top_tickers_by_return(
        &self,
        top_n: usize,
    ) -> Result<Vec<TickerReturn>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.symbol,
                    p1.close AS first_price,
                    p2.close AS last_price,
                    (p2.close - p1.close) / p1.close * 100.0 AS return_pct
             FROM (
                 SELECT ticker_id, MIN(timestamp) AS first_time, MAX(timestamp) AS last_time
                 FROM prices
                 GROUP BY ticker_id
             ) span
             JOIN tickers t ON span.ticker_id = t.ticker_id
             JOIN prices p1 ON p1.ticker_id = span.ticker_id AND p1.timestamp = span.first_time
             JOIN prices p2 ON p2.ticker_id = span.ticker_id AND p2.timestamp = span.last_time
             ORDER BY return_pct DESC, t.symbol ASC
             LIMIT ?1",
        )?;
        let rows = stmt
            .query_map(params![top_n as i64], |row| {
                Ok(TickerReturn {
                    symbol: row.get(0)?,
                    first_price: row.get(1)?,
                    last_price: row.get(2)?,
                    return_pct: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Query 4: for every (ticker, calendar date) pair, the close and
    /// timestamp of the earliest and latest bar that day, ordered by date
    /// then symbol.
    pub fn query_daily_first_last_prices(&self) -> Result<Vec<DailyPriceEdges>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT t.symbol,
                    firsts.trade_date,
                    fp.close AS first_price,
                    firsts.first_time,
                    lp.close AS last_price,
                    lasts.last_time
             FROM tickers t
             JOIN (
                 SELECT ticker_id, DATE(timestamp) AS trade_date, MIN(timestamp) AS first_time
                 FROM prices
                 GROUP BY ticker_id, DATE(timestamp)
             ) firsts ON t.ticker_id = firsts.ticker_id
             JOIN prices fp ON fp.ticker_id = firsts.ticker_id AND fp.timestamp = firsts.first_time
             JOIN (
                 SELECT ticker_id, DATE(timestamp) AS trade_date, MAX(timestamp) AS last_time
                 FROM prices
                 GROUP BY ticker_id, DATE(timestamp)
             ) lasts ON lasts.ticker_id = firsts.ticker_id
                    AND lasts.trade_date = firsts.trade_date
             JOIN prices lp ON lp.ticker_id = lasts.ticker_id AND lp.timestamp = lasts.last_time
             ORDER BY firsts.trade_date, t.symbol",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(DailyPriceEdges {
                    symbol: row.get(0)?,
                    trade_date: date_from_sql(1, row.get::<_, String>(1)?)?,
                    first_price: row.get(2)?,
                    first_time: ts_from_sql(3, row.get::<_, String>(3)?)?,
                    last_price: row.get(4)?,
                    last_time: ts_from_sql(5, row.get::<_, String>(5)?)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// On-disk size of the database file in bytes (0 for in-memory).
    pub fn database_size(&self) -> u64 {
        self.path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0)
    }

    /// Path of the database file, if file-backed.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn fmt_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

fn ts_from_sql(idx: usize, raw: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&raw, TS_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn date_from_sql(idx: usize, raw: String) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(&raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map SQLite constraint failures to the typed taxonomy.
///
/// A unique violation on `tickers.symbol` is a duplicate-symbol insert;
/// everything else constraint-shaped (FK, (ticker_id, timestamp) unique)
/// is a `ConstraintViolation`.
fn map_constraint_error(err: rusqlite::Error, symbol: &str) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, Some(msg))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            if msg.contains("tickers.symbol") {
                StoreError::DuplicateSymbol {
                    symbol: symbol.to_string(),
                }
            } else {
                StoreError::ConstraintViolation(msg.clone())
            }
        }
        _ => StoreError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

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
                name: Some("Apple Inc.".into()),
                exchange: Some("NASDAQ".into()),
            },
            Ticker {
                ticker_id: 2,
                symbol: "TSLA".into(),
                name: Some("Tesla Inc.".into()),
                exchange: Some("NASDAQ".into()),
            },
        ]
    }

    fn loaded_store(bars: &[PriceBar]) -> RelationalStore {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.insert_tickers(&sample_tickers()).unwrap();
        let index = store.ticker_index().unwrap();
        store.insert_price_bars(bars, &index).unwrap();
        store
    }

    #[test]
    fn duplicate_symbol_in_batch_rejected() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store.create_schema().unwrap();

        let mut tickers = sample_tickers();
        tickers.push(Ticker {
            ticker_id: 3,
            symbol: "AAPL".into(),
            name: None,
            exchange: None,
        });

        let result = store.insert_tickers(&tickers);
        assert!(matches!(
            result,
            Err(StoreError::DuplicateSymbol { ref symbol }) if symbol == "AAPL"
        ));
        // Nothing committed
        assert!(store.tickers().unwrap().is_empty());
    }

    #[test]
    fn duplicate_symbol_against_existing_rows_rejected() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.insert_tickers(&sample_tickers()).unwrap();

        let result = store.insert_tickers(&[Ticker {
            ticker_id: 9,
            symbol: "TSLA".into(),
            name: None,
            exchange: None,
        }]);
        assert!(matches!(result, Err(StoreError::DuplicateSymbol { .. })));
    }

    #[test]
    fn unknown_ticker_rolls_back_whole_batch() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.insert_tickers(&sample_tickers()).unwrap();
        let index = store.ticker_index().unwrap();

        let bars = vec![
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 9, 31), 101.0, 600),
            bar("ZZZZ", ts(17, 9, 32), 50.0, 100),
        ];
        let result = store.insert_price_bars(&bars, &index);
        assert!(matches!(
            result,
            Err(StoreError::UnknownTicker { ref symbol }) if symbol == "ZZZZ"
        ));

        // No row from the poisoned batch is visible through any query.
        let visible = store
            .query_by_date_range("AAPL", ts(17, 0, 0), ts(18, 0, 0))
            .unwrap();
        assert!(visible.is_empty());
    }

    #[test]
    fn duplicate_bar_violates_uniqueness_atomically() {
        let mut store = RelationalStore::open_in_memory().unwrap();
        store.create_schema().unwrap();
        store.insert_tickers(&sample_tickers()).unwrap();
        let index = store.ticker_index().unwrap();

        let bars = vec![
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 9, 30), 100.5, 700),
        ];
        let result = store.insert_price_bars(&bars, &index);
        assert!(matches!(result, Err(StoreError::ConstraintViolation(_))));
        assert!(store
            .query_by_date_range("AAPL", ts(17, 0, 0), ts(18, 0, 0))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn range_query_is_inclusive_and_ordered() {
        let store = loaded_store(&[
            bar("AAPL", ts(17, 9, 31), 101.0, 600),
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 9, 32), 102.0, 700),
            bar("TSLA", ts(17, 9, 31), 200.0, 900),
        ]);

        let rows = store
            .query_by_date_range("AAPL", ts(17, 9, 30), ts(17, 9, 31))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, ts(17, 9, 30));
        assert_eq!(rows[1].timestamp, ts(17, 9, 31));
        assert!(rows.iter().all(|b| b.symbol == "AAPL"));
    }

    #[test]
    fn unknown_symbol_range_query_is_empty_not_error() {
        let store = loaded_store(&[bar("AAPL", ts(17, 9, 30), 100.0, 500)]);
        let rows = store
            .query_by_date_range("ZZZZ", ts(17, 0, 0), ts(18, 0, 0))
            .unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn average_daily_volume_means_per_date_sums() {
        // AAPL: day 17 volume 500+600=1100, day 18 volume 300 → avg 700
        // TSLA: day 17 volume 900 → avg 900
        let store = loaded_store(&[
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 9, 31), 101.0, 600),
            bar("AAPL", ts(18, 9, 30), 102.0, 300),
            bar("TSLA", ts(17, 9, 30), 200.0, 900),
        ]);

        let rows = store.query_average_daily_volume().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].symbol, "TSLA");
        assert!((rows[0].avg_daily_volume - 900.0).abs() < 1e-9);
        assert_eq!(rows[1].symbol, "AAPL");
        assert!((rows[1].avg_daily_volume - 700.0).abs() < 1e-9);
    }

    #[test]
    fn top_return_ranks_descending() {
        // AAPL 100 → 150 = +50%; TSLA 200 → 180 = -10%
        let store = loaded_store(&[
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(18, 9, 30), 150.0, 500),
            bar("TSLA", ts(17, 9, 30), 200.0, 900),
            bar("TSLA", ts(18, 9, 30), 180.0, 900),
        ]);

        let rows = store.query_top_tickers_by_return(1).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].symbol, "AAPL");
        assert!((rows[0].return_pct - 50.0).abs() < 1e-9);
        assert!((rows[0].first_price - 100.0).abs() < 1e-9);
        assert!((rows[0].last_price - 150.0).abs() < 1e-9);
    }

    #[test]
    fn top_return_ties_break_on_symbol() {
        // Both tickers flat → both 0.0%; AAPL sorts before TSLA.
        let store = loaded_store(&[
            bar("TSLA", ts(17, 9, 30), 200.0, 900),
            bar("TSLA", ts(18, 9, 30), 200.0, 900),
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(18, 9, 30), 100.0, 500),
        ]);

        let rows = store.query_top_tickers_by_return(2).unwrap();
        assert_eq!(rows[0].symbol, "AAPL");
        assert_eq!(rows[1].symbol, "TSLA");
    }

    #[test]
    fn single_bar_ticker_has_zero_return() {
        let store = loaded_store(&[bar("AAPL", ts(17, 9, 30), 100.0, 500)]);
        let rows = store.query_top_tickers_by_return(5).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].return_pct - 0.0).abs() < 1e-9);
    }

    #[test]
    fn daily_edges_pick_earliest_and_latest_bars() {
        let store = loaded_store(&[
            bar("AAPL", ts(17, 9, 31), 101.0, 600),
            bar("AAPL", ts(17, 9, 30), 100.0, 500),
            bar("AAPL", ts(17, 16, 0), 104.0, 800),
            bar("AAPL", ts(18, 9, 30), 105.0, 300),
        ]);

        let rows = store.query_daily_first_last_prices().unwrap();
        assert_eq!(rows.len(), 2);

        let day17 = &rows[0];
        assert_eq!(day17.trade_date, NaiveDate::from_ymd_opt(2025, 11, 17).unwrap());
        assert_eq!(day17.first_time, ts(17, 9, 30));
        assert!((day17.first_price - 100.0).abs() < 1e-9);
        assert_eq!(day17.last_time, ts(17, 16, 0));
        assert!((day17.last_price - 104.0).abs() < 1e-9);

        let day18 = &rows[1];
        assert_eq!(day18.first_time, ts(18, 9, 30));
        assert_eq!(day18.last_time, ts(18, 9, 30));
    }

    #[test]
    fn timestamps_roundtrip_through_text_storage() {
        let original = ts(17, 23, 59);
        let store = loaded_store(&[bar("AAPL", original, 100.0, 500)]);
        let rows = store
            .query_by_date_range("AAPL", ts(17, 0, 0), ts(18, 0, 0))
            .unwrap();
        assert_eq!(rows[0].timestamp, original);
    }
}
