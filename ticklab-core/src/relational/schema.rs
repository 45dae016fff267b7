//! Relational DDL and schema compatibility checking.

use crate::error::StoreError;
use rusqlite::Connection;

/// Two-table normalized schema: ticker dimension + price fact table.
///
/// `prices` carries a foreign key into `tickers` and a uniqueness
/// constraint on (ticker_id, timestamp) — at most one bar per ticker per
/// minute. Timestamps are TEXT in `%Y-%m-%d %H:%M:%S` form so `DATE()`
/// groups by calendar date and lexical comparison orders chronologically.
pub(crate) const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS tickers (
    ticker_id INTEGER PRIMARY KEY,
    symbol    TEXT NOT NULL UNIQUE,
    name      TEXT,
    exchange  TEXT
);

CREATE TABLE IF NOT EXISTS prices (
    timestamp TEXT    NOT NULL,
    ticker_id INTEGER NOT NULL REFERENCES tickers (ticker_id),
    open      REAL    NOT NULL,
    high      REAL    NOT NULL,
    low       REAL    NOT NULL,
    close     REAL    NOT NULL,
    volume    INTEGER NOT NULL,
    UNIQUE (ticker_id, timestamp)
);

CREATE INDEX IF NOT EXISTS idx_prices_ticker_time ON prices (ticker_id, timestamp);
";

const TICKER_COLUMNS: &[&str] = &["ticker_id", "symbol", "name", "exchange"];
const PRICE_COLUMNS: &[&str] = &[
    "timestamp",
    "ticker_id",
    "open",
    "high",
    "low",
    "close",
    "volume",
];

/// Idempotently create the schema.
///
/// If a table named `tickers` or `prices` already exists with a different
/// column set, nothing is executed and a `Schema` error is returned — the
/// caller must drop or migrate.
pub(crate) fn ensure_schema(conn: &Connection) -> Result<(), StoreError> {
    check_compatible(conn, "tickers", TICKER_COLUMNS)?;
    check_compatible(conn, "prices", PRICE_COLUMNS)?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

fn check_compatible(
    conn: &Connection,
    table: &str,
    expected: &[&str],
) -> Result<(), StoreError> {
    if !table_exists(conn, table)? {
        return Ok(());
    }
    let actual = table_columns(conn, table)?;
    if actual != expected {
        return Err(StoreError::Schema(format!(
            "table '{table}' exists with columns [{}], expected [{}]",
            actual.join(", "),
            expected.join(", ")
        )));
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> Result<bool, StoreError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
