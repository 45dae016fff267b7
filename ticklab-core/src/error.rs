//! Shared error taxonomy for both storage backends.

use thiserror::Error;

/// Structured error types for store operations.
///
/// Every operation either returns a fully valid result or one of these;
/// neither backend retries internally or returns partial results.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Relational schema creation conflicts with an existing incompatible
    /// schema. Fatal to the operation; the caller must drop or migrate.
    #[error("schema conflict: {0}")]
    Schema(String),

    /// Ticker symbol collision during insert. Nothing from the batch is
    /// committed.
    #[error("duplicate ticker symbol '{symbol}'")]
    DuplicateSymbol { symbol: String },

    /// A price bar or query references a symbol with no corresponding
    /// ticker row (relational) or partition (columnar).
    #[error("unknown ticker '{symbol}'")]
    UnknownTicker { symbol: String },

    /// Uniqueness or foreign-key violation at insert time. Aborts the
    /// enclosing bulk insert atomically.
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    /// I/O failure while writing a partition. Previously written partitions
    /// in the batch stay intact; callers re-run the whole batch.
    #[error("partition write failed: {0}")]
    PartitionWrite(String),

    #[error("parquet I/O error: {0}")]
    Parquet(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
