//! Explicit schema for partition files.
//!
//! The partition key (ticker symbol) lives in the directory name, not in
//! the file, so partition files carry only timestamp + OHLCV columns. The
//! schema is declared here and validated on every write — column types are
//! never inferred from the data, so partition rewrites cannot drift.

use polars::prelude::*;

/// Expected schema of one partition's Parquet data.
pub struct BarSchema;

impl BarSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(
                "timestamp".into(),
                DataType::Datetime(TimeUnit::Milliseconds, None),
            ),
            Field::new("open".into(), DataType::Float64),
            Field::new("high".into(), DataType::Float64),
            Field::new("low".into(), DataType::Float64),
            Field::new("close".into(), DataType::Float64),
            Field::new("volume".into(), DataType::UInt64),
        ])
    }

    /// Validate a DataFrame against the declared schema.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaMismatch> {
        let expected = Self::schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let actual_dtype = actual
                .get(field.name())
                .ok_or_else(|| SchemaMismatch::MissingColumn(field.name().to_string()))?;
            if actual_dtype != field.dtype() {
                return Err(SchemaMismatch::TypeMismatch {
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: actual_dtype.clone(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaMismatch {
    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("type mismatch in column {column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        actual: DataType,
    },
}
