//! Serializable harness configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Harness configuration: store locations plus query parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    /// SQLite database file for the relational backend.
    pub sqlite_path: PathBuf,

    /// Root directory for the partitioned Parquet backend.
    pub parquet_dir: PathBuf,

    /// Where report artifacts are written.
    pub output_dir: PathBuf,

    pub queries: QueryParams,
}

/// Parameters of the logical query set the harness runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryParams {
    /// Symbol for the range and rolling-average queries.
    /// Defaults to the dataset's first ticker when unset.
    pub range_symbol: Option<String>,

    /// Top-N cutoff for the return ranking.
    pub top_n: usize,

    /// Window size for the rolling average.
    pub rolling_window: usize,

    /// Window size for the rolling volatility.
    pub volatility_window: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("market_data.db"),
            parquet_dir: PathBuf::from("market_data"),
            output_dir: PathBuf::from("results"),
            queries: QueryParams::default(),
        }
    }
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            range_symbol: None,
            top_n: 3,
            rolling_window: 5,
            volatility_window: 5,
        }
    }
}

impl BenchConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Self::from_toml(&std::fs::read_to_string(path)?)
    }
}
