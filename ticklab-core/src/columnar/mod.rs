//! Partitioned columnar backend (Parquet) and rolling-window statistics.

pub mod rolling;
pub mod schema;
pub mod store;

pub use schema::BarSchema;
pub use store::{
    BarColumn, ColumnarStore, PartitionInfo, PartitionMeta, RollingAveragePoint, VolatilityPoint,
};
