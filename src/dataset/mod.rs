//! The persisted spot dataset.
//!
//! One CSV file with a fixed header, written atomically by the fetcher and
//! read back into a validated [`Dataset`](crate::models::Dataset) by the loader.

pub mod loader;
pub mod record;
pub mod store;

pub use loader::load_dataset;
pub use record::{parse_timestamp, SpotRecord, TIMESTAMP_FORMAT};
pub use store::write_dataset;

/// File name of the dataset inside the data directory.
pub const DATASET_FILE_NAME: &str = "wspr_spots.csv";
