//! Calendar dataset client wired through the cache, breaker and throttler.

mod dataset;
mod models;

pub use dataset::{
    cache_key, validate_records, ClientConfig, DatasetClient, DEFAULT_BASE_URL, MAX_YEAR, MIN_YEAR,
};
pub use models::{HolidayRecord, YearDataset};
