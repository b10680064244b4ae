//! Dataset record types.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

// == Holiday Record ==
/// One calendar day as published by the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    /// `YYYYMMDD`
    pub date: String,
    /// Weekday label
    pub week: String,
    #[serde(rename = "isHoliday")]
    pub is_holiday: bool,
    /// Holiday name, empty on ordinary days
    pub description: String,
}

/// A validated year of records, shared between the cache and callers.
pub type YearDataset = Arc<Vec<HolidayRecord>>;
