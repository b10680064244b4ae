//! Cache Module
//!
//! In-memory caching with per-entry TTL, lazy expiry and LRU eviction.

mod entry;
mod footprint;
mod lru;
mod smart;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use footprint::{serialized_len, MemoryFootprint, SCALAR_BYTES, SEQUENCE_ELEMENT_BYTES};
pub use lru::LruTracker;
pub use smart::{CacheConfig, SmartCache};
pub use stats::{CacheCounters, CacheStats};
pub use store::{CacheStore, ENTRY_OVERHEAD_BYTES, RECENCY_SLOT_BYTES};
