//! Payload size heuristics used by `memory_usage`.

use std::sync::Arc;

use serde::Serialize;

/// Estimated bytes per element of a sequence.
pub const SEQUENCE_ELEMENT_BYTES: usize = 100;

/// Fallback estimate for scalars.
pub const SCALAR_BYTES: usize = 8;

/// Rough payload size of a cached value.
///
/// Strings count their length, sequences a fixed cost per element and
/// structured values the length of their JSON encoding.
pub trait MemoryFootprint {
    fn estimated_bytes(&self) -> usize;
}

/// Length of the JSON encoding, or 0 if the value does not serialize.
pub fn serialized_len<T: Serialize + ?Sized>(value: &T) -> usize {
    serde_json::to_vec(value).map(|v| v.len()).unwrap_or(0)
}

impl MemoryFootprint for String {
    fn estimated_bytes(&self) -> usize {
        self.len()
    }
}

impl<T> MemoryFootprint for Vec<T> {
    fn estimated_bytes(&self) -> usize {
        self.len() * SEQUENCE_ELEMENT_BYTES
    }
}

impl MemoryFootprint for serde_json::Value {
    fn estimated_bytes(&self) -> usize {
        match self {
            serde_json::Value::String(s) => s.len(),
            serde_json::Value::Array(items) => items.len() * SEQUENCE_ELEMENT_BYTES,
            serde_json::Value::Object(_) => serialized_len(self),
            _ => SCALAR_BYTES,
        }
    }
}

impl<T: MemoryFootprint + ?Sized> MemoryFootprint for Arc<T> {
    fn estimated_bytes(&self) -> usize {
        (**self).estimated_bytes()
    }
}

macro_rules! scalar_footprint {
    ($($ty:ty),*) => {
        $(impl MemoryFootprint for $ty {
            fn estimated_bytes(&self) -> usize {
                SCALAR_BYTES
            }
        })*
    };
}

scalar_footprint!(bool, u32, u64, i32, i64, usize, f64);
