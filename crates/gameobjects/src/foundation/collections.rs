//! Specialized collection types

pub use slotmap::{new_key_type, Key, SlotMap};

/// Handle-based map using slot map for stable references
///
/// Removing an element invalidates its key; a stale key never aliases a
/// newer element because slot map keys carry a generation.
pub type HandleMap<K, T> = SlotMap<K, T>;
