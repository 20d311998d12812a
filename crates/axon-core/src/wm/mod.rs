//! Working-Memory Module
//!
//! Bounded LRU cache keyed by ingest fingerprint. Entries carry fitness,
//! a multiplicative decay term, hit counts, metabolic-burn statistics, and
//! an anomaly flag with an optional deduced constraint for sleep-time
//! consumption. Lookup is cosine-gated and weighted by decay so stale
//! entries stop answering before they are evicted.

mod cache;

pub use cache::{
    CacheEntry, CacheHit, WorkingMemory, WorkingMemoryConfig, DEFAULT_CAPACITY, MIN_CAPACITY,
};
