//! Working-Memory Cache
//!
//! `lru::LruCache` supplies the bounded store and touch order; this layer
//! adds the fitness/decay/burn bookkeeping and the priority ordering that
//! sleep consolidation consumes.

use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::tensor::{cosine_similarity, Tensor};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Smallest permitted capacity.
pub const MIN_CAPACITY: usize = 8;

/// Default capacity.
pub const DEFAULT_CAPACITY: usize = 128;

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for the working-memory cache
#[derive(Debug, Clone)]
pub struct WorkingMemoryConfig {
    /// Maximum entry count (clamped to at least [`MIN_CAPACITY`])
    pub capacity: usize,
    /// Additive decay boost applied on re-promotion, capped at 1.0
    pub decay_bump: f64,
    /// Lowest value time decay may reduce an entry's decay term to
    pub decay_floor: f64,
}

impl Default for WorkingMemoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            decay_bump: 0.2,
            decay_floor: 0.05,
        }
    }
}

// ============================================================================
// CACHE ENTRY
// ============================================================================

/// One working-memory entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    /// Ingest fingerprint
    pub key: String,
    /// Dataset type of the originating stream
    pub dataset_type: String,
    /// Dataset id of the originating stream
    pub dataset_id: String,
    /// Encoded unit vector
    pub vector: Tensor,
    /// Fitness in [0, 1]
    pub fitness: f64,
    /// Decay term in [0, 1]; multiplies into lookup scores
    pub decay: f64,
    /// Normalized burn of the most recent promotion
    pub last_burn: f64,
    /// Running mean normalized burn
    pub mean_burn: f64,
    /// Number of burn samples accumulated
    pub burn_samples: u32,
    /// Number of promotions and gated lookups that touched this entry
    pub hits: u64,
    /// Logical touch clock (monotonic, cache-wide)
    pub last_touch: u64,
    /// Set when the kernel could not resolve the input
    pub anomaly: bool,
    /// Geometric gap toward the required state, attached with the anomaly
    pub constraint: Option<Tensor>,
}

impl CacheEntry {
    /// Burn efficiency: `1 - mean_burn`, or 0.5 with no samples yet.
    pub fn efficiency(&self) -> f64 {
        if self.burn_samples == 0 {
            0.5
        } else {
            (1.0 - self.mean_burn).clamp(0.0, 1.0)
        }
    }

    /// Consolidation priority:
    /// `fitness · decay · (0.6 + 0.4 · efficiency) + 0.02 · hits`.
    pub fn priority(&self) -> f64 {
        self.fitness * self.decay * (0.6 + 0.4 * self.efficiency()) + 0.02 * self.hits as f64
    }
}

/// A gated lookup match.
#[derive(Debug, Clone)]
pub struct CacheHit {
    /// Deep copy of the matched entry
    pub entry: CacheEntry,
    /// Raw cosine similarity to the query
    pub similarity: f64,
    /// Gating score: `similarity · decay`
    pub score: f64,
}

// ============================================================================
// WORKING MEMORY
// ============================================================================

/// Bounded LRU working memory.
pub struct WorkingMemory {
    entries: LruCache<String, CacheEntry>,
    clock: u64,
    config: WorkingMemoryConfig,
}

impl Default for WorkingMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkingMemory {
    /// Create a cache with the default configuration.
    pub fn new() -> Self {
        Self::with_config(WorkingMemoryConfig::default())
    }

    /// Create a cache with a custom configuration.
    pub fn with_config(config: WorkingMemoryConfig) -> Self {
        let capacity = config.capacity.max(MIN_CAPACITY);
        Self {
            entries: LruCache::new(
                NonZeroUsize::new(capacity).expect("capacity is floored above zero"),
            ),
            clock: 0,
            config: WorkingMemoryConfig { capacity, ..config },
        }
    }

    /// Current entry count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no entries are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// True when the key is cached (does not touch recency).
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Deep copy of one entry (does not touch recency).
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.peek(key).cloned()
    }

    /// Upsert an entry. Existing entries keep their hit history: decay is
    /// bumped, burn statistics fold in the new sample, and the vector and
    /// fitness are refreshed. Inserting past capacity evicts the
    /// least-recently-touched key.
    pub fn promote(
        &mut self,
        key: &str,
        vector: Tensor,
        fitness: f64,
        dataset_type: &str,
        dataset_id: &str,
        normalized_burn: f64,
    ) {
        self.clock += 1;
        let clock = self.clock;
        let fitness = fitness.clamp(0.0, 1.0);
        let burn = normalized_burn.clamp(0.0, 1.0);
        let bump = self.config.decay_bump;

        if let Some(entry) = self.entries.get_mut(key) {
            entry.vector = vector;
            entry.fitness = fitness;
            entry.decay = (entry.decay + bump).min(1.0);
            entry.mean_burn = (entry.mean_burn * entry.burn_samples as f64 + burn)
                / (entry.burn_samples + 1) as f64;
            entry.last_burn = burn;
            entry.burn_samples += 1;
            entry.hits += 1;
            entry.last_touch = clock;
            return;
        }

        let evicting = self.entries.len() == self.config.capacity;
        if evicting {
            if let Some((victim, _)) = self.entries.peek_lru() {
                tracing::debug!(victim = %victim, "evicting least-recently-touched entry");
            }
        }
        self.entries.put(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                dataset_type: dataset_type.to_string(),
                dataset_id: dataset_id.to_string(),
                vector,
                fitness,
                decay: 1.0,
                last_burn: burn,
                mean_burn: burn,
                burn_samples: 1,
                hits: 1,
                last_touch: clock,
                anomaly: false,
                constraint: None,
            },
        );
    }

    /// Cosine-gated lookup: among entries whose vector matches the query's
    /// element count, pick the one maximizing `cos · decay` and accept it
    /// only when that score reaches `threshold`. A hit touches the entry.
    pub fn lookup(&mut self, query: &Tensor, threshold: f64) -> Option<CacheHit> {
        let mut best: Option<(String, f64, f64)> = None;
        for (key, entry) in self.entries.iter() {
            if entry.vector.len() != query.len() {
                continue;
            }
            let similarity = cosine_similarity(query, &entry.vector);
            let score = similarity * entry.decay;
            if best.as_ref().is_none_or(|(_, _, s)| score > *s) {
                best = Some((key.clone(), similarity, score));
            }
        }

        let (key, similarity, score) = best?;
        if score < threshold {
            return None;
        }
        self.clock += 1;
        let clock = self.clock;
        let entry = self.entries.get_mut(&key)?;
        entry.hits += 1;
        entry.last_touch = clock;
        Some(CacheHit {
            entry: entry.clone(),
            similarity,
            score,
        })
    }

    /// Deep copies of up to `k` most-recently-touched entries whose vectors
    /// hold `len` elements. Does not touch recency.
    pub fn candidates(&self, len: usize, k: usize) -> Vec<CacheEntry> {
        self.entries
            .iter()
            .filter(|(_, e)| e.vector.len() == len)
            .take(k)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Multiply every entry's decay by `factor`, clamped at the floor.
    pub fn decay_all(&mut self, factor: f64) {
        let factor = factor.clamp(0.0, 1.0);
        let floor = self.config.decay_floor;
        for (_, entry) in self.entries.iter_mut() {
            entry.decay = (entry.decay * factor).max(floor);
        }
    }

    /// Priority-ordered deep-copy snapshot, best first. Ties break toward
    /// the most recent touch.
    pub fn priority_snapshot(&self, limit: usize) -> Vec<CacheEntry> {
        let mut entries: Vec<CacheEntry> =
            self.entries.iter().map(|(_, e)| e.clone()).collect();
        entries.sort_by(|a, b| {
            b.priority()
                .partial_cmp(&a.priority())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.last_touch.cmp(&a.last_touch))
        });
        entries.truncate(limit);
        entries
    }

    /// Flag an entry anomalous and attach its deduced constraint.
    /// Returns false when the key is not cached.
    pub fn mark_anomaly(&mut self, key: &str, constraint: Option<Tensor>) -> bool {
        match self.entries.peek_mut(key) {
            Some(entry) => {
                entry.anomaly = true;
                entry.constraint = constraint;
                true
            }
            None => false,
        }
    }

    /// Deep copies of every anomaly-flagged entry.
    pub fn anomalies(&self) -> Vec<CacheEntry> {
        self.entries
            .iter()
            .filter(|(_, e)| e.anomaly)
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Clear every anomaly flag and constraint.
    pub fn clear_anomalies(&mut self) {
        for (_, entry) in self.entries.iter_mut() {
            entry.anomaly = false;
            entry.constraint = None;
        }
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Keys in most-recently-touched order (for tests and diagnostics).
    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
