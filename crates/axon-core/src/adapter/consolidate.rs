//! Sleep Consolidation
//!
//! Walks a priority snapshot of working memory and promotes entries that
//! earned their keep (high fitness, low burn) into the reflex store, then
//! replays each promoted vector into episodic memory. Consolidation never
//! fails: entries that cannot be promoted are skipped and counted.

use std::collections::BTreeMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::episodic::EpisodicMemory;
use crate::reflex::{PromoteOutcome, ReflexStore};
use crate::wm::WorkingMemory;

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for sleep consolidation
#[derive(Debug, Clone)]
pub struct ConsolidationConfig {
    /// Minimum fitness for promotion
    pub min_fitness: f64,
    /// Maximum mean normalized burn for promotion
    pub max_burn: f64,
    /// Size of the priority snapshot examined per run
    pub max_entries: usize,
    /// Working-memory time-decay factor applied each sleep
    pub time_decay_factor: f64,
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self {
            min_fitness: 0.5,
            max_burn: 0.75,
            max_entries: 16,
            time_decay_factor: 0.98,
        }
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Result of one consolidation run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsolidationReport {
    /// Entries examined from the priority snapshot
    pub examined: usize,
    /// Reflexes inserted or strengthened
    pub promoted: usize,
    /// Entries skipped (below fitness, above burn, or duplicates)
    pub skipped: usize,
    /// Vectors replayed into episodic memory
    pub episodic_stored: usize,
    /// Run duration in milliseconds
    pub duration_ms: i64,
}

// ============================================================================
// CONSOLIDATION
// ============================================================================

/// Reflex id derived from a cache fingerprint.
fn reflex_id_for(key: &str) -> String {
    let prefix: String = key.chars().take(12).collect();
    format!("reflex_{prefix}")
}

/// Run one consolidation pass over the cache snapshot.
pub fn consolidate_memory(
    cache: &WorkingMemory,
    reflexes: &mut ReflexStore,
    episodic: &mut EpisodicMemory,
    config: &ConsolidationConfig,
) -> ConsolidationReport {
    let start = Instant::now();
    let snapshot = cache.priority_snapshot(config.max_entries);
    let mut report = ConsolidationReport {
        examined: snapshot.len(),
        ..Default::default()
    };

    for entry in snapshot {
        if entry.fitness < config.min_fitness || entry.mean_burn > config.max_burn {
            report.skipped += 1;
            continue;
        }

        let mut meta = BTreeMap::new();
        meta.insert("label".to_string(), entry.dataset_type.clone());
        meta.insert("dataset_id".to_string(), entry.dataset_id.clone());
        meta.insert("stability".to_string(), format!("{:.6}", entry.fitness));
        meta.insert("source".to_string(), "sleep_consolidation".to_string());
        meta.insert("cache_hits".to_string(), entry.hits.to_string());
        meta.insert(
            "metabolic_burn".to_string(),
            format!("{:.6}", entry.mean_burn),
        );
        meta.insert("sequence_sha1".to_string(), entry.key.clone());

        let outcome = reflexes.promote(&reflex_id_for(&entry.key), Some(entry.vector.clone()), meta, false);
        match outcome {
            Ok(
                PromoteOutcome::Inserted
                | PromoteOutcome::Overwritten
                | PromoteOutcome::UpdatedMeta,
            ) => report.promoted += 1,
            Ok(_) => report.skipped += 1,
            Err(_) => {
                // Consolidation never fails; unpromotable entries are skipped.
                report.skipped += 1;
                continue;
            }
        }

        if episodic.store(&entry.vector).is_ok() {
            report.episodic_stored += 1;
        }
    }

    report.duration_ms = start.elapsed().as_millis() as i64;
    tracing::info!(
        examined = report.examined,
        promoted = report.promoted,
        skipped = report.skipped,
        "consolidation run complete"
    );
    report
}

// ============================================================================
// TESTS
// ============================================================================
