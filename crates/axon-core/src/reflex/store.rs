//! Reflex Store
//!
//! The dictionary behind System 1. Reflexes refer to symbols by ordinal id
//! and resolve lazily at query time, so the symbol space stays the single
//! owner of vectors it minted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::symbols::{SymbolSpace, NO_SYMBOL_ID};
use crate::tensor::Tensor;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Reflex store error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReflexError {
    /// Reflex ids must be non-empty after normalization
    #[error("reflex id is empty")]
    MissingReflexId,
}

impl ReflexError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            ReflexError::MissingReflexId => "missing_reflex_id",
        }
    }
}

// ============================================================================
// OUTCOMES
// ============================================================================

/// Result of a promotion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoteOutcome {
    /// New reflex stored
    Inserted,
    /// Existing reflex replaced wholesale
    Overwritten,
    /// Higher-stability incoming merged its metadata into the resident
    UpdatedMeta,
    /// Resident kept; incoming offered nothing stronger
    Exists,
    /// Same sequence, bit-identical vector
    DuplicateExact,
    /// Same sequence, different vector, not stronger
    DuplicateSequence,
}

impl PromoteOutcome {
    /// Wire string for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromoteOutcome::Inserted => "inserted",
            PromoteOutcome::Overwritten => "overwritten",
            PromoteOutcome::UpdatedMeta => "updated_meta",
            PromoteOutcome::Exists => "exists",
            PromoteOutcome::DuplicateExact => "duplicate_exact",
            PromoteOutcome::DuplicateSequence => "duplicate_sequence",
        }
    }
}

impl std::fmt::Display for PromoteOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ENTRY AND QUERY TYPES
// ============================================================================

/// A stored reflex.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflexEntry {
    /// Normalized reflex id
    pub id: String,
    /// Optional stored vector
    pub vector: Option<Tensor>,
    /// Symbol ordinal, or [`NO_SYMBOL_ID`] when absent
    pub symbol_id: u32,
    /// Metadata; always carries a numeric `stability`
    pub meta: BTreeMap<String, String>,
}

impl ReflexEntry {
    /// Numeric `stability` metadata, defaulting to 0.
    pub fn stability(&self) -> f64 {
        self.meta
            .get("stability")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0)
    }

    /// Numeric `edits` metadata, defaulting to 0.
    pub fn edits(&self) -> i64 {
        self.meta
            .get("edits")
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(0)
    }
}

/// Query filter; scope is implied by which of `label`/`target` is set.
#[derive(Debug, Clone, Default)]
pub struct ReflexQuery {
    /// Restrict to reflexes whose `label` metadata equals this
    pub label: Option<String>,
    /// Restrict to reflexes whose `target_id` metadata equals this
    pub target: Option<String>,
    /// Minimum stability (inclusive)
    pub min_stability: f64,
    /// Result cap; 0 means unbounded
    pub limit: usize,
    /// Resolve vectors for each match
    pub include_vectors: bool,
}

/// One query match.
#[derive(Debug, Clone)]
pub struct ReflexMatch {
    /// Deep copy of the matched entry
    pub entry: ReflexEntry,
    /// Resolved vector, present when the query asked for vectors
    pub vector: Option<Tensor>,
}

// ============================================================================
// REFLEX STORE
// ============================================================================

/// Dictionary of reflexes with a sequence-SHA ownership index.
#[derive(Default, Debug)]
pub struct ReflexStore {
    entries: HashMap<String, ReflexEntry>,
    sequence_index: HashMap<String, String>,
}

impl ReflexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reflexes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no reflexes are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Deep copy of a reflex by (normalized) id.
    pub fn get(&self, id: &str) -> Option<ReflexEntry> {
        self.entries.get(&normalize_id(id)).cloned()
    }

    /// Which reflex currently owns a sequence SHA.
    pub fn sequence_owner(&self, sha: &str) -> Option<&str> {
        self.sequence_index.get(sha).map(String::as_str)
    }

    /// Promote a reflex. Sequence dedup runs first, then the id/overwrite
    /// rules; the sequence index is updated atomically with insertion.
    pub fn promote(
        &mut self,
        id: &str,
        vector: Option<Tensor>,
        meta: BTreeMap<String, String>,
        overwrite: bool,
    ) -> Result<PromoteOutcome, ReflexError> {
        let id = normalize_id(id);
        if id.is_empty() {
            return Err(ReflexError::MissingReflexId);
        }

        let incoming_stability = meta
            .get("stability")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(0.0);
        let incoming_symbol = meta
            .get("symbol_id")
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(NO_SYMBOL_ID);
        let sequence_sha = meta.get("sequence_sha1").cloned();

        // Sequence-based dedup against a different resident.
        if let Some(sha) = sequence_sha.as_deref() {
            if let Some(owner_id) = self.sequence_index.get(sha).cloned() {
                if let Some(owner) =
                    self.entries.get_mut(&owner_id).filter(|_| owner_id != id)
                {
                    if incoming_stability > owner.stability() {
                        merge_meta(owner, &meta, incoming_symbol);
                        tracing::debug!(
                            reflex = %owner_id,
                            sha = %sha,
                            "stronger duplicate merged metadata"
                        );
                        return Ok(PromoteOutcome::UpdatedMeta);
                    }
                    let exact = match (&vector, &owner.vector) {
                        (Some(a), Some(b)) => a.as_slice() == b.as_slice(),
                        (None, None) => true,
                        _ => false,
                    };
                    return Ok(if exact {
                        PromoteOutcome::DuplicateExact
                    } else {
                        PromoteOutcome::DuplicateSequence
                    });
                }
            }
        }

        if let Some(resident) = self.entries.get_mut(&id) {
            if !overwrite {
                if incoming_stability > resident.stability() {
                    merge_meta(resident, &meta, incoming_symbol);
                    return Ok(PromoteOutcome::UpdatedMeta);
                }
                return Ok(PromoteOutcome::Exists);
            }
            // Overwrite: release the old SHA before claiming the new one.
            if let Some(old_sha) = resident.meta.get("sequence_sha1").cloned() {
                self.sequence_index.remove(&old_sha);
            }
            *resident = ReflexEntry {
                id: id.clone(),
                vector,
                symbol_id: incoming_symbol,
                meta,
            };
            if let Some(sha) = sequence_sha {
                self.sequence_index.insert(sha, id.clone());
            }
            return Ok(PromoteOutcome::Overwritten);
        }

        self.entries.insert(
            id.clone(),
            ReflexEntry {
                id: id.clone(),
                vector,
                symbol_id: incoming_symbol,
                meta,
            },
        );
        if let Some(sha) = sequence_sha {
            self.sequence_index.insert(sha, id.clone());
        }
        Ok(PromoteOutcome::Inserted)
    }

    /// Scoped query sorted by (stability desc, edits asc, id asc).
    ///
    /// Vector resolution order: stored vector, symbol id, `next_token`
    /// metadata against the symbol table, then the zero vector of the
    /// space dimension.
    pub fn query(&self, filter: &ReflexQuery, symbols: &mut SymbolSpace) -> Vec<ReflexMatch> {
        let mut matched: Vec<&ReflexEntry> = self
            .entries
            .values()
            .filter(|entry| {
                if let Some(label) = filter.label.as_deref() {
                    if entry.meta.get("label").map(String::as_str) != Some(label) {
                        return false;
                    }
                }
                if let Some(target) = filter.target.as_deref() {
                    if entry.meta.get("target_id").map(String::as_str) != Some(target) {
                        return false;
                    }
                }
                entry.stability() >= filter.min_stability
            })
            .collect();

        matched.sort_by(|a, b| {
            b.stability()
                .partial_cmp(&a.stability())
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.edits().cmp(&b.edits()))
                .then(a.id.cmp(&b.id))
        });
        if filter.limit > 0 {
            matched.truncate(filter.limit);
        }

        matched
            .into_iter()
            .map(|entry| ReflexMatch {
                entry: entry.clone(),
                vector: filter
                    .include_vectors
                    .then(|| self.resolve_vector(entry, symbols)),
            })
            .collect()
    }

    /// Resolve the effective vector of a reflex at query time.
    pub fn resolve_vector(&self, entry: &ReflexEntry, symbols: &mut SymbolSpace) -> Tensor {
        if let Some(v) = &entry.vector {
            return v.clone();
        }
        if entry.symbol_id != NO_SYMBOL_ID {
            if let Ok(v) = symbols.vector_by_id(entry.symbol_id) {
                return v;
            }
        }
        if let Some(token) = entry.meta.get("next_token") {
            if let Some(v) = symbols.vector_for_token(token) {
                return v;
            }
        }
        Tensor::zeros(symbols.dimension().unwrap_or(0))
    }

    /// Replace every entry, rebuilding the sequence index (mapper load).
    pub fn replace_all(&mut self, entries: Vec<ReflexEntry>) {
        self.entries.clear();
        self.sequence_index.clear();
        for entry in entries {
            if let Some(sha) = entry.meta.get("sequence_sha1").cloned() {
                self.sequence_index.insert(sha, entry.id.clone());
            }
            self.entries.insert(entry.id.clone(), entry);
        }
    }

    /// Deep copy of every entry, in unspecified order.
    pub fn snapshot(&self) -> Vec<ReflexEntry> {
        self.entries.values().cloned().collect()
    }

    /// Drop every reflex and the sequence index.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.sequence_index.clear();
    }
}

fn normalize_id(id: &str) -> String {
    id.trim().to_lowercase()
}

fn merge_meta(resident: &mut ReflexEntry, incoming: &BTreeMap<String, String>, symbol: u32) {
    for (k, v) in incoming {
        resident.meta.insert(k.clone(), v.clone());
    }
    if symbol != NO_SYMBOL_ID {
        resident.symbol_id = symbol;
    }
    let edits = resident.edits() + 1;
    resident.meta.insert("edits".to_string(), edits.to_string());
}

// ============================================================================
// TESTS
// ============================================================================
