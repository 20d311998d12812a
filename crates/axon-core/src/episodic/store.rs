//! Episodic Trace Store
//!
//! Every stored vector becomes a span-1 block that carry-merges up the
//! level ladder: an empty level absorbs the carried block, an occupied one
//! merges into it and the carry continues. Merging is span-weighted so a
//! block's summary stays the normalized centroid of everything it covers.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::tensor::{cosine_similarity, l2_normalize, Tensor};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Default number of hierarchy levels.
pub const DEFAULT_LEVELS: usize = 32;

/// Default capacity of the recent-trace ring.
pub const DEFAULT_RECENT: usize = 256;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Episodic memory error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EpisodicError {
    /// The empty tensor cannot be stored as a trace
    #[error("cannot store an empty tensor")]
    EmptyTensor,
    /// Vector length disagrees with the locked trace dimension
    #[error("trace dimension mismatch: store is {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

impl EpisodicError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            EpisodicError::EmptyTensor => "empty_tensor",
            EpisodicError::DimensionMismatch { .. } => "dimension_mismatch",
        }
    }
}

// ============================================================================
// TRACE TYPES
// ============================================================================

/// A merged summary block at some hierarchy level.
#[derive(Debug, Clone)]
pub struct TraceBlock {
    /// Normalized span-weighted centroid of the covered traces
    pub summary: Tensor,
    /// First step covered
    pub start_step: u64,
    /// Last step covered
    pub end_step: u64,
    /// Number of raw traces covered
    pub span: u64,
}

impl TraceBlock {
    fn leaf(vector: Tensor, step: u64) -> Self {
        Self {
            summary: vector,
            start_step: step,
            end_step: step,
            span: 1,
        }
    }

    /// Merge two blocks: span-weighted normalized sum of the summaries,
    /// union of the step ranges, sum of the spans.
    pub fn merge(older: &TraceBlock, newer: &TraceBlock) -> TraceBlock {
        let mut weighted = vec![0.0f64; older.summary.len()];
        for (slot, &x) in weighted.iter_mut().zip(older.summary.as_slice()) {
            *slot += x as f64 * older.span as f64;
        }
        for (slot, &x) in weighted.iter_mut().zip(newer.summary.as_slice()) {
            *slot += x as f64 * newer.span as f64;
        }
        let summary = l2_normalize(&Tensor::from_vec(
            weighted.iter().map(|&x| x as f32).collect(),
        ));
        TraceBlock {
            summary,
            start_step: older.start_step.min(newer.start_step),
            end_step: older.end_step.max(newer.end_step),
            span: older.span + newer.span,
        }
    }

    fn midpoint(&self) -> u64 {
        self.start_step + (self.end_step - self.start_step) / 2
    }
}

#[derive(Debug, Clone)]
struct RecentTrace {
    vector: Tensor,
    step: u64,
}

/// Outcome of a recall query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResult {
    /// Whether anything matched
    pub found: bool,
    /// The recalled unit vector (zero tensor when nothing matched)
    pub value: Tensor,
    /// Cosine similarity to the query; 0 for exact-step recall
    pub similarity: f64,
    /// Step the recalled trace was stored at (block representative for
    /// summary blocks)
    pub stored_step: u64,
    /// Steps elapsed since the recalled trace
    pub age_steps: u64,
    /// Hierarchy level of the source block, or -1 for a recent trace
    pub level: i32,
    /// Span of the source block (1 for recent traces)
    pub span: u64,
    /// "recent" or "level"
    pub source: String,
}

impl RecallResult {
    fn not_found() -> Self {
        Self {
            found: false,
            value: Tensor::empty(),
            similarity: 0.0,
            stored_step: 0,
            age_steps: 0,
            level: -1,
            span: 0,
            source: String::new(),
        }
    }
}

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for the episodic store
#[derive(Debug, Clone)]
pub struct EpisodicConfig {
    /// Number of hierarchy levels
    pub levels: usize,
    /// Capacity of the recent ring
    pub recent_capacity: usize,
}

impl Default for EpisodicConfig {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            recent_capacity: DEFAULT_RECENT,
        }
    }
}

// ============================================================================
// EPISODIC MEMORY
// ============================================================================

/// Ring of recent unit vectors plus the carry-merge hierarchy.
pub struct EpisodicMemory {
    levels: Vec<Option<TraceBlock>>,
    recent: VecDeque<RecentTrace>,
    step: u64,
    dim: Option<usize>,
    config: EpisodicConfig,
}

impl Default for EpisodicMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl EpisodicMemory {
    /// Create an empty store with the default geometry.
    pub fn new() -> Self {
        Self::with_config(EpisodicConfig::default())
    }

    /// Create an empty store with custom geometry.
    pub fn with_config(config: EpisodicConfig) -> Self {
        let levels = config.levels.max(1);
        Self {
            levels: vec![None; levels],
            recent: VecDeque::with_capacity(config.recent_capacity),
            step: 0,
            dim: None,
            config: EpisodicConfig {
                levels,
                recent_capacity: config.recent_capacity.max(1),
            },
        }
    }

    /// Monotonic step counter (number of successful stores).
    pub fn current_step(&self) -> u64 {
        self.step
    }

    /// Locked trace dimension, if any store happened yet.
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    /// Number of occupied hierarchy levels.
    pub fn valid_levels(&self) -> usize {
        self.levels.iter().filter(|l| l.is_some()).count()
    }

    /// Sum of spans across all occupied levels.
    pub fn total_span(&self) -> u64 {
        self.levels
            .iter()
            .flatten()
            .map(|block| block.span)
            .sum()
    }

    /// Number of traces in the recent ring.
    pub fn recent_len(&self) -> usize {
        self.recent.len()
    }

    /// Store a trace: flatten, normalize, validate the dimension, advance
    /// the step, push to the recent ring, and carry-merge a span-1 block
    /// through the hierarchy.
    pub fn store(&mut self, vector: &Tensor) -> Result<u64, EpisodicError> {
        if vector.is_empty() {
            return Err(EpisodicError::EmptyTensor);
        }
        let normalized = l2_normalize(&vector.clone().flatten());
        match self.dim {
            None => self.dim = Some(normalized.len()),
            Some(d) if d != normalized.len() => {
                return Err(EpisodicError::DimensionMismatch {
                    expected: d,
                    got: normalized.len(),
                });
            }
            Some(_) => {}
        }

        self.step += 1;
        self.recent.push_back(RecentTrace {
            vector: normalized.clone(),
            step: self.step,
        });
        while self.recent.len() > self.config.recent_capacity {
            self.recent.pop_front();
        }

        let mut carry = TraceBlock::leaf(normalized, self.step);
        let top = self.levels.len() - 1;
        for level in 0..self.levels.len() {
            match self.levels[level].take() {
                None => {
                    self.levels[level] = Some(carry);
                    return Ok(self.step);
                }
                Some(resident) => {
                    carry = TraceBlock::merge(&resident, &carry);
                }
            }
        }
        // Every level was occupied: the accumulated carry settles in place
        // at the top.
        tracing::debug!(step = self.step, span = carry.span, "hierarchy overflow merge");
        self.levels[top] = Some(carry);
        Ok(self.step)
    }

    /// Recall the single best trace by cosine similarity to the query.
    ///
    /// Scans the recent ring and every occupied level; the query is
    /// normalized first.
    pub fn recall_similar(&self, query: &Tensor) -> RecallResult {
        let Some(dim) = self.dim else {
            return RecallResult::not_found();
        };
        if query.len() != dim {
            return RecallResult::not_found();
        }
        let query = l2_normalize(&query.clone().flatten());

        let mut best = RecallResult::not_found();
        for trace in &self.recent {
            let sim = cosine_similarity(&query, &trace.vector);
            if !best.found || sim > best.similarity {
                best = RecallResult {
                    found: true,
                    value: trace.vector.clone(),
                    similarity: sim,
                    stored_step: trace.step,
                    age_steps: self.step - trace.step,
                    level: -1,
                    span: 1,
                    source: "recent".to_string(),
                };
            }
        }
        for (level, slot) in self.levels.iter().enumerate() {
            let Some(block) = slot else { continue };
            let sim = cosine_similarity(&query, &block.summary);
            if !best.found || sim > best.similarity {
                best = RecallResult {
                    found: true,
                    value: block.summary.clone(),
                    similarity: sim,
                    stored_step: block.end_step,
                    age_steps: self.step - block.end_step,
                    level: level as i32,
                    span: block.span,
                    source: "level".to_string(),
                };
            }
        }
        best
    }

    /// Recall the trace closest to `k` steps ago.
    ///
    /// The target step is `max(1, current - k)`. Recent traces compete by
    /// distance to the target; blocks compete by their representative step
    /// (the target when it falls inside the block, the midpoint otherwise).
    /// Ties break toward the smaller span. Similarity is reported as 0 for
    /// exact-step recall.
    pub fn recall_steps_ago(&self, k: i64) -> RecallResult {
        if self.step == 0 {
            return RecallResult::not_found();
        }
        let k = k.max(0) as u64;
        let target = self.step.saturating_sub(k).max(1);

        let mut best = RecallResult::not_found();
        let mut best_rank = (u64::MAX, u64::MAX);

        for trace in &self.recent {
            let distance = trace.step.abs_diff(target);
            let rank = (distance, 1u64);
            if rank < best_rank {
                best_rank = rank;
                best = RecallResult {
                    found: true,
                    value: trace.vector.clone(),
                    similarity: 0.0,
                    stored_step: trace.step,
                    age_steps: self.step - trace.step,
                    level: -1,
                    span: 1,
                    source: "recent".to_string(),
                };
            }
        }

        for (level, slot) in self.levels.iter().enumerate() {
            let Some(block) = slot else { continue };
            let representative = if target >= block.start_step && target <= block.end_step {
                target
            } else {
                block.midpoint()
            };
            let distance = representative.abs_diff(target);
            let rank = (distance, block.span);
            if rank < best_rank {
                best_rank = rank;
                best = RecallResult {
                    found: true,
                    value: block.summary.clone(),
                    similarity: 0.0,
                    stored_step: representative,
                    age_steps: self.step.saturating_sub(representative),
                    level: level as i32,
                    span: block.span,
                    source: "level".to_string(),
                };
            }
        }
        best
    }

    /// Drop every trace and unlock the dimension; the step counter resets.
    pub fn clear(&mut self) {
        self.levels.iter_mut().for_each(|slot| *slot = None);
        self.recent.clear();
        self.step = 0;
        self.dim = None;
    }
}

// ============================================================================
// TESTS
// ============================================================================
