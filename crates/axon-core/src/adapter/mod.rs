//! Cognitive Adapter Module
//!
//! The bridge between opaque inputs and the HDC stores:
//! - **Profile**: signal heuristics (entropy, sparsity, skew) that derive
//!   the adaptive thresholds governing the pipeline's energy discipline
//! - **Encode**: numeric fold or positional text encoding into a
//!   unit hypervector
//! - **Route**: System-2 candidate generation (cache blending or
//!   self-permutation, with an experimental discovery escape hatch)
//! - **Critic**: the accept gate, stricter while zombie mode is active
//! - **Consolidate**: sleep-time promotion of prioritized working-memory
//!   entries into reflexes and episodic traces

mod consolidate;
mod encode;
mod profile;
mod route;

pub use consolidate::{consolidate_memory, ConsolidationConfig, ConsolidationReport};
pub use encode::{AdapterError, DataStream, DEFAULT_DIMENSION};
pub use profile::{HeuristicConfig, SignalLabel, SignalProfile};
pub use route::{RouteOutcome, RouteStrategy};

use crate::episodic::EpisodicMemory;
use crate::reflex::ReflexStore;
use crate::symbols::SymbolSpace;
use crate::tensor::Tensor;
use crate::wm::{CacheEntry, WorkingMemory};

// ============================================================================
// COGNITIVE ADAPTER
// ============================================================================

/// Stateless heuristic engine parameterized by configuration.
///
/// One adapter serves one kernel loop or manifold; it holds no store state
/// of its own.
#[derive(Debug, Clone, Default)]
pub struct CognitiveAdapter {
    heuristics: HeuristicConfig,
    consolidation: ConsolidationConfig,
}

impl CognitiveAdapter {
    /// Create an adapter with default heuristics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an adapter with custom heuristics.
    pub fn with_config(heuristics: HeuristicConfig, consolidation: ConsolidationConfig) -> Self {
        Self {
            heuristics,
            consolidation,
        }
    }

    /// Current heuristic configuration.
    pub fn heuristics(&self) -> &HeuristicConfig {
        &self.heuristics
    }

    /// Replace the heuristic configuration (ruleset overrides).
    pub fn set_heuristics(&mut self, heuristics: HeuristicConfig) {
        self.heuristics = heuristics;
    }

    /// Current consolidation configuration.
    pub fn consolidation(&self) -> &ConsolidationConfig {
        &self.consolidation
    }

    /// Compute the signal profile of a stream.
    pub fn analyze(&self, stream: &DataStream) -> SignalProfile {
        profile::analyze(stream, &self.heuristics)
    }

    /// Encode a stream into a unit hypervector.
    pub fn encode(
        &self,
        stream: &DataStream,
        symbols: &mut SymbolSpace,
        episodic_dim: Option<usize>,
    ) -> Result<Tensor, AdapterError> {
        encode::encode(stream, symbols, episodic_dim)
    }

    /// Produce the next System-2 candidate.
    pub fn route(
        &self,
        target: &Tensor,
        profile: &SignalProfile,
        candidates: &[CacheEntry],
        references: &[Tensor],
        iteration: usize,
        zombie: bool,
    ) -> RouteOutcome {
        route::route(
            target,
            profile,
            candidates,
            references,
            iteration,
            zombie,
            &self.heuristics,
        )
    }

    /// Critic gate: accept when fitness reaches the active threshold.
    pub fn critic_accepts(
        &self,
        fitness: f64,
        profile: &SignalProfile,
        zombie: bool,
        zombie_critic_threshold: f64,
    ) -> bool {
        let threshold = if zombie {
            zombie_critic_threshold
        } else {
            profile.critic_accept
        };
        fitness >= threshold
    }

    /// Geometric gap between the state the input demands and the closest
    /// state the system can currently produce.
    pub fn deduce_constraint(&self, target: &Tensor, references: &[Tensor]) -> Option<Tensor> {
        route::deduce_constraint(target, references)
    }

    /// Sleep-time consolidation over a priority snapshot of the cache.
    pub fn consolidate(
        &self,
        cache: &WorkingMemory,
        reflexes: &mut ReflexStore,
        episodic: &mut EpisodicMemory,
    ) -> ConsolidationReport {
        consolidate_memory(cache, reflexes, episodic, &self.consolidation)
    }
}
