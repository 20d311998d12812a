//! Program Manifold Module
//!
//! An isolated sub-runtime: its own HDC system, adapter, working memory,
//! and metabolism seeded from a slice of the host's budget. Strictly
//! isolated: manifold work never decrements the host's energy counter.
//! During sleep a manifold additionally evolves its own ruleset: every
//! anomaly-flagged cache entry contributes a learned symbol (its deduced
//! constraint) and a reflex trigger, so the next encounter resolves
//! through System 1.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::adapter::{CognitiveAdapter, ConsolidationConfig, ConsolidationReport, DataStream};
use crate::kernel::{IngestReport, Kernel, KernelConfig, KernelError, PipelineOutcome};
use crate::ruleset::{Ruleset, RulesetError};
use crate::substrate::{ByteSink, SubstrateSensor};
use crate::symbols::SymbolError;
use crate::system::SystemError;
use crate::tensor::Tensor;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Manifold error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum ManifoldError {
    /// Sub-kernel failure
    #[error(transparent)]
    Kernel(#[from] KernelError),
    /// Ruleset materialization failure
    #[error(transparent)]
    Ruleset(#[from] RulesetError),
    /// Symbol installation failure
    #[error(transparent)]
    Symbol(#[from] SymbolError),
    /// Store lock failure
    #[error(transparent)]
    System(#[from] SystemError),
}

// ============================================================================
// CONFIG AND REPORTS
// ============================================================================

/// Configuration for a manifold
#[derive(Debug, Clone)]
pub struct ManifoldConfig {
    /// Fraction of the host's max energy allocated to this manifold
    pub alloc_pct: f64,
    /// Hypervector dimension of the manifold's symbol space
    pub dimension: usize,
    /// Kernel configuration template (scheduler cadence is taken from the
    /// host regardless)
    pub kernel: KernelConfig,
}

impl Default for ManifoldConfig {
    fn default() -> Self {
        Self {
            alloc_pct: 0.15,
            dimension: 1024,
            kernel: KernelConfig::default(),
        }
    }
}

/// Tally of one `run_batch` call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Streams processed
    pub processed: usize,
    /// System-1 answers
    pub reflex_hits: usize,
    /// System-2 acceptances
    pub deep_accepts: usize,
    /// Inputs that resolved neither way
    pub rejected: usize,
    /// Sleep cycles that fired mid-batch
    pub slept: usize,
    /// Per-input diagnostics, in order
    #[serde(skip)]
    pub reports: Vec<IngestReport>,
}

// ============================================================================
// PROGRAM MANIFOLD
// ============================================================================

/// An isolated sub-kernel with its own ruleset and energy slice.
pub struct ProgramManifold {
    name: String,
    kernel: Kernel,
    ruleset: Ruleset,
    queue: VecDeque<DataStream>,
    dimension: usize,
}

impl ProgramManifold {
    /// Create a manifold against a host kernel. The allocation is
    /// `alloc_pct · host.max_energy`, floored by the global minimum budget;
    /// the sleep cadence is cloned from the host so `tick` follows the
    /// host's rhythm without coupling budgets.
    pub fn new(
        name: impl Into<String>,
        host: &Kernel,
        sensor: &dyn SubstrateSensor,
        ruleset: Ruleset,
        config: ManifoldConfig,
    ) -> Result<Self, ManifoldError> {
        let name = name.into();
        let allocation = config.alloc_pct.clamp(0.0, 1.0) * host.max_energy()?;

        let mut heuristics = crate::adapter::HeuristicConfig::default();
        ruleset.apply_heuristics(&mut heuristics)?;
        let adapter = CognitiveAdapter::with_config(heuristics, ConsolidationConfig::default());

        let kernel_config = KernelConfig {
            scheduler: host.scheduler_config()?,
            energy_override: Some(allocation),
            ..config.kernel
        };
        let kernel = Kernel::boot(sensor, adapter, kernel_config);

        let mut manifold = Self {
            name,
            kernel,
            ruleset,
            queue: VecDeque::new(),
            dimension: config.dimension,
        };
        manifold.install_ruleset()?;
        tracing::info!(
            manifold = %manifold.name,
            allocation,
            symbols = manifold.ruleset.symbol_definitions.len(),
            triggers = manifold.ruleset.reflex_triggers.len(),
            "manifold booted"
        );
        Ok(manifold)
    }

    /// Manifold name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The sub-kernel (stats, stores).
    pub fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The current ruleset, including learned rules.
    pub fn ruleset(&self) -> &Ruleset {
        &self.ruleset
    }

    /// Streams waiting in the batch queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Install symbols, triggers, and reference vectors from the ruleset.
    fn install_ruleset(&mut self) -> Result<(), ManifoldError> {
        let mut references = Vec::new();
        {
            let mut symbols = self.kernel.system().symbols()?;
            symbols.ensure_dimension(self.dimension)?;
            for def in &self.ruleset.symbol_definitions {
                let vector = def.materialize(self.dimension)?;
                symbols.insert(&def.token, vector.clone())?;
                references.push(vector);
            }
        }
        self.kernel.set_references(references)?;

        {
            let mut symbols = self.kernel.system().symbols()?;
            let mut reflexes = self.kernel.system().reflexes()?;
            for trigger in &self.ruleset.reflex_triggers {
                let Some(vector) = symbols.vector_for_token(&trigger.target) else {
                    tracing::warn!(target = %trigger.target, "trigger has no symbol; skipped");
                    continue;
                };
                let mut meta = BTreeMap::new();
                meta.insert("label".to_string(), trigger.target.clone());
                meta.insert("target_id".to_string(), trigger.target.clone());
                meta.insert("stability".to_string(), "1".to_string());
                meta.insert("source".to_string(), "ruleset".to_string());
                meta.insert(
                    "similarity_threshold".to_string(),
                    format!("{:.6}", trigger.similarity_threshold),
                );
                meta.insert("action".to_string(), trigger.action.clone());
                if let Some(id) = symbols.ordinal_id(&trigger.target) {
                    meta.insert("symbol_id".to_string(), id.to_string());
                }
                if let Err(e) = reflexes.promote(&trigger.target, Some(vector), meta, true) {
                    tracing::warn!(target = %trigger.target, error = %e, "trigger promotion failed");
                }
            }
        }

        self.seed_cache_from_triggers()?;
        Ok(())
    }

    /// Prime working memory with each trigger's target vector so System 1
    /// can answer immediately.
    fn seed_cache_from_triggers(&self) -> Result<(), ManifoldError> {
        let mut seeds = Vec::new();
        {
            let symbols = self.kernel.system().symbols()?;
            for trigger in &self.ruleset.reflex_triggers {
                if let Some(vector) = symbols.vector_for_token(&trigger.target) {
                    seeds.push((format!("ruleset:{}", trigger.target), vector));
                }
            }
        }
        for (key, vector) in seeds {
            self.kernel.prime_cache(&key, vector, 1.0)?;
        }
        Ok(())
    }

    /// Accept a stream into the batch queue.
    pub fn enqueue(&mut self, stream: DataStream) {
        self.queue.push_back(stream);
    }

    /// Run up to `n` queued streams through the local pipeline.
    ///
    /// If a sleep cycle fires mid-batch, ruleset evolution runs before the
    /// next stream so learned rules apply immediately.
    pub fn run_batch(&mut self, n: usize) -> Result<BatchReport, ManifoldError> {
        let mut report = BatchReport::default();
        for _ in 0..n {
            let Some(stream) = self.queue.pop_front() else { break };
            let ingest = self.kernel.ingest(&stream)?;
            report.processed += 1;
            match ingest.outcome {
                PipelineOutcome::ReflexHit => report.reflex_hits += 1,
                PipelineOutcome::DeepThinkAccept => report.deep_accepts += 1,
                _ => report.rejected += 1,
            }
            if ingest.slept {
                report.slept += 1;
                self.evolve_ruleset_during_sleep()?;
                self.seed_cache_from_triggers()?;
            }
            report.reports.push(ingest);
        }
        Ok(report)
    }

    /// Explicit sleep: consolidate, evolve the ruleset from flagged
    /// anomalies, and re-seed working memory from the (grown) trigger set.
    pub fn sleep(&mut self) -> Result<ConsolidationReport, ManifoldError> {
        let report = self.kernel.sleep()?;
        self.evolve_ruleset_during_sleep()?;
        self.seed_cache_from_triggers()?;
        Ok(report)
    }

    /// Neuroplasticity: each anomaly with a deduced constraint becomes a
    /// symbol definition and a `resolve_state` trigger at the critic's
    /// floor threshold; flags are cleared afterwards.
    fn evolve_ruleset_during_sleep(&mut self) -> Result<(), ManifoldError> {
        let anomalies = self.kernel.cache_anomalies()?;
        if anomalies.is_empty() {
            return Ok(());
        }

        let threshold = self.kernel.adapter().heuristics().critic_min;
        let mut learned = 0usize;
        for entry in anomalies {
            let Some(constraint) = entry.constraint else { continue };
            let label = if entry.dataset_id.is_empty() {
                format!("anomaly_{}", &entry.key[..entry.key.len().min(8)])
            } else {
                entry.dataset_id.clone()
            };
            // Skip labels the ruleset already learned.
            if self
                .ruleset
                .symbol_definitions
                .iter()
                .any(|def| def.token == label)
            {
                continue;
            }

            {
                let mut symbols = self.kernel.system().symbols()?;
                symbols.insert(&label, constraint.clone())?;
            }
            self.kernel.add_reference(constraint.clone())?;
            self.ruleset.add_symbol(&label, &constraint);
            self.ruleset.add_trigger(&label, threshold, "resolve_state");
            learned += 1;
        }
        self.kernel.clear_cache_anomalies()?;
        if learned > 0 {
            tracing::info!(manifold = %self.name, learned, "ruleset evolved during sleep");
        }
        Ok(())
    }

    /// Cooperative tick on the host's cadence. Budgets stay disjoint: the
    /// sleep this may trigger refills only the manifold's own pool.
    pub fn tick(&mut self, idle: bool) -> Result<Option<IngestReport>, ManifoldError> {
        let report = self.kernel.tick(idle)?;
        if report.is_some() {
            self.evolve_ruleset_during_sleep()?;
            self.seed_cache_from_triggers()?;
        }
        Ok(report)
    }

    /// Emit a line through the host-provided byte sink for each trigger
    /// action the given report would fire. The core does not interpret
    /// actions; it only reports them.
    pub fn emit_actions(&self, report: &IngestReport, sink: &mut dyn ByteSink) {
        if report.outcome != PipelineOutcome::ReflexHit {
            return;
        }
        for trigger in &self.ruleset.reflex_triggers {
            if report.similarity >= trigger.similarity_threshold {
                sink.write_line(&format!(
                    "{} {} {:.4}",
                    trigger.action, trigger.target, report.similarity
                ));
                break;
            }
        }
    }

    /// Learned + declared reference vectors (tests, diagnostics).
    pub fn reference_count(&self) -> Result<usize, ManifoldError> {
        Ok(self.kernel.reference_vectors()?.len())
    }

    /// Deep copy of learned symbol tokens, in learning order.
    pub fn learned_tokens(&self) -> Vec<String> {
        self.ruleset
            .symbol_definitions
            .iter()
            .map(|def| def.token.clone())
            .collect()
    }

    /// The manifold's reference snapshot (tests).
    pub fn references(&self) -> Result<Vec<Tensor>, ManifoldError> {
        Ok(self.kernel.reference_vectors()?)
    }
}

// ============================================================================
// TESTS
// ============================================================================
