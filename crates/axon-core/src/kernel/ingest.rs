//! Ingest Pipeline
//!
//! Per input: profile, encode, try the System-1 similarity gate, and fall
//! back to the bounded System-2 loop under the critic. Energy is deducted
//! for every operation; the sleep scheduler is polled at the end of each
//! ingest and on idle ticks. All store access goes through narrow lock
//! scopes so no similarity scan runs under a lock it does not need.

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use uuid::Uuid;

use super::metabolism::{Metabolism, MetabolismConfig};
use super::scheduler::{SchedulerConfig, SleepReason, SleepScheduler};
use crate::adapter::{
    AdapterError, CognitiveAdapter, ConsolidationReport, DataStream, RouteStrategy, SignalProfile,
};
use crate::substrate::SubstrateSensor;
use crate::system::{HdcSystem, SystemError};
use crate::tensor::Tensor;
use crate::wm::{WorkingMemory, WorkingMemoryConfig};

use std::sync::{Mutex, MutexGuard};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Kernel error type
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// Store lock failure
    #[error(transparent)]
    System(#[from] SystemError),
    /// Profiling or encoding failure
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    /// Kernel-owned lock failure
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

impl KernelError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            KernelError::Adapter(e) => e.code(),
            KernelError::System(_) | KernelError::LockPoisoned(_) => "lock_poisoned",
        }
    }
}

// ============================================================================
// OUTCOMES AND REPORTS
// ============================================================================

/// Terminal state of one pipeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// System 1 answered from working memory
    ReflexHit,
    /// System 2 converged and the critic accepted
    DeepThinkAccept,
    /// System 2 exhausted its budget without acceptance
    CriticReject,
    /// Energy fell below the fatigue threshold mid-loop
    FatigueLimit,
    /// Rejected under the stricter zombie critic
    ZombieBlock,
    /// A scheduled sleep cycle ran (idle tick)
    SleepTriggered,
}

impl PipelineOutcome {
    /// Wire string for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineOutcome::ReflexHit => "reflex_hit",
            PipelineOutcome::DeepThinkAccept => "deep_think_accept",
            PipelineOutcome::CriticReject => "critic_reject",
            PipelineOutcome::FatigueLimit => "fatigue_limit",
            PipelineOutcome::ZombieBlock => "zombie_block",
            PipelineOutcome::SleepTriggered => "sleep_triggered",
        }
    }
}

/// Diagnostic object emitted for every pipeline event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    /// Event id
    pub id: String,
    /// Terminal outcome
    pub outcome: PipelineOutcome,
    /// Whether the input was resolved
    pub success: bool,
    /// System 1 answered
    pub reflex: bool,
    /// System 2 ran
    pub deep: bool,
    /// Zombie mode was active
    pub zombie: bool,
    /// A sleep cycle ran during this event
    pub slept: bool,
    /// System-2 iterations spent
    pub iterations: usize,
    /// Reflex similarity, or the best fitness System 2 reached
    pub similarity: f64,
    /// Strategy of the final routed candidate
    pub strategy: Option<RouteStrategy>,
    /// Working-memory key that answered, for reflex hits
    pub reflex_key: Option<String>,
    /// Signal profile of the input (absent for pure sleep events)
    pub profile: Option<SignalProfile>,
    /// Energy left after the event
    pub energy_remaining: f64,
    /// Why a sleep fired, when one did
    pub sleep_reason: Option<SleepReason>,
}

/// Point-in-time kernel statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KernelStats {
    /// Current energy
    pub energy: f64,
    /// Maximum energy
    pub max_energy: f64,
    /// Zombie mode flag
    pub zombie_active: bool,
    /// Completed sleep cycles
    pub sleep_count: u64,
    /// Inputs processed since boot
    pub processed_inputs: u64,
    /// Working-memory entry count
    pub cache_entries: usize,
    /// Reflex count
    pub reflex_count: usize,
    /// Symbol count
    pub symbol_count: usize,
    /// Episodic step counter
    pub episodic_steps: u64,
}

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for a kernel loop
#[derive(Debug, Clone, Default)]
pub struct KernelConfig {
    /// Metabolism parameters
    pub metabolism: MetabolismConfig,
    /// Sleep cadence
    pub scheduler: SchedulerConfig,
    /// Working-memory parameters
    pub working_memory: WorkingMemoryConfig,
    /// Cache candidates offered to each System-2 iteration
    pub candidates_k: usize,
    /// Manual energy budget override (still clamped to the global bounds)
    pub energy_override: Option<f64>,
}

impl KernelConfig {
    fn candidates_k(&self) -> usize {
        if self.candidates_k == 0 {
            8
        } else {
            self.candidates_k
        }
    }
}

// ============================================================================
// KERNEL
// ============================================================================

/// One cognitive loop: stores, adapter, metabolism, scheduler.
pub struct Kernel {
    system: HdcSystem,
    adapter: CognitiveAdapter,
    cache: Mutex<WorkingMemory>,
    metabolism: Mutex<Metabolism>,
    scheduler: Mutex<SleepScheduler>,
    references: Mutex<Vec<Tensor>>,
    config: KernelConfig,
}

impl Kernel {
    /// Boot a kernel: read the substrate, size the energy budget, and wire
    /// the stores together.
    pub fn boot(
        sensor: &dyn SubstrateSensor,
        adapter: CognitiveAdapter,
        config: KernelConfig,
    ) -> Self {
        let reading = sensor.read();
        let metabolism = Metabolism::boot(
            &reading,
            config.metabolism.clone(),
            config.energy_override,
        );
        let scheduler = SleepScheduler::new(config.scheduler.clone());
        let cache = WorkingMemory::with_config(config.working_memory.clone());
        Self {
            system: HdcSystem::new(),
            adapter,
            cache: Mutex::new(cache),
            metabolism: Mutex::new(metabolism),
            scheduler: Mutex::new(scheduler),
            references: Mutex::new(Vec::new()),
            config,
        }
    }

    fn lock_cache(&self) -> Result<MutexGuard<'_, WorkingMemory>, KernelError> {
        self.cache
            .lock()
            .map_err(|_| KernelError::LockPoisoned("working memory"))
    }

    fn lock_metabolism(&self) -> Result<MutexGuard<'_, Metabolism>, KernelError> {
        self.metabolism
            .lock()
            .map_err(|_| KernelError::LockPoisoned("metabolism"))
    }

    fn lock_scheduler(&self) -> Result<MutexGuard<'_, SleepScheduler>, KernelError> {
        self.scheduler
            .lock()
            .map_err(|_| KernelError::LockPoisoned("scheduler"))
    }

    fn lock_references(&self) -> Result<MutexGuard<'_, Vec<Tensor>>, KernelError> {
        self.references
            .lock()
            .map_err(|_| KernelError::LockPoisoned("references"))
    }

    /// The stores this kernel owns.
    pub fn system(&self) -> &HdcSystem {
        &self.system
    }

    /// The adapter this kernel routes through.
    pub fn adapter(&self) -> &CognitiveAdapter {
        &self.adapter
    }

    /// The sleep cadence (manifolds tick on the host's).
    pub fn scheduler_config(&self) -> Result<SchedulerConfig, KernelError> {
        Ok(self.lock_scheduler()?.config().clone())
    }

    /// Current energy.
    pub fn energy(&self) -> Result<f64, KernelError> {
        Ok(self.lock_metabolism()?.energy())
    }

    /// Maximum energy.
    pub fn max_energy(&self) -> Result<f64, KernelError> {
        Ok(self.lock_metabolism()?.max_energy())
    }

    /// Completed sleep cycles.
    pub fn sleep_count(&self) -> Result<u64, KernelError> {
        Ok(self.lock_metabolism()?.sleep_counter())
    }

    /// Replace the reference set (ruleset ground truths).
    pub fn set_references(&self, references: Vec<Tensor>) -> Result<(), KernelError> {
        *self.lock_references()? = references;
        Ok(())
    }

    /// Append one reference vector.
    pub fn add_reference(&self, reference: Tensor) -> Result<(), KernelError> {
        self.lock_references()?.push(reference);
        Ok(())
    }

    /// Pre-load a working-memory entry (ruleset trigger seeding).
    pub fn prime_cache(&self, key: &str, vector: Tensor, fitness: f64) -> Result<(), KernelError> {
        self.lock_cache()?
            .promote(key, vector, fitness, "ruleset", key, 0.0);
        Ok(())
    }

    /// Deep copies of every anomaly-flagged working-memory entry.
    pub fn cache_anomalies(&self) -> Result<Vec<crate::wm::CacheEntry>, KernelError> {
        Ok(self.lock_cache()?.anomalies())
    }

    /// Deep copy of one working-memory entry by key.
    pub fn cache_entry(&self, key: &str) -> Result<Option<crate::wm::CacheEntry>, KernelError> {
        Ok(self.lock_cache()?.get(key))
    }

    /// Clear every anomaly flag in working memory.
    pub fn clear_cache_anomalies(&self) -> Result<(), KernelError> {
        self.lock_cache()?.clear_anomalies();
        Ok(())
    }

    /// Deep copy of the reference set.
    pub fn reference_vectors(&self) -> Result<Vec<Tensor>, KernelError> {
        Ok(self.lock_references()?.clone())
    }

    /// Ingest fingerprint: SHA-1 over type, id, and payload.
    pub fn fingerprint(stream: &DataStream) -> String {
        let mut hasher = Sha1::new();
        hasher.update(stream.dataset_type.as_bytes());
        hasher.update(b"|");
        hasher.update(stream.dataset_id.as_bytes());
        hasher.update(b"|");
        hasher.update(stream.payload.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Run one input through the pipeline.
    pub fn ingest(&self, stream: &DataStream) -> Result<IngestReport, KernelError> {
        let profile = self.adapter.analyze(stream);

        let episodic_dim = self.system.episodic()?.dimension();
        let target = {
            let mut symbols = self.system.symbols()?;
            self.adapter.encode(stream, &mut symbols, episodic_dim)?
        };
        let fingerprint = Self::fingerprint(stream);

        self.lock_metabolism()?.record_entropy(profile.entropy);

        // Fatigue carried over from the previous event forces a sleep
        // before any new work.
        let mut slept = false;
        let mut sleep_reason = None;
        if self.lock_metabolism()?.is_fatigued() {
            self.run_sleep(SleepReason::Fatigue)?;
            slept = true;
            sleep_reason = Some(SleepReason::Fatigue);
        }

        let zombie_at_entry = self.lock_metabolism()?.zombie_active();

        // System 1: similarity-gated reflex.
        let s1_hit = self
            .lock_cache()?
            .lookup(&target, profile.system1_threshold);
        if let Some(hit) = s1_hit {
            {
                let mut metabolism = self.lock_metabolism()?;
                let cost = metabolism.reflex_cost();
                metabolism.deduct(cost);
                metabolism.note_processed();
            }
            self.lock_scheduler()?.note_processed();
            let (post_slept, post_reason) = self.poll_and_sleep(false)?;
            let energy_remaining = self.lock_metabolism()?.energy();
            tracing::debug!(key = %hit.entry.key, similarity = hit.similarity, "reflex hit");
            return Ok(IngestReport {
                id: Uuid::new_v4().to_string(),
                outcome: PipelineOutcome::ReflexHit,
                success: true,
                reflex: true,
                deep: false,
                zombie: zombie_at_entry,
                slept: slept || post_slept,
                iterations: 0,
                similarity: hit.similarity,
                strategy: None,
                reflex_key: Some(hit.entry.key.clone()),
                profile: Some(profile),
                energy_remaining,
                sleep_reason: sleep_reason.or(post_reason),
            });
        }

        // System 2: bounded exploratory loop. The reference set is the
        // installed ground truths plus the closest episodic trace, when
        // one exists.
        let mut references = self.lock_references()?.clone();
        let recall = self.system.episodic()?.recall_similar(&target);
        if recall.found {
            references.push(recall.value);
        }
        let candidates = self
            .lock_cache()?
            .candidates(target.len(), self.config.candidates_k());

        let mut accepted = false;
        let mut fatigued = false;
        let mut zombie = zombie_at_entry;
        let mut iterations = 0usize;
        let mut best_fitness = 0.0f64;
        let mut last_strategy = None;
        let mut total_cost = 0.0f64;

        let (deep_budget, zombie_critic, max_energy, fatigue_threshold) = {
            let metabolism = self.lock_metabolism()?;
            (
                metabolism.deep_budget(),
                metabolism.zombie_critic_threshold(),
                metabolism.max_energy(),
                metabolism.fatigue_threshold(),
            )
        };

        for iteration in 0..deep_budget {
            let outcome = self.adapter.route(
                &target,
                &profile,
                &candidates,
                &references,
                iteration,
                zombie,
            );
            iterations = iteration + 1;
            best_fitness = best_fitness.max(outcome.fitness);
            last_strategy = Some(outcome.strategy);
            total_cost += outcome.cost;

            let (remaining, now_zombie) = {
                let mut metabolism = self.lock_metabolism()?;
                let remaining = metabolism.deduct(outcome.cost);
                (remaining, metabolism.zombie_active())
            };
            zombie = now_zombie;

            if self
                .adapter
                .critic_accepts(outcome.fitness, &profile, zombie, zombie_critic)
            {
                accepted = true;
                break;
            }
            if remaining < fatigue_threshold {
                fatigued = true;
                break;
            }
        }

        let burn = if max_energy > 0.0 {
            (total_cost / max_energy).clamp(0.0, 1.0)
        } else {
            1.0
        };

        {
            let mut cache = self.lock_cache()?;
            cache.promote(
                &fingerprint,
                target.clone(),
                best_fitness,
                &stream.dataset_type,
                &stream.dataset_id,
                burn,
            );
        }

        if accepted {
            if let Err(e) = self.system.episodic()?.store(&target) {
                tracing::warn!(error = %e, "episodic store rejected accepted target");
            }
        }

        // Unresolved input, or input resolved only after an anomalous
        // amount of work: flag the entry and attach the geometric gap for
        // sleep-time learning.
        let anomalous = !accepted
            || (profile.entropy > self.adapter.heuristics().anomaly_entropy_floor
                && iterations > self.adapter.heuristics().anomaly_iteration_floor);
        if anomalous {
            let gap_refs: Vec<Tensor> = if references.is_empty() {
                candidates.iter().map(|c| c.vector.clone()).collect()
            } else {
                references.clone()
            };
            let constraint = self.adapter.deduce_constraint(&target, &gap_refs);
            self.lock_cache()?.mark_anomaly(&fingerprint, constraint);
        }

        self.lock_metabolism()?.note_processed();
        self.lock_scheduler()?.note_processed();
        let (post_slept, post_reason) = self.poll_and_sleep(false)?;
        let energy_remaining = self.lock_metabolism()?.energy();

        let outcome = if accepted {
            PipelineOutcome::DeepThinkAccept
        } else if fatigued {
            PipelineOutcome::FatigueLimit
        } else if zombie {
            PipelineOutcome::ZombieBlock
        } else {
            PipelineOutcome::CriticReject
        };
        tracing::debug!(
            outcome = outcome.as_str(),
            iterations,
            fitness = best_fitness,
            "deep think finished"
        );

        Ok(IngestReport {
            id: Uuid::new_v4().to_string(),
            outcome,
            success: accepted,
            reflex: false,
            deep: true,
            zombie,
            slept: slept || post_slept,
            iterations,
            similarity: best_fitness,
            strategy: last_strategy,
            reflex_key: None,
            profile: Some(profile),
            energy_remaining,
            sleep_reason: sleep_reason.or(post_reason),
        })
    }

    fn poll_and_sleep(&self, idle: bool) -> Result<(bool, Option<SleepReason>), KernelError> {
        let triggered = {
            let metabolism = self.lock_metabolism()?;
            self.lock_scheduler()?.poll(idle, &metabolism)
        };
        match triggered {
            Some(reason) => {
                self.run_sleep(reason)?;
                Ok((true, Some(reason)))
            }
            None => Ok((false, None)),
        }
    }

    /// Cooperative idle tick: polls the scheduler and runs a sleep cycle
    /// when one is due.
    pub fn tick(&self, idle: bool) -> Result<Option<IngestReport>, KernelError> {
        let (slept, reason) = self.poll_and_sleep(idle)?;
        if !slept {
            return Ok(None);
        }
        Ok(Some(IngestReport {
            id: Uuid::new_v4().to_string(),
            outcome: PipelineOutcome::SleepTriggered,
            success: true,
            reflex: false,
            deep: false,
            zombie: false,
            slept: true,
            iterations: 0,
            similarity: 0.0,
            strategy: None,
            reflex_key: None,
            profile: None,
            energy_remaining: self.energy()?,
            sleep_reason: reason,
        }))
    }

    /// Explicit sleep: consolidate, refill, reset the cadence.
    pub fn sleep(&self) -> Result<ConsolidationReport, KernelError> {
        self.run_sleep(SleepReason::Explicit)
    }

    fn run_sleep(&self, reason: SleepReason) -> Result<ConsolidationReport, KernelError> {
        self.lock_metabolism()?.lock_sleep_interrupts();
        tracing::info!(reason = reason.as_str(), "sleep cycle starting");

        let report = {
            let cache = self.lock_cache()?;
            let mut reflexes = self.system.reflexes()?;
            let mut episodic = self.system.episodic()?;
            self.adapter
                .consolidate(&cache, &mut reflexes, &mut episodic)
        };
        self.lock_cache()?
            .decay_all(self.adapter.consolidation().time_decay_factor);

        self.lock_metabolism()?.sleep_cycle();
        self.lock_scheduler()?.reset_after_sleep();
        Ok(report)
    }

    /// Ask for a sleep at the next poll.
    pub fn request_sleep(&self) -> Result<(), KernelError> {
        self.lock_scheduler()?.request_sleep();
        Ok(())
    }

    /// Point-in-time statistics.
    pub fn stats(&self) -> Result<KernelStats, KernelError> {
        let metabolism = self.lock_metabolism()?;
        Ok(KernelStats {
            energy: metabolism.energy(),
            max_energy: metabolism.max_energy(),
            zombie_active: metabolism.zombie_active(),
            sleep_count: metabolism.sleep_counter(),
            processed_inputs: metabolism.processed_inputs(),
            cache_entries: self.lock_cache()?.len(),
            reflex_count: self.system.reflexes()?.len(),
            symbol_count: self.system.symbols()?.len(),
            episodic_steps: self.system.episodic()?.current_step(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
