//! Metabolism
//!
//! A bounded energy pool deducted by every cognitive operation. The boot
//! budget is a weighted RAM/CPU sum scaled by availability and memory
//! pressure and lightly attenuated by uptime, clamped into
//! [`MIN_ENERGY_FLOOR`, `MAX_ENERGY_CEILING`]. Below the fatigue threshold
//! deep thinking halts; below the zombie threshold the critic tightens and
//! only sleep restores the pool.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::substrate::SubstrateReading;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Smallest boot energy budget.
pub const MIN_ENERGY_FLOOR: f64 = 64.0;

/// Largest boot energy budget.
pub const MAX_ENERGY_CEILING: f64 = 8192.0;

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for the metabolism
#[derive(Debug, Clone)]
pub struct MetabolismConfig {
    /// Fatigue threshold as a fraction of max energy
    pub fatigue_ratio: f64,
    /// Zombie activation threshold as a fraction of max energy
    pub zombie_ratio: f64,
    /// Absolute critic threshold used while zombie mode is active
    pub zombie_critic_threshold: f64,
    /// Energy cost of a System-1 reflex answer
    pub reflex_cost: f64,
    /// System-2 iteration budget (hard-capped at 64)
    pub deep_budget: usize,
    /// Length of the rolling cognitive-entropy buffer
    pub entropy_buffer_len: usize,
}

impl Default for MetabolismConfig {
    fn default() -> Self {
        Self {
            fatigue_ratio: 0.25,
            zombie_ratio: 0.10,
            zombie_critic_threshold: 0.90,
            reflex_cost: 1.5,
            deep_budget: 48,
            entropy_buffer_len: 32,
        }
    }
}

// ============================================================================
// METABOLISM
// ============================================================================

/// Energy accounting and sleep bookkeeping for one kernel or manifold.
#[derive(Debug, Clone)]
pub struct Metabolism {
    energy: f64,
    max_energy: f64,
    fatigue_threshold: f64,
    zombie_threshold: f64,
    zombie_critic_threshold: f64,
    zombie_active: bool,
    sleep_counter: u64,
    last_sleep: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    sleep_interrupts_locked: bool,
    processed_inputs: u64,
    entropy_buffer: VecDeque<f64>,
    config: MetabolismConfig,
}

impl Metabolism {
    /// Boot from a substrate reading. `energy_override` bypasses the
    /// computed budget but is clamped into the same bounds.
    pub fn boot(
        reading: &SubstrateReading,
        config: MetabolismConfig,
        energy_override: Option<f64>,
    ) -> Self {
        let max_energy = energy_override
            .unwrap_or_else(|| Self::budget_from(reading))
            .clamp(MIN_ENERGY_FLOOR, MAX_ENERGY_CEILING);

        let now = Utc::now();
        let metabolism = Self {
            energy: max_energy,
            max_energy,
            fatigue_threshold: config.fatigue_ratio * max_energy,
            zombie_threshold: config.zombie_ratio * max_energy,
            zombie_critic_threshold: config.zombie_critic_threshold,
            zombie_active: false,
            sleep_counter: 0,
            last_sleep: now,
            last_activity: now,
            sleep_interrupts_locked: false,
            processed_inputs: 0,
            entropy_buffer: VecDeque::with_capacity(config.entropy_buffer_len),
            config,
        };
        tracing::info!(
            max_energy = metabolism.max_energy,
            fatigue = metabolism.fatigue_threshold,
            zombie = metabolism.zombie_threshold,
            "metabolism booted"
        );
        metabolism
    }

    /// The weighted substrate budget before clamping.
    fn budget_from(reading: &SubstrateReading) -> f64 {
        let ram_term = reading.total_ram_mb as f64 * 2.0;
        let cpu_term = reading.cpu_cycle_hz as f64 / 1e9 * 256.0;

        let availability = if reading.total_ram_mb > 0 {
            (reading.available_ram_mb as f64 / reading.total_ram_mb as f64).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let total_bytes = reading.total_ram_mb as f64 * 1024.0 * 1024.0;
        let pressure = if total_bytes > 0.0 {
            (reading.used_ram_bytes_estimate as f64 / total_bytes).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let attenuation = 1.0 / (1.0 + reading.cpu_uptime_ticks as f64 * 1e-12);

        (ram_term + cpu_term) * availability * (1.0 - 0.5 * pressure) * attenuation
    }

    /// Current energy.
    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Maximum energy.
    pub fn max_energy(&self) -> f64 {
        self.max_energy
    }

    /// Current energy as a fraction of maximum.
    pub fn energy_ratio(&self) -> f64 {
        if self.max_energy > 0.0 {
            self.energy / self.max_energy
        } else {
            0.0
        }
    }

    /// Fatigue threshold in absolute units.
    pub fn fatigue_threshold(&self) -> f64 {
        self.fatigue_threshold
    }

    /// True when energy sits below the fatigue threshold.
    pub fn is_fatigued(&self) -> bool {
        self.energy < self.fatigue_threshold
    }

    /// True while zombie mode is active.
    pub fn zombie_active(&self) -> bool {
        self.zombie_active
    }

    /// The stricter critic threshold zombie mode imposes.
    pub fn zombie_critic_threshold(&self) -> f64 {
        self.zombie_critic_threshold
    }

    /// Completed sleep cycles.
    pub fn sleep_counter(&self) -> u64 {
        self.sleep_counter
    }

    /// Timestamp of the last completed sleep.
    pub fn last_sleep(&self) -> DateTime<Utc> {
        self.last_sleep
    }

    /// Timestamp of the last recorded activity.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// True while a sleep cycle is being handled.
    pub fn sleep_interrupts_locked(&self) -> bool {
        self.sleep_interrupts_locked
    }

    /// Inputs processed since boot.
    pub fn processed_inputs(&self) -> u64 {
        self.processed_inputs
    }

    /// The configured System-2 iteration budget (never above 64).
    pub fn deep_budget(&self) -> usize {
        self.config.deep_budget.min(64)
    }

    /// Energy cost of a reflex answer.
    pub fn reflex_cost(&self) -> f64 {
        self.config.reflex_cost
    }

    /// Deduct energy, flooring at zero; entering the zombie band flips the
    /// flag (only sleep clears it). Returns the remaining energy.
    pub fn deduct(&mut self, amount: f64) -> f64 {
        self.energy = (self.energy - amount.max(0.0)).max(0.0);
        if self.energy < self.zombie_threshold && !self.zombie_active {
            self.zombie_active = true;
            tracing::warn!(energy = self.energy, "zombie mode activated");
        }
        self.energy
    }

    /// Record one processed input and refresh the activity timestamp.
    pub fn note_processed(&mut self) {
        self.processed_inputs += 1;
        self.last_activity = Utc::now();
    }

    /// Push one entropy observation into the rolling buffer.
    pub fn record_entropy(&mut self, entropy: f64) {
        if self.entropy_buffer.len() == self.config.entropy_buffer_len {
            self.entropy_buffer.pop_front();
        }
        self.entropy_buffer.push_back(entropy);
    }

    /// Mean of the rolling entropy buffer, 0 when empty.
    pub fn mean_entropy(&self) -> f64 {
        if self.entropy_buffer.is_empty() {
            return 0.0;
        }
        self.entropy_buffer.iter().sum::<f64>() / self.entropy_buffer.len() as f64
    }

    /// Block sleep triggers while one is being serviced.
    pub fn lock_sleep_interrupts(&mut self) {
        self.sleep_interrupts_locked = true;
    }

    /// Complete a sleep cycle: refill to max, exit zombie mode, bump the
    /// counter, unlock interrupts.
    pub fn sleep_cycle(&mut self) {
        self.energy = self.max_energy;
        self.zombie_active = false;
        self.sleep_counter += 1;
        self.last_sleep = Utc::now();
        self.sleep_interrupts_locked = false;
        tracing::info!(cycle = self.sleep_counter, "sleep cycle complete");
    }
}

// ============================================================================
// TESTS
// ============================================================================
