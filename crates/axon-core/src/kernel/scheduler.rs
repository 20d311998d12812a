//! Sleep Scheduler
//!
//! Decides when the loop must consolidate. Four triggers, checked in
//! priority order: explicit request, fatigue, periodic input cadence,
//! extended idle. The periodic counter is monotone in processed inputs and
//! fatigue is monotone in spent energy, so sustained work or sustained
//! idle always reaches a trigger in finitely many polls.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::metabolism::Metabolism;

// ============================================================================
// CONFIG
// ============================================================================

/// Configuration for the sleep scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Sleep after this many inputs since the last sleep
    pub periodic_inputs: u64,
    /// Sleep after this many seconds without activity (idle polls only)
    pub idle_timeout_secs: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            periodic_inputs: 128,
            idle_timeout_secs: 300,
        }
    }
}

// ============================================================================
// SLEEP REASON
// ============================================================================

/// Why a sleep cycle fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SleepReason {
    /// Energy fell below the fatigue threshold
    Fatigue,
    /// No activity for the idle timeout
    Idle,
    /// Periodic input cadence reached
    Periodic,
    /// Explicitly requested by the host
    Explicit,
}

impl SleepReason {
    /// Wire string for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepReason::Fatigue => "fatigue",
            SleepReason::Idle => "idle",
            SleepReason::Periodic => "periodic",
            SleepReason::Explicit => "explicit",
        }
    }
}

// ============================================================================
// SCHEDULER
// ============================================================================

/// Cooperative sleep scheduler; polled by the kernel after each ingest and
/// by the host's idle tick.
#[derive(Debug, Clone)]
pub struct SleepScheduler {
    config: SchedulerConfig,
    inputs_since_sleep: u64,
    explicit_requested: bool,
}

impl Default for SleepScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl SleepScheduler {
    /// Create a scheduler with the given cadence.
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            inputs_since_sleep: 0,
            explicit_requested: false,
        }
    }

    /// The configured cadence (manifolds clone the host's).
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Inputs observed since the last sleep.
    pub fn inputs_since_sleep(&self) -> u64 {
        self.inputs_since_sleep
    }

    /// Count one processed input toward the periodic cadence.
    pub fn note_processed(&mut self) {
        self.inputs_since_sleep += 1;
    }

    /// Ask for a sleep at the next poll.
    pub fn request_sleep(&mut self) {
        self.explicit_requested = true;
    }

    /// Check the triggers. `idle` marks polls coming from the host's idle
    /// loop rather than the ingest path.
    pub fn poll(&self, idle: bool, metabolism: &Metabolism) -> Option<SleepReason> {
        if metabolism.sleep_interrupts_locked() {
            return None;
        }
        if self.explicit_requested {
            return Some(SleepReason::Explicit);
        }
        if metabolism.is_fatigued() {
            return Some(SleepReason::Fatigue);
        }
        if self.inputs_since_sleep >= self.config.periodic_inputs {
            return Some(SleepReason::Periodic);
        }
        if idle {
            let idle_secs = (Utc::now() - metabolism.last_activity()).num_seconds();
            if idle_secs >= self.config.idle_timeout_secs {
                return Some(SleepReason::Idle);
            }
        }
        None
    }

    /// Reset the cadence after a completed sleep.
    pub fn reset_after_sleep(&mut self) {
        self.inputs_since_sleep = 0;
        self.explicit_requested = false;
    }
}

// ============================================================================
// TESTS
// ============================================================================
