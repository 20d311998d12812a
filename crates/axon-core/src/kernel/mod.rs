//! Kernel Module
//!
//! The cognitive loop: metabolism (bounded energy booted from a substrate
//! reading), the sleep scheduler (fatigue / idle / periodic / explicit
//! triggers with guaranteed progress), and the ingest pipeline that routes
//! each input through the fast similarity gate (System 1) or the bounded
//! exploratory loop (System 2).

mod ingest;
mod metabolism;
mod scheduler;

pub use ingest::{IngestReport, Kernel, KernelConfig, KernelError, KernelStats, PipelineOutcome};
pub use metabolism::{Metabolism, MetabolismConfig, MAX_ENERGY_CEILING, MIN_ENERGY_FLOOR};
pub use scheduler::{SchedulerConfig, SleepReason, SleepScheduler};
