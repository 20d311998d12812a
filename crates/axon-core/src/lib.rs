//! # Axon Core
//!
//! Biologically-inspired cognitive runtime on hyperdimensional computing:
//!
//! - **HDC algebra**: bind / bundle / permute over unit hypervectors,
//!   deterministic ±1/√D generation seeded by SplitMix64
//! - **Dual-process routing**: a similarity-gated reflex path (System 1)
//!   backed by working memory, and a bounded exploratory loop (System 2)
//!   gated by an adaptive critic
//! - **Episodic memory**: log-structured hierarchical traces with
//!   exponential-span carry-merging
//! - **Metabolism**: a bounded energy budget booted from substrate
//!   readings, with fatigue, zombie mode, and sleep consolidation
//! - **Program manifolds**: isolated sub-runtimes that evolve their own
//!   rulesets while they sleep
//! - **Binary mapper**: versioned `.bcmap` persistence for symbols and
//!   reflexes
//!
//! ## Quick Start
//!
//! ```rust
//! use axon_core::prelude::*;
//! use axon_core::substrate::DefaultSubstrate;
//!
//! let kernel = Kernel::boot(
//!     &DefaultSubstrate,
//!     CognitiveAdapter::new(),
//!     KernelConfig::default(),
//! );
//! let report = kernel.ingest(&DataStream::text("note", "alpha beta gamma"))?;
//! assert!(report.iterations <= 64);
//! # Ok::<(), axon_core::KernelError>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `discovery-induction`: enable the experimental critic override for
//!   high-entropy inputs that never converge

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod adapter;
pub mod episodic;
pub mod kernel;
pub mod manifold;
pub mod mapper;
pub mod reflex;
pub mod ruleset;
pub mod substrate;
pub mod symbols;
pub mod system;
pub mod tensor;
pub mod wm;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Tensor algebra
pub use tensor::{
    bind, bundle, cosine_similarity, fnv1a64, l2_normalize, permute, random_hypervector,
    splitmix64, Tensor, EPSILON, MAX_DIMENSION, UNIT_TOLERANCE,
};

// Symbol space and sequence encoder
pub use symbols::{
    encode_sequence, encode_text, kmer_positions, kmerize, tokenize, KmerConfig, SymbolError,
    SymbolSpace, SymbolStats, NO_SYMBOL_ID,
};

// Episodic memory
pub use episodic::{
    EpisodicConfig, EpisodicError, EpisodicMemory, RecallResult, TraceBlock, DEFAULT_LEVELS,
    DEFAULT_RECENT,
};

// Working memory
pub use wm::{CacheEntry, CacheHit, WorkingMemory, WorkingMemoryConfig};

// Reflex store
pub use reflex::{PromoteOutcome, ReflexEntry, ReflexError, ReflexMatch, ReflexQuery, ReflexStore};

// Cognitive adapter
pub use adapter::{
    consolidate_memory, AdapterError, CognitiveAdapter, ConsolidationConfig, ConsolidationReport,
    DataStream, HeuristicConfig, RouteOutcome, RouteStrategy, SignalLabel, SignalProfile,
    DEFAULT_DIMENSION,
};

// Kernel loop
pub use kernel::{
    IngestReport, Kernel, KernelConfig, KernelError, KernelStats, Metabolism, MetabolismConfig,
    PipelineOutcome, SchedulerConfig, SleepReason, SleepScheduler,
};

// Program manifolds
pub use manifold::{BatchReport, ManifoldConfig, ManifoldError, ProgramManifold};

// Binary mapper
pub use mapper::{default_mapper_path, load_bytes, load_file, save_bytes, save_file, MapperError};

// Ruleset
pub use ruleset::{parse_ruleset, ReflexTrigger, Ruleset, RulesetError, SymbolDef, VectorSpec};

// Substrate seams
pub use substrate::{ByteSink, SubstrateReading, SubstrateSensor};

// System handle
pub use system::{HdcSystem, SystemError};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Mapper format version written by this build
pub const MAPPER_VERSION: u32 = mapper::VERSION_V3;

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        CognitiveAdapter, DataStream, HdcSystem, IngestReport, Kernel, KernelConfig, KernelError,
        PipelineOutcome, ProgramManifold, ReflexStore, Ruleset, SignalProfile, SymbolSpace,
        Tensor, WorkingMemory,
    };

    pub use crate::{
        bind, bundle, cosine_similarity, l2_normalize, parse_ruleset, permute,
        random_hypervector,
    };
}
