//! Episodic Memory Module
//!
//! Log-structured hierarchical traces:
//! - A bounded ring of the most recent raw unit vectors
//! - A fixed ladder of summary blocks whose spans grow exponentially,
//!   maintained by binary-counter carry-merging
//!
//! One merge per level per insertion, so the number of occupied levels
//! after `N` stores equals `popcount(N)` and total span is conserved.

mod store;

pub use store::{
    EpisodicConfig, EpisodicError, EpisodicMemory, RecallResult, TraceBlock, DEFAULT_LEVELS,
    DEFAULT_RECENT,
};
