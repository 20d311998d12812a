//! Reflex Store Module
//!
//! Named System-1 trigger vectors with metadata. Promotion is outcome-typed
//! (inserted / overwritten / updated_meta / exists / duplicate_exact /
//! duplicate_sequence) and deduplicated through a `sequence_sha1` index so
//! one behavioral sequence never owns two reflexes. Queries resolve vectors
//! lazily: stored vector, then symbol id, then `next_token`, then zero.

mod store;

pub use store::{PromoteOutcome, ReflexEntry, ReflexError, ReflexMatch, ReflexQuery, ReflexStore};
