//! Symbol Space Module
//!
//! Token → unit-hypervector registry with:
//! - Deterministic miss synthesis (stable token hash seeds SplitMix64)
//! - A single dimension locked at first insertion
//! - Lexicographic ordinal ids, invalidated on any mutation
//! - The positional sequence encoder and k-mer tokenizer

mod encoder;
mod space;

pub use encoder::{encode_sequence, encode_text, kmer_positions, kmerize, tokenize, KmerConfig};
pub use space::{SymbolError, SymbolSpace, SymbolStats, NO_SYMBOL_ID};
