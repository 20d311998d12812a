//! Sequence Encoder
//!
//! Turns token sequences into a single hypervector: each token's vector is
//! circularly permuted by its position and the permuted vectors are summed
//! and normalized. Position breaks the commutativity of the raw sum, so
//! "alpha beta" and "beta alpha" encode differently.

use super::space::{SymbolError, SymbolSpace};
use crate::tensor::{l2_normalize, permute, Tensor};

// ============================================================================
// K-MER CONFIG
// ============================================================================

/// Configuration for k-mer windowing
#[derive(Debug, Clone)]
pub struct KmerConfig {
    /// Window size
    pub k: usize,
    /// Step between window starts
    pub stride: usize,
    /// Hard cap on emitted windows
    pub max_kmers: usize,
}

impl Default for KmerConfig {
    fn default() -> Self {
        Self {
            k: 3,
            stride: 1,
            max_kmers: 256,
        }
    }
}

// ============================================================================
// TOKENIZATION
// ============================================================================

/// Split text into lowercase letter/digit runs.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            for lower in ch.to_lowercase() {
                current.push(lower);
            }
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Split an input string into overlapping windows of `k` characters with
/// the configured stride, capped at `max_kmers`.
pub fn kmerize(input: &str, config: &KmerConfig) -> Vec<String> {
    let chars: Vec<char> = input.chars().collect();
    let k = config.k.max(1);
    let stride = config.stride.max(1);
    if chars.len() < k {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut start = 0;
    while start + k <= chars.len() && windows.len() < config.max_kmers {
        windows.push(chars[start..start + k].iter().collect());
        start += stride;
    }
    windows
}

/// Positions for `count` k-mers: `i mod max(1, dim)`.
pub fn kmer_positions(count: usize, dim: usize) -> Vec<i64> {
    let modulus = dim.max(1) as i64;
    (0..count as i64).map(|i| i % modulus).collect()
}

// ============================================================================
// ENCODING
// ============================================================================

/// Encode a token sequence: `sum_i permute(resolve(t_i), p_i)`, normalized.
///
/// When `positions` is `None` the default `p_i = i mod D` is used. An empty
/// sequence encodes to the zero vector of the space dimension.
pub fn encode_sequence(
    space: &mut SymbolSpace,
    tokens: &[&str],
    positions: Option<&[i64]>,
) -> Result<Tensor, SymbolError> {
    let dim = space.dimension().ok_or(SymbolError::MissingDim)?;
    if tokens.is_empty() {
        return Ok(Tensor::zeros(dim));
    }

    let mut accumulator = vec![0.0f64; dim];
    for (i, token) in tokens.iter().enumerate() {
        let position = match positions {
            Some(ps) => ps.get(i).copied().unwrap_or(i as i64 % dim as i64),
            None => i as i64 % dim as i64,
        };
        let vector = space.resolve(token)?;
        let shifted = permute(&vector, position);
        for (slot, &x) in accumulator.iter_mut().zip(shifted.as_slice()) {
            *slot += x as f64;
        }
    }

    let summed = Tensor::from_vec(accumulator.iter().map(|&x| x as f32).collect());
    Ok(l2_normalize(&summed))
}

/// Tokenize text into letter/digit runs and encode the resulting sequence.
pub fn encode_text(space: &mut SymbolSpace, text: &str) -> Result<Tensor, SymbolError> {
    let tokens = tokenize(text);
    let refs: Vec<&str> = tokens.iter().map(String::as_str).collect();
    encode_sequence(space, &refs, None)
}

// ============================================================================
// TESTS
// ============================================================================
