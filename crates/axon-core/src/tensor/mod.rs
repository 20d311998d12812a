//! Tensor Algebra Module
//!
//! Fixed-length real vectors and the three HDC primitives:
//! - **Bind**: elementwise product (commutative, ~self-inverse for ±1 vectors)
//! - **Bundle**: additive superposition, normalized by default
//! - **Permute**: circular rotation for positional encoding
//!
//! Plus L2 normalization, clamped cosine similarity, and deterministic
//! ±1/√D hypervector generation seeded by SplitMix64.

mod dense;
mod ops;

pub use dense::{Tensor, MAX_DIMENSION};
pub use ops::{
    bind, bundle, cosine_similarity, fnv1a64, l2_normalize, permute, random_hypervector,
    splitmix64, EPSILON, UNIT_TOLERANCE,
};
