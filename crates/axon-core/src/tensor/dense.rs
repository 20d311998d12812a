//! Dense Tensor
//!
//! A logical shape over a contiguous single-precision buffer. The invariant
//! `product(shape) == data.len()` holds for every tensor the crate produces;
//! constructing one that violates it is a caller contract breach and panics.

use serde::{Deserialize, Serialize};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Hard ceiling on any single hypervector dimension.
///
/// Encoding requests above this are rejected with `hdc_dim_limit_exceeded`.
pub const MAX_DIMENSION: usize = 32_768;

// ============================================================================
// TENSOR
// ============================================================================

/// A dense tensor: ordered dimensions plus a contiguous `f32` buffer.
///
/// The empty tensor (no dimensions, no elements) is a valid value. All HDC
/// operations require operands of equal element count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Default for Tensor {
    fn default() -> Self {
        Self::empty()
    }
}

impl Tensor {
    /// Create a tensor from an explicit shape and buffer.
    ///
    /// # Panics
    ///
    /// Panics if `product(shape) != data.len()` (caller contract violation).
    pub fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        let expected: usize = shape.iter().product();
        assert_eq!(
            expected,
            data.len(),
            "tensor shape {:?} does not cover buffer of {} elements",
            shape,
            data.len()
        );
        Self { shape, data }
    }

    /// The empty tensor: a single zero-length dimension, zero elements.
    pub fn empty() -> Self {
        Self {
            shape: vec![0],
            data: vec![],
        }
    }

    /// A one-dimensional tensor over the given buffer.
    pub fn from_vec(data: Vec<f32>) -> Self {
        let shape = vec![data.len()];
        Self { shape, data }
    }

    /// A one-dimensional zero tensor of length `dim`.
    pub fn zeros(dim: usize) -> Self {
        Self {
            shape: vec![dim],
            data: vec![0.0; dim],
        }
    }

    /// Logical shape (ordered sequence of dimensions).
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Total element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Immutable view of the buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable view of the buffer.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consume the tensor and return its buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Reshape to a single dimension covering the same buffer.
    ///
    /// Pure bookkeeping: the buffer is untouched.
    pub fn flatten(mut self) -> Self {
        self.shape = vec![self.data.len()];
        self
    }

    /// Euclidean norm, accumulated in double precision.
    ///
    /// Non-finite elements contribute zero, matching the sanitization rule
    /// of the normalize operation.
    pub fn norm(&self) -> f64 {
        self.data
            .iter()
            .map(|&x| {
                let x = if x.is_finite() { x as f64 } else { 0.0 };
                x * x
            })
            .sum::<f64>()
            .sqrt()
    }

    /// True when the norm is within `tolerance` of 1.
    pub fn is_unit(&self, tolerance: f64) -> bool {
        (self.norm() - 1.0).abs() <= tolerance
    }

    /// Serialize the buffer as little-endian `f32` bytes.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        self.data.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    /// Deserialize a one-dimensional tensor from little-endian `f32` bytes.
    ///
    /// Returns `None` when the byte count is not a multiple of four.
    pub fn from_le_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        let data: Vec<f32> = bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();
        Some(Self::from_vec(data))
    }
}

// ============================================================================
// TESTS
// ============================================================================
