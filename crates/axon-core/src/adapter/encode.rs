//! Stream Encoding
//!
//! Numeric payloads fold into the accumulator through three fixed
//! multiplicative hash offsets per input index (+v, −v/2, +v/2); textual
//! payloads go through the positional sequence encoder. Either way the
//! result is a unit vector in the resolved dimension.

use serde::{Deserialize, Serialize};

use crate::symbols::{encode_text, SymbolError, SymbolSpace};
use crate::tensor::{l2_normalize, Tensor, MAX_DIMENSION};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Fallback dimension when neither the hint nor any store dictates one.
pub const DEFAULT_DIMENSION: usize = 1024;

// Fold offsets. Fixed at spec time: three multipliers whose residues
// modulo any dimension stay distinct for consecutive indices.
const FOLD_M1: u64 = 2_654_435_761;
const FOLD_M2: u64 = 2_246_822_519;
const FOLD_M3: u64 = 3_266_489_917;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Adapter error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum AdapterError {
    /// Requested dimension exceeds the hard ceiling
    #[error("dimension {got} exceeds limit {max}")]
    DimLimitExceeded { got: usize, max: usize },
    /// No dimension could be resolved
    #[error("no dimension available for encoding")]
    MissingDim,
    /// Symbol space failure while encoding text
    #[error(transparent)]
    Symbol(#[from] SymbolError),
}

impl AdapterError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            AdapterError::DimLimitExceeded { .. } => "hdc_dim_limit_exceeded",
            AdapterError::MissingDim => "missing_dim",
            AdapterError::Symbol(e) => e.code(),
        }
    }
}

// ============================================================================
// DATA STREAM
// ============================================================================

/// One opaque input presented to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStream {
    /// Dataset type; `tensor` and `numeric` payloads parse as floats,
    /// anything else is treated as text
    pub dataset_type: String,
    /// Caller-chosen dataset identifier
    pub dataset_id: String,
    /// The raw payload
    pub payload: String,
    /// Preferred encoding dimension; 0 defers to the stores
    pub dim_hint: usize,
}

impl Default for DataStream {
    fn default() -> Self {
        Self {
            dataset_type: "text".to_string(),
            dataset_id: String::new(),
            payload: String::new(),
            dim_hint: 0,
        }
    }
}

impl DataStream {
    /// Convenience constructor for text streams.
    pub fn text(dataset_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            dataset_type: "text".to_string(),
            dataset_id: dataset_id.into(),
            payload: payload.into(),
            dim_hint: 0,
        }
    }

    /// Convenience constructor for numeric streams.
    pub fn numeric(dataset_id: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            dataset_type: "numeric".to_string(),
            dataset_id: dataset_id.into(),
            payload: payload.into(),
            dim_hint: 0,
        }
    }

    /// True when the payload parses as numbers rather than text.
    pub fn is_numeric(&self) -> bool {
        matches!(self.dataset_type.as_str(), "tensor" | "numeric")
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// Resolve the encoding dimension: hint, then symbol-space D, then
/// episodic D, then [`DEFAULT_DIMENSION`].
fn resolve_dim(
    stream: &DataStream,
    symbols: &SymbolSpace,
    episodic_dim: Option<usize>,
) -> Result<usize, AdapterError> {
    if stream.dim_hint > 0 {
        if stream.dim_hint > MAX_DIMENSION {
            return Err(AdapterError::DimLimitExceeded {
                got: stream.dim_hint,
                max: MAX_DIMENSION,
            });
        }
        return Ok(stream.dim_hint);
    }
    Ok(symbols
        .dimension()
        .or(episodic_dim)
        .unwrap_or(DEFAULT_DIMENSION))
}

/// Fold a numeric sequence into a `dim`-length accumulator.
///
/// Each input index scatters into three slots: the full value, minus half,
/// plus half. The spread keeps nearby indices from colliding while the
/// fold stays linear in the values, so small perturbations of the input
/// stay cosine-close to the original.
fn fold_numeric(values: &[f64], dim: usize) -> Tensor {
    let mut accumulator = vec![0.0f64; dim];
    let d = dim as u64;
    for (i, &raw) in values.iter().enumerate() {
        let v = if raw.is_finite() { raw } else { 0.0 };
        let i = i as u64;
        let h1 = (i.wrapping_mul(FOLD_M1) % d) as usize;
        let h2 = (i.wrapping_mul(FOLD_M2).wrapping_add(1) % d) as usize;
        let h3 = (i.wrapping_mul(FOLD_M3).wrapping_add(2) % d) as usize;
        accumulator[h1] += v;
        accumulator[h2] -= v / 2.0;
        accumulator[h3] += v / 2.0;
    }
    l2_normalize(&Tensor::from_vec(
        accumulator.iter().map(|&x| x as f32).collect(),
    ))
}

/// Encode a stream into a unit hypervector.
pub(crate) fn encode(
    stream: &DataStream,
    symbols: &mut SymbolSpace,
    episodic_dim: Option<usize>,
) -> Result<Tensor, AdapterError> {
    let dim = resolve_dim(stream, symbols, episodic_dim)?;
    if dim == 0 {
        return Err(AdapterError::MissingDim);
    }

    if stream.is_numeric() {
        let values = super::profile::parse_numbers(&stream.payload);
        return Ok(fold_numeric(&values, dim));
    }

    // Text: the sequence encoder can only emit in the symbol space's
    // dimension, so lock the resolved one onto a fresh space.
    symbols.ensure_dimension(dim)?;
    Ok(encode_text(symbols, &stream.payload)?)
}

// ============================================================================
// TESTS
// ============================================================================
