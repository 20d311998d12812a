//! Ruleset Module
//!
//! The declarative bootstrap a manifold consumes: a constraint mode tag,
//! symbol definitions (one-hot index lists or explicit values), reflex
//! triggers, and heuristic overrides. Parsed from a compact line DSL;
//! mutated during manifold sleep when anomalies teach new symbols.

mod parser;

pub use parser::parse_ruleset;

use serde::{Deserialize, Serialize};

use crate::adapter::HeuristicConfig;
use crate::tensor::{l2_normalize, Tensor};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Ruleset error type; parse failures carry a single diagnostic.
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum RulesetError {
    /// DSL parse failure
    #[error("ruleset parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
    /// A one-hot index falls outside the target dimension
    #[error("one-hot index {index} out of range for dimension {dim}")]
    IndexOutOfRange { index: usize, dim: usize },
    /// Explicit values disagree with the target dimension
    #[error("value list of length {got} does not fit dimension {dim}")]
    ValueLengthMismatch { got: usize, dim: usize },
}

// ============================================================================
// DEFINITIONS
// ============================================================================

/// How a symbol's vector is specified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VectorSpec {
    /// Unit mass at the listed indices, then normalized
    OneHot(Vec<usize>),
    /// Explicit buffer, then normalized
    Values(Vec<f32>),
}

/// One declared symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDef {
    /// Token the vector binds to
    pub token: String,
    /// Vector specification
    pub spec: VectorSpec,
}

impl SymbolDef {
    /// Realize the vector in the given dimension.
    pub fn materialize(&self, dim: usize) -> Result<Tensor, RulesetError> {
        match &self.spec {
            VectorSpec::OneHot(indices) => {
                let mut data = vec![0.0f32; dim];
                for &index in indices {
                    if index >= dim {
                        return Err(RulesetError::IndexOutOfRange { index, dim });
                    }
                    data[index] = 1.0;
                }
                Ok(l2_normalize(&Tensor::from_vec(data)))
            }
            VectorSpec::Values(values) => {
                if values.len() != dim {
                    return Err(RulesetError::ValueLengthMismatch {
                        got: values.len(),
                        dim,
                    });
                }
                Ok(l2_normalize(&Tensor::from_vec(values.clone())))
            }
        }
    }
}

/// One System-1 trigger declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReflexTrigger {
    /// Target symbol token
    pub target: String,
    /// Cosine threshold for firing
    pub similarity_threshold: f64,
    /// Action intent; the core only associates it with the trigger
    pub action: String,
}

// ============================================================================
// RULESET
// ============================================================================

/// A manifold's declarative bootstrap and, over time, its learned rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ruleset {
    /// Free-form constraint mode tag
    pub constraint_mode: String,
    /// Declared symbols
    pub symbol_definitions: Vec<SymbolDef>,
    /// Declared triggers
    pub reflex_triggers: Vec<ReflexTrigger>,
    /// Heuristic overrides, applied in order
    pub heuristic_overrides: Vec<(String, String)>,
}

impl Ruleset {
    /// Apply every heuristic override onto a config.
    pub fn apply_heuristics(&self, config: &mut HeuristicConfig) -> Result<(), RulesetError> {
        for (i, (key, value)) in self.heuristic_overrides.iter().enumerate() {
            config.apply_override(key, value).map_err(|message| {
                RulesetError::Parse {
                    line: i + 1,
                    message,
                }
            })?;
        }
        Ok(())
    }

    /// Append a learned symbol definition (sleep-time neuroplasticity).
    pub fn add_symbol(&mut self, token: impl Into<String>, vector: &Tensor) {
        self.symbol_definitions.push(SymbolDef {
            token: token.into(),
            spec: VectorSpec::Values(vector.as_slice().to_vec()),
        });
    }

    /// Append a learned reflex trigger.
    pub fn add_trigger(
        &mut self,
        target: impl Into<String>,
        similarity_threshold: f64,
        action: impl Into<String>,
    ) {
        self.reflex_triggers.push(ReflexTrigger {
            target: target.into(),
            similarity_threshold,
            action: action.into(),
        });
    }
}

// ============================================================================
// TESTS
// ============================================================================
