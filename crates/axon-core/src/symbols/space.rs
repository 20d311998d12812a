//! Symbol Space
//!
//! Owns every token's hypervector. Tokens are normalized by trim + case
//! fold; the vector dimension is fixed by the first insertion and locked
//! from then on. Unknown tokens are synthesized deterministically so two
//! processes resolve the same token to the same vector.

use std::collections::{BTreeMap, HashMap};

use crate::tensor::{fnv1a64, l2_normalize, random_hypervector, Tensor};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Sentinel ordinal meaning "no symbol id assigned".
pub const NO_SYMBOL_ID: u32 = u32::MAX;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Symbol space error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum SymbolError {
    /// Token is not present and cannot be synthesized
    #[error("token not found: {0}")]
    MissingToken(String),
    /// A symbol vector must hold at least one element
    #[error("empty vector for token: {0}")]
    EmptyVector(String),
    /// Vector dimension disagrees with the locked space dimension
    #[error("symbol dimension mismatch: space is {expected}, got {got}")]
    DimMismatch { expected: usize, got: usize },
    /// Ordinal id does not resolve to a token
    #[error("symbol id not found: {0}")]
    MissingId(u32),
    /// No dimension is locked yet, so nothing can be synthesized
    #[error("symbol space has no dimension")]
    MissingDim,
}

impl SymbolError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            SymbolError::MissingToken(_) => "missing_token",
            SymbolError::EmptyVector(_) => "empty_symbol_vector",
            SymbolError::DimMismatch { .. } => "symbol_dim_mismatch",
            SymbolError::MissingId(_) => "symbol_id_missing",
            SymbolError::MissingDim => "missing_dim",
        }
    }
}

// ============================================================================
// STATS
// ============================================================================

/// Snapshot of the symbol space state
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolStats {
    /// Number of registered tokens
    pub tokens: usize,
    /// Locked dimension, if any insertion happened yet
    pub dimension: Option<usize>,
    /// Mutation generation counter
    pub generation: u64,
}

// ============================================================================
// SYMBOL SPACE
// ============================================================================

/// Token → unit-vector registry with deterministic miss synthesis.
#[derive(Debug)]
pub struct SymbolSpace {
    table: BTreeMap<String, Tensor>,
    dim: Option<usize>,
    generation: u64,
    id_index: Vec<String>,
    id_lookup: HashMap<String, u32>,
    ids_stale: bool,
}

impl Default for SymbolSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolSpace {
    /// Create an empty space; the dimension locks at first insertion.
    pub fn new() -> Self {
        Self {
            table: BTreeMap::new(),
            dim: None,
            generation: 0,
            id_index: Vec::new(),
            id_lookup: HashMap::new(),
            ids_stale: true,
        }
    }

    /// Create an empty space with the dimension already locked.
    pub fn with_dimension(dim: usize) -> Self {
        let mut space = Self::new();
        space.dim = Some(dim);
        space
    }

    /// Normalize a token: trim + case fold.
    pub fn normalize_token(token: &str) -> String {
        token.trim().to_lowercase()
    }

    /// Locked dimension, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.dim
    }

    /// Lock the dimension if none is locked yet.
    ///
    /// A disagreeing existing lock is an error; locking the same dimension
    /// twice is a no-op.
    pub fn ensure_dimension(&mut self, dim: usize) -> Result<(), SymbolError> {
        match self.dim {
            None => {
                self.dim = Some(dim);
                Ok(())
            }
            Some(d) if d == dim => Ok(()),
            Some(d) => Err(SymbolError::DimMismatch {
                expected: d,
                got: dim,
            }),
        }
    }

    /// Number of registered tokens.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True when no tokens are registered.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// True when the (normalized) token is registered.
    pub fn contains(&self, token: &str) -> bool {
        self.table.contains_key(&Self::normalize_token(token))
    }

    /// Snapshot of counts and the mutation generation.
    pub fn stats(&self) -> SymbolStats {
        SymbolStats {
            tokens: self.table.len(),
            dimension: self.dim,
            generation: self.generation,
        }
    }

    fn mark_mutated(&mut self) {
        self.generation += 1;
        self.ids_stale = true;
    }

    /// Insert (or replace) a token's vector. The vector is L2-normalized on
    /// the way in; the first insertion locks the space dimension.
    pub fn insert(&mut self, token: &str, vector: Tensor) -> Result<(), SymbolError> {
        let token = Self::normalize_token(token);
        if vector.is_empty() {
            return Err(SymbolError::EmptyVector(token));
        }
        match self.dim {
            None => self.dim = Some(vector.len()),
            Some(d) if d != vector.len() => {
                return Err(SymbolError::DimMismatch {
                    expected: d,
                    got: vector.len(),
                });
            }
            Some(_) => {}
        }
        self.table.insert(token, l2_normalize(&vector));
        self.mark_mutated();
        Ok(())
    }

    /// Look up a token's vector without synthesizing on miss.
    pub fn vector_for_token(&self, token: &str) -> Option<Tensor> {
        self.table.get(&Self::normalize_token(token)).cloned()
    }

    /// Resolve a token to its vector, synthesizing one deterministically on
    /// miss: the stable hash of the normalized token seeds a ±1 hypervector
    /// which is normalized, stored, and returned.
    pub fn resolve(&mut self, token: &str) -> Result<Tensor, SymbolError> {
        let token = Self::normalize_token(token);
        if let Some(v) = self.table.get(&token) {
            return Ok(v.clone());
        }
        let dim = self.dim.ok_or(SymbolError::MissingDim)?;
        let seed = fnv1a64(token.as_bytes());
        let vector = l2_normalize(&random_hypervector(dim, seed));
        tracing::debug!(token = %token, dim, "synthesized symbol vector");
        self.table.insert(token, vector.clone());
        self.mark_mutated();
        Ok(vector)
    }

    /// Resolve many tokens, returning vectors in input order.
    pub fn resolve_many(&mut self, tokens: &[&str]) -> Result<Vec<Tensor>, SymbolError> {
        tokens.iter().map(|t| self.resolve(t)).collect()
    }

    fn ensure_id_cache(&mut self) {
        if !self.ids_stale {
            return;
        }
        // BTreeMap iterates in lexicographic key order.
        self.id_index = self.table.keys().cloned().collect();
        self.id_lookup = self
            .id_index
            .iter()
            .enumerate()
            .map(|(i, k)| (k.clone(), i as u32))
            .collect();
        self.ids_stale = false;
    }

    /// Ordinal id of a token: its position in lexicographic key order.
    pub fn ordinal_id(&mut self, token: &str) -> Option<u32> {
        self.ensure_id_cache();
        self.id_lookup.get(&Self::normalize_token(token)).copied()
    }

    /// Ordinal ids for many tokens, in input order.
    pub fn ordinal_ids(&mut self, tokens: &[&str]) -> Vec<Option<u32>> {
        self.ensure_id_cache();
        tokens
            .iter()
            .map(|t| self.id_lookup.get(&Self::normalize_token(t)).copied())
            .collect()
    }

    /// Token owning an ordinal id.
    pub fn token_by_id(&mut self, id: u32) -> Result<String, SymbolError> {
        self.ensure_id_cache();
        self.id_index
            .get(id as usize)
            .cloned()
            .ok_or(SymbolError::MissingId(id))
    }

    /// Vector owning an ordinal id.
    pub fn vector_by_id(&mut self, id: u32) -> Result<Tensor, SymbolError> {
        let token = self.token_by_id(id)?;
        self.table
            .get(&token)
            .cloned()
            .ok_or(SymbolError::MissingToken(token))
    }

    /// Replace the whole table and dimension atomically.
    ///
    /// Every vector must match `dim`; on any mismatch the space is left
    /// untouched.
    pub fn replace_all(
        &mut self,
        entries: Vec<(String, Tensor)>,
        dim: usize,
    ) -> Result<(), SymbolError> {
        let mut table = BTreeMap::new();
        for (token, vector) in entries {
            let token = Self::normalize_token(&token);
            if vector.is_empty() {
                return Err(SymbolError::EmptyVector(token));
            }
            if vector.len() != dim {
                return Err(SymbolError::DimMismatch {
                    expected: dim,
                    got: vector.len(),
                });
            }
            table.insert(token, l2_normalize(&vector));
        }
        self.table = table;
        self.dim = Some(dim);
        self.mark_mutated();
        Ok(())
    }

    /// Drop every token; the locked dimension is retained.
    pub fn clear(&mut self) {
        self.table.clear();
        self.mark_mutated();
    }

    /// Deep copy of the full table for iteration outside any lock.
    pub fn snapshot(&self) -> Vec<(String, Tensor)> {
        self.table
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
