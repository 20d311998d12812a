//! HDC System Handle
//!
//! One `HdcSystem` bundles the three long-lived stores (symbols, reflexes,
//! episodic traces) behind per-store mutexes. Each system is owned by
//! exactly one kernel loop or manifold; there are no process-wide
//! singletons. Snapshot methods deep-copy so callers iterate outside any
//! lock.

use std::sync::{Mutex, MutexGuard};

use crate::episodic::{EpisodicError, EpisodicMemory};
use crate::reflex::{ReflexEntry, ReflexStore};
use crate::symbols::SymbolSpace;
use crate::tensor::Tensor;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// System-level error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum SystemError {
    /// A store mutex was poisoned by a panicking holder
    #[error("{0} lock poisoned")]
    LockPoisoned(&'static str),
}

// ============================================================================
// HDC SYSTEM
// ============================================================================

/// The three HDC stores behind per-store mutexes.
pub struct HdcSystem {
    symbols: Mutex<SymbolSpace>,
    reflexes: Mutex<ReflexStore>,
    episodic: Mutex<EpisodicMemory>,
}

impl Default for HdcSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl HdcSystem {
    /// Create a system with empty stores; dimensions lock on first use.
    pub fn new() -> Self {
        Self {
            symbols: Mutex::new(SymbolSpace::new()),
            reflexes: Mutex::new(ReflexStore::new()),
            episodic: Mutex::new(EpisodicMemory::new()),
        }
    }

    /// Create a system whose symbol space is pre-locked to `dim`.
    pub fn with_dimension(dim: usize) -> Self {
        Self {
            symbols: Mutex::new(SymbolSpace::with_dimension(dim)),
            reflexes: Mutex::new(ReflexStore::new()),
            episodic: Mutex::new(EpisodicMemory::new()),
        }
    }

    /// Lock the symbol space.
    pub fn symbols(&self) -> Result<MutexGuard<'_, SymbolSpace>, SystemError> {
        self.symbols
            .lock()
            .map_err(|_| SystemError::LockPoisoned("symbol space"))
    }

    /// Lock the reflex store.
    pub fn reflexes(&self) -> Result<MutexGuard<'_, ReflexStore>, SystemError> {
        self.reflexes
            .lock()
            .map_err(|_| SystemError::LockPoisoned("reflex store"))
    }

    /// Lock the episodic store.
    pub fn episodic(&self) -> Result<MutexGuard<'_, EpisodicMemory>, SystemError> {
        self.episodic
            .lock()
            .map_err(|_| SystemError::LockPoisoned("episodic memory"))
    }

    /// Store a trace, holding the episodic lock only for the insertion.
    pub fn store_trace(&self, vector: &Tensor) -> Result<Result<u64, EpisodicError>, SystemError> {
        Ok(self.episodic()?.store(vector))
    }

    /// Deep copy of the symbol table.
    pub fn symbol_snapshot(&self) -> Result<Vec<(String, Tensor)>, SystemError> {
        Ok(self.symbols()?.snapshot())
    }

    /// Deep copy of every reflex.
    pub fn reflex_snapshot(&self) -> Result<Vec<ReflexEntry>, SystemError> {
        Ok(self.reflexes()?.snapshot())
    }

    /// Episodic dimension, if locked.
    pub fn episodic_dimension(&self) -> Result<Option<usize>, SystemError> {
        Ok(self.episodic()?.dimension())
    }
}

// ============================================================================
// TESTS
// ============================================================================
