//! Shared harness for the axon end-to-end suites.

use axon_core::prelude::*;
use axon_core::substrate::DefaultSubstrate;
use axon_core::{ManifoldConfig, Ruleset};

/// Host kernel with a pinned energy budget.
pub fn host_kernel(max_energy: f64) -> Kernel {
    Kernel::boot(
        &DefaultSubstrate,
        CognitiveAdapter::new(),
        KernelConfig {
            energy_override: Some(max_energy),
            ..Default::default()
        },
    )
}

/// Manifold on a host with the given ruleset and default geometry.
pub fn manifold_on(host: &Kernel, name: &str, ruleset: Ruleset) -> ProgramManifold {
    ProgramManifold::new(name, host, &DefaultSubstrate, ruleset, ManifoldConfig::default())
        .expect("manifold boot")
}

/// Deterministic pseudo-random stream for test payloads.
pub struct TestRng(u64);

impl TestRng {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn next(&mut self) -> u64 {
        axon_core::splitmix64(&mut self.0)
    }

    /// Signed value in [-128, 127].
    pub fn signed_byte(&mut self) -> i64 {
        (self.next() % 256) as i64 - 128
    }

    /// Small perturbation in [-2, 2].
    pub fn jitter(&mut self) -> i64 {
        (self.next() % 5) as i64 - 2
    }
}

/// Render a numeric payload from values.
pub fn numeric_payload(values: &[i64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
