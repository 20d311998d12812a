//! Deep-Think Routing
//!
//! Each System-2 iteration proposes a candidate state: blend toward the
//! best cache memory when one resonates, otherwise self-mix by circular
//! permutation. Fitness scores the candidate against the reference set
//! (ruleset symbols, cache candidates, episodic recall); the critic gates
//! on it. The discovery-induction override is experimental and disabled
//! unless configured on.

use serde::{Deserialize, Serialize};

use super::profile::{HeuristicConfig, SignalProfile};
use crate::tensor::{bundle, cosine_similarity, l2_normalize, permute, Tensor};
use crate::wm::CacheEntry;

// ============================================================================
// STRATEGY
// ============================================================================

/// How a candidate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Blend of the target and the best-matching cache memory
    CacheBundle,
    /// Permuted self-mix of the target
    SelfPermute,
    /// Experimental critic override for non-converging input
    DiscoveryInduction,
}

impl RouteStrategy {
    /// Wire string for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStrategy::CacheBundle => "cache_bundle",
            RouteStrategy::SelfPermute => "self_permute",
            RouteStrategy::DiscoveryInduction => "discovery_induction",
        }
    }
}

/// One routed candidate with its score and thermodynamic cost.
#[derive(Debug, Clone)]
pub struct RouteOutcome {
    /// The proposed state
    pub candidate: Tensor,
    /// Strategy that produced it
    pub strategy: RouteStrategy,
    /// Fitness against the reference set, in [0, 1]
    pub fitness: f64,
    /// Energy cost of this iteration
    pub cost: f64,
    /// Best cosine between the target and any cache candidate
    pub best_similarity: f64,
}

// ============================================================================
// ROUTING
// ============================================================================

fn best_candidate<'a>(target: &Tensor, candidates: &'a [CacheEntry]) -> Option<(&'a CacheEntry, f64)> {
    candidates
        .iter()
        .filter(|c| c.vector.len() == target.len())
        .map(|c| (c, cosine_similarity(target, &c.vector)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

/// Score a candidate against the reference set; with no references the
/// candidate's coherence with the target stands in.
fn fitness_of(candidate: &Tensor, target: &Tensor, references: &[Tensor]) -> f64 {
    let usable: Vec<&Tensor> = references
        .iter()
        .filter(|r| r.len() == candidate.len())
        .collect();
    if usable.is_empty() {
        return cosine_similarity(candidate, target).max(0.0);
    }
    usable
        .iter()
        .map(|r| cosine_similarity(candidate, r))
        .fold(0.0f64, f64::max)
        .clamp(0.0, 1.0)
}

/// Produce the next candidate for one System-2 iteration.
pub(crate) fn route(
    target: &Tensor,
    profile: &SignalProfile,
    candidates: &[CacheEntry],
    references: &[Tensor],
    iteration: usize,
    zombie: bool,
    config: &HeuristicConfig,
) -> RouteOutcome {
    let best = best_candidate(target, candidates);
    let best_similarity = best.as_ref().map(|(_, s)| *s).unwrap_or(0.0);

    // Zombie metabolism prefers the cache path: halve the bundle bar so a
    // weaker memory still counts as resonant.
    let bundle_floor = if zombie {
        config.route_bundle_floor * 0.5
    } else {
        config.route_bundle_floor
    };

    let (candidate, mut strategy) = match best {
        Some((entry, similarity)) if similarity >= bundle_floor => {
            let w = (config.blend_base + config.blend_entropy_weight * (1.0 - profile.entropy))
                .clamp(config.blend_min, config.blend_max);
            let blended: Vec<f32> = target
                .as_slice()
                .iter()
                .zip(entry.vector.as_slice())
                .map(|(&t, &b)| ((t as f64) * (1.0 - w) + (b as f64) * w) as f32)
                .collect();
            (
                l2_normalize(&Tensor::from_vec(blended)),
                RouteStrategy::CacheBundle,
            )
        }
        _ => {
            let dim = target.len();
            let shift = if dim > 1 {
                (iteration % (dim - 1)) as i64 + 1
            } else {
                0
            };
            (
                bundle(&permute(target, shift), target, true),
                RouteStrategy::SelfPermute,
            )
        }
    };

    let mut fitness = fitness_of(&candidate, target, references);

    if config.enable_discovery_induction
        && profile.entropy > config.discovery_entropy_floor
        && best_similarity < config.discovery_cos_ceiling
        && iteration > config.discovery_iteration_floor
    {
        strategy = RouteStrategy::DiscoveryInduction;
        fitness = (profile.critic_accept + 0.01).min(1.0);
        tracing::debug!(iteration, "discovery induction override");
    }

    let mut cost = config.cost_base
        + config.cost_deep_weight * profile.deep_cost_bias
        + config.cost_fitness_weight * (1.0 - fitness);
    if strategy == RouteStrategy::CacheBundle {
        cost *= config.cache_bundle_cost_factor;
    }

    RouteOutcome {
        candidate,
        strategy,
        fitness,
        cost,
        best_similarity,
    }
}

/// Geometric gap: `L2Normalize(target − best_sim · best_ref)`.
///
/// With no resonant reference the gap is the target itself. Returns `None`
/// only when the gap collapses to zero (target already fully produced).
pub(crate) fn deduce_constraint(target: &Tensor, references: &[Tensor]) -> Option<Tensor> {
    let usable: Vec<&Tensor> = references
        .iter()
        .filter(|r| r.len() == target.len())
        .collect();
    let best = usable
        .iter()
        .map(|r| (*r, cosine_similarity(target, r)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));

    let gap = match best {
        Some((reference, similarity)) if similarity > 0.0 => {
            let data: Vec<f32> = target
                .as_slice()
                .iter()
                .zip(reference.as_slice())
                .map(|(&t, &r)| ((t as f64) - similarity * (r as f64)) as f32)
                .collect();
            Tensor::from_vec(data)
        }
        _ => target.clone(),
    };

    let normalized = l2_normalize(&gap);
    if normalized.as_slice().iter().all(|&x| x == 0.0) {
        None
    } else {
        Some(normalized)
    }
}

// ============================================================================
// TESTS
// ============================================================================
