//! Signal Profiling
//!
//! Heuristic statistics over the raw payload drive three adaptive
//! thresholds: the System-1 similarity gate loosens for high-entropy
//! input, the critic tightens for it, and the deep-think cost bias rises
//! with both entropy and sparsity. The thresholds are the pipeline's
//! energy discipline; every weight here is configuration, not code.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::encode::DataStream;

// ============================================================================
// HEURISTIC CONFIG
// ============================================================================

/// All adaptive-threshold, routing, and cost weights.
#[derive(Debug, Clone)]
pub struct HeuristicConfig {
    /// System-1 gate base value
    pub system1_base: f64,
    /// Entropy weight subtracted from the System-1 gate
    pub system1_entropy_weight: f64,
    /// Sparsity weight added to the System-1 gate
    pub system1_sparsity_weight: f64,
    /// System-1 gate lower clamp
    pub system1_min: f64,
    /// System-1 gate upper clamp
    pub system1_max: f64,

    /// Critic base value
    pub critic_base: f64,
    /// Entropy weight added to the critic
    pub critic_entropy_weight: f64,
    /// |skew| weight added to the critic
    pub critic_skew_weight: f64,
    /// Critic lower clamp
    pub critic_min: f64,
    /// Critic upper clamp
    pub critic_max: f64,

    /// Deep-think cost bias base value
    pub deep_base: f64,
    /// Entropy weight added to the cost bias
    pub deep_entropy_weight: f64,
    /// Sparsity weight added to the cost bias
    pub deep_sparsity_weight: f64,
    /// Cost bias lower clamp
    pub deep_min: f64,
    /// Cost bias upper clamp
    pub deep_max: f64,

    /// Minimum best-candidate cosine for the cache-bundle route
    pub route_bundle_floor: f64,
    /// Blend weight base term
    pub blend_base: f64,
    /// Blend weight (1 - entropy) coefficient
    pub blend_entropy_weight: f64,
    /// Blend weight lower clamp
    pub blend_min: f64,
    /// Blend weight upper clamp
    pub blend_max: f64,

    /// Thermodynamic base cost per deep iteration
    pub cost_base: f64,
    /// Cost weight on the deep cost bias
    pub cost_deep_weight: f64,
    /// Cost weight on the fitness shortfall
    pub cost_fitness_weight: f64,
    /// Multiplier applied when the cache-bundle route was taken
    pub cache_bundle_cost_factor: f64,

    /// Experimental critic override for non-converging high-entropy input
    pub enable_discovery_induction: bool,
    /// Entropy floor for discovery induction
    pub discovery_entropy_floor: f64,
    /// Best-cosine ceiling for discovery induction
    pub discovery_cos_ceiling: f64,
    /// Iteration floor for discovery induction
    pub discovery_iteration_floor: usize,

    /// Entropy floor for anomaly marking
    pub anomaly_entropy_floor: f64,
    /// Iteration floor for anomaly marking
    pub anomaly_iteration_floor: usize,

    /// Magnitude under which a sample counts as near-zero for sparsity
    pub near_zero: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            system1_base: 0.82,
            system1_entropy_weight: 0.15,
            system1_sparsity_weight: 0.10,
            system1_min: 0.60,
            system1_max: 0.98,

            critic_base: 0.55,
            critic_entropy_weight: 0.20,
            critic_skew_weight: 0.05,
            critic_min: 0.40,
            critic_max: 0.95,

            deep_base: 0.30,
            deep_entropy_weight: 0.40,
            deep_sparsity_weight: 0.20,
            deep_min: 0.10,
            deep_max: 1.00,

            route_bundle_floor: 0.20,
            blend_base: 0.30,
            blend_entropy_weight: 0.50,
            blend_min: 0.20,
            blend_max: 0.80,

            cost_base: 2.0,
            cost_deep_weight: 12.0,
            cost_fitness_weight: 8.0,
            cache_bundle_cost_factor: 0.85,

            enable_discovery_induction: cfg!(feature = "discovery-induction"),
            discovery_entropy_floor: 0.85,
            discovery_cos_ceiling: 0.20,
            discovery_iteration_floor: 32,

            anomaly_entropy_floor: 0.85,
            anomaly_iteration_floor: 8,

            near_zero: 1e-6,
        }
    }
}

impl HeuristicConfig {
    /// Apply a ruleset key/value override. Unknown keys are reported back
    /// as an error string so ruleset parsing can surface one diagnostic.
    pub fn apply_override(&mut self, key: &str, value: &str) -> Result<(), String> {
        let parsed = value
            .parse::<f64>()
            .map_err(|_| format!("heuristic {key}: not a number: {value}"))?;
        match key {
            "system1_base" => self.system1_base = parsed,
            "system1_entropy_weight" => self.system1_entropy_weight = parsed,
            "system1_sparsity_weight" => self.system1_sparsity_weight = parsed,
            "system1_min" => self.system1_min = parsed,
            "system1_max" => self.system1_max = parsed,
            "critic_base" => self.critic_base = parsed,
            "critic_entropy_weight" => self.critic_entropy_weight = parsed,
            "critic_skew_weight" => self.critic_skew_weight = parsed,
            "critic_min" => self.critic_min = parsed,
            "critic_max" => self.critic_max = parsed,
            "deep_base" => self.deep_base = parsed,
            "deep_entropy_weight" => self.deep_entropy_weight = parsed,
            "deep_sparsity_weight" => self.deep_sparsity_weight = parsed,
            "deep_min" => self.deep_min = parsed,
            "deep_max" => self.deep_max = parsed,
            "route_bundle_floor" => self.route_bundle_floor = parsed,
            "cost_base" => self.cost_base = parsed,
            "enable_discovery_induction" => self.enable_discovery_induction = parsed != 0.0,
            _ => return Err(format!("unknown heuristic key: {key}")),
        }
        Ok(())
    }
}

// ============================================================================
// SIGNAL PROFILE
// ============================================================================

/// Categorical signal character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalLabel {
    /// Mostly near-zero samples
    Sparse,
    /// Bucket entropy close to maximal
    HighEntropy,
    /// Strongly asymmetric distribution
    Skewed,
    /// Nothing remarkable
    Balanced,
}

impl SignalLabel {
    /// Wire string for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalLabel::Sparse => "sparse",
            SignalLabel::HighEntropy => "high_entropy",
            SignalLabel::Skewed => "skewed",
            SignalLabel::Balanced => "balanced",
        }
    }
}

/// Heuristic statistics plus the adaptive thresholds they induce.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalProfile {
    /// Number of samples analyzed
    pub length: usize,
    /// Minimum sample
    pub min: f64,
    /// Maximum sample
    pub max: f64,
    /// Mean sample
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Skewness (central third moment / σ³)
    pub skew: f64,
    /// Fraction of near-zero samples
    pub sparsity: f64,
    /// Shannon entropy over rounded-integer buckets, normalized to [0, 1]
    pub entropy: f64,
    /// Distinct buckets / sample count
    pub unique_ratio: f64,
    /// max - min
    pub range: f64,
    /// System-1 similarity gate
    pub system1_threshold: f64,
    /// Critic accept threshold
    pub critic_accept: f64,
    /// Deep-think cost bias
    pub deep_cost_bias: f64,
    /// Categorical label
    pub label: SignalLabel,
}

// ============================================================================
// ANALYSIS
// ============================================================================

/// Parse a numeric payload: decimals and floats separated by any
/// non-numeric character.
pub(crate) fn parse_numbers(payload: &str) -> Vec<f64> {
    let mut values = Vec::new();
    let mut token = String::new();
    for ch in payload.chars() {
        if ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E') {
            token.push(ch);
        } else if !token.is_empty() {
            if let Ok(v) = std::mem::take(&mut token).parse::<f64>() {
                values.push(v);
            }
        }
    }
    if !token.is_empty() {
        if let Ok(v) = token.parse::<f64>() {
            values.push(v);
        }
    }
    values
}

fn samples_of(stream: &DataStream) -> Vec<f64> {
    match stream.dataset_type.as_str() {
        "tensor" | "numeric" => parse_numbers(&stream.payload),
        _ => stream.payload.chars().map(|c| c as u32 as f64).collect(),
    }
}

/// Compute the full signal profile of a stream.
pub(crate) fn analyze(stream: &DataStream, config: &HeuristicConfig) -> SignalProfile {
    let samples: Vec<f64> = samples_of(stream)
        .into_iter()
        .map(|v| if v.is_finite() { v } else { 0.0 })
        .collect();
    let n = samples.len();

    let (min, max, mean, std, skew, sparsity, entropy, unique_ratio) = if n == 0 {
        (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0)
    } else {
        let min = samples.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
        let std = variance.sqrt();
        let skew = if std > 1e-12 {
            samples.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n as f64 / std.powi(3)
        } else {
            0.0
        };
        let sparsity =
            samples.iter().filter(|v| v.abs() < config.near_zero).count() as f64 / n as f64;

        let mut buckets: HashMap<i64, usize> = HashMap::new();
        for v in &samples {
            *buckets.entry(v.round() as i64).or_default() += 1;
        }
        let entropy = if buckets.len() > 1 {
            let raw: f64 = buckets
                .values()
                .map(|&count| {
                    let p = count as f64 / n as f64;
                    -p * p.log2()
                })
                .sum();
            (raw / (buckets.len() as f64).log2()).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let unique_ratio = buckets.len() as f64 / n as f64;

        (min, max, mean, std, skew, sparsity, entropy, unique_ratio)
    };

    let system1_threshold = (config.system1_base - entropy * config.system1_entropy_weight
        + sparsity * config.system1_sparsity_weight)
        .clamp(config.system1_min, config.system1_max);
    let critic_accept = (config.critic_base
        + entropy * config.critic_entropy_weight
        + skew.abs() * config.critic_skew_weight)
        .clamp(config.critic_min, config.critic_max);
    let deep_cost_bias = (config.deep_base
        + entropy * config.deep_entropy_weight
        + sparsity * config.deep_sparsity_weight)
        .clamp(config.deep_min, config.deep_max);

    let label = if sparsity >= 0.5 {
        SignalLabel::Sparse
    } else if entropy > 0.85 {
        SignalLabel::HighEntropy
    } else if skew.abs() > 1.0 {
        SignalLabel::Skewed
    } else {
        SignalLabel::Balanced
    };

    SignalProfile {
        length: n,
        min,
        max,
        mean,
        std,
        skew,
        sparsity,
        entropy,
        unique_ratio,
        range: max - min,
        system1_threshold,
        critic_accept,
        deep_cost_bias,
        label,
    }
}

// ============================================================================
// TESTS
// ============================================================================
