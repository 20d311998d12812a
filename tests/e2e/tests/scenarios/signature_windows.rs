//! Sequence signature parsing.
//!
//! Two-byte windows slide over a byte stream; the MZ and PE signature
//! states answer their exact windows through the strict System-1 gate,
//! zero windows carry no signal, and near-miss windows stay below the
//! gate and the pinned critic.

use axon_core::prelude::*;
use axon_core::substrate::DefaultSubstrate;
use axon_core::{HeuristicConfig, KernelStats, MetabolismConfig};
use axon_e2e_tests::numeric_payload;

const STREAM: [i64; 8] = [0x4D, 0x5A, 0x00, 0x00, 0x50, 0x45, 0xC7, 0x83];

fn strict_kernel() -> Kernel {
    let ruleset = parse_ruleset(
        "mode signatures\n\
         heuristic system1_min 0.99\n\
         heuristic system1_max 0.99\n\
         heuristic critic_min 0.999\n\
         heuristic critic_max 0.999\n",
    )
    .unwrap();
    let mut heuristics = HeuristicConfig::default();
    ruleset.apply_heuristics(&mut heuristics).unwrap();

    Kernel::boot(
        &DefaultSubstrate,
        CognitiveAdapter::with_config(heuristics, Default::default()),
        KernelConfig {
            energy_override: Some(8192.0),
            metabolism: MetabolismConfig {
                deep_budget: 4,
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

fn encode_window(kernel: &Kernel, values: &[i64]) -> Tensor {
    let stream = DataStream::numeric("sig", numeric_payload(values));
    let mut symbols = kernel.system().symbols().unwrap();
    kernel.adapter().encode(&stream, &mut symbols, None).unwrap()
}

#[test]
fn signatures_fire_on_their_windows_only() {
    let kernel = strict_kernel();

    // Install the two signature states.
    let mz = encode_window(&kernel, &[0x4D, 0x5A]);
    let pe = encode_window(&kernel, &[0x50, 0x45]);
    kernel.set_references(vec![mz.clone(), pe.clone()]).unwrap();
    kernel.prime_cache("sig:mz", mz, 1.0).unwrap();
    kernel.prime_cache("sig:pe", pe, 1.0).unwrap();

    let mut hits = Vec::new();
    for start in 0..STREAM.len() - 1 {
        let window = &STREAM[start..start + 2];
        let stream = DataStream::numeric(format!("window_{start}"), numeric_payload(window));
        let report = kernel.ingest(&stream).unwrap();

        if report.outcome == PipelineOutcome::ReflexHit {
            hits.push((start, report.reflex_key.clone().unwrap()));
            assert!(report.similarity > 0.99);
        } else {
            // Everything else stays below the pinned critic.
            assert!(!report.success, "window {start} must not resolve");
        }
    }

    // Exactly the MZ window at offset 0 and the PE window at offset 4.
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0], (0, "sig:mz".to_string()));
    assert_eq!(hits[1], (4, "sig:pe".to_string()));
}

#[test]
fn zero_windows_carry_no_signal() {
    let kernel = strict_kernel();
    let mz = encode_window(&kernel, &[0x4D, 0x5A]);
    kernel.prime_cache("sig:mz", mz.clone(), 1.0).unwrap();

    // The all-zero window folds to the zero vector: cosine 0 everywhere.
    let zero = encode_window(&kernel, &[0, 0]);
    assert!(zero.as_slice().iter().all(|&x| x == 0.0));
    assert_eq!(cosine_similarity(&zero, &mz), 0.0);

    let report = kernel
        .ingest(&DataStream::numeric("zeros", "0 0"))
        .unwrap();
    assert_ne!(report.outcome, PipelineOutcome::ReflexHit);
    assert!(!report.success);

    // No sleep fired during this short run, so the gate never loosened.
    let stats: KernelStats = kernel.stats().unwrap();
    assert_eq!(stats.sleep_count, 0);
}
