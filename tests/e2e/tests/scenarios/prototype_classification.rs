//! Noisy prototype classification with reject.
//!
//! Eight 32-byte prototypes are trained in with a dozen noisy copies
//! each; 96 held-out noisy copies must pass the strict-gated reflex path
//! and land on their own prototype, while a structurally dissimilar alien
//! pulse stays below the gate and the critic.

use axon_core::prelude::*;
use axon_core::substrate::DefaultSubstrate;
use axon_core::{HeuristicConfig, MetabolismConfig};
use axon_e2e_tests::{numeric_payload, TestRng};

const PROTOTYPES: usize = 8;
const WIDTH: usize = 32;
const TRAIN_COPIES: usize = 12;
const HELD_OUT_COPIES: usize = 12;

fn strict_kernel() -> Kernel {
    let ruleset = parse_ruleset(
        "mode classify\n\
         heuristic system1_min 0.85\n\
         heuristic system1_max 0.85\n\
         heuristic critic_min 0.97\n\
         heuristic critic_max 0.97\n",
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
                deep_budget: 8,
                ..Default::default()
            },
            ..Default::default()
        },
    )
}

fn prototypes(rng: &mut TestRng) -> Vec<Vec<i64>> {
    (0..PROTOTYPES)
        .map(|_| (0..WIDTH).map(|_| rng.signed_byte()).collect())
        .collect()
}

fn noisy_copy(prototype: &[i64], rng: &mut TestRng) -> Vec<i64> {
    prototype.iter().map(|&v| v + rng.jitter()).collect()
}

#[test]
fn held_out_copies_accept_alien_rejects() {
    let kernel = strict_kernel();
    let mut rng = TestRng::new(0xA0A0);
    let protos = prototypes(&mut rng);

    // Train: each prototype once, then twelve noisy copies. The first
    // encounter builds the working-memory entry; the copies reinforce it
    // through the reflex path.
    let mut train_keys = Vec::new();
    for (p, proto) in protos.iter().enumerate() {
        let id = format!("proto_{p}");
        let stream = DataStream::numeric(&id, numeric_payload(proto));
        train_keys.push(Kernel::fingerprint(&stream));
        kernel.ingest(&stream).unwrap();
        for _ in 0..TRAIN_COPIES {
            let copy = noisy_copy(proto, &mut rng);
            kernel
                .ingest(&DataStream::numeric(&id, numeric_payload(&copy)))
                .unwrap();
        }
    }

    // Held out: 96 fresh noisy copies through the strict gate.
    let mut accepted = 0usize;
    let mut correctly_classified = 0usize;
    for (p, proto) in protos.iter().enumerate() {
        for _ in 0..HELD_OUT_COPIES {
            let copy = noisy_copy(proto, &mut rng);
            let report = kernel
                .ingest(&DataStream::numeric(format!("held_{p}"), numeric_payload(&copy)))
                .unwrap();
            if report.outcome == PipelineOutcome::ReflexHit {
                accepted += 1;
                let key = report.reflex_key.as_deref().unwrap();
                let entry = kernel.cache_entry(key).unwrap().unwrap();
                if entry.dataset_id == format!("proto_{p}") {
                    correctly_classified += 1;
                }
            }
        }
    }
    let total = PROTOTYPES * HELD_OUT_COPIES;
    assert!(
        accepted >= total - 1,
        "only {accepted}/{total} held-out copies passed the gate"
    );
    assert!(
        correctly_classified >= total - 1,
        "only {correctly_classified}/{total} landed on their prototype"
    );

    // The alien pulse: a square wave no prototype correlates with.
    let alien: Vec<i64> = (0..WIDTH)
        .map(|i| if i % 2 == 0 { 127 } else { -128 })
        .collect();

    // Its best cosine margin against every trained state sits far below
    // the configured gate.
    let alien_stream = DataStream::numeric("alien", numeric_payload(&alien));
    let alien_vector = {
        let mut symbols = kernel.system().symbols().unwrap();
        kernel.adapter().encode(&alien_stream, &mut symbols, None).unwrap()
    };
    let best_margin = protos
        .iter()
        .enumerate()
        .map(|(p, proto)| {
            let stream = DataStream::numeric(format!("proto_{p}"), numeric_payload(proto));
            let mut symbols = kernel.system().symbols().unwrap();
            let proto_vector = kernel.adapter().encode(&stream, &mut symbols, None).unwrap();
            cosine_similarity(&alien_vector, &proto_vector)
        })
        .fold(f64::MIN, f64::max);
    assert!(best_margin < 0.85, "alien correlates at {best_margin}");

    let report = kernel.ingest(&alien_stream).unwrap();
    assert_ne!(report.outcome, PipelineOutcome::ReflexHit);
    assert!(!report.success, "the alien pulse must be rejected");
}
