//! Neuroplastic discovery.
//!
//! A manifold that only knows opcode 0xC3 meets two strangers. On the
//! first pass the strangers are flagged anomalous while 0xC3 answers
//! reflexively; sleeping turns each anomaly's deduced constraint into a
//! learned symbol and trigger, so the second pass answers all three
//! through System 1 with no deep thinking at all.

use axon_core::prelude::*;
use axon_core::substrate::DefaultSubstrate;
use axon_core::{KernelConfig, ManifoldConfig, MetabolismConfig};

const KNOWN_OPCODE_RULESET: &str = "\
mode strict
symbol c3 onehot 195
trigger c3 0.95 execute
heuristic critic_min 0.9
heuristic critic_max 0.95
";

fn discovery_manifold(host: &Kernel) -> ProgramManifold {
    ProgramManifold::new(
        "decoder",
        host,
        &DefaultSubstrate,
        parse_ruleset(KNOWN_OPCODE_RULESET).unwrap(),
        ManifoldConfig {
            kernel: KernelConfig {
                metabolism: MetabolismConfig {
                    deep_budget: 4,
                    ..Default::default()
                },
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap()
}

fn opcodes() -> Vec<DataStream> {
    vec![
        DataStream::text("op_6a", "6a"),
        DataStream::text("op_58", "58"),
        DataStream::text("op_c3", "c3"),
    ]
}

#[test]
fn anomalies_become_reflexes_after_sleep() {
    let host = Kernel::boot(
        &DefaultSubstrate,
        CognitiveAdapter::new(),
        KernelConfig {
            energy_override: Some(1000.0),
            ..Default::default()
        },
    );
    let mut manifold = discovery_manifold(&host);

    let symbols_before = manifold.ruleset().symbol_definitions.len();
    let triggers_before = manifold.ruleset().reflex_triggers.len();
    assert_eq!(symbols_before, 1);
    assert_eq!(triggers_before, 1);

    // Pass 1: two strangers, one known opcode.
    for stream in opcodes() {
        manifold.enqueue(stream);
    }
    let pass1 = manifold.run_batch(3).unwrap();
    assert_eq!(pass1.processed, 3);
    assert_eq!(pass1.rejected, 2, "both strangers must fail to resolve");
    assert_eq!(pass1.reflex_hits, 1, "the known opcode answers reflexively");
    assert_eq!(pass1.deep_accepts, 0);

    manifold.sleep().unwrap();

    // Sleep converted every flagged anomaly into a symbol + trigger.
    assert_eq!(manifold.ruleset().symbol_definitions.len(), 3);
    assert_eq!(manifold.ruleset().reflex_triggers.len(), 3);
    let learned = manifold.learned_tokens();
    assert!(learned.contains(&"op_6a".to_string()));
    assert!(learned.contains(&"op_58".to_string()));
    for trigger in &manifold.ruleset().reflex_triggers[triggers_before..] {
        assert_eq!(trigger.action, "resolve_state");
    }
    assert!(manifold.kernel().cache_anomalies().unwrap().is_empty());

    // Pass 2: every opcode answers through System 1.
    for stream in opcodes() {
        manifold.enqueue(stream);
    }
    let pass2 = manifold.run_batch(3).unwrap();
    assert_eq!(pass2.processed, 3);
    assert_eq!(pass2.reflex_hits, 3);
    assert_eq!(pass2.deep_accepts, 0);
    for report in &pass2.reports {
        assert_eq!(report.outcome, PipelineOutcome::ReflexHit);
        assert!(!report.deep);
    }
}

#[test]
fn learned_constraint_points_at_the_unresolved_state() {
    let host = Kernel::boot(
        &DefaultSubstrate,
        CognitiveAdapter::new(),
        KernelConfig {
            energy_override: Some(1000.0),
            ..Default::default()
        },
    );
    let mut manifold = discovery_manifold(&host);

    manifold.enqueue(DataStream::text("op_6a", "6a"));
    manifold.run_batch(1).unwrap();

    let anomalies = manifold.kernel().cache_anomalies().unwrap();
    assert_eq!(anomalies.len(), 1);
    let entry = &anomalies[0];
    let constraint = entry.constraint.as_ref().unwrap();

    // The geometric gap is nearly the encoded input itself, because the
    // known symbol is quasi-orthogonal to it.
    assert!(cosine_similarity(constraint, &entry.vector) > 0.95);
    assert!(constraint.is_unit(1e-6));
}
