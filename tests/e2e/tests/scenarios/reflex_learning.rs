//! Reflex learning after one sleep.
//!
//! A manifold bootstrapped with three one-hot symbols deep-thinks its way
//! through a token sequence once, consolidates during sleep, and answers
//! the same sequence reflexively afterwards, without ever touching the
//! host's energy budget.

use axon_core::prelude::*;
use axon_e2e_tests::{host_kernel, manifold_on};

const SEQUENCE_RULESET: &str = "\
mode identity
symbol alpha onehot 0,10
symbol beta onehot 1,11
symbol gamma onehot 2,12
trigger alpha 0.92 emit_token
trigger beta 0.92 emit_token
trigger gamma 0.92 emit_token
heuristic critic_max 0.7
";

#[test]
fn reflex_learned_after_one_sleep() {
    let host = host_kernel(427.0);
    let ruleset = parse_ruleset(SEQUENCE_RULESET).unwrap();
    let mut manifold = manifold_on(&host, "sequencer", ruleset);
    assert!((manifold.kernel().max_energy().unwrap() - 64.05).abs() < 1e-9);

    let host_before = host.energy().unwrap();
    for _ in 0..4 {
        manifold.enqueue(DataStream::text("seq", "ALPHA BETA GAMMA ALPHA"));
    }

    // First encounter: the positional encoding is unfamiliar, so System 2
    // must converge on it.
    let pass1 = manifold.run_batch(1).unwrap();
    assert_eq!(pass1.processed, 1);
    assert_eq!(pass1.deep_accepts, 1);
    assert_eq!(pass1.reflex_hits, 0);

    manifold.sleep().unwrap();

    // Second encounter: working memory answers at System-1 speed.
    let pass2 = manifold.run_batch(1).unwrap();
    assert_eq!(pass2.processed, 1);
    assert_eq!(pass2.deep_accepts, 0);
    assert_eq!(pass2.reflex_hits, 1);
    let hit = &pass2.reports[0];
    assert_eq!(hit.outcome, PipelineOutcome::ReflexHit);
    assert!(hit.similarity > 0.95);

    // Strict isolation: manifold work cost the host nothing.
    let host_delta = (host.energy().unwrap() - host_before).abs();
    assert!(host_delta <= 1.0, "host energy drifted by {host_delta}");
}

#[test]
fn consolidation_promoted_the_sequence_to_a_reflex() {
    let host = host_kernel(427.0);
    let mut manifold = manifold_on(&host, "sequencer", parse_ruleset(SEQUENCE_RULESET).unwrap());

    manifold.enqueue(DataStream::text("seq", "ALPHA BETA GAMMA ALPHA"));
    manifold.run_batch(1).unwrap();
    let reflexes_before = manifold.kernel().system().reflexes().unwrap().len();

    let report = manifold.sleep().unwrap();
    assert!(report.promoted >= 1);

    let reflexes_after = manifold.kernel().system().reflexes().unwrap().len();
    assert!(reflexes_after > reflexes_before);

    // The promoted reflex carries consolidation provenance.
    let mut symbols = SymbolSpace::with_dimension(1024);
    let matches = manifold.kernel().system().reflexes().unwrap().query(
        &axon_core::ReflexQuery {
            min_stability: 0.5,
            ..Default::default()
        },
        &mut symbols,
    );
    assert!(matches
        .iter()
        .any(|m| m.entry.meta.get("source").map(String::as_str) == Some("sleep_consolidation")));
}
