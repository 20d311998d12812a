//! Deterministic identity classification under a strict threshold.
//!
//! With the critic pinned at 1.0, only a bit-exact state may pass: the
//! one-hot encoding of byte 0xC7 accepts its own copy and rejects a copy
//! perturbed by +0.01 at a single far-away index.

use axon_core::prelude::*;
use axon_core::{HeuristicConfig, ReflexQuery, ReflexStore, VectorSpec};

fn strict_adapter() -> CognitiveAdapter {
    let ruleset = parse_ruleset(
        "mode strict\n\
         heuristic critic_min 1.0\n\
         heuristic critic_max 1.0\n",
    )
    .unwrap();
    let mut heuristics = HeuristicConfig::default();
    ruleset.apply_heuristics(&mut heuristics).unwrap();
    CognitiveAdapter::with_config(heuristics, Default::default())
}

fn byte_c7_symbol() -> Tensor {
    let def = axon_core::SymbolDef {
        token: "opcode_c7".to_string(),
        spec: VectorSpec::OneHot(vec![199]),
    };
    def.materialize(1024).unwrap()
}

#[test]
fn exact_copy_accepts_perturbed_copy_rejects() {
    let adapter = strict_adapter();
    let symbol = byte_c7_symbol();

    let stream = DataStream::text("opcode", "c7");
    let profile = adapter.analyze(&stream);
    assert!((profile.critic_accept - 1.0).abs() < 1e-12);

    // Exact copy: cosine is exactly 1.0 for the one-hot.
    let exact = symbol.clone();
    let fitness = cosine_similarity(&exact, &symbol);
    assert!((fitness - 1.0).abs() < 1e-12);
    assert!(adapter.critic_accepts(fitness, &profile, false, 0.9));

    // Flip a single float by +0.01 far from the hot index.
    let mut flipped = symbol.clone();
    flipped.as_mut_slice()[500] += 0.01;
    let flipped = l2_normalize(&flipped);
    let fitness = cosine_similarity(&flipped, &symbol);
    assert!(fitness < 1.0);
    assert!(!adapter.critic_accepts(fitness, &profile, false, 0.9));
}

#[test]
fn working_memory_gate_at_unity_threshold() {
    let symbol = byte_c7_symbol();
    let mut cache = WorkingMemory::new();
    cache.promote("opcode_c7", symbol.clone(), 1.0, "opcode", "c7", 0.0);

    // The strict gate admits the exact state...
    let hit = cache.lookup(&symbol, 1.0).expect("exact state must pass");
    assert_eq!(hit.entry.key, "opcode_c7");

    // ...and refuses the perturbed one.
    let mut flipped = symbol.clone();
    flipped.as_mut_slice()[500] += 0.01;
    let flipped = l2_normalize(&flipped);
    assert!(cache.lookup(&flipped, 1.0).is_none());
}

#[test]
fn strict_gate_through_reflex_store() {
    let symbol = byte_c7_symbol();
    let mut reflexes = ReflexStore::new();
    let mut meta = std::collections::BTreeMap::new();
    meta.insert("stability".to_string(), "1".to_string());
    meta.insert("label".to_string(), "opcode".to_string());
    reflexes
        .promote("opcode_c7", Some(symbol.clone()), meta, false)
        .unwrap();

    let mut symbols = SymbolSpace::with_dimension(1024);
    let matches = reflexes.query(
        &ReflexQuery {
            label: Some("opcode".to_string()),
            include_vectors: true,
            ..Default::default()
        },
        &mut symbols,
    );
    assert_eq!(matches.len(), 1);
    let resolved = matches[0].vector.as_ref().unwrap();
    assert!((cosine_similarity(resolved, &symbol) - 1.0).abs() < 1e-12);
}
