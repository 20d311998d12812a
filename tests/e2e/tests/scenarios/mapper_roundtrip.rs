//! Mapper round-trip.
//!
//! 100 symbols and 50 reflexes (half carrying vectors, half referring to
//! symbols by ordinal) survive a save / clear / load cycle with vectors
//! L2-equal, metadata intact, and query ordering unchanged.

use std::collections::BTreeMap;

use axon_core::prelude::*;
use axon_core::{
    cosine_similarity, load_file, random_hypervector, save_file, ReflexQuery, NO_SYMBOL_ID,
};

const DIM: usize = 64;

fn meta(pairs: &[(&str, String)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn build_stores() -> (SymbolSpace, ReflexStore) {
    let mut symbols = SymbolSpace::with_dimension(DIM);
    for i in 0..100 {
        symbols.resolve(&format!("tok{i:03}")).unwrap();
    }

    let mut reflexes = ReflexStore::new();
    for i in 0..50 {
        let stability = format!("{:.4}", i as f64 / 50.0);
        let id = format!("reflex{i:03}");
        let m = if i % 2 == 0 {
            // Half with explicit vectors and a sequence index entry.
            meta(&[
                ("stability", stability),
                ("label", format!("band{}", i % 5)),
                ("sequence_sha1", format!("sha{i:03}")),
            ])
        } else {
            // Half referring to a symbol by ordinal.
            let ordinal = symbols.ordinal_id(&format!("tok{i:03}")).unwrap();
            meta(&[
                ("stability", stability),
                ("label", format!("band{}", i % 5)),
                ("symbol_id", ordinal.to_string()),
            ])
        };
        let vector = (i % 2 == 0).then(|| random_hypervector(DIM, 5000 + i as u64));
        reflexes.promote(&id, vector, m, false).unwrap();
    }
    (symbols, reflexes)
}

#[test]
fn save_clear_load_preserves_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cognition.bcmap");

    let (mut symbols, mut reflexes) = build_stores();
    let symbol_snapshot = symbols.snapshot();
    let query = ReflexQuery {
        include_vectors: true,
        ..Default::default()
    };
    let order_before: Vec<String> = reflexes
        .query(&query, &mut symbols)
        .iter()
        .map(|m| m.entry.id.clone())
        .collect();

    save_file(&symbols, &reflexes, &path).unwrap();
    symbols.clear();
    reflexes.clear();
    assert!(symbols.is_empty());
    assert!(reflexes.is_empty());

    let (mut loaded_symbols, loaded_reflexes) = load_file(&path, 0).unwrap();

    // Every symbol vector L2-equal within 1e-6.
    assert_eq!(loaded_symbols.len(), 100);
    for (token, original) in &symbol_snapshot {
        let restored = loaded_symbols
            .vector_for_token(token)
            .unwrap_or_else(|| panic!("token {token} lost"));
        assert!(
            cosine_similarity(original, &restored) > 1.0 - 1e-6,
            "vector drift for {token}"
        );
        for (a, b) in original.as_slice().iter().zip(restored.as_slice()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    // Every reflex's stability, label, and sequence sha preserved.
    assert_eq!(loaded_reflexes.len(), 50);
    for i in 0..50usize {
        let id = format!("reflex{i:03}");
        let entry = loaded_reflexes.get(&id).unwrap();
        assert!((entry.stability() - i as f64 / 50.0).abs() < 1e-4, "{id}");
        assert_eq!(
            entry.meta.get("label").unwrap(),
            &format!("band{}", i % 5),
            "{id}"
        );
        if i % 2 == 0 {
            assert_eq!(
                entry.meta.get("sequence_sha1").unwrap(),
                &format!("sha{i:03}")
            );
            assert_eq!(
                loaded_reflexes.sequence_owner(&format!("sha{i:03}")),
                Some(id.as_str())
            );
            assert!(entry.vector.as_ref().unwrap().is_unit(1e-6));
        } else {
            assert_ne!(entry.symbol_id, NO_SYMBOL_ID);
            assert!(entry.vector.is_none());
        }
    }

    // Query ordering unchanged.
    let order_after: Vec<String> = loaded_reflexes
        .query(&query, &mut loaded_symbols)
        .iter()
        .map(|m| m.entry.id.clone())
        .collect();
    assert_eq!(order_before, order_after);
}

#[test]
fn symbol_referencing_reflexes_resolve_after_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cognition.bcmap");

    let (symbols, reflexes) = build_stores();
    save_file(&symbols, &reflexes, &path).unwrap();
    let (mut loaded_symbols, loaded_reflexes) = load_file(&path, 0).unwrap();

    // An odd-numbered reflex resolves through its symbol ordinal; the
    // ordinal space is rebuilt identically because tokens reload in
    // lexicographic order.
    let entry = loaded_reflexes.get("reflex007").unwrap();
    let resolved = loaded_reflexes.resolve_vector(&entry, &mut loaded_symbols);
    let direct = loaded_symbols.vector_for_token("tok007").unwrap();
    assert!(cosine_similarity(&resolved, &direct) > 1.0 - 1e-6);
}
