//! Energy discipline: every ingest pays for itself, energy never goes
//! negative, sleep restores the pool, and manifold work never touches the
//! host's counter.

use axon_core::prelude::*;
use axon_e2e_tests::{host_kernel, manifold_on};

#[test]
fn every_ingest_deducts_and_never_overdraws() {
    let kernel = host_kernel(500.0);
    let mut previous = kernel.energy().unwrap();

    for i in 0..12 {
        let report = kernel
            .ingest(&DataStream::text("load", format!("input number {i}")))
            .unwrap();
        assert!(report.energy_remaining >= 0.0);
        if report.slept {
            // The cycle refilled the pool; restart the descent.
            assert_eq!(report.energy_remaining, 500.0);
        } else {
            assert!(
                report.energy_remaining < previous,
                "ingest {i} was free ({previous} -> {})",
                report.energy_remaining
            );
        }
        previous = report.energy_remaining;
    }
}

#[test]
fn sleep_in_zombie_mode_exits_zombie_and_refills() {
    let kernel = host_kernel(64.0);
    // Grind the pool down; the tiny budget zombifies quickly.
    for i in 0..6 {
        kernel
            .ingest(&DataStream::text("grind", format!("grind {i}")))
            .unwrap();
    }
    kernel.sleep().unwrap();
    let stats = kernel.stats().unwrap();
    assert!(!stats.zombie_active);
    assert_eq!(stats.energy, stats.max_energy);
}

#[test]
fn manifold_budgets_are_strictly_disjoint() {
    let host = host_kernel(1000.0);
    let ruleset = parse_ruleset(
        "mode iso\n\
         symbol probe onehot 7,70\n\
         trigger probe 0.9 emit_token\n",
    )
    .unwrap();
    let mut manifold = manifold_on(&host, "island", ruleset);

    let host_energy = host.energy().unwrap();
    let host_sleeps = host.sleep_count().unwrap();

    for i in 0..10 {
        manifold.enqueue(DataStream::text("w", format!("payload {i}")));
    }
    manifold.run_batch(10).unwrap();
    manifold.sleep().unwrap();

    // Host counters are untouched by any amount of manifold work.
    assert_eq!(host.energy().unwrap(), host_energy);
    assert_eq!(host.sleep_count().unwrap(), host_sleeps);

    // And the reverse: host work leaves the manifold's pool alone.
    let manifold_energy = manifold.kernel().energy().unwrap();
    host.ingest(&DataStream::text("h", "host side work")).unwrap();
    assert_eq!(manifold.kernel().energy().unwrap(), manifold_energy);
}

#[test]
fn processed_counter_tracks_every_ingest() {
    let kernel = host_kernel(2000.0);
    for i in 0..5 {
        kernel
            .ingest(&DataStream::text("count", format!("item {i}")))
            .unwrap();
    }
    assert_eq!(kernel.stats().unwrap().processed_inputs, 5);
}
