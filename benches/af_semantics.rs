//! Benchmarks for attack-graph semantics and enforcement.

use std::collections::BTreeSet;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use argmend::argumentation::enforce::{EnforcementTask, enforce};
use argmend::argumentation::{Acceptance, AttackGraph, Semantics};
use argmend::config::EnforcementConfig;
use argmend::model::NodeId;

/// A ring of `n` arguments, each attacking the next, plus mutual attacks
/// between every third pair.
fn ring(n: usize) -> AttackGraph {
    let id = |i: usize| NodeId::new(format!("a{i}"));
    let mut attacks: Vec<(NodeId, NodeId)> = (0..n).map(|i| (id(i), id((i + 1) % n))).collect();
    for i in (0..n).step_by(3) {
        let j = (i + 2) % n;
        attacks.push((id(i), id(j)));
        attacks.push((id(j), id(i)));
    }
    AttackGraph::from_parts((0..n).map(id), attacks)
}

fn bench_grounded(c: &mut Criterion) {
    let af = ring(200);
    c.bench_function("grounded_ring_200", |bench| {
        bench.iter(|| black_box(af.grounded()))
    });
}

fn bench_preferred(c: &mut Criterion) {
    let af = ring(12);
    c.bench_function("preferred_ring_12", |bench| {
        bench.iter(|| black_box(af.preferred(16).unwrap()))
    });
}

fn bench_stable(c: &mut Criterion) {
    let af = ring(12);
    c.bench_function("stable_ring_12", |bench| {
        bench.iter(|| black_box(af.stable(16).unwrap()))
    });
}

fn bench_enforce(c: &mut Criterion) {
    let af = ring(12);
    let goal = NodeId::new("a0");
    let hard = BTreeSet::new();
    let task = EnforcementTask {
        goal: &goal,
        semantics: Semantics::Grounded,
        acceptance: Acceptance::Credulous,
        search_limit: 16,
        hard: &hard,
    };
    let config = EnforcementConfig::default();
    c.bench_function("enforce_grounded_ring_12", |bench| {
        bench.iter(|| black_box(enforce(&af, &task, &config).unwrap()))
    });
}

criterion_group!(benches, bench_grounded, bench_preferred, bench_stable, bench_enforce);
criterion_main!(benches);
