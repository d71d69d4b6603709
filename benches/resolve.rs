//! Benchmarks for turn resolution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use silentrisk::conversation::ConversationState;
use silentrisk::recommend::recommend;
use silentrisk::resolve::ResolutionEngine;
use silentrisk::snapshot::{HealthSnapshot, MetricKind};

fn snapshot() -> HealthSnapshot {
    HealthSnapshot::default()
        .with(MetricKind::Glucose, 150.0)
        .with(MetricKind::SystolicBp, 135.0)
        .with(MetricKind::Cholesterol, 210.0)
}

fn bench_keyword_turn(c: &mut Criterion) {
    let engine = ResolutionEngine::bundled().unwrap();
    let snap = snapshot();

    c.bench_function("resolve_keyword", |bench| {
        bench.iter(|| {
            let mut state = ConversationState::new();
            black_box(engine.resolve("what foods lower my cholesterol", &mut state, &snap))
        })
    });
}

fn bench_context_turn(c: &mut Criterion) {
    let engine = ResolutionEngine::bundled().unwrap();
    let snap = snapshot();

    c.bench_function("resolve_context_carry", |bench| {
        bench.iter(|| {
            let mut state = ConversationState::with_last_topic("glucose");
            black_box(engine.resolve("how do I improve it?", &mut state, &snap))
        })
    });
}

fn bench_fallback_turn(c: &mut Criterion) {
    let engine = ResolutionEngine::bundled().unwrap();
    let snap = snapshot();

    // Worst case: every topic's keywords are scanned before falling back.
    c.bench_function("resolve_fallback", |bench| {
        bench.iter(|| {
            let mut state = ConversationState::new();
            black_box(engine.resolve("asdfgh qwerty zxcvb", &mut state, &snap))
        })
    });
}

fn bench_recommend(c: &mut Criterion) {
    let snap = snapshot();
    c.bench_function("recommend", |bench| bench.iter(|| black_box(recommend(&snap))));
}

criterion_group!(
    benches,
    bench_keyword_turn,
    bench_context_turn,
    bench_fallback_turn,
    bench_recommend
);
criterion_main!(benches);
