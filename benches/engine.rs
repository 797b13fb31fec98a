mod common;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use lumos::compiler::{self, Target};
use lumos::evaluator::Evaluator;

fn bench_evaluate(c: &mut Criterion) {
    for (label, path) in common::workloads() {
        let program = common::load_program(&path);

        c.bench_function(&format!("evaluate_{label}"), |b| {
            b.iter(|| {
                let mut evaluator = Evaluator::new();
                let out = evaluator.evaluate(black_box(&program));
                assert!(out.error.is_none(), "evaluate failed: {:?}", out.error);
                black_box(out);
            })
        });
    }
}

fn bench_render(c: &mut Criterion) {
    for (label, path) in common::workloads() {
        let program = common::load_program(&path);

        for target in [Target::Python, Target::Javascript, Target::Rust] {
            c.bench_function(&format!("render_{target}_{label}"), |b| {
                b.iter(|| {
                    let out = compiler::render(black_box(&program), target);
                    black_box(out);
                })
            });
        }
    }
}

criterion_group!(benches, bench_evaluate, bench_render);
criterion_main!(benches);
