//! Benchmarks for pipeline execution.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use phaseflow::prelude::*;
use phaseflow::testing::{fast_config, SuccessPhase};

fn orchestrator(phases: usize) -> PipelineOrchestrator {
    let mut orchestrator = PipelineOrchestrator::new(fast_config());
    for i in 0..phases {
        orchestrator.register_phase(Arc::new(
            SuccessPhase::new(PhaseConfig::new(format!("phase_{i}")))
                .with_value(format!("key_{i}"), serde_json::json!(i)),
        ));
    }
    orchestrator
}

fn pipeline_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("sequential_pipeline");
    for phases in [1, 10, 50] {
        let mut orchestrator = orchestrator(phases);
        group.bench_with_input(BenchmarkId::from_parameter(phases), &phases, |b, _| {
            b.iter(|| black_box(runtime.block_on(orchestrator.execute_pipeline(None))));
        });
    }
    group.finish();
}

fn validation_benchmark(c: &mut Criterion) {
    let orchestrator = orchestrator(100);
    c.bench_function("validate_100_phases", |b| {
        b.iter(|| black_box(orchestrator.validate_pipeline_config()));
    });
}

criterion_group!(benches, pipeline_benchmark, validation_benchmark);
criterion_main!(benches);
