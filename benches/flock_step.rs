//! Benchmarks for the CPU reference passes and shader generation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use murmuration::flock;
use murmuration::prelude::*;
use murmuration::shader;
use murmuration::uniforms::SimUniforms;

fn uniforms(config: &FlockConfig) -> SimUniforms {
    let mut u = SimUniforms::from_config(config);
    u.delta_time = 1.0 / 60.0;
    u
}

fn bench_velocity_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("velocity_pass");

    for count in [100u32, 500, 2000] {
        let config = FlockConfig::from_scenario(Scenario::Murmuration)
            .with_agent_count(count)
            .with_seed(1);
        let store = AgentStore::seeded(&config);
        let u = uniforms(&config);

        group.bench_with_input(BenchmarkId::from_parameter(count), &store, |b, store| {
            b.iter_batched_ref(
                || store.clone(),
                |store| flock::velocity_pass(store, black_box(&u)),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

fn bench_position_pass(c: &mut Criterion) {
    let config = FlockConfig::from_scenario(Scenario::Swarm)
        .with_agent_count(3000)
        .with_seed(1);
    let mut store = AgentStore::seeded(&config);
    let u = uniforms(&config);

    c.bench_function("position_pass_3000", |b| {
        b.iter(|| flock::position_pass(&mut store, black_box(&u)))
    });
}

fn bench_frame(c: &mut Criterion) {
    let config = FlockConfig::from_scenario(Scenario::Swarm)
        .with_agent_count(500)
        .with_seed(1);
    let backend = CpuBackend::new(&config);
    let mut scheduler = FrameScheduler::start(config, backend, 1280, 720);

    c.bench_function("cpu_frame_500", |b| {
        b.iter(|| scheduler.tick_with_delta(black_box(1.0 / 60.0)))
    });
}

fn bench_shader_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("shader_generation");
    group.bench_function("velocity", |b| b.iter(|| black_box(shader::velocity_shader())));
    group.bench_function("position", |b| b.iter(|| black_box(shader::position_shader())));
    group.bench_function("render", |b| b.iter(|| black_box(shader::render_shader())));
    group.finish();
}

criterion_group!(
    benches,
    bench_velocity_pass,
    bench_position_pass,
    bench_frame,
    bench_shader_generation
);
criterion_main!(benches);
