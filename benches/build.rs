use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use particle_kd::synthetic::{random, regular};
use particle_kd::{AxisPolicy, BuildOptions, ParticleSet, PkdBuilder};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn random_set(count: usize) -> ParticleSet {
    let mut particles = ParticleSet::new();
    random(&mut particles, count, &mut StdRng::seed_from_u64(0));
    particles
}

fn lattice_set(n: usize) -> ParticleSet {
    let mut particles = ParticleSet::new();
    regular(&mut particles, n);
    particles
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let random_particles = random_set(200_000);
    let lattice_particles = lattice_set(50);

    c.bench_function("build (random, greatest extent)", |b| {
        let builder = PkdBuilder::new();
        b.iter_batched(
            || random_particles.clone(),
            |particles| builder.build(particles).unwrap(),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("build (random, round robin)", |b| {
        let options = BuildOptions::default().with_axis_policy(AxisPolicy::RoundRobin);
        let builder = PkdBuilder::with_options(options);
        b.iter_batched(
            || random_particles.clone(),
            |particles| builder.build(particles).unwrap(),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("build (random, parallel down to 4 levels)", |b| {
        let options = BuildOptions::default().with_parallel_levels(4);
        let builder = PkdBuilder::with_options(options);
        b.iter_batched(
            || random_particles.clone(),
            |particles| builder.build(particles).unwrap(),
            BatchSize::LargeInput,
        )
    });

    c.bench_function("build (lattice, no validation)", |b| {
        let options = BuildOptions::default().with_validation(false);
        let builder = PkdBuilder::with_options(options);
        b.iter_batched(
            || lattice_particles.clone(),
            |particles| builder.build(particles).unwrap(),
            BatchSize::LargeInput,
        )
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
