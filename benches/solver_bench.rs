//! Benchmarks for the contact solver
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::Vec3;

use rust_contact_solver::physics::backend::{HostBackend, ParallelBackend};
use rust_contact_solver::physics::collision_detection::ContactManifold;
use rust_contact_solver::physics::constraints::UpdateMode;
use rust_contact_solver::physics::{
    BodyInertia, ConflictBatcher, ConstraintConverter, RigidBody, SolveDescription, Solver, SolverBody,
};

// ============================================================================
// Scene
// ============================================================================

/// Static ground under a `side x side` field of box stacks.
fn box_stacks(side: usize, height: usize) -> (Vec<RigidBody>, Vec<BodyInertia>, Vec<ContactManifold>) {
    let mut bodies = vec![RigidBody::new_static(Vec3::ZERO)];
    let mut inertias = vec![BodyInertia::STATIC];
    let mut manifolds = Vec::new();
    for x in 0..side {
        for z in 0..side {
            let mut below = 0u32;
            for level in 0..height {
                let position = Vec3::new(x as f32 * 1.5, 0.5 + level as f32, z as f32 * 1.5);
                let index = bodies.len() as u32;
                bodies.push(RigidBody::new(position, 1.0).with_linear_velocity(Vec3::new(0.0, -0.2, 0.0)));
                inertias.push(BodyInertia::solid_box(1.0, Vec3::splat(0.5)));
                let mut manifold = ContactManifold::new(index, below, Vec3::Y).with_friction(0.5);
                for (dx, dz) in [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)] {
                    manifold.add_point(position + Vec3::new(dx, -0.5, dz), 0.01);
                }
                manifolds.push(manifold);
                below = index;
            }
        }
    }
    (bodies, inertias, manifolds)
}

// ============================================================================
// Solve benchmarks
// ============================================================================

fn bench_solve(c: &mut Criterion) {
    let mut group = c.benchmark_group("solve");
    let description = SolveDescription::default().with_iteration_count(8);

    for side in [8usize, 24] {
        let (bodies, inertias, manifolds) = box_stacks(side, 6);

        group.bench_with_input(BenchmarkId::new("host_sequential", side), &side, |b, _| {
            let mut solver = Solver::host(description).unwrap();
            b.iter(|| {
                let mut scratch = bodies.clone();
                solver.solve(&mut scratch, &inertias, black_box(&manifolds), None).unwrap();
                scratch
            });
        });

        group.bench_with_input(BenchmarkId::new("host_jacobi", side), &side, |b, _| {
            let backend = HostBackend::default().with_update_mode(UpdateMode::Jacobi);
            let mut solver = Solver::new(description, backend).unwrap();
            b.iter(|| {
                let mut scratch = bodies.clone();
                solver.solve(&mut scratch, &inertias, black_box(&manifolds), None).unwrap();
                scratch
            });
        });

        group.bench_with_input(BenchmarkId::new("parallel", side), &side, |b, _| {
            let mut solver = Solver::new(description, ParallelBackend::new()).unwrap();
            b.iter(|| {
                let mut scratch = bodies.clone();
                solver.solve(&mut scratch, &inertias, black_box(&manifolds), None).unwrap();
                scratch
            });
        });
    }

    group.finish();
}

// ============================================================================
// Scheduling benchmarks
// ============================================================================

fn bench_batching(c: &mut Criterion) {
    let mut group = c.benchmark_group("batching");
    let description = SolveDescription::default();
    let (bodies, inertias, manifolds) = box_stacks(24, 6);
    let states = SolverBody::gather(&bodies, &inertias, None).unwrap();
    let constraints = ConstraintConverter::new(&description)
        .convert_gathered(&states, &manifolds, None)
        .unwrap();
    let batcher = ConflictBatcher::new(&description);

    group.bench_function("convert_3456_manifolds", |b| {
        let converter = ConstraintConverter::new(&description);
        b.iter(|| converter.convert_gathered(&states, black_box(&manifolds), None).unwrap());
    });

    group.bench_function("batch_3456_constraints", |b| {
        b.iter(|| batcher.batch(black_box(&constraints), &states).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_solve, bench_batching);
criterion_main!(benches);
