use bevy::math::Vec2;
use ecosim::ecosystem::config::EcosystemConfig;
use ecosim::ecosystem::execution::{ExecutionStrategy, Executor};
use ecosim::ecosystem::flocking::resolve_flocking;
use ecosim::ecosystem::snapshot::{FlockerSample, FlockingSnapshot, PredatorSample, TargetingSnapshot};
use ecosim::ecosystem::spatial_grid::SpatialGrid;
use ecosim::ecosystem::targeting::resolve_nearest_targets;
use std::time::Instant;

fn random_points(rng: &mut fastrand::Rng, count: usize, extent: f32) -> Vec<Vec2> {
    (0..count)
        .map(|_| Vec2::new(rng.f32() * extent, rng.f32() * extent))
        .collect()
}

fn targeting_snapshot(predators: usize, prey: usize, extent: f32, seed: u64) -> TargetingSnapshot {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut snapshot = TargetingSnapshot::default();
    snapshot.reserve(predators, prey);
    for position in random_points(&mut rng, predators, extent) {
        let sensing_radius = 5.0 + rng.f32() * 20.0;
        snapshot.push_predator(Some(PredatorSample { position, sensing_radius }), 50.0);
    }
    for position in random_points(&mut rng, prey, extent) {
        snapshot.push_prey(Some(position));
    }
    snapshot
}

fn flocking_snapshot(agents: usize, extent: f32, seed: u64) -> FlockingSnapshot {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut snapshot = FlockingSnapshot::default();
    snapshot.reserve(agents);
    for position in random_points(&mut rng, agents, extent) {
        let velocity = Vec2::new(rng.f32() * 2.0 - 1.0, rng.f32() * 2.0 - 1.0);
        snapshot.push(Some(FlockerSample { position, velocity, flocking_radius: 5.0 }), 10.0);
    }
    snapshot
}

fn executor(strategy: ExecutionStrategy) -> Executor {
    let config = EcosystemConfig { execution: strategy, ..Default::default() };
    Executor::from_config(&config)
}

#[test]
fn test_targeting_parallel_matches_sequential_at_scale() {
    let snapshot = targeting_snapshot(2_000, 10_000, 500.0, 3);

    for strategy in [ExecutionStrategy::Sequential, ExecutionStrategy::Parallel] {
        let executor = executor(strategy);
        let start = Instant::now();
        let grid = SpatialGrid::build(&snapshot.prey_positions, 4.0, &executor);
        let built = start.elapsed();
        let nearest = resolve_nearest_targets(&grid, &snapshot, &executor);
        let total = start.elapsed();
        println!(
            "{:?}: grid of {} prey in {:?}, 2000 predators resolved in {:?}",
            strategy,
            grid.len(),
            built,
            total - built
        );
        assert_eq!(nearest.len(), 2_000);
    }

    let sequential = {
        let executor = executor(ExecutionStrategy::Sequential);
        let grid = SpatialGrid::build(&snapshot.prey_positions, 4.0, &executor);
        resolve_nearest_targets(&grid, &snapshot, &executor)
    };
    let parallel = {
        let executor = executor(ExecutionStrategy::Parallel);
        let grid = SpatialGrid::build(&snapshot.prey_positions, 4.0, &executor);
        resolve_nearest_targets(&grid, &snapshot, &executor)
    };
    assert_eq!(sequential, parallel);
}

#[test]
fn test_flocking_parallel_matches_sequential_at_scale() {
    let snapshot = flocking_snapshot(10_000, 400.0, 5);

    let mut results = Vec::new();
    for strategy in [ExecutionStrategy::Sequential, ExecutionStrategy::Parallel] {
        let executor = executor(strategy);
        let start = Instant::now();
        let mut grid = SpatialGrid::with_capacity(5.0, snapshot.len() * 2);
        grid.rebuild(&snapshot.positions, Some(&snapshot.live), &executor);
        let vectors = resolve_flocking(&grid, &snapshot, &executor, 1.0e-4);
        println!("{:?}: 10K flockers in {:?}", strategy, start.elapsed());
        results.push(vectors);
    }

    assert_eq!(results[0], results[1]);
}

#[test]
fn test_sparse_unlimited_radius_stays_fast() {
    // Two far-apart clusters: an unlimited scan must stay bounded by occupied cells.
    let mut snapshot = TargetingSnapshot::default();
    for i in 0..100 {
        let position = Vec2::new(i as f32 * 0.1, 0.0);
        snapshot.push_predator(Some(PredatorSample { position, sensing_radius: 0.0 }), f32::INFINITY);
    }
    for i in 0..1_000 {
        snapshot.push_prey(Some(Vec2::new(1.0e6 + (i % 10) as f32, (i / 10) as f32)));
    }

    let executor = executor(ExecutionStrategy::Parallel);
    let grid = SpatialGrid::build(&snapshot.prey_positions, 1.0, &executor);
    let start = Instant::now();
    let nearest = resolve_nearest_targets(&grid, &snapshot, &executor);
    let elapsed = start.elapsed();
    println!("Sparse unlimited scan: {:?}", elapsed);

    assert!(nearest.iter().all(|n| n.is_some()));
    assert!(
        elapsed.as_millis() < 2_000,
        "Unlimited scan took {}ms, should be bounded by the occupied cell count",
        elapsed.as_millis()
    );
}
