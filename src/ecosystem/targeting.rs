use bevy::math::Vec2;
use fixedbitset::FixedBitSet;

use super::execution::Executor;
use super::snapshot::TargetingSnapshot;
use super::spatial_grid::{squared_search_radius, SpatialGrid};

/// Closest prey to `position` within `radius`, scanning only the grid ring
/// that covers the radius.
///
/// `radius <= 0` means unlimited. On equal squared distance the lower prey
/// index wins, so the result does not depend on bucket or thread order.
pub fn nearest_in_grid(grid: &SpatialGrid, prey_positions: &[Vec2], position: Vec2, radius: f32) -> Option<u32> {
    let max_dist_sq = squared_search_radius(radius);
    let center = grid.cell_of(position);
    let ring = grid.ring_radius(radius);

    let mut best: Option<(u32, f32)> = None;
    grid.for_each_in_ring(center, ring, |candidate| {
        let dist_sq = position.distance_squared(prey_positions[candidate as usize]);
        if dist_sq > max_dist_sq {
            return;
        }
        let closer = match best {
            None => true,
            Some((best_index, best_dist_sq)) => {
                dist_sq < best_dist_sq || (dist_sq == best_dist_sq && candidate < best_index)
            }
        };
        if closer {
            best = Some((candidate, dist_sq));
        }
    });

    best.map(|(index, _)| index)
}

/// Resolve the nearest live prey for every predator slot of `snapshot`.
///
/// `grid` must have been built from `snapshot.prey_positions`. Vacant
/// predator slots resolve to `None`; with no live prey nothing is scanned.
pub fn resolve_nearest_targets(grid: &SpatialGrid, snapshot: &TargetingSnapshot, executor: &Executor) -> Vec<Option<u32>> {
    let predators = snapshot.predator_count();
    if grid.is_empty() {
        return vec![None; predators];
    }

    let positions = &snapshot.predator_positions;
    let radii = &snapshot.predator_radii;
    let live: &FixedBitSet = &snapshot.predator_live;
    let prey = &snapshot.prey_positions;

    executor.map_indexed(predators, |i| {
        if !live.contains(i) {
            return None;
        }
        nearest_in_grid(grid, prey, positions[i], radii[i])
    })
}

#[cfg(test)]
#[path = "targeting_tests.rs"]
mod tests;
