use bevy::math::Vec2;

use super::execution::Executor;
use super::snapshot::FlockingSnapshot;
use super::spatial_grid::{squared_search_radius, SpatialGrid};

/// Separation, alignment and cohesion of one agent against its neighbours.
///
/// These are the raw boids components. How they are weighted into a single
/// steering direction is up to the consumer (see [`FlockingVectors::steering`]).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FlockingVectors {
    /// Repulsion summed over neighbours, each weighted by `1 / dist²`.
    pub separation: Vec2,
    /// Unit vector from the agent's velocity toward the neighbours' mean velocity.
    pub alignment: Vec2,
    /// Unit vector from the agent toward the neighbours' centre of mass.
    pub cohesion: Vec2,
}

impl FlockingVectors {
    pub const ZERO: Self = Self {
        separation: Vec2::ZERO,
        alignment: Vec2::ZERO,
        cohesion: Vec2::ZERO,
    };

    pub fn steering(&self, separation_weight: f32, alignment_weight: f32, cohesion_weight: f32) -> Vec2 {
        self.separation * separation_weight + self.alignment * alignment_weight + self.cohesion * cohesion_weight
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Flocking vectors of agent `i` against every other live agent in range.
///
/// `grid` must hold the live slots of `snapshot.positions`. Neighbours closer
/// than `sqrt(separation_epsilon)` still count toward alignment and cohesion
/// but add no separation, so coincident agents never divide by zero.
pub fn flocking_vectors_for(grid: &SpatialGrid, snapshot: &FlockingSnapshot, i: usize, separation_epsilon: f32) -> FlockingVectors {
    let position = snapshot.positions[i];
    let velocity = snapshot.velocities[i];
    let radius = snapshot.radii[i];
    let max_dist_sq = squared_search_radius(radius);

    let mut separation = Vec2::ZERO;
    let mut alignment = Vec2::ZERO;
    let mut cohesion = Vec2::ZERO;
    let mut neighbor_count = 0u32;

    grid.for_each_in_ring(grid.cell_of(position), grid.ring_radius(radius), |j| {
        let j = j as usize;
        if j == i {
            return;
        }
        let other = snapshot.positions[j];
        let offset = other - position;
        let dist_sq = offset.length_squared();
        if dist_sq > max_dist_sq {
            return;
        }

        if dist_sq > separation_epsilon {
            separation -= offset / dist_sq;
        }
        alignment += snapshot.velocities[j];
        cohesion += other;
        neighbor_count += 1;
    });

    if neighbor_count == 0 {
        return FlockingVectors::ZERO;
    }

    let count = neighbor_count as f32;
    FlockingVectors {
        separation,
        alignment: (alignment / count - velocity).normalize_or_zero(),
        cohesion: (cohesion / count - position).normalize_or_zero(),
    }
}

/// Compute flocking vectors for every slot of `snapshot`. Vacant slots get zeros.
pub fn resolve_flocking(
    grid: &SpatialGrid,
    snapshot: &FlockingSnapshot,
    executor: &Executor,
    separation_epsilon: f32,
) -> Vec<FlockingVectors> {
    executor.map_indexed(snapshot.len(), |i| {
        if !snapshot.live.contains(i) {
            return FlockingVectors::ZERO;
        }
        flocking_vectors_for(grid, snapshot, i, separation_epsilon)
    })
}

#[cfg(test)]
#[path = "flocking_tests.rs"]
mod tests;
