//! Flat per-tick copies of agent state.
//!
//! Snapshots are filled sequentially on the orchestrating thread, then read
//! concurrently by the grid build and the resolvers. Slot `i` always belongs
//! to the `i`-th registry entry of the tick. A slot whose agent could not be
//! sampled is *vacant*: it holds [`SENTINEL_POSITION`] and radius 0 and its
//! bit in the liveness mask is clear.

use bevy::math::Vec2;
use fixedbitset::FixedBitSet;

/// Far-away position written into vacant slots.
pub const SENTINEL_POSITION: Vec2 = Vec2::splat(1.0e9);

/// Per-tick readable state of a predator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PredatorSample {
    pub position: Vec2,
    pub sensing_radius: f32,
}

/// Per-tick readable state of a flocking agent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlockerSample {
    pub position: Vec2,
    pub velocity: Vec2,
    pub flocking_radius: f32,
}

/// Agent radius after applying the global cap.
///
/// A non-positive result means "unlimited" to the resolvers. A NaN radius
/// is treated as unlimited too.
pub fn effective_radius(own: f32, cap: f32) -> f32 {
    if own.is_nan() {
        return 0.0;
    }
    own.min(cap)
}

/// Set the liveness bit of `slot`, growing the mask when needed.
///
/// Masks keep their length across ticks and are zeroed by `clear`.
fn mark(mask: &mut FixedBitSet, slot: usize, live: bool) {
    if slot >= mask.len() {
        mask.grow(slot + 1);
    }
    mask.set(slot, live);
}

/// Inputs of the nearest-target pass.
#[derive(Default, Debug)]
pub struct TargetingSnapshot {
    pub predator_positions: Vec<Vec2>,
    pub predator_radii: Vec<f32>,
    pub predator_live: FixedBitSet,
    pub prey_positions: Vec<Vec2>,
    pub prey_live: FixedBitSet,
}

impl TargetingSnapshot {
    pub fn reserve(&mut self, predators: usize, prey: usize) {
        self.predator_positions.reserve(predators);
        self.predator_radii.reserve(predators);
        self.prey_positions.reserve(prey);
    }

    /// Append a predator slot, capping its radius. `None` makes the slot vacant.
    pub fn push_predator(&mut self, sample: Option<PredatorSample>, sensing_cap: f32) {
        match sample {
            Some(sample) => {
                mark(&mut self.predator_live, self.predator_positions.len(), true);
                self.predator_positions.push(sample.position);
                self.predator_radii.push(effective_radius(sample.sensing_radius, sensing_cap));
            }
            None => {
                mark(&mut self.predator_live, self.predator_positions.len(), false);
                self.predator_positions.push(SENTINEL_POSITION);
                self.predator_radii.push(0.0);
            }
        }
    }

    pub fn push_prey(&mut self, position: Option<Vec2>) {
        mark(&mut self.prey_live, self.prey_positions.len(), position.is_some());
        self.prey_positions.push(position.unwrap_or(SENTINEL_POSITION));
    }

    pub fn predator_count(&self) -> usize {
        self.predator_positions.len()
    }

    pub fn prey_count(&self) -> usize {
        self.prey_positions.len()
    }

    pub fn live_prey(&self) -> usize {
        self.prey_live.count_ones(..)
    }

    pub fn vacant_slots(&self) -> usize {
        (self.predator_count() - self.predator_live.count_ones(..)) + (self.prey_count() - self.live_prey())
    }

    /// Empty every buffer, keeping capacity.
    pub fn clear(&mut self) {
        self.predator_positions.clear();
        self.predator_radii.clear();
        self.predator_live.clear();
        self.prey_positions.clear();
        self.prey_live.clear();
    }
}

/// Inputs of the flocking pass. One homogeneous class of agents.
#[derive(Default, Debug)]
pub struct FlockingSnapshot {
    pub positions: Vec<Vec2>,
    pub velocities: Vec<Vec2>,
    pub radii: Vec<f32>,
    pub live: FixedBitSet,
}

impl FlockingSnapshot {
    pub fn reserve(&mut self, agents: usize) {
        self.positions.reserve(agents);
        self.velocities.reserve(agents);
        self.radii.reserve(agents);
    }

    pub fn push(&mut self, sample: Option<FlockerSample>, flocking_cap: f32) {
        match sample {
            Some(sample) => {
                mark(&mut self.live, self.positions.len(), true);
                self.positions.push(sample.position);
                self.velocities.push(sample.velocity);
                self.radii.push(effective_radius(sample.flocking_radius, flocking_cap));
            }
            None => {
                mark(&mut self.live, self.positions.len(), false);
                self.positions.push(SENTINEL_POSITION);
                self.velocities.push(Vec2::ZERO);
                self.radii.push(0.0);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn vacant_slots(&self) -> usize {
        self.len() - self.live.count_ones(..)
    }

    pub fn clear(&mut self) {
        self.positions.clear();
        self.velocities.clear();
        self.radii.clear();
        self.live.clear();
    }
}
