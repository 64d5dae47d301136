//! Per-tick sequencing of the targeting and flocking passes.
//!
//! The orchestrator owns everything that lives longer than a single resolver
//! call: the participant registries, the grids and the snapshot buffers. The
//! agents themselves stay outside; they are reached through the
//! [`TargetingWorld`] and [`FlockingWorld`] traits, which the ECS layer
//! implements over Bevy queries and tests implement over plain vectors.
//!
//! A pass runs on the calling thread except for the grid build and the
//! resolve step, which fan out through the configured [`Executor`] and block
//! until done.

use bevy::log::{debug, trace};
use bevy::math::Vec2;

use super::capture::TickCapture;
use super::config::EcosystemConfig;
use super::execution::Executor;
use super::flocking::{resolve_flocking, FlockingVectors};
use super::registry::{AgentHandle, AgentRegistry};
use super::snapshot::{FlockerSample, FlockingSnapshot, PredatorSample, TargetingSnapshot};
use super::spatial_grid::SpatialGrid;
use super::targeting::resolve_nearest_targets;

/// Agent-side view needed by the nearest-target pass.
pub trait TargetingWorld {
    type Handle: AgentHandle;

    fn predator_alive(&self, predator: Self::Handle) -> bool;
    fn prey_alive(&self, prey: Self::Handle) -> bool;
    /// `None` when the predator can no longer be read this tick.
    fn predator_sample(&self, predator: Self::Handle) -> Option<PredatorSample>;
    fn prey_position(&self, prey: Self::Handle) -> Option<Vec2>;
    fn receive_nearest_target(&mut self, predator: Self::Handle, target: Option<Self::Handle>);
}

/// Agent-side view needed by the flocking pass.
pub trait FlockingWorld {
    type Handle: AgentHandle;

    fn flocker_alive(&self, agent: Self::Handle) -> bool;
    fn flocker_sample(&self, agent: Self::Handle) -> Option<FlockerSample>;
    fn receive_flocking_vectors(&mut self, agent: Self::Handle, vectors: FlockingVectors);
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TargetingReport {
    pub predators: usize,
    pub prey: usize,
    /// Handles dropped by compaction.
    pub pruned: usize,
    /// Snapshot slots whose agent could not be sampled.
    pub vacant: usize,
    pub delivered: usize,
    /// Deliveries carrying a target.
    pub hits: usize,
    /// The grid was not built this tick.
    pub skipped: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlockingReport {
    pub agents: usize,
    pub pruned: usize,
    pub vacant: usize,
    pub delivered: usize,
    pub skipped: bool,
}

/// Nearest-prey pass: predators query a grid of prey.
#[derive(Debug)]
pub struct TargetingPass<H: AgentHandle> {
    predators: AgentRegistry<H>,
    prey: AgentRegistry<H>,
    grid: SpatialGrid,
    snapshot: TargetingSnapshot,
    capture_tick: Option<u64>,
    capture: Option<TickCapture>,
}

impl<H: AgentHandle> TargetingPass<H> {
    pub fn new(config: &EcosystemConfig) -> Self {
        Self {
            predators: AgentRegistry::new(),
            prey: AgentRegistry::new(),
            grid: SpatialGrid::with_capacity(config.targeting_cell_size, config.initial_grid_capacity),
            snapshot: TargetingSnapshot::default(),
            capture_tick: None,
            capture: None,
        }
    }

    pub fn predators(&self) -> &AgentRegistry<H> {
        &self.predators
    }

    pub fn predators_mut(&mut self) -> &mut AgentRegistry<H> {
        &mut self.predators
    }

    pub fn prey(&self) -> &AgentRegistry<H> {
        &self.prey
    }

    pub fn prey_mut(&mut self) -> &mut AgentRegistry<H> {
        &mut self.prey
    }

    /// Record the inputs and results of the next run, labelled with `tick`.
    pub fn request_capture(&mut self, tick: u64) {
        self.capture_tick = Some(tick);
    }

    pub fn take_capture(&mut self) -> Option<TickCapture> {
        self.capture.take()
    }

    pub fn run<W>(&mut self, world: &mut W, config: &EcosystemConfig) -> TargetingReport
    where
        W: TargetingWorld<Handle = H>,
    {
        let mut report = TargetingReport::default();

        // 1. Compact
        report.pruned = self.predators.compact(|h| world.predator_alive(h)) + self.prey.compact(|h| world.prey_alive(h));
        report.predators = self.predators.len();
        report.prey = self.prey.len();

        // 2. Early exit
        if self.predators.is_empty() {
            report.skipped = true;
            trace!("[TARGETING] No predators registered, skipping");
            return report;
        }
        if self.prey.is_empty() {
            // Nothing to scan, but stale targets must still be cleared.
            report.skipped = true;
            for predator in self.predators.iter() {
                world.receive_nearest_target(predator, None);
                report.delivered += 1;
            }
            trace!("[TARGETING] No prey registered, cleared {} targets", report.delivered);
            return report;
        }

        // 3. Snapshot
        let executor = Executor::from_config(config);
        self.snapshot.clear();
        self.snapshot.reserve(self.predators.len(), self.prey.len());
        for predator in self.predators.iter() {
            self.snapshot.push_predator(world.predator_sample(predator), config.global_sensing_cap);
        }
        for prey in self.prey.iter() {
            self.snapshot.push_prey(world.prey_position(prey));
        }
        report.vacant = self.snapshot.vacant_slots();

        // 4. Build
        self.grid.reset(config.targeting_cell_size);
        self.grid.rebuild(&self.snapshot.prey_positions, Some(&self.snapshot.prey_live), &executor);

        // 5. Resolve
        let nearest = resolve_nearest_targets(&self.grid, &self.snapshot, &executor);

        if let Some(tick) = self.capture_tick.take() {
            self.capture = Some(TickCapture::record(tick, self.grid.cell_size(), &self.snapshot, &nearest));
        }

        // 6. Distribute
        for (slot, predator) in self.predators.iter().enumerate() {
            if !self.snapshot.predator_live.contains(slot) || !world.predator_alive(predator) {
                continue;
            }
            let target = nearest[slot]
                .and_then(|prey_slot| self.prey.get(prey_slot as usize))
                .filter(|&prey| world.prey_alive(prey));
            world.receive_nearest_target(predator, target);
            report.delivered += 1;
            if target.is_some() {
                report.hits += 1;
            }
        }

        // 7. Release
        self.grid.clear();
        self.snapshot.clear();

        debug!(
            "[TARGETING] predators {} prey {} pruned {} vacant {} hits {}",
            report.predators, report.prey, report.pruned, report.vacant, report.hits
        );
        report
    }
}

/// Boids pass: one homogeneous class queries a grid of itself.
#[derive(Debug)]
pub struct FlockingPass<H: AgentHandle> {
    agents: AgentRegistry<H>,
    grid: SpatialGrid,
    snapshot: FlockingSnapshot,
}

impl<H: AgentHandle> FlockingPass<H> {
    pub fn new(config: &EcosystemConfig) -> Self {
        Self {
            agents: AgentRegistry::new(),
            grid: SpatialGrid::with_capacity(config.flocking_cell_size, config.initial_grid_capacity),
            snapshot: FlockingSnapshot::default(),
        }
    }

    pub fn agents(&self) -> &AgentRegistry<H> {
        &self.agents
    }

    pub fn agents_mut(&mut self) -> &mut AgentRegistry<H> {
        &mut self.agents
    }

    pub fn run<W>(&mut self, world: &mut W, config: &EcosystemConfig) -> FlockingReport
    where
        W: FlockingWorld<Handle = H>,
    {
        let mut report = FlockingReport::default();

        report.pruned = self.agents.compact(|h| world.flocker_alive(h));
        report.agents = self.agents.len();

        if self.agents.len() < 2 {
            // A lone survivor has no neighbours; clear whatever it held last tick.
            for agent in self.agents.iter() {
                world.receive_flocking_vectors(agent, FlockingVectors::ZERO);
                report.delivered += 1;
            }
            report.skipped = true;
            trace!("[FLOCKING] {} flockers, skipping", report.agents);
            return report;
        }

        let executor = Executor::from_config(config);
        self.snapshot.clear();
        self.snapshot.reserve(self.agents.len());
        for agent in self.agents.iter() {
            self.snapshot.push(world.flocker_sample(agent), config.global_flocking_cap);
        }
        report.vacant = self.snapshot.vacant_slots();

        self.grid.reset(config.flocking_cell_size);
        self.grid.rebuild(&self.snapshot.positions, Some(&self.snapshot.live), &executor);

        let vectors = resolve_flocking(&self.grid, &self.snapshot, &executor, config.separation_epsilon);

        for (slot, agent) in self.agents.iter().enumerate() {
            if !self.snapshot.live.contains(slot) || !world.flocker_alive(agent) {
                continue;
            }
            world.receive_flocking_vectors(agent, vectors[slot]);
            report.delivered += 1;
        }

        self.grid.clear();
        self.snapshot.clear();

        debug!(
            "[FLOCKING] agents {} pruned {} vacant {} delivered {}",
            report.agents, report.pruned, report.vacant, report.delivered
        );
        report
    }
}

/// Both passes of one ecosystem, run targeting first.
#[derive(Debug)]
pub struct TickOrchestrator<H: AgentHandle> {
    pub targeting: TargetingPass<H>,
    pub flocking: FlockingPass<H>,
}

impl<H: AgentHandle> TickOrchestrator<H> {
    pub fn new(config: &EcosystemConfig) -> Self {
        Self {
            targeting: TargetingPass::new(config),
            flocking: FlockingPass::new(config),
        }
    }

    pub fn register_predator(&mut self, handle: H) -> bool {
        self.targeting.predators_mut().register(handle)
    }

    pub fn unregister_predator(&mut self, handle: H) -> bool {
        self.targeting.predators_mut().unregister(handle)
    }

    pub fn register_prey(&mut self, handle: H) -> bool {
        self.targeting.prey_mut().register(handle)
    }

    pub fn unregister_prey(&mut self, handle: H) -> bool {
        self.targeting.prey_mut().unregister(handle)
    }

    pub fn register_flocker(&mut self, handle: H) -> bool {
        self.flocking.agents_mut().register(handle)
    }

    pub fn unregister_flocker(&mut self, handle: H) -> bool {
        self.flocking.agents_mut().unregister(handle)
    }

    pub fn run_tick<W>(&mut self, world: &mut W, config: &EcosystemConfig) -> (TargetingReport, FlockingReport)
    where
        W: TargetingWorld<Handle = H> + FlockingWorld<Handle = H>,
    {
        let targeting = self.targeting.run(world, config);
        let flocking = self.flocking.run(world, config);
        (targeting, flocking)
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
