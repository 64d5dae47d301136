use bevy::prelude::*;
use ecosim_macros::profile;
use std::time::Instant;

use crate::profile_log;

use super::components::{AgentPosition, AgentVelocity, Flocker, FlockingSteering, NearestTarget, Predator, Prey};
use super::config::EcosystemConfig;
use super::events::TargetChanged;
use super::flocking::FlockingVectors;
use super::orchestrator::{FlockingWorld, TargetingWorld};
use super::resources::{EcoTick, EcosystemStats, Orchestrator, PendingTargetChanges};
use super::snapshot::{FlockerSample, PredatorSample};

// ============================================================================
// World adapters
// ============================================================================

/// Targeting view over the ECS world. Liveness is "still has the role component".
struct EcsTargeting<'w> {
    world: &'w mut World,
    changes: Vec<TargetChanged>,
}

impl TargetingWorld for EcsTargeting<'_> {
    type Handle = Entity;

    fn predator_alive(&self, predator: Entity) -> bool {
        self.world.get::<Predator>(predator).is_some()
    }

    fn prey_alive(&self, prey: Entity) -> bool {
        self.world.get::<Prey>(prey).is_some()
    }

    fn predator_sample(&self, predator: Entity) -> Option<PredatorSample> {
        let sensing_radius = self.world.get::<Predator>(predator)?.sensing_radius;
        let position = self.world.get::<AgentPosition>(predator)?.0;
        Some(PredatorSample { position, sensing_radius })
    }

    fn prey_position(&self, prey: Entity) -> Option<Vec2> {
        self.world.get::<Prey>(prey)?;
        self.world.get::<AgentPosition>(prey).map(|p| p.0)
    }

    fn receive_nearest_target(&mut self, predator: Entity, target: Option<Entity>) {
        let Some(mut nearest) = self.world.get_mut::<NearestTarget>(predator) else {
            return;
        };
        if nearest.0 != target {
            self.changes.push(TargetChanged { predator, previous: nearest.0, target });
            nearest.0 = target;
        }
    }
}

struct EcsFlocking<'w> {
    world: &'w mut World,
}

impl FlockingWorld for EcsFlocking<'_> {
    type Handle = Entity;

    fn flocker_alive(&self, agent: Entity) -> bool {
        self.world.get::<Flocker>(agent).is_some()
    }

    fn flocker_sample(&self, agent: Entity) -> Option<FlockerSample> {
        let flocking_radius = self.world.get::<Flocker>(agent)?.flocking_radius;
        let position = self.world.get::<AgentPosition>(agent)?.0;
        let velocity = self.world.get::<AgentVelocity>(agent).map_or(Vec2::ZERO, |v| v.0);
        Some(FlockerSample { position, velocity, flocking_radius })
    }

    fn receive_flocking_vectors(&mut self, agent: Entity, vectors: FlockingVectors) {
        if let Some(mut steering) = self.world.get_mut::<FlockingSteering>(agent) {
            steering.set_if_neq(FlockingSteering(vectors));
        }
    }
}

fn current_config(world: &World) -> EcosystemConfig {
    world.get_resource::<EcosystemConfig>().cloned().unwrap_or_default()
}

// ============================================================================
// Registration
// ============================================================================

pub(super) fn advance_tick(mut tick: ResMut<EcoTick>) {
    tick.0 += 1;
}

/// Mirror role component additions and removals into the registries.
///
/// Removals are applied first so a role removed and re-added within one tick
/// stays registered. Entities despawned without a removal message reaching
/// this system are pruned by the next compaction.
#[profile(2)]
pub(super) fn sync_registries(
    mut orchestrator: ResMut<Orchestrator>,
    mut removed_predators: RemovedComponents<Predator>,
    mut removed_prey: RemovedComponents<Prey>,
    mut removed_flockers: RemovedComponents<Flocker>,
    added_predators: Query<Entity, Added<Predator>>,
    added_prey: Query<Entity, Added<Prey>>,
    added_flockers: Query<Entity, Added<Flocker>>,
    #[allow(unused_variables)] tick: Res<EcoTick>,
) {
    for entity in removed_predators.read() {
        orchestrator.unregister_predator(entity);
    }
    for entity in removed_prey.read() {
        orchestrator.unregister_prey(entity);
    }
    for entity in removed_flockers.read() {
        orchestrator.unregister_flocker(entity);
    }

    let mut added = 0usize;
    for entity in &added_predators {
        added += usize::from(orchestrator.register_predator(entity));
    }
    for entity in &added_prey {
        added += usize::from(orchestrator.register_prey(entity));
    }
    for entity in &added_flockers {
        added += usize::from(orchestrator.register_flocker(entity));
    }
    if added > 0 {
        debug!("[REGISTRY] Registered {} agents", added);
    }

    profile_log!(
        tick,
        "[REGISTRY] predators {} prey {} flockers {}",
        orchestrator.targeting.predators().len(),
        orchestrator.targeting.prey().len(),
        orchestrator.flocking.agents().len()
    );
}

// ============================================================================
// Passes
// ============================================================================

/// Exclusive: the pass reads agent components and writes results directly.
#[profile(4)]
pub(super) fn run_targeting(world: &mut World) {
    world.resource_scope(|world, mut orchestrator: Mut<Orchestrator>| {
        let config = current_config(world);
        let started = Instant::now();

        let mut agents = EcsTargeting { world: &mut *world, changes: Vec::new() };
        let report = orchestrator.targeting.run(&mut agents, &config);
        let changes = agents.changes;
        let elapsed = started.elapsed();

        if !changes.is_empty() {
            if let Some(mut pending) = world.get_resource_mut::<PendingTargetChanges>() {
                pending.0.extend(changes);
            }
        }
        if let Some(mut stats) = world.get_resource_mut::<EcosystemStats>() {
            stats.targeting = report;
            stats.targeting_duration = elapsed;
        }

        profile_log!(world.resource::<EcoTick>(), "[TARGETING] {:?} in {:?}", report, elapsed);
    });
}

#[profile(4)]
pub(super) fn run_flocking(world: &mut World) {
    world.resource_scope(|world, mut orchestrator: Mut<Orchestrator>| {
        let config = current_config(world);
        let started = Instant::now();

        let report = orchestrator.flocking.run(&mut EcsFlocking { world: &mut *world }, &config);
        let elapsed = started.elapsed();

        if let Some(mut stats) = world.get_resource_mut::<EcosystemStats>() {
            stats.flocking = report;
            stats.flocking_duration = elapsed;
            stats.ticks += 1;
        }

        profile_log!(world.resource::<EcoTick>(), "[FLOCKING] {:?} in {:?}", report, elapsed);
    });
}

// ============================================================================
// Notification
// ============================================================================

pub(super) fn emit_target_changes(mut pending: ResMut<PendingTargetChanges>, mut writer: MessageWriter<TargetChanged>) {
    for change in pending.0.drain(..) {
        writer.write(change);
    }
}
