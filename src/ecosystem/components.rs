/// Component definitions for the ecosystem layer.
///
/// Agents are plain entities. The role components ([`Predator`], [`Prey`],
/// [`Flocker`]) register an entity with the orchestrator when added and
/// unregister it when removed; the data components are what the passes read
/// and write every tick.

use bevy::prelude::*;

use super::flocking::FlockingVectors;

// ============================================================================
// Kinematics
// ============================================================================

/// World-space position read by every pass.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentPosition(pub Vec2);

#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct AgentVelocity(pub Vec2);

// ============================================================================
// Roles
// ============================================================================

/// Hunts the nearest [`Prey`] within `sensing_radius` (capped globally).
/// A radius `<= 0` means unlimited.
#[derive(Component, Debug, Clone, Copy)]
#[require(NearestTarget)]
pub struct Predator {
    pub sensing_radius: f32,
}

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Prey;

/// Takes part in the flocking pass against every other flocker.
#[derive(Component, Debug, Clone, Copy)]
#[require(AgentVelocity, FlockingSteering)]
pub struct Flocker {
    pub flocking_radius: f32,
}

// ============================================================================
// Outputs
// ============================================================================

/// Nearest prey delivered by the last targeting pass.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NearestTarget(pub Option<Entity>);

/// Flocking vectors delivered by the last flocking pass.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq)]
pub struct FlockingSteering(pub FlockingVectors);
