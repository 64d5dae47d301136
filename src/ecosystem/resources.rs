/// Resource definitions for the ecosystem layer.

use bevy::prelude::*;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use super::config::EcosystemConfig;
use super::events::TargetChanged;
use super::orchestrator::{FlockingReport, TargetingReport, TickOrchestrator};

/// Fixed-update tick counter, advanced once at the start of every ecosystem tick.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct EcoTick(pub u64);

/// Reports and timings of the last tick.
#[derive(Resource, Default, Debug, Clone)]
pub struct EcosystemStats {
    pub targeting: TargetingReport,
    pub flocking: FlockingReport,
    pub targeting_duration: Duration,
    pub flocking_duration: Duration,
    pub ticks: u64,
}

/// The tick orchestrator over ECS entities.
///
/// Built from the [`EcosystemConfig`] present when the plugin is added;
/// registries are fed by the registration systems.
#[derive(Resource)]
pub struct Orchestrator(pub TickOrchestrator<Entity>);

impl Orchestrator {
    pub fn new(config: &EcosystemConfig) -> Self {
        Self(TickOrchestrator::new(config))
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(&EcosystemConfig::default())
    }
}

impl Deref for Orchestrator {
    type Target = TickOrchestrator<Entity>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Orchestrator {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Target changes collected during the exclusive targeting system, written
/// out as [`TargetChanged`] messages in the notify set.
#[derive(Resource, Default, Debug)]
pub struct PendingTargetChanges(pub Vec<TargetChanged>);
