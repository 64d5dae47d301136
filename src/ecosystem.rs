//! Predator/prey ecosystem core.
//!
//! - **cell_key**, **spatial_grid**: uniform hash grid over snapshot indices
//! - **execution**: parallel or sequential dispatch of the data-parallel phases
//! - **snapshot**, **targeting**, **flocking**: per-tick buffers and the two resolvers
//! - **registry**, **orchestrator**: participant sets and per-tick sequencing
//! - **capture**: on-disk record of one targeting tick for replay
//! - **components**, **resources**, **events**, **systems**: Bevy integration
//! - **config**, **demo**: startup configuration and the headless demo population

use bevy::prelude::*;

pub mod capture;
pub mod cell_key;
pub mod components;
pub mod config;
pub mod demo;
pub mod events;
pub mod execution;
pub mod flocking;
pub mod orchestrator;
pub mod registry;
pub mod resources;
pub mod snapshot;
pub mod spatial_grid;
pub mod targeting;
mod systems;

pub use components::*;
pub use config::{EcosystemConfig, EcosystemConfigPlugin};
pub use events::TargetChanged;
pub use resources::*;

/// Ordering of the ecosystem tick inside `FixedUpdate`.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum EcoSet {
    Registration, // Tick counter, registry sync from component add/remove
    Targeting,    // Nearest-prey pass
    Flocking,     // Boids pass
    Notify,       // Messages for observers
}

/// Runs the orchestrator over ECS agents every fixed tick.
pub struct EcosystemPlugin;

impl Plugin for EcosystemPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<EcosystemConfig>();
        let config = app.world().resource::<EcosystemConfig>().clone();
        app.insert_resource(Orchestrator::new(&config));
        app.init_resource::<EcoTick>();
        app.init_resource::<EcosystemStats>();
        app.init_resource::<PendingTargetChanges>();

        app.add_message::<TargetChanged>();

        app.configure_sets(FixedUpdate, (
            EcoSet::Registration,
            EcoSet::Targeting,
            EcoSet::Flocking,
            EcoSet::Notify,
        ).chain());

        app.add_systems(FixedUpdate, (
            (systems::advance_tick, systems::sync_registries)
                .chain()
                .in_set(EcoSet::Registration),
            systems::run_targeting.in_set(EcoSet::Targeting),
            systems::run_flocking.in_set(EcoSet::Flocking),
            systems::emit_target_changes.in_set(EcoSet::Notify),
        ));
    }
}
