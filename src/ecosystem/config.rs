use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::execution::ExecutionStrategy;

/// Smallest cell size the grids accept. Non-positive sizes are clamped to it.
pub const MIN_CELL_SIZE: f32 = 1.0e-4;

pub const CONFIG_PATH: &str = "assets/ecosystem_config.ron";

/// Static ecosystem configuration loaded once at startup.
///
/// Cell sizes and caps are read by the orchestrator every tick but are only
/// validated here; call [`EcosystemConfig::sanitized`] after deserializing.
/// Fields missing from the RON file take their default value.
#[derive(Resource, Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct EcosystemConfig {
    /// Fixed-update ticks per second.
    pub tick_rate: f64,

    // Nearest-target pass
    pub targeting_cell_size: f32,
    pub global_sensing_cap: f32,

    // Flocking pass
    pub flocking_cell_size: f32,
    pub global_flocking_cap: f32,
    pub separation_epsilon: f32,

    // Execution
    pub initial_grid_capacity: usize,
    pub execution: ExecutionStrategy,
    pub parallel_batch_size: usize,
    pub min_parallel_len: usize,
}

impl Default for EcosystemConfig {
    fn default() -> Self {
        Self {
            tick_rate: 50.0,
            targeting_cell_size: 4.0,
            global_sensing_cap: 50.0,
            flocking_cell_size: 5.0,
            global_flocking_cap: 10.0,
            separation_epsilon: 1.0e-4,
            initial_grid_capacity: 1024,
            execution: ExecutionStrategy::Parallel,
            parallel_batch_size: 64,
            min_parallel_len: 4,
        }
    }
}

impl EcosystemConfig {
    /// Return a copy with every out-of-range value clamped, logging each fix.
    pub fn sanitized(&self) -> Self {
        let mut config = self.clone();
        config.targeting_cell_size = clamp_cell_size("targeting_cell_size", config.targeting_cell_size);
        config.flocking_cell_size = clamp_cell_size("flocking_cell_size", config.flocking_cell_size);

        if !config.tick_rate.is_finite() || config.tick_rate <= 0.0 {
            warn!("[ECOSYSTEM_CONFIG] tick_rate {} is invalid, using 50", config.tick_rate);
            config.tick_rate = 50.0;
        }
        if config.parallel_batch_size == 0 {
            warn!("[ECOSYSTEM_CONFIG] parallel_batch_size 0 is invalid, using 1");
            config.parallel_batch_size = 1;
        }
        if config.global_sensing_cap.is_nan() {
            warn!("[ECOSYSTEM_CONFIG] global_sensing_cap is NaN, treating as unlimited");
            config.global_sensing_cap = f32::INFINITY;
        }
        if config.global_flocking_cap.is_nan() {
            warn!("[ECOSYSTEM_CONFIG] global_flocking_cap is NaN, treating as unlimited");
            config.global_flocking_cap = f32::INFINITY;
        }
        if config.separation_epsilon.is_nan() || config.separation_epsilon < 0.0 {
            warn!(
                "[ECOSYSTEM_CONFIG] separation_epsilon {} is invalid, using 1e-4",
                config.separation_epsilon
            );
            config.separation_epsilon = 1.0e-4;
        }
        config
    }

    pub fn timestep_seconds(&self) -> f64 {
        1.0 / self.tick_rate
    }
}

/// `cell_size` if it is a usable grid size, [`MIN_CELL_SIZE`] otherwise.
pub fn clamped_cell_size(cell_size: f32) -> f32 {
    if cell_size.is_finite() && cell_size >= MIN_CELL_SIZE {
        cell_size
    } else {
        MIN_CELL_SIZE
    }
}

/// Clamp a configured cell size to [`MIN_CELL_SIZE`], warning when it changes.
pub fn clamp_cell_size(name: &str, cell_size: f32) -> f32 {
    if clamped_cell_size(cell_size) == cell_size {
        return cell_size;
    }
    warn!(
        "[ECOSYSTEM_CONFIG] {} {} is not a positive finite size, clamping to {}",
        name, cell_size, MIN_CELL_SIZE
    );
    MIN_CELL_SIZE
}

/// Parse a RON config document and sanitize it.
pub fn parse_config(contents: &str) -> Result<EcosystemConfig, ron::error::SpannedError> {
    ron::from_str::<EcosystemConfig>(contents).map(|config| config.sanitized())
}

pub struct EcosystemConfigPlugin;

impl Plugin for EcosystemConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_ecosystem_config);
    }
}

/// Load the configuration synchronously at startup and apply the fixed timestep.
fn load_ecosystem_config(mut commands: Commands, mut fixed_time: ResMut<Time<Fixed>>) {
    let config = match std::fs::read_to_string(CONFIG_PATH) {
        Ok(contents) => match parse_config(&contents) {
            Ok(config) => {
                info!("Loaded ecosystem config from {}", CONFIG_PATH);
                config
            }
            Err(e) => {
                error!("Failed to parse ecosystem config: {}", e);
                error!("Using default EcosystemConfig");
                EcosystemConfig::default()
            }
        },
        Err(e) => {
            error!("Failed to read {}: {}", CONFIG_PATH, e);
            error!("Using default EcosystemConfig");
            EcosystemConfig::default()
        }
    };

    fixed_time.set_timestep_hz(config.tick_rate);
    info!(
        "[ECOSYSTEM_CONFIG] tick_rate {} Hz, execution {:?}, batch {}",
        config.tick_rate, config.execution, config.parallel_batch_size
    );
    commands.insert_resource(config);
}
