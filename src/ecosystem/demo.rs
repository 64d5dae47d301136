//! Headless demo population.
//!
//! A minimal consumer of the ecosystem passes: prey wander, predators chase
//! their delivered target (blended with their flocking vectors) and eat prey
//! they reach. Eaten prey are replaced so the population stays dynamic.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashSet;

use super::capture::save_capture;
use super::components::{AgentPosition, AgentVelocity, Flocker, FlockingSteering, NearestTarget, Predator, Prey};
use super::config::EcosystemConfig;
use super::resources::{EcoTick, EcosystemStats, Orchestrator};
use super::EcoSet;

#[derive(Resource, Debug, Clone)]
pub struct DemoConfig {
    pub seed: u64,
    /// Agents spawn in, and are pushed back into, `[-half_extent, half_extent]²`.
    pub half_extent: f32,
    pub initial_predators: usize,
    pub initial_prey: usize,
    pub sensing_radius: f32,
    pub flocking_radius: f32,
    pub predator_speed: f32,
    pub prey_speed: f32,
    pub wander_interval: u32,
    pub bounds_push: f32,
    pub eat_distance: f32,
    pub separation_weight: f32,
    pub alignment_weight: f32,
    pub cohesion_weight: f32,
    /// Stop after this many ticks; 0 runs forever.
    pub run_ticks: u64,
    pub capture_tick: Option<u64>,
    pub capture_path: String,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            half_extent: 60.0,
            initial_predators: 40,
            initial_prey: 400,
            sensing_radius: 12.0,
            flocking_radius: 5.0,
            predator_speed: 4.5,
            prey_speed: 3.0,
            wander_interval: 25,
            bounds_push: 2.0,
            eat_distance: 0.6,
            separation_weight: 1.5,
            alignment_weight: 1.0,
            cohesion_weight: 1.0,
            run_ticks: 1_000,
            capture_tick: None,
            capture_path: "logs/targeting_capture.bin".to_string(),
        }
    }
}

/// Current random heading and the ticks until it changes.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Wander {
    pub heading: Vec2,
    pub ticks_left: u32,
}

#[derive(Resource)]
pub struct DemoRng(pub StdRng);

#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct DemoStats {
    pub eaten: u64,
    pub spawned: u64,
}

#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum DemoSet {
    Steering,
    Integration,
    Feeding,
}

pub struct DemoPlugin;

impl Plugin for DemoPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<DemoConfig>();
        let seed = app.world().resource::<DemoConfig>().seed;
        app.insert_resource(DemoRng(StdRng::seed_from_u64(seed)));
        app.init_resource::<DemoStats>();

        app.configure_sets(FixedUpdate, (
            DemoSet::Steering,
            DemoSet::Integration,
            DemoSet::Feeding,
        ).chain().after(EcoSet::Notify));

        app.add_systems(Startup, spawn_population);
        app.add_systems(FixedUpdate, (
            request_capture.after(EcoSet::Registration).before(EcoSet::Targeting),
            save_requested_capture.in_set(EcoSet::Notify),
            // Chained so the shared rng is drawn in a fixed order.
            (wander_prey, steer_predators).chain().in_set(DemoSet::Steering),
            integrate.in_set(DemoSet::Integration),
            (eat_prey, log_population, stop_after_run_ticks).chain().in_set(DemoSet::Feeding),
        ));
    }
}

fn random_position(rng: &mut StdRng, half_extent: f32) -> Vec2 {
    Vec2::new(
        rng.random_range(-half_extent..=half_extent),
        rng.random_range(-half_extent..=half_extent),
    )
}

fn random_heading(rng: &mut StdRng) -> Vec2 {
    Vec2::from_angle(rng.random_range(0.0..std::f32::consts::TAU))
}

fn spawn_prey(commands: &mut Commands, rng: &mut StdRng, config: &DemoConfig) {
    commands.spawn((
        Prey,
        AgentPosition(random_position(rng, config.half_extent)),
        AgentVelocity::default(),
        Wander { heading: random_heading(rng), ticks_left: rng.random_range(0..=config.wander_interval) },
    ));
}

fn spawn_population(mut commands: Commands, mut rng: ResMut<DemoRng>, config: Res<DemoConfig>) {
    for _ in 0..config.initial_prey {
        spawn_prey(&mut commands, &mut rng.0, &config);
    }
    for _ in 0..config.initial_predators {
        let position = random_position(&mut rng.0, config.half_extent);
        commands.spawn((
            Predator { sensing_radius: config.sensing_radius },
            Flocker { flocking_radius: config.flocking_radius },
            AgentPosition(position),
            Wander { heading: random_heading(&mut rng.0), ticks_left: config.wander_interval },
        ));
    }
    info!(
        "[DEMO] Spawned {} predators and {} prey (seed {})",
        config.initial_predators, config.initial_prey, config.seed
    );
}

/// Pick a new heading every `wander_interval` ticks.
fn tick_wander(wander: &mut Wander, rng: &mut StdRng, interval: u32) -> Vec2 {
    if wander.ticks_left == 0 {
        wander.heading = random_heading(rng);
        wander.ticks_left = interval;
    } else {
        wander.ticks_left -= 1;
    }
    wander.heading
}

/// Steering toward the origin once outside the extent.
fn bounds_push(position: Vec2, half_extent: f32, strength: f32) -> Vec2 {
    let outside = Vec2::new(
        (position.x.abs() - half_extent).max(0.0) * position.x.signum(),
        (position.y.abs() - half_extent).max(0.0) * position.y.signum(),
    );
    -outside.normalize_or_zero() * strength
}

fn wander_prey(
    mut prey: Query<(&AgentPosition, &mut AgentVelocity, &mut Wander), With<Prey>>,
    mut rng: ResMut<DemoRng>,
    config: Res<DemoConfig>,
) {
    for (position, mut velocity, mut wander) in &mut prey {
        let heading = tick_wander(&mut wander, &mut rng.0, config.wander_interval);
        let desired = heading + bounds_push(position.0, config.half_extent, config.bounds_push);
        velocity.0 = (velocity.0 + desired * config.prey_speed * 0.25).clamp_length_max(config.prey_speed);
    }
}

fn steer_predators(
    mut predators: Query<
        (&AgentPosition, &mut AgentVelocity, &mut Wander, &NearestTarget, &FlockingSteering),
        With<Predator>,
    >,
    positions: Query<&AgentPosition, With<Prey>>,
    mut rng: ResMut<DemoRng>,
    config: Res<DemoConfig>,
) {
    for (position, mut velocity, mut wander, target, steering) in &mut predators {
        let flocking = steering.0.steering(config.separation_weight, config.alignment_weight, config.cohesion_weight);
        let target_position = target.0.and_then(|prey| positions.get(prey).ok());
        let desired = match target_position {
            Some(prey_position) => (prey_position.0 - position.0).normalize_or_zero() + flocking * 0.5,
            None => tick_wander(&mut wander, &mut rng.0, config.wander_interval) + flocking,
        };
        let desired = desired + bounds_push(position.0, config.half_extent, config.bounds_push);
        velocity.0 = desired.normalize_or_zero() * config.predator_speed;
    }
}

fn integrate(mut agents: Query<(&mut AgentPosition, &AgentVelocity)>, ecosystem: Res<EcosystemConfig>) {
    let dt = ecosystem.timestep_seconds() as f32;
    for (mut position, velocity) in &mut agents {
        position.0 += velocity.0 * dt;
    }
}

/// Despawn prey a predator has reached and replace each one.
fn eat_prey(
    mut commands: Commands,
    predators: Query<(&AgentPosition, &NearestTarget), With<Predator>>,
    prey: Query<&AgentPosition, With<Prey>>,
    mut rng: ResMut<DemoRng>,
    mut stats: ResMut<DemoStats>,
    config: Res<DemoConfig>,
) {
    let eat_distance_sq = config.eat_distance * config.eat_distance;
    let mut eaten: FxHashSet<Entity> = FxHashSet::default();

    for (position, target) in &predators {
        let Some(target) = target.0 else {
            continue;
        };
        let Ok(prey_position) = prey.get(target) else {
            continue;
        };
        if position.0.distance_squared(prey_position.0) <= eat_distance_sq && eaten.insert(target) {
            commands.entity(target).despawn();
        }
    }

    for _ in 0..eaten.len() {
        spawn_prey(&mut commands, &mut rng.0, &config);
    }
    stats.eaten += eaten.len() as u64;
    stats.spawned += eaten.len() as u64;
}

fn log_population(
    tick: Res<EcoTick>,
    predators: Query<(), With<Predator>>,
    prey: Query<(), With<Prey>>,
    stats: Res<DemoStats>,
    ecosystem: Res<EcosystemStats>,
) {
    if tick.0 % 100 != 0 {
        return;
    }
    info!(
        "[DEMO] tick {} predators {} prey {} eaten {} hits {} targeting {:?} flocking {:?}",
        tick.0,
        predators.iter().count(),
        prey.iter().count(),
        stats.eaten,
        ecosystem.targeting.hits,
        ecosystem.targeting_duration,
        ecosystem.flocking_duration
    );
}

fn stop_after_run_ticks(tick: Res<EcoTick>, config: Res<DemoConfig>, mut exit: MessageWriter<AppExit>) {
    if config.run_ticks > 0 && tick.0 == config.run_ticks {
        info!("[DEMO] Reached {} ticks, exiting", config.run_ticks);
        exit.write(AppExit::Success);
    }
}

fn request_capture(tick: Res<EcoTick>, config: Res<DemoConfig>, mut orchestrator: ResMut<Orchestrator>) {
    if config.capture_tick == Some(tick.0) {
        orchestrator.targeting.request_capture(tick.0);
    }
}

fn save_requested_capture(config: Res<DemoConfig>, mut orchestrator: ResMut<Orchestrator>) {
    let Some(capture) = orchestrator.targeting.take_capture() else {
        return;
    };
    if let Some(parent) = std::path::Path::new(&config.capture_path).parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            error!("Failed to create capture directory {:?}: {}", parent, e);
            return;
        }
    }
    match save_capture(&config.capture_path, &capture) {
        Ok(()) => info!(
            "[DEMO] Saved tick {} capture ({} predators, {} prey) to {}",
            capture.tick,
            capture.predator_positions.len(),
            capture.prey_positions.len(),
            config.capture_path
        ),
        Err(e) => error!("Failed to save capture to {}: {}", config.capture_path, e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_push_points_inward_only_outside() {
        assert_eq!(bounds_push(Vec2::new(10.0, -5.0), 60.0, 2.0), Vec2::ZERO);
        let push = bounds_push(Vec2::new(70.0, 0.0), 60.0, 2.0);
        assert_eq!(push, Vec2::new(-2.0, 0.0));
        let corner = bounds_push(Vec2::new(-65.0, 65.0), 60.0, 1.0);
        assert!(corner.x > 0.0 && corner.y < 0.0);
    }

    #[test]
    fn test_wander_changes_heading_on_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut wander = Wander { heading: Vec2::X, ticks_left: 2 };
        assert_eq!(tick_wander(&mut wander, &mut rng, 5), Vec2::X);
        assert_eq!(tick_wander(&mut wander, &mut rng, 5), Vec2::X);
        let heading = tick_wander(&mut wander, &mut rng, 5);
        assert_eq!(wander.ticks_left, 5);
        assert!((heading.length() - 1.0).abs() < 1.0e-5);
    }
}
