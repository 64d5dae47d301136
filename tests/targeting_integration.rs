use bevy::prelude::*;
use ecosim::ecosystem::{
    AgentPosition, EcoSet, EcoTick, EcosystemConfig, EcosystemPlugin, EcosystemStats, NearestTarget, Orchestrator,
    Predator, Prey, TargetChanged,
};

#[derive(Resource, Default)]
struct ChangeLog(Vec<TargetChanged>);

fn record_changes(mut reader: MessageReader<TargetChanged>, mut log: ResMut<ChangeLog>) {
    log.0.extend(reader.read().copied());
}

fn setup_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins);
    app.add_plugins(EcosystemPlugin);
    app.init_resource::<ChangeLog>();
    app.add_systems(FixedUpdate, record_changes.after(EcoSet::Notify));
    app
}

fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

fn spawn_predator(app: &mut App, x: f32, y: f32, sensing_radius: f32) -> Entity {
    app.world_mut()
        .spawn((Predator { sensing_radius }, AgentPosition(Vec2::new(x, y))))
        .id()
}

fn spawn_prey(app: &mut App, x: f32, y: f32) -> Entity {
    app.world_mut().spawn((Prey, AgentPosition(Vec2::new(x, y)))).id()
}

fn target_of(app: &App, predator: Entity) -> Option<Entity> {
    app.world().get::<NearestTarget>(predator).and_then(|t| t.0)
}

fn take_changes(app: &mut App) -> Vec<TargetChanged> {
    std::mem::take(&mut app.world_mut().resource_mut::<ChangeLog>().0)
}

#[test]
fn test_predator_gets_nearest_prey_after_one_tick() {
    let mut app = setup_app();
    let predator = spawn_predator(&mut app, 0.0, 0.0, 10.0);
    let _far = spawn_prey(&mut app, 6.0, 0.0);
    let near = spawn_prey(&mut app, 2.0, 0.0);
    let _middle = spawn_prey(&mut app, 0.0, 4.0);

    tick(&mut app);

    assert_eq!(app.world().resource::<EcoTick>().0, 1);
    assert_eq!(target_of(&app, predator), Some(near));

    let stats = app.world().resource::<EcosystemStats>();
    assert_eq!(stats.targeting.predators, 1);
    assert_eq!(stats.targeting.prey, 3);
    assert_eq!(stats.targeting.hits, 1);
}

#[test]
fn test_target_follows_moving_prey() {
    let mut app = setup_app();
    let predator = spawn_predator(&mut app, 0.0, 0.0, 10.0);
    let a = spawn_prey(&mut app, 2.0, 0.0);
    let b = spawn_prey(&mut app, 5.0, 0.0);

    tick(&mut app);
    assert_eq!(target_of(&app, predator), Some(a));

    app.world_mut().get_mut::<AgentPosition>(a).unwrap().0 = Vec2::new(9.0, 0.0);
    app.world_mut().get_mut::<AgentPosition>(b).unwrap().0 = Vec2::new(1.0, 1.0);
    tick(&mut app);
    assert_eq!(target_of(&app, predator), Some(b));
}

#[test]
fn test_out_of_range_prey_gives_no_target() {
    let mut app = setup_app();
    let predator = spawn_predator(&mut app, 0.0, 0.0, 3.0);
    spawn_prey(&mut app, 3.5, 0.0);

    tick(&mut app);
    assert_eq!(target_of(&app, predator), None);
    assert!(take_changes(&mut app).is_empty(), "None to None is not a change");
}

#[test]
fn test_global_cap_limits_large_sensing_radius() {
    let mut app = setup_app();
    app.world_mut().resource_mut::<EcosystemConfig>().global_sensing_cap = 5.0;
    let predator = spawn_predator(&mut app, 0.0, 0.0, 100.0);
    let unlimited = spawn_predator(&mut app, 40.0, 0.0, 0.0);
    let prey = spawn_prey(&mut app, 8.0, 0.0);

    tick(&mut app);
    assert_eq!(target_of(&app, predator), None);
    // min(0, cap) is still non-positive, so the radius stays unlimited.
    assert_eq!(target_of(&app, unlimited), Some(prey));
}

#[test]
fn test_despawned_prey_is_never_delivered() {
    let mut app = setup_app();
    let predator = spawn_predator(&mut app, 0.0, 0.0, 10.0);
    let near = spawn_prey(&mut app, 1.0, 0.0);
    let far = spawn_prey(&mut app, 7.0, 0.0);

    tick(&mut app);
    assert_eq!(target_of(&app, predator), Some(near));

    app.world_mut().despawn(near);
    tick(&mut app);
    assert_eq!(target_of(&app, predator), Some(far));
    assert!(!app.world().resource::<Orchestrator>().targeting.prey().contains(near));

    app.world_mut().despawn(far);
    tick(&mut app);
    assert_eq!(target_of(&app, predator), None, "no prey left clears the stale target");
}

#[test]
fn test_target_changed_is_written_only_on_change() {
    let mut app = setup_app();
    let predator = spawn_predator(&mut app, 0.0, 0.0, 10.0);
    let prey = spawn_prey(&mut app, 3.0, 0.0);

    tick(&mut app);
    let changes = take_changes(&mut app);
    assert_eq!(changes, vec![TargetChanged { predator, previous: None, target: Some(prey) }]);

    tick(&mut app);
    tick(&mut app);
    assert!(take_changes(&mut app).is_empty());

    app.world_mut().get_mut::<AgentPosition>(prey).unwrap().0 = Vec2::new(30.0, 0.0);
    tick(&mut app);
    let changes = take_changes(&mut app);
    assert_eq!(changes, vec![TargetChanged { predator, previous: Some(prey), target: None }]);
}

#[test]
fn test_removing_roles_unregisters_agents() {
    let mut app = setup_app();
    let predator = spawn_predator(&mut app, 0.0, 0.0, 10.0);
    let prey = spawn_prey(&mut app, 2.0, 0.0);

    tick(&mut app);
    {
        let orchestrator = app.world().resource::<Orchestrator>();
        assert!(orchestrator.targeting.predators().contains(predator));
        assert!(orchestrator.targeting.prey().contains(prey));
    }

    app.world_mut().entity_mut(prey).remove::<Prey>();
    app.world_mut().entity_mut(predator).remove::<Predator>();
    tick(&mut app);

    let orchestrator = app.world().resource::<Orchestrator>();
    assert!(orchestrator.targeting.predators().is_empty());
    assert!(orchestrator.targeting.prey().is_empty());
    assert!(app.world().resource::<EcosystemStats>().targeting.skipped);
}

#[test]
fn test_many_predators_agree_with_brute_force() {
    let mut app = setup_app();
    let mut rng = fastrand::Rng::with_seed(7);

    let predators: Vec<(Entity, Vec2, f32)> = (0..200)
        .map(|_| {
            let position = Vec2::new(rng.f32() * 100.0, rng.f32() * 100.0);
            let radius = 2.0 + rng.f32() * 15.0;
            (spawn_predator(&mut app, position.x, position.y, radius), position, radius)
        })
        .collect();
    let prey: Vec<(Entity, Vec2)> = (0..500)
        .map(|_| {
            let position = Vec2::new(rng.f32() * 100.0, rng.f32() * 100.0);
            (spawn_prey(&mut app, position.x, position.y), position)
        })
        .collect();

    tick(&mut app);

    for &(predator, position, radius) in &predators {
        let expected_dist = prey
            .iter()
            .map(|&(_, p)| position.distance_squared(p))
            .filter(|&d| d <= radius * radius)
            .fold(None, |best: Option<f32>, d| Some(best.map_or(d, |b| b.min(d))));

        let got = target_of(&app, predator);
        match expected_dist {
            None => assert_eq!(got, None),
            Some(best) => {
                let target = got.expect("prey in range must be found");
                let target_position = app.world().get::<AgentPosition>(target).unwrap().0;
                assert_eq!(position.distance_squared(target_position), best);
            }
        }
    }
}
