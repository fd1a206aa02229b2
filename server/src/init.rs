use crate::world::{
    load_from_file::{load_snapshot, SceneFile},
    simulation::{
        advance_simulation_system, finish_run_system, report_system, RunSettings, Simulation,
    },
};
use bevy::prelude::*;
use bevy_app::ScheduleRunnerPlugin;
use std::path::PathBuf;
use std::time::Duration;

pub fn build_simulation(
    scene: &SceneFile,
    resume_from: Option<&PathBuf>,
) -> Result<Simulation, Box<dyn std::error::Error>> {
    let mut simulation = Simulation::new(scene.name.clone(), scene.build()?);

    if let Some(path) = resume_from {
        let snapshot = load_snapshot(path)?;
        let Simulation { model, engine, .. } = &mut simulation;
        model.restore(engine, &snapshot)?;
    }

    Ok(simulation)
}

pub fn init(
    scene: SceneFile,
    mut settings: RunSettings,
    resume_from: Option<PathBuf>,
) -> AppExit {
    let mut app = App::new();

    // Without realtime pacing every frame runs exactly one tick, as fast as possible
    let wait = if settings.realtime {
        Duration::from_secs_f64(scene.config.fixed_time_step())
    } else {
        Duration::ZERO
    };
    app.add_plugins(MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(wait)));
    app.add_plugins(bevy::log::LogPlugin::default());

    let simulation = match build_simulation(&scene, resume_from.as_ref()) {
        Ok(simulation) => simulation,
        Err(err) => {
            error!("Failed to set up scene {} : {}", scene.name, err);
            return AppExit::error();
        }
    };

    // Run length counts from the resumed tick
    settings.target_tick += simulation.model.tick_count();

    info!(
        "Starting scene {} at tick {}, running until tick {}",
        scene.name,
        simulation.model.tick_count(),
        settings.target_tick
    );

    app.insert_resource(simulation);
    app.insert_resource(settings);

    app.add_systems(
        Update,
        (
            advance_simulation_system,
            report_system,
            finish_run_system,
        )
            .chain(),
    );

    app.run()
}
