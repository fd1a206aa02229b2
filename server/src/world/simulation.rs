use bevy::prelude::*;
use bevy_log::{error, info, trace};
use shared::constants::SNAPSHOT_WRITE_ERROR;
use shared::{BuoyancyModel, RapierEngine, StepClock, SubmersionState};
use std::path::PathBuf;

use crate::world::load_from_file::BuiltScene;
use crate::world::save::save_snapshot;

/// The running model and the engine it drives.
#[derive(Resource, Debug)]
pub struct Simulation {
    pub name: String,
    pub model: BuoyancyModel,
    pub engine: RapierEngine,
    pub clock: StepClock,
}

impl Simulation {
    pub fn new(name: impl Into<String>, scene: BuiltScene) -> Self {
        let clock = StepClock::from_config(scene.model.config());
        Self {
            name: name.into(),
            model: scene.model,
            engine: scene.engine,
            clock,
        }
    }
}

#[derive(Resource, Debug, Clone)]
pub struct RunSettings {
    /// Stop once the model reaches this tick. [`crate::init::init`] takes it
    /// as a run length and shifts it past a resumed snapshot.
    pub target_tick: u64,
    /// Follow wall-clock time instead of running one tick per frame.
    pub realtime: bool,
    /// Ticks between two status lines. Zero disables them.
    pub report_every: u64,
    pub snapshot_path: Option<PathBuf>,
}

pub fn advance_simulation_system(
    time: Res<Time>,
    settings: Res<RunSettings>,
    mut simulation: ResMut<Simulation>,
) {
    let Simulation {
        model,
        engine,
        clock,
        ..
    } = &mut *simulation;

    if model.tick_count() >= settings.target_tick {
        return;
    }

    let elapsed = if settings.realtime {
        time.delta_secs_f64()
    } else {
        clock.time_step()
    };

    let ticks = model.advance(engine, clock, elapsed);
    if ticks > 0 {
        trace!("Ran {} ticks, now at tick {}", ticks, model.tick_count());
    }
}

pub fn report_system(
    simulation: Res<Simulation>,
    settings: Res<RunSettings>,
    mut last_report: Local<u64>,
) {
    let model = &simulation.model;
    let tick = model.tick_count();
    if settings.report_every == 0 || tick < *last_report + settings.report_every {
        return;
    }
    *last_report = tick;

    let ratio = simulation.clock.ratio();
    for basin in model.basins().iter() {
        info!(
            "[{}] tick {} basin {}: {:.5} m³ at height {:.4}",
            simulation.name,
            tick,
            basin.id(),
            basin.liquid_volume(),
            basin.interpolated_height(ratio)
        );
    }

    for mass in model.masses().iter() {
        if let Some(reading) = model.scale_reading(mass.id(), ratio) {
            info!(
                "[{}] tick {} scale '{}' reads {:.3}",
                simulation.name, tick, mass.name, reading
            );
        } else if mass.submersion() == SubmersionState::Submerged {
            info!(
                "[{}] tick {} '{}' {:.1}% submerged at y {:.4}",
                simulation.name,
                tick,
                mass.name,
                mass.submerged_fraction() * 100.0,
                mass.interpolated_position(ratio).y
            );
        }
    }
}

pub fn finish_run_system(
    simulation: Res<Simulation>,
    settings: Res<RunSettings>,
    mut exit: EventWriter<AppExit>,
) {
    if simulation.model.tick_count() < settings.target_tick {
        return;
    }

    if let Some(path) = &settings.snapshot_path {
        let snapshot = simulation.model.snapshot(&simulation.engine);
        if let Err(err) = save_snapshot(&snapshot, path) {
            error!("{} {} : {}", SNAPSHOT_WRITE_ERROR, path.display(), err);
            exit.write(AppExit::error());
            return;
        }
    }

    info!(
        "[{}] Finished at tick {} holding {:.5} m³ of {}",
        simulation.name,
        simulation.model.tick_count(),
        simulation.model.total_liquid_volume(),
        simulation.model.liquid().name
    );
    exit.write(AppExit::Success);
}
