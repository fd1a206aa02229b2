use std::path::PathBuf;

use buoyancy_server::init;
use buoyancy_server::world::load_from_file::load_scene;
use buoyancy_server::world::simulation::RunSettings;
use clap::Parser;
use shared::constants::CONFIG_READ_ERROR;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Scene file to run. The built-in harbor scene is used when omitted.
    #[arg(short, long)]
    scene: Option<PathBuf>,

    /// Simulated seconds to run.
    #[arg(short, long, default_value_t = 10.0)]
    duration: f64,

    /// Where to write a snapshot of the final state.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Snapshot to resume from.
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Pace ticks to wall-clock time.
    #[arg(long)]
    realtime: bool,

    #[arg(long, default_value_t = 60)]
    report_every: u64,
}

fn main() {
    let args = Args::parse();

    if !(args.duration.is_finite() && args.duration > 0.0) {
        eprintln!("Error: duration must be a positive number of seconds.");
        eprintln!("Got: {}", args.duration);
        std::process::exit(1);
    }

    let scene = match load_scene(args.scene.as_deref()) {
        Ok(scene) => scene,
        Err(err) => {
            eprintln!("{}: {err}", CONFIG_READ_ERROR);
            std::process::exit(1);
        }
    };

    let ticks = (args.duration * scene.config.ticks_per_second as f64).ceil() as u64;

    let exit = init::init(
        scene,
        RunSettings {
            target_tick: ticks,
            realtime: args.realtime,
            report_every: args.report_every,
            snapshot_path: args.output,
        },
        args.resume,
    );

    if exit.is_error() {
        std::process::exit(1);
    }
}
