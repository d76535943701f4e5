//! Headless gravity-well tuner.
//!
//! Runs a scenario against the sandbox world and writes CSV telemetry.
//!
//! Usage:
//!   cargo run -p well-sim -- --scenario orbit --tuning tuning.json > run.csv

use std::{fs, path::PathBuf, process::ExitCode};

use clap::Parser;
use glam::Vec3;
use gravity_well::WellTuning;
use well_sim::{
    SimConfig, Simulation,
    config::load_tuning,
    error::{Result, SimError},
    scenario::{Scenario, SpawnParams},
    telemetry::{
        FileTelemetryOutput, NullTelemetryOutput, StdoutTelemetryOutput, TelemetryOutput,
    },
};

#[derive(Parser)]
#[command(about = "Headless sandbox for tuning gravity-well attraction")]
struct CliArgs {
    /// Number of bodies to spawn.
    #[arg(long, default_value_t = 64)]
    count: usize,

    /// Seed for scenario placement.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Steps per second.
    #[arg(long, default_value_t = 60.0)]
    hz: f32,

    /// Maximum simulated time in seconds.
    #[arg(long, default_value_t = 20.0)]
    duration: f32,

    /// Outer (attraction) radius.
    #[arg(long, default_value_t = 1000.0)]
    outer: f32,

    /// Inner (consumption) radius.
    #[arg(long, default_value_t = 20.0)]
    inner: f32,

    /// Height of the well center above the ground.
    #[arg(long, default_value_t = 300.0)]
    height: f32,

    /// Downward gravity magnitude.
    #[arg(long, default_value_t = 980.0)]
    gravity: f32,

    /// Fallback query radius as a multiple of the outer radius.
    #[arg(long, default_value_t = 4.0)]
    fallback_scale: f32,

    /// Remove the ground plane.
    #[arg(long)]
    no_ground: bool,

    /// JSON file overriding tuning parameters.
    #[arg(long)]
    tuning: Option<PathBuf>,

    /// Telemetry destination: `stdout`, `none`, or a file path.
    #[arg(long, default_value = "stdout")]
    telemetry: String,

    /// Body placement.
    #[arg(long, value_enum, default_value_t = Scenario::default())]
    scenario: Scenario,

    /// Initial speed of bodies in the orbit scenario.
    #[arg(long, default_value_t = 400.0)]
    orbit_speed: f32,

    /// Also write the run summary as JSON to this file.
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn telemetry_output(destination: &str) -> Result<Box<dyn TelemetryOutput>> {
    Ok(match destination {
        "stdout" => Box::new(StdoutTelemetryOutput),
        "none" => Box::new(NullTelemetryOutput),
        path => {
            let path = PathBuf::from(path);
            let output = FileTelemetryOutput::create(&path)
                .map_err(|source| SimError::Telemetry { path, source })?;
            Box::new(output)
        }
    })
}

fn run(args: &CliArgs) -> Result<()> {
    let tuning = match &args.tuning {
        Some(path) => {
            let tuning = load_tuning(path)?;
            eprintln!("# Loaded tuning from {}", path.display());
            tuning
        }
        None => WellTuning::default(),
    };

    let config = SimConfig {
        spawn: SpawnParams {
            scenario: args.scenario,
            count: args.count,
            seed: args.seed,
            center: Vec3::new(0.0, 0.0, args.height),
            outer_radius: args.outer,
            inner_radius: args.inner,
            orbit_speed: args.orbit_speed,
        },
        gravity: args.gravity,
        hz: args.hz,
        duration: args.duration,
        tuning,
        fallback_radius_scale: args.fallback_scale,
        ground: !args.no_ground,
    };

    let mut simulation = Simulation::new(&config)?;
    let mut output = telemetry_output(&args.telemetry)?;
    eprintln!(
        "# Running {:?} with {} bodies for up to {:.1} s...",
        args.scenario, args.count, args.duration
    );
    let summary = simulation.run(output.as_mut());
    summary.report();

    if let Some(path) = &args.summary_json {
        let json = serde_json::to_string_pretty(&summary).map_err(|e| SimError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
        fs::write(path, json).map_err(|e| SimError::Config {
            path: path.clone(),
            message: e.to_string(),
        })?;
    }

    Ok(())
}

fn main() -> ExitCode {
    {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .init();
    }

    match run(&CliArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("# ERROR: {e}");
            ExitCode::FAILURE
        }
    }
}
