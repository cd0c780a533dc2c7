//! # loopsim - Closed-loop PID simulator
//!
//! One command, controller + plant, step setpoint.
//!
//! Usage:
//!   loopsim                                  # Demo loop, 1000 ticks
//!   loopsim --config loop.toml               # Custom controller/plant/schedule
//!   loopsim --p-gain 20 --i-gain 2          # Override gains
//!   loopsim --csv run.csv --json run.json    # Export the run
//!
//! Log verbosity is controlled with RUST_LOG (default: info).

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use loopsim::{Recording, SegmentTracker, SimConfig, Simulation, StepMetrics};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Parser)]
#[command(name = "loopsim")]
#[command(about = "Closed-loop PID controller and plant simulator")]
pub struct Args {
    /// Simulation configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks to simulate
    #[arg(long)]
    ticks: Option<u64>,

    /// Seed for the measurement noise
    #[arg(long)]
    seed: Option<u64>,

    /// Proportional gain
    #[arg(long)]
    p_gain: Option<f64>,

    /// Integral gain
    #[arg(long)]
    i_gain: Option<f64>,

    /// Derivative gain
    #[arg(long)]
    d_gain: Option<f64>,

    /// Measurement noise standard deviation
    #[arg(long)]
    noise: Option<f64>,

    /// Write every tick to a CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write the full recording to a JSON file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Log a progress line every N ticks (0 disables)
    #[arg(long)]
    report_every: Option<u64>,

    /// Sleep one sampling interval between ticks
    #[arg(long)]
    realtime: bool,
}

impl Args {
    /// Layer command line overrides on top of the loaded configuration
    fn apply(&self, config: &mut SimConfig) {
        if let Some(ticks) = self.ticks {
            config.run.ticks = ticks;
        }
        if let Some(seed) = self.seed {
            config.controller.seed = Some(seed);
        }
        if let Some(p) = self.p_gain {
            config.controller.proportional_gain = p;
        }
        if let Some(i) = self.i_gain {
            config.controller.integral_gain = i;
        }
        if let Some(d) = self.d_gain {
            config.controller.differential_gain = d;
        }
        if let Some(noise) = self.noise {
            config.controller.noise_std_dev = noise.abs();
        }
        if let Some(every) = self.report_every {
            config.run.report_every = every;
        }
        if self.realtime {
            config.run.realtime = true;
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::load_from_file(path)?,
        None => SimConfig::default(),
    };
    args.apply(&mut config);
    config.validate().context("Invalid simulation configuration")?;

    let c = &config.controller;
    info!(" Starting loopsim");
    info!(
        "   P={} I={} D={} power={} saturation={} integral_stop={}",
        c.proportional_gain, c.integral_gain, c.differential_gain, c.power, c.saturation,
        c.integral_stop
    );
    info!(
        "   mass={} damping={} gravity={} dt={} noise={}",
        config.plant.mass,
        config.plant.damping,
        config.plant.gravity,
        c.sampling_interval,
        c.noise_std_dev
    );
    info!("   ticks={} setpoint={:?}", config.run.ticks, config.setpoint);

    let mut sim = Simulation::from_config(&config)?;
    let mut segments = SegmentTracker::new(config.plant.value, c.sampling_interval);
    // Samples are only kept when they are going to be written out
    let mut recording = (args.csv.is_some() || args.json.is_some())
        .then(|| Recording::new("loopsim").with_config(config.clone()));
    let mut diverged = false;

    for _ in 0..config.run.ticks {
        let sample = sim.step()?;
        if let Some(metrics) = segments.push(&sample) {
            log_segment(&metrics);
        }
        if let Some(recording) = recording.as_mut() {
            recording.push(sample);
        }

        if !diverged && !sample.value.is_finite() {
            diverged = true;
            warn!(tick = sample.tick, "plant value diverged");
        }

        let every = config.run.report_every;
        if every > 0 && (sample.tick + 1) % every == 0 {
            info!(
                tick = sample.tick,
                setpoint = sample.setpoint,
                value = sample.value,
                control = sample.control,
                saturated = sample.saturated,
                "progress"
            );
        }

        if config.run.realtime {
            std::thread::sleep(Duration::from_secs_f64(
                sim.controller().sampling_interval(),
            ));
        }
    }
    if let Some(metrics) = segments.finish() {
        log_segment(&metrics);
    }

    if let Some(recording) = &recording {
        if let Some(path) = &args.csv {
            recording.export_csv(path)?;
            info!("Exported {} ticks to {:?}", recording.len(), path);
        }
        if let Some(path) = &args.json {
            recording.save_json(path)?;
            info!("Saved recording to {:?}", path);
        }
    }

    info!(
        "Finished {} ticks ({:.2}s simulated)",
        sim.tick(),
        sim.elapsed()
    );
    Ok(())
}

fn log_segment(segment: &StepMetrics) {
    info!(
        start_tick = segment.start_tick,
        target = segment.target,
        overshoot_percent = segment.overshoot_percent,
        rise_time = ?segment.rise_time,
        settling_time = ?segment.settling_time,
        iae = segment.iae,
        saturated_ticks = segment.saturated_ticks,
        final_error = segment.final_error,
        "segment"
    );
}
