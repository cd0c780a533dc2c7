//! Shared fixtures for the control loop benchmarks

use loopsim::{SetpointProfile, SimConfig, Simulation};
use pidloop::{PidConfig, PidLoopResult, Plant, PlantConfig};

/// PID gains and limits of the demo loop, with all three terms active
pub fn demo_pid() -> PidConfig {
    PidConfig::new(50.0, 5.0, 1.0)
        .with_saturation(1500.0)
        .with_integral_stop(40.0)
        .with_sampling_interval(0.02)
}

pub fn demo_plant() -> PidLoopResult<Plant> {
    Plant::new(PlantConfig::new(10.0, 0.3, 0.0))
}

/// Demo simulation tracking a constant target
pub fn constant_target_sim(target: f64) -> anyhow::Result<Simulation> {
    let mut config = SimConfig::default();
    config.controller = demo_pid();
    config.setpoint = SetpointProfile::Constant { value: target };
    Simulation::from_config(&config)
}
