//! Closed-loop driving loop
//!
//! One tick: read the plant value, compute the control signal once, push the
//! signal scaled by the sampling interval into the plant, record a sample.

use std::collections::VecDeque;

use anyhow::{Context, Result};
use pidloop::{Controller, GaussianNoise, NoiseSource, Plant};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SimConfig;
use crate::recorder::lossless_f64;
use crate::setpoint::SetpointProfile;
use crate::tuning::{Param, ScheduledChange, TuningSurface};

/// Everything observed during one tick
///
/// Floats keep NaN and infinities through JSON, so a diverged run can be
/// saved and loaded back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TickSample {
    /// Tick index (0-indexed)
    pub tick: u64,
    /// Simulated time at the start of the tick, in seconds
    #[serde(with = "lossless_f64")]
    pub time: f64,
    /// Sampling interval used for this tick
    #[serde(with = "lossless_f64")]
    pub dt: f64,
    #[serde(with = "lossless_f64")]
    pub setpoint: f64,
    /// Plant position after the step
    #[serde(with = "lossless_f64")]
    pub value: f64,
    #[serde(with = "lossless_f64")]
    pub velocity: f64,
    #[serde(with = "lossless_f64")]
    pub acceleration: f64,
    /// Controller output (before scaling by dt)
    #[serde(with = "lossless_f64")]
    pub control: f64,
    /// Measured error including noise
    #[serde(with = "lossless_f64")]
    pub error: f64,
    /// Controller accumulator after the windup stop
    #[serde(with = "lossless_f64")]
    pub integral: f64,
    pub saturated: bool,
}

/// Rolling window of the most recent samples
#[derive(Debug, Clone)]
pub struct DisplayWindow {
    capacity: usize,
    samples: VecDeque<TickSample>,
}

impl DisplayWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, sample: TickSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&TickSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TickSample> {
        self.samples.iter()
    }

    pub fn setpoints(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.setpoint).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn controls(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.control).collect()
    }
}

/// One controller driving one plant
pub struct Simulation<N: NoiseSource = GaussianNoise> {
    controller: Controller<N>,
    plant: Plant,
    setpoint: SetpointProfile,
    surface: TuningSurface,
    schedule: Vec<ScheduledChange>,
    next_change: usize,
    tick: u64,
    elapsed: f64,
    window: DisplayWindow,
}

impl Simulation<GaussianNoise> {
    /// Build controller, plant and schedule from a validated config
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        config.validate()?;

        let controller =
            Controller::new(config.controller).context("Failed to create controller")?;
        let plant = Plant::new(config.plant).context("Failed to create plant")?;
        let surface = if config.run.bounded_tuning {
            TuningSurface::default()
        } else {
            TuningSurface::unbounded()
        };

        Ok(Simulation::new(controller, plant, config.setpoint, config.run.window)
            .with_tuning_surface(surface)
            .with_schedule(config.schedule.clone()))
    }
}

impl<N: NoiseSource> Simulation<N> {
    pub fn new(
        controller: Controller<N>,
        plant: Plant,
        setpoint: SetpointProfile,
        window: usize,
    ) -> Self {
        Self {
            controller,
            plant,
            setpoint,
            surface: TuningSurface::default(),
            schedule: Vec::new(),
            next_change: 0,
            tick: 0,
            elapsed: 0.0,
            window: DisplayWindow::new(window),
        }
    }

    pub fn with_tuning_surface(mut self, surface: TuningSurface) -> Self {
        self.surface = surface;
        self
    }

    /// Parameter changes to apply before their tick; order within a tick is kept
    pub fn with_schedule(mut self, mut schedule: Vec<ScheduledChange>) -> Self {
        schedule.sort_by_key(|change| change.tick);
        self.schedule = schedule;
        self.next_change = 0;
        self
    }

    /// Advance one tick
    pub fn step(&mut self) -> Result<TickSample> {
        self.apply_due_changes()?;

        let tick = self.tick;
        let setpoint = self.setpoint.at(tick);
        if self.setpoint.is_edge(tick) {
            debug!(tick, setpoint, "setpoint edge");
        }

        let diag = self
            .controller
            .control_with_diagnostics(self.plant.value(), setpoint);
        let dt = self.controller.sampling_interval();
        self.plant.change(diag.output * dt);

        let state = self.plant.state();
        let sample = TickSample {
            tick,
            time: self.elapsed,
            dt,
            setpoint,
            value: state.value,
            velocity: state.velocity,
            acceleration: state.acceleration,
            control: diag.output,
            error: diag.error,
            integral: diag.integral,
            saturated: diag.saturated,
        };

        self.tick += 1;
        self.elapsed += dt;
        self.window.push(sample);

        Ok(sample)
    }

    /// Run `ticks` ticks and return every sample
    pub fn run(&mut self, ticks: u64) -> Result<Vec<TickSample>> {
        let mut samples = Vec::with_capacity(ticks as usize);
        self.run_for_each(ticks, |sample| samples.push(*sample))?;
        Ok(samples)
    }

    /// Run `ticks` ticks, handing each sample to `on_sample`
    pub fn run_for_each<F>(&mut self, ticks: u64, mut on_sample: F) -> Result<()>
    where
        F: FnMut(&TickSample),
    {
        for _ in 0..ticks {
            let sample = self.step()?;
            on_sample(&sample);
        }
        Ok(())
    }

    /// Change a parameter now, through the tuning surface
    pub fn tune(&mut self, param: Param, value: f64) -> Result<f64> {
        let applied = self
            .surface
            .apply(&mut self.controller, &mut self.plant, param, value)
            .with_context(|| format!("Failed to set {param} to {value}"))?;
        Ok(applied)
    }

    fn apply_due_changes(&mut self) -> Result<()> {
        while let Some(change) = self.schedule.get(self.next_change).copied() {
            if change.tick > self.tick {
                break;
            }
            self.next_change += 1;

            let applied = self.tune(change.param, change.value)?;
            info!(
                tick = self.tick,
                param = %change.param,
                value = applied,
                "applied scheduled change"
            );
        }
        Ok(())
    }

    pub fn controller(&self) -> &Controller<N> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut Controller<N> {
        &mut self.controller
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn plant_mut(&mut self) -> &mut Plant {
        &mut self.plant
    }

    pub fn setpoint(&self) -> &SetpointProfile {
        &self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: SetpointProfile) {
        self.setpoint = setpoint;
    }

    pub fn window(&self) -> &DisplayWindow {
        &self.window
    }

    /// Number of ticks run so far
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Simulated seconds elapsed
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use pidloop::noise::Silent;
    use pidloop::{PidConfig, PlantConfig};

    fn demo(setpoint: SetpointProfile) -> Simulation<Silent> {
        let config = SimConfig::default();
        let controller = Controller::with_noise_source(config.controller, Silent).unwrap();
        let plant = Plant::new(config.plant).unwrap();
        Simulation::new(controller, plant, setpoint, 50)
    }

    #[test]
    fn test_first_ticks_match_hand_computation() {
        let mut sim = demo(SetpointProfile::Constant { value: 10.0 });

        // control = 50 * 10 = 500, force = 500 * 0.02 = 10, accel = 10 / 10 = 1
        let s0 = sim.step().unwrap();
        assert_relative_eq!(s0.control, 500.0);
        assert_relative_eq!(s0.acceleration, 1.0);
        assert_relative_eq!(s0.value, 1.0);

        // control = 50 * 9 = 450, accel = 0.9 - 0.3 * 1 = 0.6, vel = 1.6, value = 2.6
        let s1 = sim.step().unwrap();
        assert_relative_eq!(s1.control, 450.0);
        assert_relative_eq!(s1.velocity, 1.6, epsilon = 1e-12);
        assert_relative_eq!(s1.value, 2.6, epsilon = 1e-12);
        assert_relative_eq!(s1.time, 0.02);
    }

    #[test]
    fn test_square_wave_idle_until_first_edge() {
        let mut sim = demo(SetpointProfile::default());
        let samples = sim.run(130).unwrap();

        assert!(samples[..125].iter().all(|s| s.value == 0.0 && s.control == 0.0));
        assert_eq!(samples[125].setpoint, 10.0);
        assert!(samples[125].value > 0.0);
    }

    #[test]
    fn test_window_keeps_latest_samples() {
        let mut sim = demo(SetpointProfile::Constant { value: 10.0 });
        sim.run(120).unwrap();

        let window = sim.window();
        assert_eq!(window.len(), 50);
        assert_eq!(window.iter().next().unwrap().tick, 70);
        assert_eq!(window.latest().unwrap().tick, 119);
        assert_eq!(window.values().len(), 50);
        assert!(window.setpoints().iter().all(|&sp| sp == 10.0));
    }

    #[test]
    fn test_schedule_applied_before_tick() {
        let mut sim = demo(SetpointProfile::Constant { value: 10.0 }).with_schedule(vec![
            ScheduledChange {
                tick: 5,
                param: Param::ProportionalGain,
                value: 0.0,
            },
            ScheduledChange {
                tick: 2,
                param: Param::Saturation,
                value: 100.0,
            },
        ]);

        let samples = sim.run(6).unwrap();

        assert_eq!(samples[1].control, 50.0 * (10.0 - samples[0].value));
        assert_eq!(samples[2].control, 100.0);
        assert!(samples[2].saturated);
        assert_eq!(samples[5].control, 0.0);
        assert_eq!(sim.controller().proportional_gain(), 0.0);
    }

    #[test]
    fn test_tune_mid_run_keeps_state() {
        let mut sim = demo(SetpointProfile::Constant { value: 10.0 });
        sim.run(10).unwrap();
        let state = sim.plant().state();
        let accumulator = sim.controller().error_accumulator();

        sim.tune(Param::Mass, 20.0).unwrap();
        sim.tune(Param::IntegralGain, 1.0).unwrap();

        assert_eq!(sim.plant().state(), state);
        assert_eq!(sim.controller().error_accumulator(), accumulator);
        assert_eq!(sim.plant().mass(), 20.0);
    }

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = SimConfig::default();
        config.controller = PidConfig::default().with_sampling_interval(0.0);
        assert!(Simulation::from_config(&config).is_err());

        let mut config = SimConfig::default();
        config.plant = PlantConfig::new(-1.0, 0.0, 0.0);
        assert!(Simulation::from_config(&config).is_err());
    }

    #[test]
    fn test_failed_scheduled_change_reports_error() {
        let mut sim = demo(SetpointProfile::Constant { value: 1.0 })
            .with_tuning_surface(TuningSurface::unbounded())
            .with_schedule(vec![ScheduledChange {
                tick: 0,
                param: Param::SamplingInterval,
                value: 0.0,
            }]);

        assert!(sim.step().is_err());
    }
}
