//! Live parameter tuning
//!
//! Every tunable parameter of the controller and the plant has a name and a
//! slider range. Changes are clamped into that range and written between
//! ticks without touching the controller or plant state.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use pidloop::{Controller, NoiseSource, PidLoopResult, Plant};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A tunable parameter of the controller or the plant
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Param {
    Power,
    ProportionalGain,
    IntegralGain,
    DifferentialGain,
    Saturation,
    IntegralStop,
    Noise,
    SamplingInterval,
    Mass,
    Damping,
    Gravity,
}

impl Param {
    pub const ALL: [Param; 11] = [
        Param::Power,
        Param::ProportionalGain,
        Param::IntegralGain,
        Param::DifferentialGain,
        Param::Saturation,
        Param::IntegralStop,
        Param::Noise,
        Param::SamplingInterval,
        Param::Mass,
        Param::Damping,
        Param::Gravity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Param::Power => "power",
            Param::ProportionalGain => "proportional_gain",
            Param::IntegralGain => "integral_gain",
            Param::DifferentialGain => "differential_gain",
            Param::Saturation => "saturation",
            Param::IntegralStop => "integral_stop",
            Param::Noise => "noise",
            Param::SamplingInterval => "sampling_interval",
            Param::Mass => "mass",
            Param::Damping => "damping",
            Param::Gravity => "gravity",
        }
    }

    /// True for parameters owned by the plant
    pub fn is_plant(&self) -> bool {
        matches!(self, Param::Mass | Param::Damping | Param::Gravity)
    }

    /// Read the current value from the controller or plant
    pub fn read<N: NoiseSource>(&self, controller: &Controller<N>, plant: &Plant) -> f64 {
        match self {
            Param::Power => controller.power(),
            Param::ProportionalGain => controller.proportional_gain(),
            Param::IntegralGain => controller.integral_gain(),
            Param::DifferentialGain => controller.differential_gain(),
            Param::Saturation => controller.saturation(),
            Param::IntegralStop => controller.integral_stop(),
            Param::Noise => controller.noise_std_dev(),
            Param::SamplingInterval => controller.sampling_interval(),
            Param::Mass => plant.mass(),
            Param::Damping => plant.damping(),
            Param::Gravity => plant.gravity(),
        }
    }

    /// Write `value` into the controller or plant
    pub fn write<N: NoiseSource>(
        &self,
        controller: &mut Controller<N>,
        plant: &mut Plant,
        value: f64,
    ) -> PidLoopResult<()> {
        match self {
            Param::Power => controller.set_power(value),
            Param::ProportionalGain => controller.set_proportional_gain(value),
            Param::IntegralGain => controller.set_integral_gain(value),
            Param::DifferentialGain => controller.set_differential_gain(value),
            Param::Saturation => controller.set_saturation(value),
            Param::IntegralStop => controller.set_integral_stop(value),
            Param::Noise => controller.set_noise_std_dev(value),
            Param::SamplingInterval => controller.set_sampling_interval(value),
            Param::Mass => plant.set_mass(value),
            Param::Damping => plant.set_damping(value),
            Param::Gravity => plant.set_gravity(value),
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Param {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let param = match s.to_ascii_lowercase().as_str() {
            "power" => Param::Power,
            "p" | "kp" | "p_gain" | "proportional_gain" => Param::ProportionalGain,
            "i" | "ki" | "i_gain" | "integral_gain" => Param::IntegralGain,
            "d" | "kd" | "d_gain" | "differential_gain" => Param::DifferentialGain,
            "saturation" => Param::Saturation,
            "integral_stop" | "integralstop" => Param::IntegralStop,
            "noise" | "noise_std_dev" => Param::Noise,
            "dt" | "sampling_interval" => Param::SamplingInterval,
            "mass" => Param::Mass,
            "damping" => Param::Damping,
            "gravity" => Param::Gravity,
            other => return Err(format!("unknown parameter '{other}'")),
        };
        Ok(param)
    }
}

/// Inclusive bounds of a tunable parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
}

impl ParamRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    /// Clamp into the range; NaN is passed through for the setter to reject
    pub fn clamp(&self, value: f64) -> f64 {
        if value.is_nan() {
            return value;
        }
        value.max(self.min).min(self.max)
    }
}

/// Bounded, named set of live-adjustable parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningSurface {
    ranges: BTreeMap<Param, ParamRange>,
}

impl Default for TuningSurface {
    /// Slider ranges of the interactive front-end
    fn default() -> Self {
        let mut ranges = BTreeMap::new();
        ranges.insert(Param::ProportionalGain, ParamRange::new(0.0, 100.0));
        ranges.insert(Param::IntegralGain, ParamRange::new(0.0, 100.0));
        ranges.insert(Param::DifferentialGain, ParamRange::new(0.0, 100.0));
        ranges.insert(Param::Noise, ParamRange::new(0.0, 2.0));
        ranges.insert(Param::Damping, ParamRange::new(0.05, 0.5));
        ranges.insert(Param::Gravity, ParamRange::new(0.0, 0.5));
        ranges.insert(Param::Mass, ParamRange::new(1.0, 100.0));
        Self { ranges }
    }
}

impl TuningSurface {
    /// Surface without any bounds
    pub fn unbounded() -> Self {
        Self {
            ranges: BTreeMap::new(),
        }
    }

    /// Set or replace the range of a parameter
    pub fn with_range(mut self, param: Param, range: ParamRange) -> Self {
        self.ranges.insert(param, range);
        self
    }

    pub fn range(&self, param: Param) -> Option<ParamRange> {
        self.ranges.get(&param).copied()
    }

    /// Clamp `value` into the parameter's range and write it
    ///
    /// Noise is sign-folded before clamping, as the controller setter does.
    /// Returns the value actually applied.
    pub fn apply<N: NoiseSource>(
        &self,
        controller: &mut Controller<N>,
        plant: &mut Plant,
        param: Param,
        value: f64,
    ) -> PidLoopResult<f64> {
        let requested = match param {
            Param::Noise => value.abs(),
            _ => value,
        };
        let applied = match self.range(param) {
            Some(range) if !requested.is_nan() && !range.contains(requested) => {
                let clamped = range.clamp(requested);
                debug!(%param, requested, applied = clamped, "tuning value clamped to range");
                clamped
            }
            _ => requested,
        };

        param.write(controller, plant, applied)?;
        debug!(
            %param,
            value = applied,
            owner = if param.is_plant() { "plant" } else { "controller" },
            "parameter tuned"
        );
        Ok(applied)
    }
}

/// Parameter change applied before a given tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledChange {
    pub tick: u64,
    pub param: Param,
    pub value: f64,
}
