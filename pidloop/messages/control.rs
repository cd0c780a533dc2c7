use serde::{Deserialize, Serialize};

use crate::error::{require_finite, require_non_negative, require_positive, PidLoopResult};

/// PID controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    /// Multiplier applied to the summed PID terms
    pub power: f64,
    /// Proportional gain
    pub proportional_gain: f64,
    /// Integral gain
    pub integral_gain: f64,
    /// Derivative gain
    pub differential_gain: f64,
    /// Output clamp magnitude (0 disables saturation)
    pub saturation: f64,
    /// Clamp magnitude of the error accumulator
    pub integral_stop: f64,
    /// Standard deviation of the Gaussian noise added to each error
    pub noise_std_dev: f64,
    /// Seconds between ticks
    pub sampling_interval: f64,
    /// Seed for the noise source (OS entropy when unset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            power: 1.0,
            proportional_gain: 1.0,
            integral_gain: 0.0,
            differential_gain: 0.0,
            saturation: 0.0,
            integral_stop: 10.0,
            noise_std_dev: 0.0,
            sampling_interval: 1.0,
            seed: None,
        }
    }
}

impl PidConfig {
    /// Create a configuration with the given gains and defaults elsewhere
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            proportional_gain: kp,
            integral_gain: ki,
            differential_gain: kd,
            ..Default::default()
        }
    }

    /// Create a P-only controller
    pub fn proportional(kp: f64) -> Self {
        Self::new(kp, 0.0, 0.0)
    }

    /// Create a PI controller
    pub fn pi(kp: f64, ki: f64) -> Self {
        Self::new(kp, ki, 0.0)
    }

    /// Create a PD controller
    pub fn pd(kp: f64, kd: f64) -> Self {
        Self::new(kp, 0.0, kd)
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_saturation(mut self, saturation: f64) -> Self {
        self.saturation = saturation;
        self
    }

    pub fn with_integral_stop(mut self, integral_stop: f64) -> Self {
        self.integral_stop = integral_stop;
        self
    }

    /// Set the noise standard deviation (sign-folded like the controller setter)
    pub fn with_noise(mut self, std_dev: f64) -> Self {
        self.noise_std_dev = std_dev.abs();
        self
    }

    pub fn with_sampling_interval(mut self, dt: f64) -> Self {
        self.sampling_interval = dt;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every field against the controller's setter rules
    pub fn validate(&self) -> PidLoopResult<()> {
        require_finite("power", self.power)?;
        require_finite("proportional_gain", self.proportional_gain)?;
        require_finite("integral_gain", self.integral_gain)?;
        require_finite("differential_gain", self.differential_gain)?;
        require_non_negative("saturation", self.saturation)?;
        require_non_negative("integral_stop", self.integral_stop)?;
        require_finite("noise_std_dev", self.noise_std_dev)?;
        require_positive("sampling_interval", self.sampling_interval)?;
        Ok(())
    }
}

/// Plant configuration: physical parameters and initial conditions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlantConfig {
    /// Inertia of the process value
    pub mass: f64,
    /// Dissipative coefficient working against velocity
    pub damping: f64,
    /// Constant offset force
    pub gravity: f64,
    /// Initial position
    pub value: f64,
    /// Initial velocity
    pub velocity: f64,
    /// Initial acceleration
    pub acceleration: f64,
}

impl Default for PlantConfig {
    fn default() -> Self {
        Self {
            mass: 1.0,
            damping: 0.0,
            gravity: 0.0,
            value: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
        }
    }
}

impl PlantConfig {
    /// Plant at rest at the origin
    pub fn new(mass: f64, damping: f64, gravity: f64) -> Self {
        Self {
            mass,
            damping,
            gravity,
            ..Default::default()
        }
    }

    /// Set initial position and velocity
    pub fn with_initial(mut self, value: f64, velocity: f64) -> Self {
        self.value = value;
        self.velocity = velocity;
        self
    }

    pub fn validate(&self) -> PidLoopResult<()> {
        require_positive("mass", self.mass)?;
        require_finite("damping", self.damping)?;
        require_finite("gravity", self.gravity)?;
        require_finite("value", self.value)?;
        require_finite("velocity", self.velocity)?;
        require_finite("acceleration", self.acceleration)?;
        Ok(())
    }
}

/// Intermediate values of one `Controller::control` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlDiagnostics {
    /// Measured error including noise
    pub error: f64,
    /// Error derivative over the sampling interval
    pub derivative: f64,
    /// Error accumulator after the windup clamp
    pub integral: f64,
    /// Output before saturation
    pub raw_output: f64,
    /// Output returned to the caller
    pub output: f64,
    /// True when the saturation clamp changed the output
    pub saturated: bool,
}

/// Kinematic state of the plant
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlantState {
    pub value: f64,
    pub velocity: f64,
    pub acceleration: f64,
}
