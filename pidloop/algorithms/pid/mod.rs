//! PID (Proportional-Integral-Derivative) Controller
//!
//! Computes a bounded control signal from the error between a measured
//! process value and a setpoint.
//!
//! # Features
//!
//! - Proportional, integral, and derivative terms scaled by an overall power
//! - Integral windup stop (accumulator clamp)
//! - Output saturation (0 disables it)
//! - Gaussian measurement noise from an injectable, seedable source
//! - Fixed sampling interval
//!
//! The windup clamp is applied after the output is computed: the output of a
//! tick sees that tick's unclamped accumulator, the next tick sees the clamped
//! one.
//!
//! # Example
//!
//! ```rust
//! use pidloop::{Controller, PidConfig};
//!
//! let mut pid = Controller::new(PidConfig::proportional(2.0).with_saturation(10.0)).unwrap();
//!
//! assert_eq!(pid.control(80.0, 82.0), 4.0);
//! assert_eq!(pid.control(0.0, 100.0), 10.0); // saturated
//! ```

use tracing::trace;

use crate::error::{require_finite, require_non_negative, require_positive, PidLoopResult};
use crate::messages::{ControlDiagnostics, PidConfig};
use crate::noise::{GaussianNoise, NoiseSource};

/// PID Controller
pub struct Controller<N: NoiseSource = GaussianNoise> {
    power: f64,
    proportional_gain: f64,
    integral_gain: f64,
    differential_gain: f64,
    saturation: f64,
    integral_stop: f64,
    noise_std_dev: f64,
    sampling_interval: f64,

    previous_error: f64,
    error_accumulator: f64,

    noise: N,
    last: ControlDiagnostics,
}

impl Controller<GaussianNoise> {
    /// Create a controller whose noise source is seeded from `config.seed`,
    /// or from OS entropy when no seed is set
    pub fn new(config: PidConfig) -> PidLoopResult<Self> {
        let noise = match config.seed {
            Some(seed) => GaussianNoise::seeded(seed),
            None => GaussianNoise::from_entropy(),
        };
        Self::with_noise_source(config, noise)
    }
}

impl<N: NoiseSource> Controller<N> {
    /// Create a controller with an explicit noise source
    pub fn with_noise_source(config: PidConfig, noise: N) -> PidLoopResult<Self> {
        config.validate()?;

        Ok(Self {
            power: config.power,
            proportional_gain: config.proportional_gain,
            integral_gain: config.integral_gain,
            differential_gain: config.differential_gain,
            saturation: config.saturation,
            integral_stop: config.integral_stop,
            noise_std_dev: config.noise_std_dev.abs(),
            sampling_interval: config.sampling_interval,
            previous_error: 0.0,
            error_accumulator: 0.0,
            noise,
            last: ControlDiagnostics::default(),
        })
    }

    /// Compute the control signal for one tick
    ///
    /// # Arguments
    /// * `process_value` - Current measured value
    /// * `setpoint` - Desired value
    ///
    /// # Returns
    /// Control output, clamped to `[-saturation, saturation]` when saturation is set
    pub fn control(&mut self, process_value: f64, setpoint: f64) -> f64 {
        let dt = self.sampling_interval;

        let error = (setpoint - process_value) + self.noise.sample(self.noise_std_dev);
        let derivative = (error - self.previous_error) / dt;
        self.error_accumulator += error * dt;
        self.previous_error = error;

        let raw_output = (error * self.proportional_gain
            + self.error_accumulator * self.integral_gain
            + derivative * self.differential_gain)
            * self.power;

        // Windup stop takes effect from the next tick
        self.error_accumulator = self
            .error_accumulator
            .clamp(-self.integral_stop, self.integral_stop);

        let output = if self.saturation != 0.0 {
            raw_output.clamp(-self.saturation, self.saturation)
        } else {
            raw_output
        };

        self.last = ControlDiagnostics {
            error,
            derivative,
            integral: self.error_accumulator,
            raw_output,
            output,
            saturated: self.saturation != 0.0 && raw_output.abs() > self.saturation,
        };

        trace!(
            error,
            derivative,
            integral = self.error_accumulator,
            raw_output,
            output,
            "pid tick"
        );

        output
    }

    /// Compute the control signal and return the full diagnostics record
    pub fn control_with_diagnostics(
        &mut self,
        process_value: f64,
        setpoint: f64,
    ) -> ControlDiagnostics {
        self.control(process_value, setpoint);
        self.last
    }

    /// Diagnostics of the most recent `control` call
    pub fn last_diagnostics(&self) -> ControlDiagnostics {
        self.last
    }

    /// Clear the previous error and the accumulator
    ///
    /// Never called by the controller itself; parameter changes keep state.
    pub fn reset(&mut self) {
        self.previous_error = 0.0;
        self.error_accumulator = 0.0;
        self.last = ControlDiagnostics::default();
    }

    /// Snapshot of the tunable parameters (without the seed)
    pub fn config(&self) -> PidConfig {
        PidConfig {
            power: self.power,
            proportional_gain: self.proportional_gain,
            integral_gain: self.integral_gain,
            differential_gain: self.differential_gain,
            saturation: self.saturation,
            integral_stop: self.integral_stop,
            noise_std_dev: self.noise_std_dev,
            sampling_interval: self.sampling_interval,
            seed: None,
        }
    }

    pub fn power(&self) -> f64 {
        self.power
    }

    pub fn set_power(&mut self, power: f64) -> PidLoopResult<()> {
        self.power = require_finite("power", power)?;
        Ok(())
    }

    pub fn proportional_gain(&self) -> f64 {
        self.proportional_gain
    }

    pub fn set_proportional_gain(&mut self, gain: f64) -> PidLoopResult<()> {
        self.proportional_gain = require_finite("proportional_gain", gain)?;
        Ok(())
    }

    pub fn integral_gain(&self) -> f64 {
        self.integral_gain
    }

    pub fn set_integral_gain(&mut self, gain: f64) -> PidLoopResult<()> {
        self.integral_gain = require_finite("integral_gain", gain)?;
        Ok(())
    }

    pub fn differential_gain(&self) -> f64 {
        self.differential_gain
    }

    pub fn set_differential_gain(&mut self, gain: f64) -> PidLoopResult<()> {
        self.differential_gain = require_finite("differential_gain", gain)?;
        Ok(())
    }

    /// Set all three gains at once
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64) -> PidLoopResult<()> {
        require_finite("proportional_gain", kp)?;
        require_finite("integral_gain", ki)?;
        require_finite("differential_gain", kd)?;
        self.proportional_gain = kp;
        self.integral_gain = ki;
        self.differential_gain = kd;
        Ok(())
    }

    /// Get current gains
    pub fn gains(&self) -> (f64, f64, f64) {
        (
            self.proportional_gain,
            self.integral_gain,
            self.differential_gain,
        )
    }

    pub fn saturation(&self) -> f64 {
        self.saturation
    }

    /// Set the output clamp magnitude; 0 disables saturation
    pub fn set_saturation(&mut self, saturation: f64) -> PidLoopResult<()> {
        self.saturation = require_non_negative("saturation", saturation)?;
        Ok(())
    }

    pub fn integral_stop(&self) -> f64 {
        self.integral_stop
    }

    /// Set the accumulator clamp magnitude
    ///
    /// The stored accumulator is not touched here; the new bound applies at
    /// the end of the next `control` call.
    pub fn set_integral_stop(&mut self, integral_stop: f64) -> PidLoopResult<()> {
        self.integral_stop = require_non_negative("integral_stop", integral_stop)?;
        Ok(())
    }

    pub fn noise_std_dev(&self) -> f64 {
        self.noise_std_dev
    }

    /// Set the noise standard deviation; negative values are sign-folded
    pub fn set_noise_std_dev(&mut self, std_dev: f64) -> PidLoopResult<()> {
        self.noise_std_dev = require_finite("noise_std_dev", std_dev)?.abs();
        Ok(())
    }

    pub fn sampling_interval(&self) -> f64 {
        self.sampling_interval
    }

    pub fn set_sampling_interval(&mut self, dt: f64) -> PidLoopResult<()> {
        self.sampling_interval = require_positive("sampling_interval", dt)?;
        Ok(())
    }

    /// Error stored by the last call, baseline of the next derivative
    pub fn previous_error(&self) -> f64 {
        self.previous_error
    }

    /// Running integral of the error (always within the windup stop)
    pub fn error_accumulator(&self) -> f64 {
        self.error_accumulator
    }
}
