//! Second-order damped plant
//!
//! A one-dimensional mass under an external driving force, a constant offset
//! force (gravity) and velocity-proportional damping. Each `change` call is one
//! semi-implicit Euler step with a unit time step:
//!
//! ```text
//! acceleration = force / mass - gravity - damping * velocity
//! velocity    += acceleration
//! value       += velocity
//! ```
//!
//! Callers scale the force by their own time constant; the simulation loop
//! passes the controller output multiplied by the sampling interval.

use tracing::trace;

use crate::error::{require_finite, require_positive, PidLoopResult};
use crate::messages::{PlantConfig, PlantState};

/// Damped second-order plant
#[derive(Debug, Clone)]
pub struct Plant {
    mass: f64,
    damping: f64,
    gravity: f64,

    value: f64,
    velocity: f64,
    acceleration: f64,
}

impl Plant {
    /// Create a plant from its parameters and initial conditions
    ///
    /// Fails if the mass is not strictly positive or any field is not finite.
    pub fn new(config: PlantConfig) -> PidLoopResult<Self> {
        config.validate()?;

        Ok(Self {
            mass: config.mass,
            damping: config.damping,
            gravity: config.gravity,
            value: config.value,
            velocity: config.velocity,
            acceleration: config.acceleration,
        })
    }

    /// Advance the plant by one step under `force`
    pub fn change(&mut self, force: f64) {
        // Uses the velocity from before this step
        self.acceleration = (force / self.mass) - self.gravity - (self.damping * self.velocity);
        self.velocity += self.acceleration;
        self.value += self.velocity;

        trace!(
            force,
            value = self.value,
            velocity = self.velocity,
            acceleration = self.acceleration,
            "plant step"
        );
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn acceleration(&self) -> f64 {
        self.acceleration
    }

    /// Current kinematic state
    pub fn state(&self) -> PlantState {
        PlantState {
            value: self.value,
            velocity: self.velocity,
            acceleration: self.acceleration,
        }
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Set the mass; zero, negative and non-finite masses are rejected
    pub fn set_mass(&mut self, mass: f64) -> PidLoopResult<()> {
        self.mass = require_positive("mass", mass)?;
        Ok(())
    }

    pub fn damping(&self) -> f64 {
        self.damping
    }

    pub fn set_damping(&mut self, damping: f64) -> PidLoopResult<()> {
        self.damping = require_finite("damping", damping)?;
        Ok(())
    }

    pub fn gravity(&self) -> f64 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: f64) -> PidLoopResult<()> {
        self.gravity = require_finite("gravity", gravity)?;
        Ok(())
    }

    /// Snapshot of parameters and current state as a config
    pub fn config(&self) -> PlantConfig {
        PlantConfig {
            mass: self.mass,
            damping: self.damping,
            gravity: self.gravity,
            value: self.value,
            velocity: self.velocity,
            acceleration: self.acceleration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_free_fall() {
        let g = 0.25;
        let mut plant = Plant::new(PlantConfig::new(3.0, 0.0, g)).unwrap();

        plant.change(0.0);
        assert_relative_eq!(plant.acceleration(), -g);
        assert_relative_eq!(plant.velocity(), -g);
        assert_relative_eq!(plant.value(), -g);

        plant.change(0.0);
        assert_relative_eq!(plant.acceleration(), -g);
        assert_relative_eq!(plant.velocity(), -2.0 * g);
        assert_relative_eq!(plant.value(), -3.0 * g);
    }

    #[test]
    fn test_damping_decay() {
        let d = 0.3;
        let v0 = 2.0;
        let mut plant = Plant::new(PlantConfig::new(1.0, d, 0.0).with_initial(0.0, v0)).unwrap();

        plant.change(0.0);

        assert_relative_eq!(plant.acceleration(), -d * v0);
        assert_relative_eq!(plant.velocity(), v0 - d * v0);
        assert_relative_eq!(plant.value(), v0 - d * v0);
    }

    #[test]
    fn test_force_over_mass() {
        let mut plant = Plant::new(PlantConfig::new(10.0, 0.0, 0.0)).unwrap();

        plant.change(20.0);
        assert_relative_eq!(plant.acceleration(), 2.0);
        assert_relative_eq!(plant.velocity(), 2.0);
        assert_relative_eq!(plant.value(), 2.0);

        // Coasting: no force, no damping keeps the velocity
        plant.change(0.0);
        assert_relative_eq!(plant.acceleration(), 0.0);
        assert_relative_eq!(plant.velocity(), 2.0);
        assert_relative_eq!(plant.value(), 4.0);
    }

    #[test]
    fn test_parameter_change_keeps_state() {
        let mut plant = Plant::new(PlantConfig::new(1.0, 0.1, 0.0)).unwrap();
        plant.change(5.0);
        let before = plant.state();

        plant.set_mass(50.0).unwrap();
        plant.set_damping(0.5).unwrap();
        plant.set_gravity(0.2).unwrap();

        assert_eq!(plant.state(), before);
        assert_eq!(plant.mass(), 50.0);
        assert_eq!(plant.damping(), 0.5);
        assert_eq!(plant.gravity(), 0.2);
    }

    #[test]
    fn test_zero_mass_rejected() {
        assert!(Plant::new(PlantConfig::new(0.0, 0.0, 0.0)).is_err());

        let mut plant = Plant::new(PlantConfig::default()).unwrap();
        assert!(plant.set_mass(0.0).is_err());
        assert!(plant.set_mass(-2.0).is_err());
        assert!(plant.set_mass(f64::NAN).is_err());
        assert_eq!(plant.mass(), 1.0);
    }

    #[test]
    fn test_initial_conditions() {
        let config = PlantConfig {
            value: 4.0,
            velocity: -1.0,
            acceleration: 0.5,
            ..PlantConfig::new(2.0, 0.0, 0.0)
        };
        let plant = Plant::new(config).unwrap();

        assert_eq!(
            plant.state(),
            PlantState {
                value: 4.0,
                velocity: -1.0,
                acceleration: 0.5
            }
        );
        assert_eq!(plant.config(), config);
    }

    #[test]
    fn test_pathological_force_propagates() {
        let mut plant = Plant::new(PlantConfig::default()).unwrap();
        plant.change(f64::NAN);
        assert!(plant.value().is_nan());
    }
}
