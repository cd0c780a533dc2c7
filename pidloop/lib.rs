//! # pidloop
//!
//! Numerical core of a closed-loop control simulation: a PID controller
//! driving a second-order damped plant.
//!
//! ## Structure
//!
//! ```text
//! pidloop/
//! ── algorithms/     # Controller (pid) and plant integrator
//! ── messages/       # Configuration and diagnostic records
//! ── noise           # Injectable measurement noise
//! ── tools/          # Driving loop and CLI (loopsim)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use pidloop::{Controller, PidConfig, Plant, PlantConfig};
//!
//! let config = PidConfig::proportional(50.0)
//!     .with_saturation(1500.0)
//!     .with_integral_stop(40.0)
//!     .with_sampling_interval(0.02);
//! let mut controller = Controller::new(config).unwrap();
//! let mut plant = Plant::new(PlantConfig::new(10.0, 0.3, 0.0)).unwrap();
//!
//! for _ in 0..100 {
//!     let signal = controller.control(plant.value(), 10.0);
//!     plant.change(signal * controller.sampling_interval());
//! }
//! assert!(plant.value().is_finite());
//! ```

pub mod algorithms;
pub mod error;
pub mod messages;
pub mod noise;

pub use algorithms::pid::Controller;
pub use algorithms::plant::Plant;
pub use error::{PidLoopError, PidLoopResult};
pub use messages::*;
pub use noise::{GaussianNoise, NoiseSource};
