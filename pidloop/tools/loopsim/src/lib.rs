//! # loopsim - Closed-loop PID simulator library
//!
//! This crate provides both a binary executable and a library interface
//! for driving a [`pidloop::Controller`] against a [`pidloop::Plant`].
//!
//! ## Binary Usage
//! ```bash
//! loopsim --config loop.toml --ticks 2000 --csv run.csv
//! ```
//!
//! ## Library Usage
//! ```rust
//! use loopsim::{SimConfig, Simulation, StepMetrics};
//!
//! let config = SimConfig::default();
//! let mut sim = Simulation::from_config(&config).unwrap();
//! let samples = sim.run(500).unwrap();
//!
//! let segments = StepMetrics::analyze_segments(&samples, 0.0, 0.02);
//! assert_eq!(segments.len(), 4);
//! ```

pub mod config;
pub mod metrics;
pub mod recorder;
pub mod setpoint;
pub mod simulation;
pub mod tuning;

pub use config::{RunConfig, SimConfig};
pub use metrics::{SegmentTracker, StepMetrics};
pub use recorder::{Recording, RecordingMetadata};
pub use setpoint::SetpointProfile;
pub use simulation::{DisplayWindow, Simulation, TickSample};
pub use tuning::{Param, ParamRange, ScheduledChange, TuningSurface};
