//! Configuration and diagnostic records exchanged with the driving loop

pub mod control;

pub use control::{ControlDiagnostics, PidConfig, PlantConfig, PlantState};
