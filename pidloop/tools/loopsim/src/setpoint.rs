//! Setpoint profiles driving the simulation

use serde::{Deserialize, Serialize};

/// Setpoint signal as a function of the tick index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SetpointProfile {
    /// Fixed target
    Constant { value: f64 },
    /// Step signal alternating between `low` and `high`
    ///
    /// Starts at `low` and toggles at every tick `i > 0` with
    /// `i % half_period == 0`.
    Square {
        low: f64,
        high: f64,
        half_period: u64,
    },
}

impl Default for SetpointProfile {
    fn default() -> Self {
        // 125 ticks at 20ms between 0 and 10
        SetpointProfile::Square {
            low: 0.0,
            high: 10.0,
            half_period: 125,
        }
    }
}

impl SetpointProfile {
    /// Setpoint in effect at `tick`
    pub fn at(&self, tick: u64) -> f64 {
        match *self {
            SetpointProfile::Constant { value } => value,
            SetpointProfile::Square {
                low,
                high,
                half_period,
            } => {
                if half_period == 0 {
                    return low;
                }
                if (tick / half_period) % 2 == 0 {
                    low
                } else {
                    high
                }
            }
        }
    }

    /// Whether the setpoint changes value at `tick`
    pub fn is_edge(&self, tick: u64) -> bool {
        match *self {
            SetpointProfile::Constant { .. } => false,
            SetpointProfile::Square { half_period, .. } => {
                half_period > 0 && tick > 0 && tick % half_period == 0
            }
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match *self {
            SetpointProfile::Constant { value } if !value.is_finite() => {
                Err(format!("constant setpoint must be finite, got {value}"))
            }
            SetpointProfile::Square {
                low,
                high,
                half_period,
            } => {
                if !low.is_finite() || !high.is_finite() {
                    return Err(format!("square setpoint levels must be finite, got {low}/{high}"));
                }
                if half_period == 0 {
                    return Err("square setpoint half_period must be >= 1".to_string());
                }
                Ok(())
            }
            SetpointProfile::Constant { .. } => Ok(()),
        }
    }
}
