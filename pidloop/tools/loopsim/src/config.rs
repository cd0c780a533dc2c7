//! Simulation configuration loaded from TOML
//!
//! ```toml
//! [controller]
//! proportional_gain = 50.0
//! saturation = 1500.0
//!
//! [plant]
//! mass = 10.0
//!
//! [setpoint]
//! kind = "square"
//! low = 0.0
//! high = 10.0
//! half_period = 125
//!
//! [run]
//! ticks = 1000
//!
//! [[schedule]]
//! tick = 300
//! param = "integral_gain"
//! value = 5.0
//! ```
//!
//! Every section is optional; missing fields fall back to the defaults below.

use std::path::Path;

use anyhow::{bail, Context, Result};
use pidloop::{PidConfig, PlantConfig};
use serde::{Deserialize, Serialize};

use crate::setpoint::SetpointProfile;
use crate::tuning::ScheduledChange;

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub controller: PidConfig,
    pub plant: PlantConfig,
    pub setpoint: SetpointProfile,
    pub run: RunConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub schedule: Vec<ScheduledChange>,
}

/// Loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Number of ticks to simulate
    pub ticks: u64,
    /// Samples kept in the rolling display window
    pub window: usize,
    /// Log a progress line every N ticks (0 disables)
    pub report_every: u64,
    /// Sleep one sampling interval between ticks
    pub realtime: bool,
    /// Clamp scheduled changes into the slider ranges
    pub bounded_tuning: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            ticks: 1000,
            window: 50,
            report_every: 125,
            realtime: false,
            bounded_tuning: true,
        }
    }
}

impl Default for SimConfig {
    /// Values of the interactive demo: a 10 kg damped plant under a stiff
    /// P controller following a 0/10 step
    fn default() -> Self {
        Self {
            controller: PidConfig::proportional(50.0)
                .with_power(1.0)
                .with_saturation(1500.0)
                .with_integral_stop(40.0)
                .with_noise(0.0)
                .with_sampling_interval(0.02),
            plant: PlantConfig::new(10.0, 0.3, 0.0),
            setpoint: SetpointProfile::default(),
            run: RunConfig::default(),
            schedule: Vec::new(),
        }
    }
}

impl SimConfig {
    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(content).context("Failed to parse config TOML")?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::from_toml_str(&content).with_context(|| format!("Invalid config in {:?}", path))
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    pub fn validate(&self) -> Result<()> {
        self.controller
            .validate()
            .context("Invalid [controller] section")?;
        self.plant.validate().context("Invalid [plant] section")?;
        if let Err(msg) = self.setpoint.validate() {
            bail!("Invalid [setpoint] section: {msg}");
        }
        if self.run.window == 0 {
            bail!("run.window must be >= 1");
        }
        for change in &self.schedule {
            if !change.value.is_finite() {
                bail!(
                    "scheduled change of {} at tick {} must be finite, got {}",
                    change.param,
                    change.tick,
                    change.value
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuning::Param;

    #[test]
    fn test_defaults_match_demo() {
        let config = SimConfig::default();

        assert_eq!(config.controller.proportional_gain, 50.0);
        assert_eq!(config.controller.integral_gain, 0.0);
        assert_eq!(config.controller.differential_gain, 0.0);
        assert_eq!(config.controller.saturation, 1500.0);
        assert_eq!(config.controller.integral_stop, 40.0);
        assert_eq!(config.controller.sampling_interval, 0.02);
        assert_eq!(config.plant.mass, 10.0);
        assert_eq!(config.plant.damping, 0.3);
        assert_eq!(config.run.window, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_document_is_default() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config = SimConfig::from_toml_str(
            r#"
            [controller]
            integral_gain = 3.0
            seed = 11

            [plant]
            gravity = 0.2

            [setpoint]
            kind = "constant"
            value = 4.0

            [[schedule]]
            tick = 10
            param = "mass"
            value = 20.0
            "#,
        )
        .unwrap();

        assert_eq!(config.controller.integral_gain, 3.0);
        assert_eq!(config.controller.seed, Some(11));
        // Section-level defaults come from PidConfig/PlantConfig, not the demo
        assert_eq!(config.controller.proportional_gain, 1.0);
        assert_eq!(config.plant.gravity, 0.2);
        assert_eq!(config.plant.mass, 1.0);
        assert_eq!(config.setpoint, SetpointProfile::Constant { value: 4.0 });
        assert_eq!(config.schedule.len(), 1);
        assert_eq!(config.schedule[0].param, Param::Mass);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = SimConfig::default();
        config.plant.mass = 0.0;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.run.window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SimConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(SimConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimConfig::load_from_file(Path::new("/nonexistent/loopsim.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to read config"));
    }
}
