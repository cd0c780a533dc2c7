//! Recording and export of simulation runs
//!
//! A recording holds every tick sample plus metadata, and can be written as
//! JSON (full fidelity) or CSV (one row per tick, for plotting elsewhere).

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::simulation::TickSample;

/// Metadata about a recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    /// Recording name
    pub name: String,

    /// Simulated seconds covered, up to the end of the last tick
    pub duration: f64,

    /// Total number of ticks
    pub tick_count: u64,

    /// Recording start time (ISO 8601)
    pub recorded_at: String,

    /// Configuration the run started from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<SimConfig>,
}

/// Complete recording session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    pub metadata: RecordingMetadata,
    pub samples: Vec<TickSample>,
}

impl Recording {
    /// Create a new empty recording
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            metadata: RecordingMetadata {
                name: name.into(),
                duration: 0.0,
                tick_count: 0,
                recorded_at: chrono::Utc::now().to_rfc3339(),
                config: None,
            },
            samples: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: SimConfig) -> Self {
        self.metadata.config = Some(config);
        self
    }

    /// Add a sample to the recording
    pub fn push(&mut self, sample: TickSample) {
        self.metadata.tick_count = sample.tick + 1;
        self.metadata.duration = sample.time + sample.dt;
        self.samples.push(sample);
    }

    pub fn extend(&mut self, samples: impl IntoIterator<Item = TickSample>) {
        for sample in samples {
            self.push(sample);
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Save recording to a JSON file
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize recording to JSON")?;

        std::fs::write(path, json).with_context(|| format!("Failed to write recording to {:?}", path))?;

        Ok(())
    }

    /// Load recording from a JSON file
    pub fn load_json(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read recording from {:?}", path))?;

        let recording: Recording =
            serde_json::from_str(&json).context("Failed to deserialize recording from JSON")?;

        Ok(recording)
    }

    /// Export samples to CSV, one row per tick
    pub fn export_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file at {:?}", path))?;

        for sample in &self.samples {
            writer
                .serialize(sample)
                .context("Failed to write CSV row")?;
        }
        writer.flush().context("Failed to flush CSV file")?;

        Ok(())
    }

    /// Read samples back from a CSV export
    pub fn read_csv(path: &Path) -> Result<Vec<TickSample>> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open CSV file at {:?}", path))?;

        let mut samples = Vec::new();
        for row in reader.deserialize() {
            samples.push(row.context("Failed to parse CSV row")?);
        }
        Ok(samples)
    }
}

/// Serde form of `f64` that keeps NaN and infinities through JSON
///
/// Finite values stay plain numbers; the rest become `"NaN"`, `"inf"` or
/// `"-inf"`. Diverged runs would otherwise be written as `null`.
pub(crate) mod lossless_f64 {
    use std::fmt;

    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if *value > 0.0 {
            serializer.serialize_str("inf")
        } else {
            serializer.serialize_str("-inf")
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        deserializer.deserialize_any(LosslessF64)
    }

    struct LosslessF64;

    impl<'de> Visitor<'de> for LosslessF64 {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or one of \"NaN\", \"inf\", \"-inf\"")
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            match v {
                "NaN" | "nan" => Ok(f64::NAN),
                "inf" | "+inf" | "infinity" => Ok(f64::INFINITY),
                "-inf" | "-infinity" => Ok(f64::NEG_INFINITY),
                other => other
                    .parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(other), &self)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tick: u64) -> TickSample {
        TickSample {
            tick,
            time: tick as f64 * 0.02,
            dt: 0.02,
            setpoint: 10.0,
            value: tick as f64,
            velocity: 1.0,
            acceleration: 0.0,
            control: 50.0,
            error: 10.0 - tick as f64,
            integral: 0.0,
            saturated: tick % 2 == 0,
        }
    }

    #[test]
    fn test_push_updates_metadata() {
        let mut recording = Recording::new("test");
        assert!(recording.is_empty());

        recording.extend((0..5).map(sample));

        assert_eq!(recording.len(), 5);
        assert_eq!(recording.metadata.tick_count, 5);
        // End of the last tick, not its start
        assert_eq!(recording.metadata.duration, 4.0 * 0.02 + 0.02);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");

        let mut recording = Recording::new("json").with_config(SimConfig::default());
        recording.extend((0..3).map(sample));
        recording.save_json(&path).unwrap();

        let loaded = Recording::load_json(&path).unwrap();
        assert_eq!(loaded.metadata.name, "json");
        assert_eq!(loaded.metadata.tick_count, 3);
        assert_eq!(loaded.samples.len(), 3);
        assert_eq!(loaded.samples[2].tick, 2);
        assert!(loaded.samples[2].saturated);
        let config = loaded.metadata.config.unwrap();
        assert_eq!(config.controller.proportional_gain, 50.0);
        assert_eq!(config.run.window, 50);
    }

    #[test]
    fn test_csv_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.csv");

        let mut recording = Recording::new("csv");
        recording.extend((0..4).map(sample));
        recording.export_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert!(header.starts_with("tick,time,dt,setpoint,value"));
        assert_eq!(text.lines().count(), 5);

        let rows = Recording::read_csv(&path).unwrap();
        assert_eq!(rows, recording.samples);
    }

    #[test]
    fn test_non_finite_values_survive_export() {
        let dir = tempfile::tempdir().unwrap();
        let json_path = dir.path().join("diverged.json");
        let csv_path = dir.path().join("diverged.csv");

        let mut recording = Recording::new("diverged");
        let mut s = sample(0);
        s.value = f64::NAN;
        s.velocity = f64::INFINITY;
        s.control = f64::NEG_INFINITY;
        recording.push(s);
        recording.push(sample(1));

        recording.save_json(&json_path).unwrap();
        let text = std::fs::read_to_string(&json_path).unwrap();
        assert!(!text.contains("null"));

        let loaded = Recording::load_json(&json_path).unwrap();
        assert!(loaded.samples[0].value.is_nan());
        assert_eq!(loaded.samples[0].velocity, f64::INFINITY);
        assert_eq!(loaded.samples[0].control, f64::NEG_INFINITY);
        assert_eq!(loaded.samples[1].tick, 1);
        assert_eq!(loaded.samples[1].value, 1.0);

        recording.export_csv(&csv_path).unwrap();
        let rows = Recording::read_csv(&csv_path).unwrap();
        assert!(rows[0].value.is_nan());
        assert_eq!(rows[0].velocity, f64::INFINITY);
        assert_eq!(rows[0].control, f64::NEG_INFINITY);
        assert_eq!(rows[1], sample(1));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(Recording::load_json(Path::new("/nonexistent/run.json")).is_err());
    }
}
