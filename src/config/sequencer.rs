// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;

use super::error::ConfigError;
use crate::playback::VelocityLevels;
use crate::transport::TempoRange;

const DEFAULT_BACKEND: &str = "mock";
const DEFAULT_TEMPO: f64 = 132.0;
const DEFAULT_LOOKAHEAD: Duration = Duration::from_millis(100);
const DEFAULT_ACCENT_VELOCITY: f32 = 1.3;
const DEFAULT_NORMAL_VELOCITY: f32 = 0.6;

/// The supported tempo range.
#[derive(Deserialize, Clone, Debug)]
struct TempoRangeConfig {
    min: f64,
    max: f64,
}

/// The two trigger velocities.
#[derive(Deserialize, Clone, Debug, Default)]
struct VelocityConfig {
    /// Velocity of steps with the accent set.
    accent: Option<f32>,
    /// Velocity of all other steps.
    normal: Option<f32>,
}

/// The configuration for the sequencer.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SequencerConfig {
    /// The audio backend to trigger samples on.
    backend: Option<String>,

    /// The tempo at startup in bpm.
    tempo: Option<f64>,

    /// The supported tempo range.
    tempo_range: Option<TempoRangeConfig>,

    /// How far ahead of time ticks are scheduled, e.g. "100ms".
    lookahead: Option<String>,

    /// Trigger velocities.
    #[serde(default)]
    velocity: VelocityConfig,

    /// The master volume at startup in dB.
    master_volume: Option<f32>,

    /// Path to the instrument catalog. Relative paths are resolved against the config file.
    catalog: Option<String>,

    /// Directory holding the sample assets. Relative paths are resolved against the config file.
    samples: Option<String>,

    /// The directory relative paths are resolved against.
    #[serde(skip)]
    base_path: PathBuf,
}

impl SequencerConfig {
    /// Parse a sequencer configuration from a YAML file.
    pub fn deserialize(path: &Path) -> Result<SequencerConfig, ConfigError> {
        let mut config = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<SequencerConfig>()?;
        config.base_path = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Ok(config)
    }

    /// Parse a sequencer configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<SequencerConfig, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<SequencerConfig>()?)
    }

    /// The name of the audio backend.
    pub fn backend(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_BACKEND)
    }

    /// The tempo at startup.
    pub fn tempo(&self) -> f64 {
        self.tempo.unwrap_or(DEFAULT_TEMPO)
    }

    /// The supported tempo range.
    pub fn tempo_range(&self) -> Result<TempoRange, ConfigError> {
        match &self.tempo_range {
            Some(range) => TempoRange::new(range.min, range.max).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "tempo range {}..={} is empty or not positive",
                    range.min, range.max
                ))
            }),
            None => Ok(TempoRange::default()),
        }
    }

    /// How far ahead of time ticks are scheduled.
    pub fn lookahead(&self) -> Result<Duration, ConfigError> {
        match &self.lookahead {
            Some(lookahead) => Ok(DurationString::from_string(lookahead.clone())
                .map_err(|e| {
                    ConfigError::Invalid(format!("invalid lookahead {}: {}", lookahead, e))
                })?
                .into()),
            None => Ok(DEFAULT_LOOKAHEAD),
        }
    }

    /// The trigger velocities.
    pub fn velocity(&self) -> VelocityLevels {
        VelocityLevels::new(
            self.velocity.accent.unwrap_or(DEFAULT_ACCENT_VELOCITY),
            self.velocity.normal.unwrap_or(DEFAULT_NORMAL_VELOCITY),
        )
    }

    /// The master volume at startup.
    pub fn master_volume(&self) -> f32 {
        self.master_volume.unwrap_or(0.0)
    }

    /// The instrument catalog path, if one is configured.
    pub fn catalog(&self) -> Option<PathBuf> {
        self.catalog.as_ref().map(|path| self.base_path.join(path))
    }

    /// The sample asset directory, if one is configured.
    pub fn samples(&self) -> Option<PathBuf> {
        self.samples.as_ref().map(|path| self.base_path.join(path))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = SequencerConfig::default();
        assert_eq!("mock", config.backend());
        assert_eq!(132.0, config.tempo());
        let range = config.tempo_range().unwrap();
        assert_eq!((80.0, 200.0), (range.min(), range.max()));
        assert_eq!(Duration::from_millis(100), config.lookahead().unwrap());
        assert_eq!(VelocityLevels::new(1.3, 0.6), config.velocity());
        assert!(config.catalog().is_none());
    }

    #[test]
    fn test_deserialize() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rhythmctl.yaml");
        let mut file = std::fs::File::create(&path)?;
        write!(
            file,
            r#"
backend: mock
tempo: 120
tempo_range:
  min: 60
  max: 240
lookahead: 50ms
velocity:
  accent: 1.0
  normal: 0.5
master_volume: -6.0
catalog: catalog.yaml
samples: /srv/808
"#
        )?;

        let config = SequencerConfig::deserialize(&path)?;
        assert_eq!(120.0, config.tempo());
        let range = config.tempo_range()?;
        assert_eq!((60.0, 240.0), (range.min(), range.max()));
        assert_eq!(Duration::from_millis(50), config.lookahead()?);
        assert_eq!(VelocityLevels::new(1.0, 0.5), config.velocity());
        assert_eq!(-6.0, config.master_volume());
        assert_eq!(Some(dir.path().join("catalog.yaml")), config.catalog());
        assert_eq!(Some(PathBuf::from("/srv/808")), config.samples());
        Ok(())
    }

    #[test]
    fn test_from_yaml() {
        let config = SequencerConfig::from_yaml("tempo: 140\nvelocity:\n  accent: 1.5\n").unwrap();
        assert_eq!(140.0, config.tempo());
        assert_eq!(VelocityLevels::new(1.5, 0.6), config.velocity());
        assert_eq!(None, config.samples());
    }

    #[test]
    fn test_invalid_values() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rhythmctl.yaml");
        std::fs::write(
            &path,
            "tempo_range:\n  min: 200\n  max: 80\nlookahead: soon\n",
        )?;

        let config = SequencerConfig::deserialize(&path)?;
        assert!(matches!(config.tempo_range(), Err(ConfigError::Invalid(_))));
        assert!(matches!(config.lookahead(), Err(ConfigError::Invalid(_))));
        Ok(())
    }
}
