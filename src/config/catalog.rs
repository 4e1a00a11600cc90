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
use std::path::Path;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Default poti position when the catalog doesn't give one.
pub const DEFAULT_POTI_LEVEL: f64 = 50.0;

fn default_poti_level() -> f64 {
    DEFAULT_POTI_LEVEL
}

/// A YAML representation of a poti on an instrument channel.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct PotiDefinition {
    /// The label printed next to the knob, e.g. "tone" or "decay".
    label: String,

    /// The initial knob value (0-100).
    #[serde(default = "default_poti_level")]
    default: f64,
}

impl PotiDefinition {
    /// Creates a new poti definition.
    pub fn new(label: &str, default: f64) -> PotiDefinition {
        PotiDefinition {
            label: label.to_string(),
            default,
        }
    }

    /// Gets the knob label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Gets the initial knob value.
    pub fn default_level(&self) -> f64 {
        self.default
    }
}

/// A YAML representation of an instrument channel.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct InstrumentDefinition {
    /// The instrument name.
    name: String,

    /// One or two sample handles sharing this channel, e.g. [lt, lc].
    alt_groups: Vec<String>,

    /// The first poti, if the channel has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poti1: Option<PotiDefinition>,

    /// The second poti. Only valid together with the first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    poti2: Option<PotiDefinition>,
}

impl InstrumentDefinition {
    /// Creates a new instrument definition.
    pub fn new(
        name: &str,
        alt_groups: &[&str],
        poti1: Option<PotiDefinition>,
        poti2: Option<PotiDefinition>,
    ) -> InstrumentDefinition {
        InstrumentDefinition {
            name: name.to_string(),
            alt_groups: alt_groups.iter().map(|group| group.to_string()).collect(),
            poti1,
            poti2,
        }
    }

    /// Gets the instrument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the alternate group labels.
    pub fn alt_groups(&self) -> &[String] {
        &self.alt_groups
    }

    /// Gets the first poti.
    pub fn poti1(&self) -> Option<&PotiDefinition> {
        self.poti1.as_ref()
    }

    /// Gets the second poti.
    pub fn poti2(&self) -> Option<&PotiDefinition> {
        self.poti2.as_ref()
    }
}

/// The instrument catalog. Instruments are numbered from track 1 in list order.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Catalog {
    instruments: Vec<InstrumentDefinition>,
}

impl Catalog {
    /// Creates a catalog from the given instruments.
    pub fn new(instruments: Vec<InstrumentDefinition>) -> Catalog {
        Catalog { instruments }
    }

    /// Parse a catalog from a YAML file.
    pub fn deserialize(path: &Path) -> Result<Catalog, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Catalog>()?)
    }

    /// Parse a catalog from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Catalog, ConfigError> {
        Ok(Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize::<Catalog>()?)
    }

    /// Renders the catalog as YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yml::to_string(self)?)
    }

    /// Gets the instrument definitions.
    pub fn instruments(&self) -> &[InstrumentDefinition] {
        &self.instruments
    }
}

impl Default for Catalog {
    /// The stock TR-808 channel layout.
    fn default() -> Self {
        let poti = |label: &str| Some(PotiDefinition::new(label, DEFAULT_POTI_LEVEL));
        Catalog::new(vec![
            InstrumentDefinition::new("bass drum", &["bd"], poti("tone"), poti("decay")),
            InstrumentDefinition::new("snare drum", &["sd"], poti("tone"), poti("snappy")),
            InstrumentDefinition::new("low tom/conga", &["lt", "lc"], poti("tuning"), None),
            InstrumentDefinition::new("mid tom/conga", &["mt", "mc"], poti("tuning"), None),
            InstrumentDefinition::new("hi tom/conga", &["ht", "hc"], poti("tuning"), None),
            InstrumentDefinition::new("rim shot/claves", &["rs", "cl"], None, None),
            InstrumentDefinition::new("hand clap/maracas", &["cp", "ma"], None, None),
            InstrumentDefinition::new("cowbell", &["cb"], None, None),
            InstrumentDefinition::new("cymbal", &["cy"], poti("tone"), poti("decay")),
            InstrumentDefinition::new("open hihat", &["oh"], poti("decay"), None),
            InstrumentDefinition::new("closed hihat", &["ch"], None, None),
        ])
    }
}
