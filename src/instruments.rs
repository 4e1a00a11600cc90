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

//! The read-only instrument registry, built once from a catalog.

use std::fmt;

use tracing::{info, warn};

use crate::config::catalog::{Catalog, InstrumentDefinition, PotiDefinition};
use crate::config::error::ConfigError;
use crate::error::ValidationError;
use crate::pattern::{TrackId, MAX_INSTRUMENTS};
use crate::samples::{AssetIndex, MissingSampleError, SampleId, VariantTable};
use crate::track::{PotiLevel, TrackState};

/// A poti present on an instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct Poti {
    label: String,
    default: PotiLevel,
}

impl Poti {
    fn from_definition(
        instrument: &str,
        definition: &PotiDefinition,
    ) -> Result<Poti, ConfigError> {
        let default = PotiLevel::quantize(definition.default_level()).map_err(|e| {
            ConfigError::Catalog(format!("instrument {}: {}", instrument, e))
        })?;
        Ok(Poti {
            label: definition.label().to_string(),
            default,
        })
    }

    /// The knob label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The level the poti starts at.
    pub fn default_level(&self) -> PotiLevel {
        self.default
    }
}

/// An instrument channel with its precomputed sample variants.
#[derive(Debug)]
pub struct Instrument {
    id: TrackId,
    name: String,
    handles: Vec<String>,
    poti1: Option<Poti>,
    poti2: Option<Poti>,
    variants: VariantTable,
}

impl Instrument {
    fn from_definition(
        id: TrackId,
        definition: &InstrumentDefinition,
        assets: Option<&AssetIndex>,
    ) -> Result<Instrument, ConfigError> {
        let name = definition.name();
        let invalid = |reason: &str| ConfigError::Catalog(format!("instrument {}: {}", name, reason));

        match definition.alt_groups().len() {
            1 | 2 => {}
            _ => return Err(invalid("needs one or two alternate groups")),
        }
        if definition.alt_groups().iter().any(|g| g.trim().is_empty()) {
            return Err(invalid("alternate group labels must not be empty"));
        }
        if definition.poti2().is_some() && definition.poti1().is_none() {
            return Err(invalid("poti2 requires poti1"));
        }

        let handles: Vec<String> = definition
            .alt_groups()
            .iter()
            .map(|group| group.trim().to_uppercase())
            .collect();
        let poti1 = definition
            .poti1()
            .map(|poti| Poti::from_definition(name, poti))
            .transpose()?;
        let poti2 = definition
            .poti2()
            .map(|poti| Poti::from_definition(name, poti))
            .transpose()?;
        let potis = usize::from(poti1.is_some()) + usize::from(poti2.is_some());
        let variants = VariantTable::build(name, &handles, potis, assets);

        Ok(Instrument {
            id,
            name: name.to_string(),
            handles,
            poti1,
            poti2,
            variants,
        })
    }

    /// The track this instrument plays on.
    pub fn id(&self) -> TrackId {
        self.id
    }

    /// The instrument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The uppercase sample handles, one per alternate group.
    pub fn handles(&self) -> &[String] {
        &self.handles
    }

    /// The number of alternate groups.
    pub fn alt_count(&self) -> usize {
        self.handles.len()
    }

    /// Gets poti 1 or 2.
    pub fn poti(&self, index: usize) -> Option<&Poti> {
        match index {
            1 => self.poti1.as_ref(),
            2 => self.poti2.as_ref(),
            _ => None,
        }
    }

    /// Returns true if the instrument has poti 1 or 2.
    pub fn has_poti(&self, index: usize) -> bool {
        self.poti(index).is_some()
    }

    /// The track state the instrument starts with.
    pub fn default_state(&self) -> TrackState {
        TrackState::new(
            self.poti1.as_ref().map(Poti::default_level),
            self.poti2.as_ref().map(Poti::default_level),
        )
    }

    /// Resolves the sample to play for the given state.
    pub fn resolve(&self, state: &TrackState) -> Result<&SampleId, MissingSampleError> {
        self.variants
            .lookup(state.alt(), state.poti1(), state.poti2())
    }

    /// Every sample variant of this instrument.
    pub fn variants(&self) -> &VariantTable {
        &self.variants
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>2} {} ({})", self.id.0, self.name, self.handles.join("/"))?;
        let labels: Vec<&str> = [&self.poti1, &self.poti2]
            .into_iter()
            .flatten()
            .map(|poti| poti.label())
            .collect();
        if !labels.is_empty() {
            write!(f, " [{}]", labels.join(", "))?;
        }
        write!(f, ", {} samples", self.variants.len())
    }
}

/// The instrument catalog with every sample variant precomputed.
#[derive(Debug)]
pub struct InstrumentRegistry {
    instruments: Vec<Instrument>,
}

impl InstrumentRegistry {
    /// Builds the registry. When an asset index is given, variants that don't exist on disk
    /// are marked missing and reported.
    pub fn new(
        catalog: &Catalog,
        assets: Option<&AssetIndex>,
    ) -> Result<InstrumentRegistry, ConfigError> {
        let definitions = catalog.instruments();
        if definitions.is_empty() || definitions.len() > MAX_INSTRUMENTS {
            return Err(ConfigError::Catalog(format!(
                "expected 1 to {} instruments, found {}",
                MAX_INSTRUMENTS,
                definitions.len()
            )));
        }

        let instruments = definitions
            .iter()
            .enumerate()
            .map(|(index, definition)| {
                Instrument::from_definition(TrackId(index + 1), definition, assets)
            })
            .collect::<Result<Vec<Instrument>, ConfigError>>()?;

        let registry = InstrumentRegistry { instruments };
        let missing = registry.missing_samples().count();
        if missing > 0 {
            warn!(missing, "Sample variants are missing from the sample assets");
        }
        info!(
            instruments = registry.len(),
            samples = registry.sample_count(),
            "Instrument registry built"
        );
        Ok(registry)
    }

    /// The number of instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Returns true if the registry has no instruments.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Gets the instrument on the given track.
    pub fn instrument(&self, track: TrackId) -> Result<&Instrument, ValidationError> {
        if track.is_accent() {
            return Err(ValidationError::NotAnInstrument(track.0));
        }
        self.instruments
            .get(track.0 - 1)
            .ok_or(ValidationError::Track(track.0))
    }

    /// Iterates over the instruments in track order.
    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    /// The starting state of every instrument, in track order.
    pub fn default_states(&self) -> Vec<TrackState> {
        self.instruments
            .iter()
            .map(Instrument::default_state)
            .collect()
    }

    /// The total number of sample variants.
    pub fn sample_count(&self) -> usize {
        self.instruments.iter().map(|i| i.variants().len()).sum()
    }

    /// Iterates over every sample variant missing from the asset index.
    pub fn missing_samples(&self) -> impl Iterator<Item = &SampleId> {
        self.instruments.iter().flat_map(|i| i.variants().missing())
    }
}
