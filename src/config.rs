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
use std::error::Error;
use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::audio;
use crate::controller::{keyboard, Controller};
use crate::instruments::InstrumentRegistry;
use crate::machine::DrumMachine;
use crate::samples::AssetIndex;

use self::catalog::Catalog;
use self::error::ConfigError;
use self::sequencer::SequencerConfig;

pub mod catalog;
pub mod error;
pub mod sequencer;

/// Loads the catalog at the given path, or the stock 808 catalog if there is none.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog, ConfigError> {
    match path {
        Some(path) => {
            info!(path = ?path, "Loading instrument catalog.");
            Catalog::deserialize(path)
        }
        None => Ok(Catalog::default()),
    }
}

/// Indexes the sample directory, if one is given.
pub fn load_assets(dir: Option<&Path>) -> Result<Option<AssetIndex>, ConfigError> {
    dir.map(AssetIndex::scan)
        .transpose()
        .map_err(ConfigError::from)
}

/// Loads the sequencer config at the given path, or the defaults if there is none.
pub fn load_config(path: Option<&Path>) -> Result<SequencerConfig, ConfigError> {
    match path {
        Some(path) => SequencerConfig::deserialize(path),
        None => Ok(SequencerConfig::default()),
    }
}

/// Builds a drum machine from the given config: catalog, sample assets and backend.
pub fn init_machine(config: &SequencerConfig) -> Result<DrumMachine, Box<dyn Error>> {
    let catalog = load_catalog(config.catalog().as_deref())?;
    let assets = load_assets(config.samples().as_deref())?;
    let registry = Arc::new(InstrumentRegistry::new(&catalog, assets.as_ref())?);
    let backend = audio::get_backend(config.backend(), assets)?;
    Ok(DrumMachine::new(registry, backend, config)?)
}

/// Initializes the drum machine and a keyboard controller from the given config file. The
/// controller owns the machine and runs until the keyboard input closes.
pub fn init_machine_and_controller(config_path: Option<&Path>) -> Result<Controller, Box<dyn Error>> {
    let config = load_config(config_path)?;
    let machine = init_machine(&config)?;
    Ok(Controller::new(machine, Arc::new(keyboard::Driver::new())))
}
