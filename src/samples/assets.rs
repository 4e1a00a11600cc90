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
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{debug, info};

use super::{SampleId, SAMPLE_EXTENSION};

/// The set of sample identifiers that exist as asset files.
#[derive(Clone, Debug, Default)]
pub struct AssetIndex {
    names: HashSet<String>,
}

impl AssetIndex {
    /// Indexes every sample file directly inside the given directory.
    pub fn scan(dir: &Path) -> io::Result<AssetIndex> {
        let mut names = HashSet::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }

            let is_sample = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(SAMPLE_EXTENSION));
            if !is_sample {
                debug!(path = ?path, "Skipping non-sample file");
                continue;
            }

            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.insert(stem.to_uppercase());
            }
        }

        info!(dir = ?dir, samples = names.len(), "Indexed sample assets");
        Ok(AssetIndex { names })
    }

    /// Returns true if the sample exists.
    pub fn contains(&self, id: &SampleId) -> bool {
        self.names.contains(id.as_str())
    }

    /// The number of indexed samples.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if nothing was indexed.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: AsRef<str>> FromIterator<S> for AssetIndex {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        AssetIndex {
            names: iter
                .into_iter()
                .map(|name| name.as_ref().to_uppercase())
                .collect(),
        }
    }
}
