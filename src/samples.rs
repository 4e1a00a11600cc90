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

//! Sample identity and resolution.
//!
//! This module provides:
//! - Sample identifiers following the `<HANDLE><POTI1><POTI2>.WAV` asset naming scheme
//! - Precomputed variant tables so resolution during playback never allocates
//! - An index of the sample files actually present on disk

mod assets;
mod error;
mod resolver;

use std::fmt;
use std::sync::Arc;

pub use assets::AssetIndex;
pub use error::MissingSampleError;
pub use resolver::VariantTable;

/// The file extension of every sample asset.
pub const SAMPLE_EXTENSION: &str = "WAV";

/// Names one sample asset. Cloning is a reference count bump.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SampleId(Arc<str>);

impl SampleId {
    /// Creates a sample identifier. Identifiers are always uppercase.
    pub fn new(name: &str) -> SampleId {
        SampleId(Arc::from(name.to_uppercase()))
    }

    /// The identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The asset file name of this sample.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.0, SAMPLE_EXTENSION)
    }
}

impl fmt::Display for SampleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
