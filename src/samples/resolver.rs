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

//! Precomputed sample variant tables.
//!
//! Each instrument owns one table holding every sample it can play: one variant per
//! alternate group without potis, five with one poti and twenty-five with two. The table
//! is laid out so that a lookup is a single index computation.

use tracing::debug;

use super::{AssetIndex, MissingSampleError, SampleId};
use crate::track::PotiLevel;

/// Number of levels a poti can take.
const LEVELS: usize = PotiLevel::ALL.len();

/// A precomputed sample variant.
#[derive(Debug)]
struct Variant {
    /// The sample identifier.
    id: SampleId,
    /// False if an asset index was given and the sample is not in it.
    available: bool,
}

/// Every sample variant of one instrument.
#[derive(Debug)]
pub struct VariantTable {
    /// The instrument name, for error reporting.
    instrument: String,
    /// The number of potis the instrument has (0, 1 or 2).
    potis: usize,
    /// The number of variants per alternate group.
    per_alt: usize,
    /// Variants ordered by alt, then poti 1, then poti 2.
    variants: Vec<Variant>,
}

impl VariantTable {
    /// Builds the full variant table for the given uppercase handles.
    pub fn build(
        instrument: &str,
        handles: &[String],
        potis: usize,
        assets: Option<&AssetIndex>,
    ) -> VariantTable {
        let potis = potis.min(2);
        let per_alt = LEVELS.pow(potis as u32);

        let mut ids = Vec::with_capacity(handles.len() * per_alt);
        for handle in handles {
            match potis {
                0 => ids.push(VariantTable::sample_id(handle, None, None)),
                1 => PotiLevel::ALL
                    .iter()
                    .for_each(|p1| ids.push(VariantTable::sample_id(handle, Some(*p1), None))),
                _ => PotiLevel::ALL.iter().for_each(|p1| {
                    PotiLevel::ALL.iter().for_each(|p2| {
                        ids.push(VariantTable::sample_id(handle, Some(*p1), Some(*p2)))
                    })
                }),
            }
        }

        let variants: Vec<Variant> = ids
            .into_iter()
            .map(|id| Variant {
                available: assets.map_or(true, |assets| assets.contains(&id)),
                id,
            })
            .collect();

        debug!(
            instrument,
            variants = variants.len(),
            missing = variants.iter().filter(|v| !v.available).count(),
            "Built sample variant table"
        );

        VariantTable {
            instrument: instrument.to_string(),
            potis,
            per_alt,
            variants,
        }
    }

    /// Names the sample for a handle and poti selection: the handle followed by the code of
    /// each poti that is present.
    pub fn sample_id(
        handle: &str,
        poti1: Option<PotiLevel>,
        poti2: Option<PotiLevel>,
    ) -> SampleId {
        let mut name = handle.to_uppercase();
        if let Some(poti1) = poti1 {
            name.push_str(poti1.code());
            if let Some(poti2) = poti2 {
                name.push_str(poti2.code());
            }
        }
        SampleId::new(&name)
    }

    /// Looks up the sample for the given selection.
    pub fn lookup(
        &self,
        alt: usize,
        poti1: Option<PotiLevel>,
        poti2: Option<PotiLevel>,
    ) -> Result<&SampleId, MissingSampleError> {
        let offset = match (self.potis, poti1, poti2) {
            (0, None, None) => Some(0),
            (1, Some(p1), None) => Some(p1.index()),
            (2, Some(p1), Some(p2)) => Some(p1.index() * LEVELS + p2.index()),
            _ => None,
        };

        let variant = offset
            .filter(|offset| *offset < self.per_alt)
            .and_then(|offset| self.variants.get(alt * self.per_alt + offset))
            .ok_or_else(|| MissingSampleError::NoVariant {
                instrument: self.instrument.clone(),
                alt,
                poti1,
                poti2,
            })?;

        if variant.available {
            Ok(&variant.id)
        } else {
            Err(MissingSampleError::NotInAssets(variant.id.clone()))
        }
    }

    /// The total number of variants.
    pub fn len(&self) -> usize {
        self.variants.len()
    }

    /// Returns true if the table has no variants.
    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    /// The number of variants per alternate group.
    pub fn per_alt(&self) -> usize {
        self.per_alt
    }

    /// Iterates over every sample identifier in the table.
    pub fn ids(&self) -> impl Iterator<Item = &SampleId> {
        self.variants.iter().map(|variant| &variant.id)
    }

    /// Iterates over the identifiers missing from the asset index.
    pub fn missing(&self) -> impl Iterator<Item = &SampleId> {
        self.variants
            .iter()
            .filter(|variant| !variant.available)
            .map(|variant| &variant.id)
    }
}
