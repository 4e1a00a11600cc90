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

use super::SampleId;
use crate::track::PotiLevel;

/// A sample could not be resolved. This points at a catalog or asset problem, not at bad
/// user input, so callers skip the trigger and keep playing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum MissingSampleError {
    #[error("sample {0} is not present in the sample assets")]
    NotInAssets(SampleId),

    #[error("instrument {instrument} has no sample for alt {alt}, poti1 {poti1:?}, poti2 {poti2:?}")]
    NoVariant {
        instrument: String,
        alt: usize,
        poti1: Option<PotiLevel>,
        poti2: Option<PotiLevel>,
    },
}
