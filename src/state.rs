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
use crate::error::ValidationError;
use crate::instruments::InstrumentRegistry;
use crate::pattern::{PatternMatrix, TrackId};
use crate::track::TrackState;

/// Everything a tick reads: the pattern and the settings of every instrument track.
#[derive(Clone, Debug, PartialEq)]
pub struct SequencerState {
    pattern: PatternMatrix,
    tracks: Vec<TrackState>,
}

impl SequencerState {
    /// Creates an empty pattern with every track at its default state.
    pub fn new(registry: &InstrumentRegistry) -> SequencerState {
        SequencerState {
            pattern: PatternMatrix::new(registry.len()),
            tracks: registry.default_states(),
        }
    }

    pub fn pattern(&self) -> &PatternMatrix {
        &self.pattern
    }

    pub fn pattern_mut(&mut self) -> &mut PatternMatrix {
        &mut self.pattern
    }

    /// The state of an instrument track.
    pub fn track(&self, track: TrackId) -> Result<&TrackState, ValidationError> {
        if track.is_accent() {
            return Err(ValidationError::NotAnInstrument(track.0));
        }
        self.tracks
            .get(track.0 - 1)
            .ok_or(ValidationError::Track(track.0))
    }

    /// The mutable state of an instrument track.
    pub fn track_mut(&mut self, track: TrackId) -> Result<&mut TrackState, ValidationError> {
        if track.is_accent() {
            return Err(ValidationError::NotAnInstrument(track.0));
        }
        self.tracks
            .get_mut(track.0 - 1)
            .ok_or(ValidationError::Track(track.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::catalog::Catalog;

    #[test]
    fn test_new_state() {
        let registry = InstrumentRegistry::new(&Catalog::default(), None).unwrap();
        let state = SequencerState::new(&registry);

        assert_eq!(12, state.pattern().tracks());
        assert!((0..32).all(|step| state.pattern().column(step).unwrap().is_silent()));
        assert_eq!(
            registry.instrument(TrackId(1)).unwrap().default_state(),
            *state.track(TrackId(1)).unwrap()
        );
        assert_eq!(
            Err(ValidationError::NotAnInstrument(0)),
            state.track(TrackId(0)).cloned()
        );
        assert_eq!(
            Err(ValidationError::Track(12)),
            state.track(TrackId(12)).cloned()
        );
    }
}
