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

//! The 32 step pattern grid.
//!
//! Every step is stored as one bit mask over the tracks: bit 0 is the accent channel and
//! bit `n` is instrument track `n`. A whole column can therefore be copied out of the
//! matrix as a single value.

use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// The number of steps in a full pattern cycle.
pub const STEPS: usize = 32;

/// The number of steps in one half of the cycle.
pub const HALF: usize = STEPS / 2;

/// The most instruments a matrix can hold. Track 0 is reserved for the accent.
pub const MAX_INSTRUMENTS: usize = u64::BITS as usize - 1;

/// The accent channel.
pub const ACCENT: TrackId = TrackId(0);

/// An absolute step in the pattern, always within 0..32.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Step(u8);

impl Step {
    /// Validates the given index as a step.
    pub fn new(index: usize) -> Result<Step, ValidationError> {
        if index < STEPS {
            Ok(Step(index as u8))
        } else {
            Err(ValidationError::Step(index))
        }
    }

    /// Maps any counter value onto the cycle.
    pub fn wrapping(counter: usize) -> Step {
        Step((counter % STEPS) as u8)
    }

    /// The absolute index of this step.
    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// The half of the cycle this step lives in.
    pub fn part(self) -> EditingPart {
        if self.index() < HALF {
            EditingPart::A
        } else {
            EditingPart::B
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A channel in the pattern matrix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TrackId(pub usize);

impl TrackId {
    /// Returns true if this is the accent channel.
    pub fn is_accent(self) -> bool {
        self == ACCENT
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The half of the matrix addressed by UI edits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EditingPart {
    #[default]
    A,
    B,
}

impl EditingPart {
    /// Maps a UI visible step index (0..16) onto the absolute step it edits.
    pub fn absolute(self, ui_index: usize) -> Result<Step, ValidationError> {
        if ui_index >= HALF {
            return Err(ValidationError::EditIndex(ui_index));
        }
        Step::new(ui_index + self.offset())
    }

    fn offset(self) -> usize {
        match self {
            EditingPart::A => 0,
            EditingPart::B => HALF,
        }
    }
}

impl FromStr for EditingPart {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "a" | "1" => Ok(EditingPart::A),
            "b" | "2" => Ok(EditingPart::B),
            _ => Err(format!("unknown part {}", s)),
        }
    }
}

/// A snapshot of one step: the accent flag and every instrument flag.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Column {
    step: Step,
    flags: u64,
    tracks: usize,
}

impl Column {
    /// The step this column was taken from.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Whether the accent channel is set on this step.
    pub fn accent(&self) -> bool {
        self.flags & 1 == 1
    }

    /// Whether the given track is set on this step. Unknown tracks are never set.
    pub fn is_active(&self, track: TrackId) -> bool {
        track.0 < self.tracks && self.flags & (1 << track.0) != 0
    }

    /// Iterates over the instrument tracks that fire on this step, in track order.
    pub fn active_instruments(&self) -> impl Iterator<Item = TrackId> + '_ {
        (1..self.tracks)
            .map(TrackId)
            .filter(|track| self.is_active(*track))
    }

    /// Returns true if no instrument fires on this step.
    pub fn is_silent(&self) -> bool {
        self.flags & !1 == 0
    }
}

/// The mutable step x track grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PatternMatrix {
    columns: [u64; STEPS],
    tracks: usize,
}

impl PatternMatrix {
    /// Creates an empty matrix for the accent channel plus the given number of instruments.
    pub fn new(instruments: usize) -> PatternMatrix {
        PatternMatrix {
            columns: [0; STEPS],
            tracks: instruments.min(MAX_INSTRUMENTS) + 1,
        }
    }

    /// The number of tracks, including the accent channel.
    pub fn tracks(&self) -> usize {
        self.tracks
    }

    /// Validates that the track exists in this matrix.
    pub fn track(&self, track: usize) -> Result<TrackId, ValidationError> {
        if track < self.tracks {
            Ok(TrackId(track))
        } else {
            Err(ValidationError::Track(track))
        }
    }

    /// Sets or clears the given track on the given step.
    pub fn set_step(
        &mut self,
        step: usize,
        track: TrackId,
        active: bool,
    ) -> Result<(), ValidationError> {
        let step = Step::new(step)?;
        let track = self.track(track.0)?;

        let mask = 1u64 << track.0;
        let column = &mut self.columns[step.index()];
        if active {
            *column |= mask;
        } else {
            *column &= !mask;
        }
        Ok(())
    }

    /// Returns a snapshot of the given step.
    pub fn column(&self, step: usize) -> Result<Column, ValidationError> {
        let step = Step::new(step)?;
        Ok(self.column_at(step))
    }

    /// Returns a snapshot of an already validated step.
    pub fn column_at(&self, step: Step) -> Column {
        Column {
            step,
            flags: self.columns[step.index()],
            tracks: self.tracks,
        }
    }

    /// Returns the 32 step sequence of the given track.
    pub fn track_pattern(&self, track: TrackId) -> Result<[bool; STEPS], ValidationError> {
        let track = self.track(track.0)?;
        let mask = 1u64 << track.0;
        Ok(std::array::from_fn(|step| self.columns[step] & mask != 0))
    }

    /// Clears every step of the given track.
    pub fn clear_track(&mut self, track: TrackId) -> Result<(), ValidationError> {
        let track = self.track(track.0)?;
        let mask = !(1u64 << track.0);
        self.columns.iter_mut().for_each(|column| *column &= mask);
        Ok(())
    }
}
