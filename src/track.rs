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
use std::fmt;

use crate::error::ValidationError;
use crate::instruments::Instrument;

/// Lowest value of the instrument level knob.
pub const MIN_LEVEL: u8 = 1;

/// Highest value of the instrument level knob.
pub const MAX_LEVEL: u8 = 127;

/// One of the five positions a poti snaps to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PotiLevel {
    Zero,
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl PotiLevel {
    /// All levels in ascending order.
    pub const ALL: [PotiLevel; 5] = [
        PotiLevel::Zero,
        PotiLevel::Quarter,
        PotiLevel::Half,
        PotiLevel::ThreeQuarters,
        PotiLevel::Full,
    ];

    /// Snaps a 0..=100 knob value onto the nearest level. Halfway values round up.
    pub fn quantize(level: f64) -> Result<PotiLevel, ValidationError> {
        if !(0.0..=100.0).contains(&level) {
            return Err(ValidationError::PotiLevel(level));
        }
        Ok(PotiLevel::ALL[(level / 25.0).round() as usize])
    }

    /// The knob value of this level.
    pub fn percent(self) -> u8 {
        match self {
            PotiLevel::Zero => 0,
            PotiLevel::Quarter => 25,
            PotiLevel::Half => 50,
            PotiLevel::ThreeQuarters => 75,
            PotiLevel::Full => 100,
        }
    }

    /// The two character code used in sample names. 0 and 100 are squeezed into two
    /// characters as "00" and "10".
    pub fn code(self) -> &'static str {
        match self {
            PotiLevel::Zero => "00",
            PotiLevel::Quarter => "25",
            PotiLevel::Half => "50",
            PotiLevel::ThreeQuarters => "75",
            PotiLevel::Full => "10",
        }
    }

    /// Position of this level within [`PotiLevel::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for PotiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.percent())
    }
}

/// The mutable settings of one instrument track.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackState {
    alt: usize,
    poti1: Option<PotiLevel>,
    poti2: Option<PotiLevel>,
    level_db: f32,
}

impl TrackState {
    /// Creates a track state on the first alternate group at unity level.
    pub fn new(poti1: Option<PotiLevel>, poti2: Option<PotiLevel>) -> TrackState {
        TrackState {
            alt: 0,
            poti1,
            poti2,
            level_db: 0.0,
        }
    }

    /// The selected alternate group.
    pub fn alt(&self) -> usize {
        self.alt
    }

    /// The first poti, if the instrument has one.
    pub fn poti1(&self) -> Option<PotiLevel> {
        self.poti1
    }

    /// The second poti, if the instrument has one.
    pub fn poti2(&self) -> Option<PotiLevel> {
        self.poti2
    }

    /// The track level in dB.
    pub fn level_db(&self) -> f32 {
        self.level_db
    }

    /// Selects the alternate group. Only instruments that share their channel between
    /// two sounds can switch.
    pub fn set_alt(&mut self, instrument: &Instrument, alt: usize) -> Result<(), ValidationError> {
        if instrument.alt_count() < 2 || alt >= instrument.alt_count() {
            return Err(ValidationError::AltGroup {
                instrument: instrument.name().to_string(),
                alt,
            });
        }
        self.alt = alt;
        Ok(())
    }

    /// Sets poti 1 or 2 to the level nearest the given knob value.
    pub fn set_poti(
        &mut self,
        instrument: &Instrument,
        poti: usize,
        level: f64,
    ) -> Result<PotiLevel, ValidationError> {
        if poti != 1 && poti != 2 {
            return Err(ValidationError::PotiIndex(poti));
        }
        if !instrument.has_poti(poti) {
            return Err(ValidationError::PotiDisabled {
                instrument: instrument.name().to_string(),
                poti,
            });
        }

        let level = PotiLevel::quantize(level)?;
        if poti == 1 {
            self.poti1 = Some(level);
        } else {
            self.poti2 = Some(level);
        }
        Ok(level)
    }

    /// Sets the level from a 1..=127 knob value and returns the resulting gain in dB.
    pub fn set_level(&mut self, value: u8) -> Result<f32, ValidationError> {
        if !(MIN_LEVEL..=MAX_LEVEL).contains(&value) {
            return Err(ValidationError::Level(value));
        }
        self.level_db = (f32::from(value) - f32::from(MAX_LEVEL) / 2.0) / 4.0;
        Ok(self.level_db)
    }
}
