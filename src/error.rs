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

/// Rejected input at the command boundary. Nothing is mutated when one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("step {0} is outside of 0..32")]
    Step(usize),

    #[error("edit index {0} is outside of 0..16")]
    EditIndex(usize),

    #[error("track {0} does not exist")]
    Track(usize),

    #[error("track {0} is the accent channel, not an instrument")]
    NotAnInstrument(usize),

    #[error("tempo {bpm} is outside of {min}..={max} bpm")]
    Tempo { bpm: f64, min: f64, max: f64 },

    #[error("poti level {0} is outside of 0..=100")]
    PotiLevel(f64),

    #[error("poti {0} does not exist, expected 1 or 2")]
    PotiIndex(usize),

    #[error("instrument {instrument} has no poti {poti}")]
    PotiDisabled { instrument: String, poti: usize },

    #[error("instrument {instrument} has no alternate group {alt}")]
    AltGroup { instrument: String, alt: usize },

    #[error("instrument level {0} is outside of 1..=127")]
    Level(u8),
}
