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
use std::ops::Range;
use std::str::FromStr;

use crate::pattern::{Step, HALF, STEPS};

/// The part of the cycle the transport loops over.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Variation {
    /// Steps 0 to 15.
    A,
    /// All 32 steps.
    #[default]
    AB,
    /// Steps 16 to 31.
    B,
}

impl Variation {
    /// The steps played by this variation.
    pub fn range(self) -> Range<usize> {
        match self {
            Variation::A => 0..HALF,
            Variation::AB => 0..STEPS,
            Variation::B => HALF..STEPS,
        }
    }
}

impl FromStr for Variation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(Variation::A),
            "ab" => Ok(Variation::AB),
            "b" => Ok(Variation::B),
            _ => Err(format!("unknown variation {}, expected a, ab or b", s)),
        }
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variation::A => "A",
            Variation::AB => "AB",
            Variation::B => "B",
        };
        write!(f, "{}", name)
    }
}

/// Walks the loop window one step per tick. A requested variation only takes over once
/// the running window has completed.
#[derive(Clone, Debug)]
pub struct LoopCursor {
    active: Variation,
    pending: Option<Variation>,
    next: Option<usize>,
}

impl LoopCursor {
    /// Creates a cursor that starts at the beginning of the given variation.
    pub fn new(variation: Variation) -> LoopCursor {
        LoopCursor {
            active: variation,
            pending: None,
            next: None,
        }
    }

    /// The variation currently being looped.
    pub fn active(&self) -> Variation {
        self.active
    }

    /// The variation that takes over at the next boundary, if any.
    pub fn pending(&self) -> Option<Variation> {
        self.pending
    }

    /// Requests a variation change at the next loop boundary.
    pub fn request(&mut self, variation: Variation) {
        self.pending = (variation != self.active).then_some(variation);
    }

    /// The variation that will be looped once the current window completes.
    pub fn requested(&self) -> Variation {
        self.pending.unwrap_or(self.active)
    }

    /// Moves the cursor back so the next step starts a fresh window. A pending variation is
    /// applied right away.
    pub fn rewind(&mut self) {
        self.next = None;
    }

    /// Returns the step to play and moves the cursor on.
    pub fn advance(&mut self) -> Step {
        let index = match self.next {
            Some(index) if index < self.active.range().end => index,
            _ => {
                if let Some(pending) = self.pending.take() {
                    self.active = pending;
                }
                self.active.range().start
            }
        };
        self.next = Some(index + 1);
        Step::wrapping(index)
    }
}
