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
use std::sync::Arc;

use tracing::{error, warn};

use crate::audio::{Backend, BackendError, Trigger};
use crate::instruments::InstrumentRegistry;
use crate::state::SequencerState;
use crate::transport::{StepEvent, StepSink};

/// The two velocities a step can be played at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Velocity {
    /// The step is accented.
    High,
    /// Every other step.
    Low,
}

impl Velocity {
    /// Picks the velocity for a step.
    pub fn for_accent(accent: bool) -> Velocity {
        if accent {
            Velocity::High
        } else {
            Velocity::Low
        }
    }
}

/// The trigger values of the two velocities.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VelocityLevels {
    high: f32,
    low: f32,
}

impl VelocityLevels {
    pub fn new(high: f32, low: f32) -> VelocityLevels {
        VelocityLevels { high, low }
    }

    /// The trigger value of the given velocity.
    pub fn value(&self, velocity: Velocity) -> f32 {
        match velocity {
            Velocity::High => self.high,
            Velocity::Low => self.low,
        }
    }
}

/// Turns step events into sample triggers.
pub struct PlaybackEngine {
    registry: Arc<InstrumentRegistry>,
    backend: Arc<dyn Backend>,
    velocity: VelocityLevels,
}

impl PlaybackEngine {
    pub fn new(
        registry: Arc<InstrumentRegistry>,
        backend: Arc<dyn Backend>,
        velocity: VelocityLevels,
    ) -> PlaybackEngine {
        PlaybackEngine {
            registry,
            backend,
            velocity,
        }
    }
}

impl StepSink for PlaybackEngine {
    fn on_step(&self, event: &StepEvent, state: &SequencerState) {
        let velocity = self.velocity.value(Velocity::for_accent(event.accent()));

        for track in event.column().active_instruments() {
            let (instrument, track_state) =
                match (self.registry.instrument(track), state.track(track)) {
                    (Ok(instrument), Ok(track_state)) => (instrument, track_state),
                    (Err(e), _) | (_, Err(e)) => {
                        error!(track = track.0, err = %e, "Step set on an unknown track.");
                        continue;
                    }
                };

            let sample = match instrument.resolve(track_state) {
                Ok(sample) => sample.clone(),
                Err(e) => {
                    warn!(
                        step = event.step().index(),
                        instrument = instrument.name(),
                        err = %e,
                        "Skipping missing sample."
                    );
                    continue;
                }
            };

            let trigger = Trigger {
                track,
                sample,
                length: event.step_length(),
                velocity,
                gain_db: track_state.level_db(),
                at: event.scheduled_at(),
            };
            match self.backend.trigger(trigger) {
                Ok(()) => {}
                Err(BackendError::MissingSample(sample)) => {
                    warn!(
                        step = event.step().index(),
                        sample = %sample,
                        "Backend has no such sample, skipping."
                    );
                }
                Err(e) => {
                    error!(step = event.step().index(), err = %e, "Backend rejected trigger.");
                }
            }
        }
    }
}
