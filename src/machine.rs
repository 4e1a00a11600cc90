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

//! The drum machine: pattern, track settings, transport and playback under one owner.
//!
//! Every command is validated before anything is changed. Edits take the write side of the
//! sequencer state lock, so a tick sees either all of an edit or none of it.

use std::fmt;
use std::io;
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::RwLock;
use tracing::{info, span, Level, Span};

use crate::audio::Backend;
use crate::config::error::ConfigError;
use crate::config::sequencer::SequencerConfig;
use crate::error::ValidationError;
use crate::instruments::InstrumentRegistry;
use crate::pattern::{Column, EditingPart, Step, TrackId, STEPS};
use crate::playback::PlaybackEngine;
use crate::state::SequencerState;
use crate::track::{PotiLevel, TrackState};
use crate::transport::{StepEvent, TransportScheduler, TransportState, Variation};

/// A request to change the drum machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Sets or clears a step of the selected track in the current editing part.
    EditStep { index: usize, active: bool },

    /// Selects the half of the pattern edits are addressed to.
    SetEditingPart(EditingPart),

    /// Selects the loop window.
    SetVariation(Variation),

    /// Changes the tempo in bpm.
    SetTempo(f64),

    /// Starts the transport if it is stopped, stops it otherwise.
    PlayPause,

    /// Selects the track edits are applied to. Track 0 is the accent.
    SelectTrack(usize),

    /// Selects the alternate group of an instrument.
    SetAltGroup { track: usize, alt: usize },

    /// Turns a poti of an instrument.
    SetPoti {
        track: usize,
        poti: usize,
        level: f64,
    },

    /// Sets the master volume in dB.
    SetMasterVolume(f32),

    /// Turns the level knob of an instrument.
    SetLevel { track: usize, value: u8 },

    /// Clears every step of the selected track.
    ClearTrack,
}

/// Errors returned by [`DrumMachine::handle`].
#[derive(Debug, thiserror::Error)]
pub enum MachineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("unable to start the transport: {0}")]
    Transport(#[from] io::Error),
}

/// A snapshot of the machine for display.
#[derive(Clone, Debug, PartialEq)]
pub struct Status {
    pub transport: TransportState,
    pub bpm: f64,
    pub variation: Variation,
    pub current_step: Option<Step>,
    pub editing_part: EditingPart,
    pub selected_track: TrackId,
    pub master_volume: f32,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {} bpm, variation {}, step {}, editing part {:?}, track {}, master {} dB",
            self.transport,
            self.bpm,
            self.variation,
            self.current_step
                .map_or_else(|| "-".to_string(), |step| step.to_string()),
            self.editing_part,
            self.selected_track,
            self.master_volume
        )
    }
}

/// An 808 style drum machine.
pub struct DrumMachine {
    registry: Arc<InstrumentRegistry>,
    state: Arc<RwLock<SequencerState>>,
    transport: TransportScheduler,
    backend: Arc<dyn Backend>,
    selected_track: TrackId,
    editing_part: EditingPart,
    master_volume: f32,
    span: Span,
}

impl DrumMachine {
    /// Creates a stopped drum machine with an empty pattern.
    pub fn new(
        registry: Arc<InstrumentRegistry>,
        backend: Arc<dyn Backend>,
        config: &SequencerConfig,
    ) -> Result<DrumMachine, ConfigError> {
        let state = Arc::new(RwLock::new(SequencerState::new(&registry)));
        let playback = Arc::new(PlaybackEngine::new(
            registry.clone(),
            backend.clone(),
            config.velocity(),
        ));
        let transport = TransportScheduler::new(
            state.clone(),
            playback,
            config.tempo_range()?,
            config.tempo(),
            config.lookahead()?,
        )
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let master_volume = config.master_volume();
        backend.set_master_volume(master_volume);

        let machine = DrumMachine {
            registry,
            state,
            transport,
            backend,
            selected_track: TrackId(1),
            editing_part: EditingPart::default(),
            master_volume,
            span: span!(Level::INFO, "drum machine"),
        };
        info!(
            instruments = machine.registry.len(),
            backend = %machine.backend,
            bpm = machine.transport.bpm(),
            "Drum machine ready."
        );
        Ok(machine)
    }

    /// Applies a command.
    pub fn handle(&mut self, command: Command) -> Result<(), MachineError> {
        match command {
            Command::EditStep { index, active } => {
                self.edit_step(index, active)?;
            }
            Command::SetEditingPart(part) => self.set_editing_part(part),
            Command::SetVariation(variation) => self.set_variation(variation),
            Command::SetTempo(bpm) => {
                self.set_tempo(bpm)?;
            }
            Command::PlayPause => {
                self.play_pause()?;
            }
            Command::SelectTrack(track) => {
                self.select_track(track)?;
            }
            Command::SetAltGroup { track, alt } => self.set_alt_group(track, alt)?,
            Command::SetPoti { track, poti, level } => {
                self.set_poti(track, poti, level)?;
            }
            Command::SetMasterVolume(db) => self.set_master_volume(db),
            Command::SetLevel { track, value } => {
                self.set_level(track, value)?;
            }
            Command::ClearTrack => self.clear_track()?,
        }
        Ok(())
    }

    /// Sets or clears a step of the selected track. The UI index is mapped through the
    /// current editing part.
    pub fn edit_step(&mut self, ui_index: usize, active: bool) -> Result<Step, ValidationError> {
        let _enter = self.span.enter();
        let step = self.editing_part.absolute(ui_index)?;
        self.state
            .write()
            .pattern_mut()
            .set_step(step.index(), self.selected_track, active)?;
        info!(
            step = step.index(),
            track = self.selected_track.0,
            active,
            "Edited step."
        );
        Ok(step)
    }

    pub fn set_editing_part(&mut self, part: EditingPart) {
        self.editing_part = part;
    }

    /// Selects the loop window. A running transport switches at the next loop boundary.
    pub fn set_variation(&mut self, variation: Variation) {
        let _enter = self.span.enter();
        self.transport.set_variation(variation);
        info!(variation = %variation, "Variation selected.");
    }

    pub fn set_tempo(&mut self, bpm: f64) -> Result<f64, ValidationError> {
        let _enter = self.span.enter();
        let bpm = self.transport.set_tempo(bpm)?;
        info!(bpm, "Tempo changed.");
        Ok(bpm)
    }

    /// Toggles the transport and returns the new transport state.
    pub fn play_pause(&mut self) -> Result<TransportState, io::Error> {
        let _enter = self.span.enter();
        if self.transport.is_running() {
            self.transport.stop();
        } else {
            self.transport.start()?;
        }
        Ok(self.transport.state())
    }

    /// Stops the transport if it is running.
    pub fn stop(&mut self) {
        self.transport.stop();
    }

    /// Selects the track that edits apply to. The accent channel can be selected.
    pub fn select_track(&mut self, track: usize) -> Result<TrackId, ValidationError> {
        self.selected_track = self.state.read().pattern().track(track)?;
        Ok(self.selected_track)
    }

    pub fn set_alt_group(&mut self, track: usize, alt: usize) -> Result<(), ValidationError> {
        let _enter = self.span.enter();
        let (track, instrument) = self.instrument(track)?;
        self.state.write().track_mut(track)?.set_alt(instrument, alt)?;
        info!(track = track.0, alt, "Alternate group selected.");
        Ok(())
    }

    /// Turns a poti. Returns the level the value was snapped to.
    pub fn set_poti(
        &mut self,
        track: usize,
        poti: usize,
        level: f64,
    ) -> Result<PotiLevel, ValidationError> {
        let _enter = self.span.enter();
        let (track, instrument) = self.instrument(track)?;
        let snapped = self
            .state
            .write()
            .track_mut(track)?
            .set_poti(instrument, poti, level)?;
        info!(track = track.0, poti, level = %snapped, "Poti turned.");
        Ok(snapped)
    }

    pub fn set_master_volume(&mut self, db: f32) {
        let _enter = self.span.enter();
        self.master_volume = db;
        self.backend.set_master_volume(db);
        info!(db, "Master volume changed.");
    }

    /// Turns the level knob of an instrument. Returns the resulting gain in dB.
    pub fn set_level(&mut self, track: usize, value: u8) -> Result<f32, ValidationError> {
        let _enter = self.span.enter();
        let (track, _) = self.instrument(track)?;
        let db = self.state.write().track_mut(track)?.set_level(value)?;
        info!(track = track.0, value, db, "Level changed.");
        Ok(db)
    }

    /// Clears every step of the selected track.
    pub fn clear_track(&mut self) -> Result<(), ValidationError> {
        let _enter = self.span.enter();
        self.state
            .write()
            .pattern_mut()
            .clear_track(self.selected_track)?;
        info!(track = self.selected_track.0, "Cleared track.");
        Ok(())
    }

    /// The 32 steps of a track.
    pub fn track_pattern(&self, track: usize) -> Result<[bool; STEPS], ValidationError> {
        let state = self.state.read();
        let track = state.pattern().track(track)?;
        state.pattern().track_pattern(track)
    }

    /// A snapshot of one step.
    pub fn column(&self, step: usize) -> Result<Column, ValidationError> {
        self.state.read().pattern().column(step)
    }

    /// The settings of an instrument track.
    pub fn track_state(&self, track: usize) -> Result<TrackState, ValidationError> {
        let state = self.state.read();
        let track = state.pattern().track(track)?;
        state.track(track).copied()
    }

    pub fn transport_state(&self) -> TransportState {
        self.transport.state()
    }

    pub fn current_step(&self) -> Option<Step> {
        self.transport.current_step()
    }

    /// Subscribes to step events.
    pub fn subscribe(&self) -> Receiver<StepEvent> {
        self.transport.subscribe()
    }

    pub fn selected_track(&self) -> TrackId {
        self.selected_track
    }

    pub fn editing_part(&self) -> EditingPart {
        self.editing_part
    }

    pub fn bpm(&self) -> f64 {
        self.transport.bpm()
    }

    pub fn variation(&self) -> Variation {
        self.transport.variation()
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    pub fn registry(&self) -> &InstrumentRegistry {
        &self.registry
    }

    pub fn backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }

    /// A snapshot of the machine.
    pub fn status(&self) -> Status {
        Status {
            transport: self.transport_state(),
            bpm: self.bpm(),
            variation: self.variation(),
            current_step: self.current_step(),
            editing_part: self.editing_part,
            selected_track: self.selected_track,
            master_volume: self.master_volume,
        }
    }

    /// Validates a track number as an instrument.
    fn instrument(
        &self,
        track: usize,
    ) -> Result<(TrackId, &crate::instruments::Instrument), ValidationError> {
        let track = self.state.read().pattern().track(track)?;
        Ok((track, self.registry.instrument(track)?))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::audio;
    use crate::config::catalog::Catalog;
    use crate::pattern::ACCENT;

    fn machine() -> DrumMachine {
        let registry = Arc::new(InstrumentRegistry::new(&Catalog::default(), None).unwrap());
        let backend = audio::get_backend("mock", None).unwrap();
        DrumMachine::new(registry, backend, &SequencerConfig::default()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let machine = machine();
        assert_eq!(TransportState::Stopped, machine.transport_state());
        assert_eq!(132.0, machine.bpm());
        assert_eq!(Variation::AB, machine.variation());
        assert_eq!(TrackId(1), machine.selected_track());
        assert_eq!(EditingPart::A, machine.editing_part());
        assert_eq!(None, machine.current_step());
        assert!(machine.track_pattern(1).unwrap().iter().all(|s| !s));
    }

    #[test]
    fn test_edit_addressing() -> Result<(), MachineError> {
        let mut machine = machine();
        machine.handle(Command::SelectTrack(3))?;
        machine.handle(Command::EditStep {
            index: 5,
            active: true,
        })?;
        machine.handle(Command::SetEditingPart(EditingPart::B))?;
        machine.handle(Command::EditStep {
            index: 5,
            active: true,
        })?;

        let pattern = machine.track_pattern(3)?;
        let set: Vec<usize> = (0..STEPS).filter(|step| pattern[*step]).collect();
        assert_eq!(vec![5, 21], set);
        assert!(machine.column(21)?.is_active(TrackId(3)));

        machine.handle(Command::EditStep {
            index: 5,
            active: false,
        })?;
        assert!(!machine.column(21)?.is_active(TrackId(3)));
        assert!(machine.column(5)?.is_active(TrackId(3)));
        Ok(())
    }

    #[test]
    fn test_invalid_commands_do_not_mutate() {
        let mut machine = machine();
        let before = machine.state.read().clone();

        let invalid = vec![
            Command::EditStep {
                index: 16,
                active: true,
            },
            Command::SelectTrack(12),
            Command::SetTempo(79.0),
            Command::SetTempo(201.0),
            Command::SetAltGroup { track: 1, alt: 1 },
            Command::SetAltGroup { track: 0, alt: 0 },
            Command::SetPoti {
                track: 3,
                poti: 2,
                level: 50.0,
            },
            Command::SetPoti {
                track: 1,
                poti: 1,
                level: 101.0,
            },
            Command::SetLevel { track: 1, value: 0 },
            Command::SetLevel { track: 12, value: 64 },
        ];
        for command in invalid {
            assert!(
                matches!(
                    machine.handle(command.clone()),
                    Err(MachineError::Validation(_))
                ),
                "{:?} should be rejected",
                command
            );
        }

        assert_eq!(before, *machine.state.read());
        assert_eq!(132.0, machine.bpm());
        assert_eq!(TrackId(1), machine.selected_track());
    }

    #[test]
    fn test_accent_track_editing() -> Result<(), MachineError> {
        let mut machine = machine();
        machine.handle(Command::SelectTrack(0))?;
        assert_eq!(ACCENT, machine.selected_track());
        machine.handle(Command::EditStep {
            index: 0,
            active: true,
        })?;
        assert!(machine.column(0)?.accent());
        assert!(machine.column(0)?.is_silent());

        assert_eq!(
            Err(ValidationError::NotAnInstrument(0)),
            machine.track_state(0)
        );
        Ok(())
    }

    #[test]
    fn test_track_settings() -> Result<(), MachineError> {
        let mut machine = machine();
        assert_eq!(PotiLevel::Full, machine.set_poti(1, 1, 90.0)?);
        machine.handle(Command::SetAltGroup { track: 7, alt: 1 })?;
        machine.handle(Command::SetLevel {
            track: 2,
            value: 1,
        })?;

        assert_eq!(Some(PotiLevel::Full), machine.track_state(1)?.poti1());
        assert_eq!(1, machine.track_state(7)?.alt());
        assert_eq!(-15.625, machine.track_state(2)?.level_db());
        Ok(())
    }

    #[test]
    fn test_clear_track() -> Result<(), MachineError> {
        let mut machine = machine();
        for index in [0, 4, 8] {
            machine.edit_step(index, true)?;
        }
        machine.select_track(2)?;
        machine.edit_step(4, true)?;
        machine.select_track(1)?;

        machine.handle(Command::ClearTrack)?;
        assert!(machine.track_pattern(1)?.iter().all(|s| !s));
        assert!(machine.track_pattern(2)?[4]);
        Ok(())
    }

    #[test]
    fn test_master_volume() -> Result<(), MachineError> {
        let mut machine = machine();
        machine.handle(Command::SetMasterVolume(-12.0))?;
        assert_eq!(-12.0, machine.master_volume());
        let backend = machine.backend();
        assert_eq!(-12.0, backend.to_mock().unwrap().master_volume());
        Ok(())
    }

    #[test]
    fn test_play_pause() -> Result<(), MachineError> {
        let mut machine = machine();
        assert_eq!(TransportState::Running, machine.play_pause()?);
        assert_eq!(TransportState::Stopped, machine.play_pause()?);
        assert_eq!(None, machine.current_step());
        assert!(machine.status().to_string().starts_with("stopped at 132 bpm"));
        Ok(())
    }
}
