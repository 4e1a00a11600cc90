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
use std::io;
use std::str::FromStr;

use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{info, span, warn, Level};

use super::Event;
use crate::machine::Command;
use crate::pattern::EditingPart;
use crate::transport::Variation;

const EDIT: &str = "edit";
const PART: &str = "part";
const VARIATION: &str = "variation";
const TEMPO: &str = "tempo";
const PLAY: &str = "play";
const TRACK: &str = "track";
const ALT: &str = "alt";
const POTI: &str = "poti";
const VOLUME: &str = "volume";
const LEVEL: &str = "level";
const CLEAR: &str = "clear";
const STATUS: &str = "status";

/// A controller that drives the drum machine from typed commands.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Parses one line of input.
    fn parse(input: &str) -> Result<Event, String> {
        let mut words = input.split_whitespace();
        let keyword = words.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match (keyword.as_str(), args.as_slice()) {
            (EDIT, [index, state]) => Command::EditStep {
                index: arg(index)?,
                active: match state.to_lowercase().as_str() {
                    "on" => true,
                    "off" => false,
                    _ => return Err(format!("expected on or off, got {}", state)),
                },
            },
            (PART, [part]) => Command::SetEditingPart(arg::<EditingPart>(part)?),
            (VARIATION, [variation]) => Command::SetVariation(arg::<Variation>(variation)?),
            (TEMPO, [bpm]) => Command::SetTempo(arg(bpm)?),
            (PLAY, []) => Command::PlayPause,
            (TRACK, [track]) => Command::SelectTrack(arg(track)?),
            (ALT, [track, alt]) => Command::SetAltGroup {
                track: arg(track)?,
                alt: arg(alt)?,
            },
            (POTI, [track, poti, level]) => Command::SetPoti {
                track: arg(track)?,
                poti: arg(poti)?,
                level: arg(level)?,
            },
            (VOLUME, [db]) => Command::SetMasterVolume(arg(db)?),
            (LEVEL, [track, value]) => Command::SetLevel {
                track: arg(track)?,
                value: arg(value)?,
            },
            (CLEAR, []) => Command::ClearTrack,
            (STATUS, []) => return Ok(Event::Status),
            _ => return Err(format!("unrecognized input: {}", input.trim())),
        };
        Ok(Event::Command(command))
    }

    /// Reads one line and forwards the event it describes. Returns false once the input is
    /// exhausted.
    fn monitor_io<R, W>(events_tx: &Sender<Event>, mut reader: R, mut writer: W) -> io::Result<bool>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(
            writer,
            "Command ({} <0-15> <on|off>, {} <a|b>, {} <a|ab|b>, {} <bpm>, {}, {} <n>, \
             {} <track> <alt>, {} <track> <1|2> <0-100>, {} <db>, {} <track> <1-127>, {}, {}): ",
            EDIT, PART, VARIATION, TEMPO, PLAY, TRACK, ALT, POTI, VOLUME, LEVEL, CLEAR, STATUS,
        )?;
        writer.flush()?;

        let mut input = String::default();
        if reader.read_line(&mut input)? == 0 {
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        match Driver::parse(&input) {
            Ok(event) => events_tx
                .blocking_send(event)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
            Err(e) => warn!(input = input.trim(), err = %e, "Unrecognized input"),
        }
        Ok(true)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

fn arg<T: FromStr>(value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("invalid argument: {}", value))
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}

            info!("Keyboard input closed.");
            Ok(())
        })
    }
}
