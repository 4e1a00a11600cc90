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
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinError;
use tokio::{sync::mpsc::Sender, task::JoinHandle};
use tracing::{error, info, span, Instrument, Level};

use crate::machine::{Command, DrumMachine};

pub mod keyboard;

/// Controller events that will trigger behavior in the drum machine.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// A command for the drum machine.
    Command(Command),

    /// Reports the machine status.
    Status,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>>;
}

/// Drives a drum machine from a driver's events.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver. The controller owns the machine until
    /// the driver closes.
    pub fn new(machine: DrumMachine, driver: Arc<dyn Driver>) -> Controller {
        Controller {
            handle: tokio::spawn(
                Controller::trigger_events(machine, driver)
                    .instrument(span!(Level::INFO, "controller")),
            ),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Applies driver events to the machine until the driver closes.
    async fn trigger_events(mut machine: DrumMachine, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(status = %machine.status(), "Controller started.");

        while let Some(event) = events_rx.recv().await {
            info!(event = ?event, "Received event.");

            match event {
                Event::Command(command) => {
                    if let Err(e) = machine.handle(command) {
                        error!(err = %e, "Command rejected.");
                    }
                }
                Event::Status => info!(status = %machine.status(), "Status."),
            }
        }

        info!("Controller closing.");
        machine.stop();
        match join_handle.await {
            Ok(Err(e)) => error!(err = %e, "Event monitor failed."),
            Err(e) => error!(err = %e, "Error waiting for event monitor to stop."),
            Ok(Ok(())) => {}
        }
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use std::sync::Arc;

    use tokio::sync::{mpsc::Sender, Notify};
    use tokio::task::JoinHandle;

    use super::{Controller, Driver, Event};
    use crate::audio;
    use crate::config::catalog::Catalog;
    use crate::config::sequencer::SequencerConfig;
    use crate::instruments::InstrumentRegistry;
    use crate::machine::{Command, DrumMachine};
    use crate::samples::SampleId;
    use crate::testutil::eventually_async;

    /// Sends a fixed list of events, then holds the channel open until released.
    struct ScriptDriver {
        events: Vec<Event>,
        release: Arc<Notify>,
    }

    impl Driver for ScriptDriver {
        fn monitor_events(&self, events_tx: Sender<Event>) -> JoinHandle<Result<(), io::Error>> {
            let events = self.events.clone();
            let release = self.release.clone();
            tokio::spawn(async move {
                for event in events {
                    events_tx
                        .send(event)
                        .await
                        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
                }
                release.notified().await;
                Ok(())
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_controller() {
        let registry = Arc::new(InstrumentRegistry::new(&Catalog::default(), None).unwrap());
        let backend = audio::get_backend("mock", None).unwrap();
        let machine =
            DrumMachine::new(registry, backend.clone(), &SequencerConfig::default()).unwrap();

        let release = Arc::new(Notify::new());
        let driver = Arc::new(ScriptDriver {
            events: vec![
                Event::Command(Command::SelectTrack(3)),
                // Rejected, the controller carries on.
                Event::Command(Command::SetTempo(500.0)),
                Event::Command(Command::EditStep {
                    index: 0,
                    active: true,
                }),
                Event::Status,
                Event::Command(Command::PlayPause),
            ],
            release: release.clone(),
        });
        let mut controller = Controller::new(machine, driver);

        let mock_backend = backend.clone();
        eventually_async(
            || {
                let backend = mock_backend.clone();
                async move { !backend.to_mock().unwrap().triggers().is_empty() }
            },
            "Controller never started playback",
        )
        .await;

        release.notify_one();
        controller.join().await.unwrap();

        let mock = backend.to_mock().unwrap();
        let triggers = mock.triggers();
        assert_eq!(SampleId::new("LT50"), triggers[0].sample);

        // The transport stopped when the controller closed.
        let count = triggers.len();
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert_eq!(count, mock.triggers().len());
    }
}
