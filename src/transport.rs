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

//! The transport: a dedicated tick thread that walks the loop window at the current tempo.
//!
//! Ticks are placed on an absolute timeline and emitted up to `lookahead` before they are
//! due. Between ticks the thread waits on the cancel handle until shortly before the next
//! wake up and spins for the rest, so `stop()` can interrupt it at any time. Steps that
//! fall too far behind the clock are skipped, keeping the loop position on the grid.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, span, warn, Level};

use crate::error::ValidationError;
use crate::pattern::{Column, Step, TrackId};
use crate::playsync::CancelHandle;
use crate::state::SequencerState;
use crate::thread_priority::TickPriority;

mod timeline;
mod window;

pub use timeline::{step_length, Timeline};
pub use window::{LoopCursor, Variation};

const DEFAULT_MIN_TEMPO: f64 = 80.0;
const DEFAULT_MAX_TEMPO: f64 = 200.0;

/// The last stretch before a wake up is spun rather than slept.
const SPIN_MARGIN: Duration = Duration::from_millis(2);

/// Steps later than this are skipped rather than played.
const MAX_LATENESS: Duration = Duration::from_millis(50);

/// Events buffered per observer before further events are dropped for it.
const OBSERVER_CAPACITY: usize = 128;

/// The tempo range accepted by the transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TempoRange {
    min: f64,
    max: f64,
}

impl TempoRange {
    /// Creates a tempo range. Returns none if the range is empty or not positive.
    pub fn new(min: f64, max: f64) -> Option<TempoRange> {
        (min.is_finite() && max.is_finite() && min > 0.0 && min <= max)
            .then_some(TempoRange { min, max })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Checks that the tempo is within the range.
    pub fn validate(&self, bpm: f64) -> Result<f64, ValidationError> {
        if (self.min..=self.max).contains(&bpm) {
            Ok(bpm)
        } else {
            Err(ValidationError::Tempo {
                bpm,
                min: self.min,
                max: self.max,
            })
        }
    }
}

impl Default for TempoRange {
    fn default() -> Self {
        TempoRange {
            min: DEFAULT_MIN_TEMPO,
            max: DEFAULT_MAX_TEMPO,
        }
    }
}

/// One tick of the transport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepEvent {
    column: Column,
    scheduled_at: Instant,
    step_length: Duration,
}

impl StepEvent {
    pub(crate) fn new(column: Column, scheduled_at: Instant, step_length: Duration) -> StepEvent {
        StepEvent {
            column,
            scheduled_at,
            step_length,
        }
    }

    /// The pattern column as it was when the tick was emitted.
    pub fn column(&self) -> &Column {
        &self.column
    }

    pub fn step(&self) -> Step {
        self.column.step()
    }

    pub fn accent(&self) -> bool {
        self.column.accent()
    }

    pub fn is_active(&self, track: TrackId) -> bool {
        self.column.is_active(track)
    }

    /// When the step should sound.
    pub fn scheduled_at(&self) -> Instant {
        self.scheduled_at
    }

    /// The length of one step at the tempo the tick was scheduled with.
    pub fn step_length(&self) -> Duration {
        self.step_length
    }
}

/// Receives every tick while the sequencer state is held for reading.
pub trait StepSink: Send + Sync {
    fn on_step(&self, event: &StepEvent, state: &SequencerState);
}

/// Whether the transport is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Stopped => write!(f, "stopped"),
            TransportState::Running => write!(f, "running"),
        }
    }
}

/// Settings read by the tick thread once per tick.
struct Settings {
    bpm: f64,
    cursor: LoopCursor,
}

/// State shared between the scheduler and its tick thread.
struct Shared {
    settings: Mutex<Settings>,
    current_step: Mutex<Option<Step>>,
    observers: Mutex<Vec<Sender<StepEvent>>>,
}

impl Shared {
    /// Hands the event to every observer. Full observers miss the event, disconnected ones
    /// are dropped.
    fn publish(&self, event: &StepEvent) {
        self.observers
            .lock()
            .retain(|observer| match observer.try_send(*event) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

/// A running tick thread.
struct TickThread {
    cancel_handle: CancelHandle,
    join: thread::JoinHandle<()>,
}

/// Drives the pattern in time.
pub struct TransportScheduler {
    state: Arc<RwLock<SequencerState>>,
    sink: Arc<dyn StepSink>,
    shared: Arc<Shared>,
    range: TempoRange,
    lookahead: Duration,
    tick_thread: Option<TickThread>,
}

impl TransportScheduler {
    /// Creates a stopped transport at the given tempo.
    pub fn new(
        state: Arc<RwLock<SequencerState>>,
        sink: Arc<dyn StepSink>,
        range: TempoRange,
        bpm: f64,
        lookahead: Duration,
    ) -> Result<TransportScheduler, ValidationError> {
        let bpm = range.validate(bpm)?;
        Ok(TransportScheduler {
            state,
            sink,
            shared: Arc::new(Shared {
                settings: Mutex::new(Settings {
                    bpm,
                    cursor: LoopCursor::new(Variation::default()),
                }),
                current_step: Mutex::new(None),
                observers: Mutex::new(Vec::new()),
            }),
            range,
            lookahead,
            tick_thread: None,
        })
    }

    /// Starts the tick thread. Playback begins at the start of the loop window. Does nothing
    /// if the transport is already running.
    pub fn start(&mut self) -> Result<(), io::Error> {
        if self.tick_thread.is_some() {
            return Ok(());
        }

        let (bpm, variation) = {
            let mut settings = self.shared.settings.lock();
            settings.cursor.rewind();
            (settings.bpm, settings.cursor.requested())
        };

        let cancel_handle = CancelHandle::new();
        let join = {
            let state = self.state.clone();
            let sink = self.sink.clone();
            let shared = self.shared.clone();
            let lookahead = self.lookahead;
            let cancel_handle = cancel_handle.clone();
            thread::Builder::new()
                .name("transport".to_string())
                .spawn(move || {
                    TransportScheduler::run(state, sink, shared, lookahead, cancel_handle)
                })?
        };

        info!(bpm, variation = %variation, "Transport started.");
        self.tick_thread = Some(TickThread {
            cancel_handle,
            join,
        });
        Ok(())
    }

    /// Stops the tick thread. Once this returns no further tick is emitted.
    pub fn stop(&mut self) {
        let Some(tick_thread) = self.tick_thread.take() else {
            return;
        };

        tick_thread.cancel_handle.cancel();
        if tick_thread.join.join().is_err() {
            error!("Transport tick thread panicked.");
        }
        *self.shared.current_step.lock() = None;
        info!("Transport stopped.");
    }

    /// Changes the tempo for every tick that isn't scheduled yet.
    pub fn set_tempo(&self, bpm: f64) -> Result<f64, ValidationError> {
        let bpm = self.range.validate(bpm)?;
        self.shared.settings.lock().bpm = bpm;
        Ok(bpm)
    }

    pub fn bpm(&self) -> f64 {
        self.shared.settings.lock().bpm
    }

    pub fn tempo_range(&self) -> TempoRange {
        self.range
    }

    /// Selects the loop window. While running the change waits for the current window to
    /// complete.
    pub fn set_variation(&self, variation: Variation) {
        self.shared.settings.lock().cursor.request(variation);
    }

    /// The most recently selected variation.
    pub fn variation(&self) -> Variation {
        self.shared.settings.lock().cursor.requested()
    }

    pub fn is_running(&self) -> bool {
        self.tick_thread.is_some()
    }

    pub fn state(&self) -> TransportState {
        if self.is_running() {
            TransportState::Running
        } else {
            TransportState::Stopped
        }
    }

    /// The step most recently emitted, or none while stopped.
    pub fn current_step(&self) -> Option<Step> {
        *self.shared.current_step.lock()
    }

    /// Subscribes to step events. Events are dropped for observers that fall behind.
    pub fn subscribe(&self) -> Receiver<StepEvent> {
        let (tx, rx) = crossbeam_channel::bounded(OBSERVER_CAPACITY);
        self.shared.observers.lock().push(tx);
        rx
    }

    /// The tick loop.
    fn run(
        state: Arc<RwLock<SequencerState>>,
        sink: Arc<dyn StepSink>,
        shared: Arc<Shared>,
        lookahead: Duration,
        cancel_handle: CancelHandle,
    ) {
        let span = span!(Level::INFO, "transport");
        let _enter = span.enter();

        TickPriority::from_env().apply();

        let mut timeline = Timeline::new(Instant::now());
        loop {
            loop {
                let now = Instant::now();
                if !timeline.is_due(now, lookahead) {
                    break;
                }
                if cancel_handle.is_cancelled() {
                    return;
                }

                let (step, bpm, missed) = {
                    let mut settings = shared.settings.lock();
                    let missed = timeline.skip_missed(now, settings.bpm, MAX_LATENESS);
                    for _ in 0..missed {
                        settings.cursor.advance();
                    }
                    (settings.cursor.advance(), settings.bpm, missed)
                };
                if missed > 0 {
                    warn!(missed, "Transport fell behind, skipped stale steps.");
                }
                let (scheduled_at, step_length) = timeline.advance(bpm);

                let event = {
                    let state = state.read();
                    *shared.current_step.lock() = Some(step);
                    // The read lock may have been contended for a while.
                    if Instant::now() > scheduled_at + MAX_LATENESS {
                        warn!(step = step.index(), "Dropped a stale step.");
                        continue;
                    }
                    let event =
                        StepEvent::new(state.pattern().column_at(step), scheduled_at, step_length);
                    sink.on_step(&event, &state);
                    event
                };
                shared.publish(&event);
                debug!(step = step.index(), accent = event.accent(), "Tick.");
            }

            let wake = timeline.wake_time(lookahead);
            let coarse = wake.checked_sub(SPIN_MARGIN).unwrap_or(wake);
            if cancel_handle.wait_until(coarse) {
                return;
            }
            let now = Instant::now();
            if wake > now {
                spin_sleep::sleep(wake - now);
            }
        }
    }
}

impl Drop for TransportScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::catalog::Catalog;
    use crate::instruments::InstrumentRegistry;
    use crate::testutil::eventually;

    /// Records the step and whether track 1 was set for every tick.
    #[derive(Default)]
    struct RecordingSink {
        ticks: Mutex<Vec<(usize, bool)>>,
        timing: Mutex<Vec<(usize, Instant, Instant)>>,
    }

    impl RecordingSink {
        fn steps(&self) -> Vec<usize> {
            self.ticks.lock().iter().map(|(step, _)| *step).collect()
        }

        fn len(&self) -> usize {
            self.ticks.lock().len()
        }
    }

    impl StepSink for RecordingSink {
        fn on_step(&self, event: &StepEvent, _: &SequencerState) {
            self.ticks
                .lock()
                .push((event.step().index(), event.is_active(TrackId(1))));
            self.timing
                .lock()
                .push((event.step().index(), event.scheduled_at(), Instant::now()));
        }
    }

    fn fast_transport() -> (
        TransportScheduler,
        Arc<RecordingSink>,
        Arc<RwLock<SequencerState>>,
    ) {
        let registry = InstrumentRegistry::new(&Catalog::default(), None).unwrap();
        let state = Arc::new(RwLock::new(SequencerState::new(&registry)));
        let sink = Arc::new(RecordingSink::default());
        // 1500 bpm gives a 10ms step.
        let transport = TransportScheduler::new(
            state.clone(),
            sink.clone(),
            TempoRange::new(60.0, 2000.0).unwrap(),
            1500.0,
            Duration::from_millis(5),
        )
        .unwrap();
        (transport, sink, state)
    }

    #[test]
    fn test_tempo_range() {
        let range = TempoRange::default();
        assert_eq!(Ok(132.0), range.validate(132.0));
        assert_eq!(Ok(80.0), range.validate(80.0));
        assert_eq!(
            Err(ValidationError::Tempo {
                bpm: 201.0,
                min: 80.0,
                max: 200.0
            }),
            range.validate(201.0)
        );
        assert!(range.validate(f64::NAN).is_err());
        assert!(TempoRange::new(200.0, 80.0).is_none());
        assert!(TempoRange::new(0.0, 80.0).is_none());
    }

    #[test]
    fn test_start_stop() {
        let (mut transport, sink, _state) = fast_transport();
        assert_eq!(TransportState::Stopped, transport.state());
        assert_eq!(None, transport.current_step());

        transport.start().unwrap();
        assert_eq!(TransportState::Running, transport.state());
        eventually(|| sink.len() >= 40, "Transport never ticked");

        transport.stop();
        assert_eq!(TransportState::Stopped, transport.state());
        assert_eq!(None, transport.current_step());

        // Ticks are the default AB window in order.
        let steps = sink.steps();
        let expected: Vec<usize> = (0..steps.len()).map(|tick| tick % 32).collect();
        assert_eq!(expected, steps);

        let stopped_at = sink.len();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(stopped_at, sink.len());
    }

    #[test]
    fn test_restart_begins_at_window_start() {
        let (mut transport, sink, _state) = fast_transport();
        transport.set_variation(Variation::B);
        transport.start().unwrap();
        eventually(|| sink.len() >= 5, "Transport never ticked");
        transport.stop();
        assert_eq!(16, sink.steps()[0]);

        sink.ticks.lock().clear();
        transport.set_variation(Variation::A);
        transport.start().unwrap();
        eventually(|| sink.len() >= 20, "Transport never ticked");
        transport.stop();

        let steps = sink.steps();
        assert_eq!(0, steps[0]);
        assert!(steps.iter().all(|step| *step < 16));
    }

    #[test]
    fn test_variation_change_waits_for_boundary() {
        let (mut transport, sink, _state) = fast_transport();
        transport.set_variation(Variation::A);
        transport.start().unwrap();
        eventually(|| sink.len() >= 3, "Transport never ticked");
        transport.set_variation(Variation::B);
        assert_eq!(Variation::B, transport.variation());
        eventually(|| sink.steps().contains(&16), "Variation B never started");
        transport.stop();

        let steps = sink.steps();
        let switch = steps.iter().position(|step| *step == 16).unwrap();
        // The A window ran to its end before B took over.
        assert_eq!(15, steps[switch - 1]);
        assert!(steps[..switch].iter().all(|step| *step < 16));
        assert!(steps[switch..].iter().all(|step| *step >= 16));
    }

    #[test]
    fn test_edits_are_seen_by_later_ticks() {
        let (mut transport, sink, state) = fast_transport();
        state
            .write()
            .pattern_mut()
            .set_step(0, TrackId(1), true)
            .unwrap();

        transport.start().unwrap();
        eventually(|| sink.len() >= 33, "Transport never completed a cycle");
        transport.stop();

        let ticks = sink.ticks.lock().clone();
        assert_eq!((0, true), ticks[0]);
        assert_eq!((1, false), ticks[1]);
        assert_eq!((0, true), ticks[32]);
    }

    #[test]
    fn test_subscribe() {
        let (mut transport, _sink, _state) = fast_transport();
        let events = transport.subscribe();
        let dropped = transport.subscribe();
        drop(dropped);

        transport.start().unwrap();
        let first = events.recv_timeout(Duration::from_secs(3)).unwrap();
        let second = events.recv_timeout(Duration::from_secs(3)).unwrap();
        transport.stop();

        assert_eq!(0, first.step().index());
        assert_eq!(1, second.step().index());
        assert_eq!(step_length(1500.0), first.step_length());
        assert_eq!(
            first.scheduled_at() + first.step_length(),
            second.scheduled_at()
        );
        assert_eq!(1, transport.shared.observers.lock().len());
    }

    #[test]
    fn test_set_tempo() {
        let (transport, _sink, _state) = fast_transport();
        assert_eq!(Ok(120.0), transport.set_tempo(120.0));
        assert_eq!(120.0, transport.bpm());
        assert!(transport.set_tempo(3000.0).is_err());
        assert_eq!(120.0, transport.bpm());
    }

    #[test]
    fn test_stall_skips_stale_steps() {
        let (mut transport, sink, state) = fast_transport();
        transport.start().unwrap();
        eventually(|| sink.len() >= 10, "Transport never ticked");

        {
            let _stall = state.write();
            thread::sleep(Duration::from_millis(300));
        }
        let resumed = sink.len();
        eventually(|| sink.len() >= resumed + 20, "Transport never resumed");
        transport.stop();

        let timing = sink.timing.lock().clone();
        let (_, first, _) = timing[0];
        let length = step_length(1500.0).as_secs_f64();
        let mut last_tick = 0;
        for &(step, scheduled_at, emitted) in &timing {
            // Nothing is played long after it was due.
            assert!(emitted.saturating_duration_since(scheduled_at) < Duration::from_millis(100));
            // Skipped steps still move the loop position.
            last_tick = ((scheduled_at - first).as_secs_f64() / length).round() as usize;
            assert_eq!(last_tick % 32, step);
        }
        // Most of the 30 steps inside the stall were never played.
        assert!(last_tick + 1 >= timing.len() + 20);
    }
}
