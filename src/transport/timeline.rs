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
use std::time::{Duration, Instant};

/// The number of ticks per quarter note.
const TICKS_PER_BEAT: f64 = 4.0;

/// The length of one sixteenth note at the given tempo.
pub fn step_length(bpm: f64) -> Duration {
    Duration::from_secs_f64(60.0 / bpm / TICKS_PER_BEAT)
}

/// Absolute tick times. Every tick is placed one step after the previous tick's scheduled
/// time, never after the time the scheduler actually woke up.
#[derive(Clone, Debug)]
pub struct Timeline {
    next: Instant,
    ticks: u64,
}

impl Timeline {
    /// Creates a timeline whose first tick is at the given instant.
    pub fn new(start: Instant) -> Timeline {
        Timeline {
            next: start,
            ticks: 0,
        }
    }

    /// The time of the next tick.
    pub fn next(&self) -> Instant {
        self.next
    }

    /// The number of ticks handed out so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// When the scheduler has to be awake to emit the next tick ahead of time.
    pub fn wake_time(&self, lookahead: Duration) -> Instant {
        self.next.checked_sub(lookahead).unwrap_or(self.next)
    }

    /// Returns true if the next tick falls inside the lookahead window.
    pub fn is_due(&self, now: Instant, lookahead: Duration) -> bool {
        self.next <= now + lookahead
    }

    /// Hands out the next tick and its length at the given tempo. The tick after it is
    /// placed one step later.
    pub fn advance(&mut self, bpm: f64) -> (Instant, Duration) {
        let at = self.next;
        let length = step_length(bpm);
        self.next = at + length;
        self.ticks += 1;
        (at, length)
    }

    /// Skips every tick that is more than `tolerance` overdue, keeping later ticks on the
    /// same grid. Returns the number of skipped ticks.
    pub fn skip_missed(&mut self, now: Instant, bpm: f64, tolerance: Duration) -> u32 {
        let Some(behind) = now
            .checked_sub(tolerance)
            .and_then(|cutoff| cutoff.checked_duration_since(self.next))
        else {
            return 0;
        };
        if behind.is_zero() {
            return 0;
        }

        let length = step_length(bpm);
        let missed = (behind.as_secs_f64() / length.as_secs_f64()).ceil() as u32;
        self.next += length * missed;
        self.ticks += u64::from(missed);
        missed
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_step_length() {
        assert_eq!(Duration::from_millis(125), step_length(120.0));
        assert_eq!(Duration::from_micros(156_250), step_length(96.0));
        let at_132 = step_length(132.0).as_secs_f64();
        assert!((at_132 - 60.0 / 132.0 / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_ticks_are_exactly_one_step_apart() {
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        let times: Vec<Instant> = (0..64).map(|_| timeline.advance(120.0).0).collect();
        assert_eq!(start, times[0]);
        for pair in times.windows(2) {
            assert_eq!(Duration::from_millis(125), pair[1] - pair[0]);
        }
        assert_eq!(start + Duration::from_millis(125 * 64), timeline.next());
        assert_eq!(64, timeline.ticks());
    }

    #[test]
    fn test_tempo_change_only_affects_later_ticks() {
        let start = Instant::now();
        let mut timeline = Timeline::new(start);

        timeline.advance(120.0);
        let (second, length) = timeline.advance(120.0);
        assert_eq!(start + Duration::from_millis(125), second);
        assert_eq!(Duration::from_millis(125), length);

        // The third tick was already placed at the old tempo.
        let (third, length) = timeline.advance(96.0);
        assert_eq!(start + Duration::from_millis(250), third);
        assert_eq!(Duration::from_micros(156_250), length);

        let (fourth, _) = timeline.advance(96.0);
        assert_eq!(third + Duration::from_micros(156_250), fourth);
    }

    #[test]
    fn test_skip_missed() {
        let start = Instant::now();
        let mut timeline = Timeline::new(start);
        let tolerance = Duration::from_millis(50);

        // Late, but within tolerance.
        assert_eq!(0, timeline.skip_missed(start + tolerance, 120.0, tolerance));
        assert_eq!(start, timeline.next());

        // 600ms behind: the ticks at 0, 125, 250, 375 and 500ms are stale.
        let now = start + Duration::from_millis(600);
        assert_eq!(5, timeline.skip_missed(now, 120.0, tolerance));
        assert_eq!(start + Duration::from_millis(625), timeline.next());
        assert_eq!(5, timeline.ticks());

        // The grid is kept for the ticks that follow.
        let (at, _) = timeline.advance(120.0);
        assert_eq!(start + Duration::from_millis(625), at);
        assert_eq!(0, timeline.skip_missed(now, 120.0, tolerance));
    }

    #[test]
    fn test_lookahead() {
        let start = Instant::now() + Duration::from_secs(1);
        let timeline = Timeline::new(start);
        let lookahead = Duration::from_millis(100);

        assert_eq!(start - lookahead, timeline.wake_time(lookahead));
        assert!(!timeline.is_due(start - Duration::from_millis(150), lookahead));
        assert!(timeline.is_due(start - Duration::from_millis(100), lookahead));
        assert!(timeline.is_due(start, lookahead));
    }
}
