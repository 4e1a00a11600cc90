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
use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;
use tracing::debug;

use super::{BackendError, Trigger};
use crate::samples::AssetIndex;

/// The number of recent triggers kept by the mock backend.
const RECORDED_TRIGGERS: usize = 1024;

/// A mock backend. Doesn't play anything, but remembers the most recent triggers it was
/// handed.
pub struct Backend {
    name: String,
    assets: Option<AssetIndex>,
    triggers: Mutex<VecDeque<Trigger>>,
    master_volume: Mutex<f32>,
}

impl Backend {
    /// Creates a mock backend. With an asset index, triggers for samples outside of it are
    /// rejected.
    pub fn new(name: &str, assets: Option<AssetIndex>) -> Backend {
        Backend {
            name: name.to_string(),
            assets,
            triggers: Mutex::new(VecDeque::with_capacity(RECORDED_TRIGGERS)),
            master_volume: Mutex::new(0.0),
        }
    }

    /// The most recently accepted triggers, oldest first.
    pub fn triggers(&self) -> Vec<Trigger> {
        self.triggers.lock().iter().cloned().collect()
    }

    /// Forgets the recorded triggers.
    pub fn clear(&self) {
        self.triggers.lock().clear();
    }

    /// The current master volume in dB.
    pub fn master_volume(&self) -> f32 {
        *self.master_volume.lock()
    }
}

impl super::Backend for Backend {
    fn trigger(&self, trigger: Trigger) -> Result<(), BackendError> {
        if let Some(assets) = &self.assets {
            if !assets.contains(&trigger.sample) {
                return Err(BackendError::MissingSample(trigger.sample));
            }
        }

        debug!(
            backend = self.name,
            track = trigger.track.0,
            sample = %trigger.sample,
            velocity = trigger.velocity,
            gain_db = trigger.gain_db,
            "Trigger."
        );
        let mut triggers = self.triggers.lock();
        if triggers.len() == RECORDED_TRIGGERS {
            triggers.pop_front();
        }
        triggers.push_back(trigger);
        Ok(())
    }

    fn set_master_volume(&self, db: f32) {
        *self.master_volume.lock() = db;
    }

    #[cfg(test)]
    fn to_mock(&self) -> Option<&Backend> {
        Some(self)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::audio::Backend as _;
    use crate::pattern::TrackId;
    use crate::samples::SampleId;

    fn trigger(sample: &str) -> Trigger {
        Trigger {
            track: TrackId(1),
            sample: SampleId::new(sample),
            length: Duration::from_millis(125),
            velocity: 0.6,
            gain_db: 0.0,
            at: Instant::now(),
        }
    }

    #[test]
    fn test_records_triggers() {
        let backend = Backend::new("mock", None);
        backend.trigger(trigger("BD5050")).unwrap();
        backend.trigger(trigger("BD5050")).unwrap();
        backend.set_master_volume(-3.0);

        assert_eq!(2, backend.triggers().len());
        assert_eq!(-3.0, backend.master_volume());
        assert_eq!("mock (Mock)", backend.to_string());

        backend.clear();
        assert!(backend.triggers().is_empty());
    }

    #[test]
    fn test_keeps_recent_triggers() {
        let backend = Backend::new("mock", None);
        for i in 0..RECORDED_TRIGGERS + 6 {
            let mut trigger = trigger("CB");
            trigger.gain_db = i as f32;
            backend.trigger(trigger).unwrap();
        }

        let triggers = backend.triggers();
        assert_eq!(RECORDED_TRIGGERS, triggers.len());
        assert_eq!(6.0, triggers[0].gain_db);
        assert_eq!((RECORDED_TRIGGERS + 5) as f32, triggers[RECORDED_TRIGGERS - 1].gain_db);
    }

    #[test]
    fn test_rejects_unknown_samples() {
        let assets: AssetIndex = ["CB"].into_iter().collect();
        let backend = Backend::new("mock", Some(assets));

        assert!(backend.trigger(trigger("CB")).is_ok());
        assert_eq!(
            Err(BackendError::MissingSample(SampleId::new("CH"))),
            backend.trigger(trigger("CH"))
        );
        assert_eq!(1, backend.triggers().len());
    }
}
