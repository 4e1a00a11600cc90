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
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pattern::TrackId;
use crate::samples::{AssetIndex, SampleId};

pub mod mock;

/// A request to play one sample.
#[derive(Clone, Debug, PartialEq)]
pub struct Trigger {
    /// The instrument track the sample belongs to.
    pub track: TrackId,
    /// The sample to play.
    pub sample: SampleId,
    /// The length of one step at the current tempo.
    pub length: Duration,
    /// Playback velocity.
    pub velocity: f32,
    /// Track gain in dB.
    pub gain_db: f32,
    /// When the sample should sound.
    pub at: Instant,
}

/// Errors reported by a backend when handed a trigger.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("backend has no sample {0}")]
    MissingSample(SampleId),

    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Plays samples. Triggers are fire and forget: a backend must never block the caller
/// until the sample has played.
pub trait Backend: Any + fmt::Display + Send + Sync {
    /// Schedules the sample described by the trigger.
    fn trigger(&self, trigger: Trigger) -> Result<(), BackendError>;

    /// Sets the output volume in dB.
    fn set_master_volume(&self, db: f32);

    #[cfg(test)]
    fn to_mock(&self) -> Option<&mock::Backend>;
}

/// Gets the backend with the given name.
pub fn get_backend(
    name: &str,
    assets: Option<AssetIndex>,
) -> Result<Arc<dyn Backend>, BackendError> {
    if name.starts_with("mock") {
        return Ok(Arc::new(mock::Backend::new(name, assets)));
    }

    Err(BackendError::Unavailable(format!(
        "no backend named {}",
        name
    )))
}
