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

//! An 808 style drum machine: a 32 step pattern, per instrument sample variants and a
//! transport that triggers samples on an audio backend in musical time.

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod instruments;
pub mod machine;
pub mod pattern;
pub mod playback;
pub mod playsync;
pub mod samples;
pub mod state;
pub mod thread_priority;
pub mod track;
pub mod transport;

#[cfg(test)]
mod testutil;
