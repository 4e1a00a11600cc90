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

//! Scheduling priority for the transport's tick thread.

use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};
use tracing::{info, warn};

const PRIORITY_VAR: &str = "RHYTHMCTL_THREAD_PRIORITY";
const DISABLE_RT_VAR: &str = "RHYTHMCTL_DISABLE_RT_SCHEDULER";

const DEFAULT_PRIORITY: u8 = 70;

/// How the tick thread asks to be scheduled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickPriority {
    priority: u8,
    realtime: bool,
}

impl TickPriority {
    /// Reads the priority (0-99, otherwise the default of 70) and the realtime opt out from
    /// the environment.
    pub fn from_env() -> TickPriority {
        let priority = std::env::var(PRIORITY_VAR)
            .ok()
            .and_then(|value| value.trim().parse::<u8>().ok())
            .filter(|priority| *priority < 100)
            .unwrap_or(DEFAULT_PRIORITY);
        let realtime = !std::env::var(DISABLE_RT_VAR).is_ok_and(|value| {
            matches!(
                value.trim().to_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        });

        TickPriority { priority, realtime }
    }

    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Whether SCHED_FIFO is requested on unix.
    pub fn realtime(&self) -> bool {
        self.realtime
    }

    /// Raises the priority of the calling thread. Failures are logged and the thread keeps
    /// its normal scheduling.
    pub fn apply(&self) {
        let priority = match ThreadPriorityValue::try_from(self.priority) {
            Ok(value) => ThreadPriority::Crossplatform(value),
            Err(e) => {
                warn!(priority = self.priority, err = %e, "Invalid tick thread priority.");
                return;
            }
        };
        if let Err(e) = set_current_thread_priority(priority) {
            warn!(err = ?e, "Unable to raise tick thread priority.");
        }

        #[cfg(unix)]
        if self.realtime {
            use thread_priority::unix::{
                set_thread_priority_and_policy, thread_native_id, RealtimeThreadSchedulePolicy,
                ThreadSchedulePolicy,
            };
            match set_thread_priority_and_policy(
                thread_native_id(),
                priority,
                ThreadSchedulePolicy::Realtime(RealtimeThreadSchedulePolicy::Fifo),
            ) {
                Ok(()) => info!("Tick thread runs with SCHED_FIFO."),
                Err(e) => warn!(err = %e, "Unable to use SCHED_FIFO for the tick thread."),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_priority_from_env() {
        std::env::remove_var(PRIORITY_VAR);
        assert_eq!(70, TickPriority::from_env().priority());

        std::env::set_var(PRIORITY_VAR, "42");
        assert_eq!(42, TickPriority::from_env().priority());

        for invalid in ["150", "high", "-1"] {
            std::env::set_var(PRIORITY_VAR, invalid);
            assert_eq!(70, TickPriority::from_env().priority());
        }
        std::env::remove_var(PRIORITY_VAR);
    }

    #[test]
    #[serial]
    fn test_realtime_opt_out() {
        std::env::remove_var(DISABLE_RT_VAR);
        assert!(TickPriority::from_env().realtime());

        std::env::set_var(DISABLE_RT_VAR, "Yes");
        assert!(!TickPriority::from_env().realtime());

        std::env::set_var(DISABLE_RT_VAR, "0");
        assert!(TickPriority::from_env().realtime());
        std::env::remove_var(DISABLE_RT_VAR);
    }
}
