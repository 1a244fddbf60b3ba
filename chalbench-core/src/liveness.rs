// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Liveness monitor: a per-execution watchdog that cancels a
//! challenge when no progress has been reported within a stale threshold.

use crate::cancel::CancellationToken;
use crate::progress::ProgressChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handle returned by `LivenessMonitor::spawn`. `stop()` is safe to call any
/// number of times, from any thread, even after the monitor task exited.
pub struct LivenessMonitor {
    stop_token: CancellationToken,
    stuck: Arc<AtomicBool>,
    enabled: bool,
}

impl LivenessMonitor {
    /// Starts the watchdog. If `stale_threshold` is zero the monitor is
    /// disabled: `stop()` becomes a no-op and `is_stuck()` always reports
    /// false.
    pub fn spawn(
        mut progress: ProgressChannel,
        stale_threshold: Duration,
        cancel_execution: CancellationToken,
        challenge_id: String,
    ) -> Self {
        let stop_token = CancellationToken::new();
        let stuck = Arc::new(AtomicBool::new(false));

        if stale_threshold.is_zero() {
            return Self {
                stop_token,
                stuck,
                enabled: false,
            };
        }

        let task_stop = stop_token.clone();
        let task_stuck = Arc::clone(&stuck);
        let task_id = challenge_id;

        tokio::spawn(async move {
            let mut timer = Box::pin(tokio::time::sleep(stale_threshold));
            loop {
                tokio::select! {
                    biased;
                    _ = task_stop.cancelled() => {
                        return;
                    }
                    update = progress.recv() => {
                        match update {
                            Some(_) => {
                                timer.as_mut().reset(tokio::time::Instant::now() + stale_threshold);
                            }
                            None => return,
                        }
                    }
                    _ = &mut timer => {
                        tracing::warn!(challenge_id = %task_id, "challenge_stuck: no progress within stale threshold");
                        task_stuck.store(true, Ordering::Release);
                        cancel_execution.cancel();
                        return;
                    }
                }
            }
        });

        Self {
            stop_token,
            stuck,
            enabled: true,
        }
    }

    /// A monitor over a challenge with no progress reporter attached, or a
    /// zero stale threshold, is simply disabled.
    pub fn disabled() -> Self {
        Self {
            stop_token: CancellationToken::new(),
            stuck: Arc::new(AtomicBool::new(false)),
            enabled: false,
        }
    }

    pub fn stop(&self) {
        if self.enabled {
            self.stop_token.cancel();
        }
    }

    pub fn is_stuck(&self) -> bool {
        self.stuck.load(Ordering::Acquire)
    }
}
