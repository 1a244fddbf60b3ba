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

//! Event collector: an append-only event list plus a dashboard-data
//! mirror, both guarded by a single mutex so observers see a consistent
//! snapshot at call time.

use chalbench_core::{ChallengeId, Metric, Status};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const EVENT_STARTED: &str = "started";
pub const EVENT_COMPLETED: &str = "completed";
pub const EVENT_FAILED: &str = "failed";
pub const EVENT_SKIPPED: &str = "skipped";
pub const EVENT_TIMED_OUT: &str = "timed_out";
pub const EVENT_METRIC: &str = "metric";
pub const EVENT_LOG: &str = "log";
/// Emitted by the runner's status classifier in addition to the
/// canonical seven event types above.
pub const EVENT_STUCK: &str = "challenge_stuck";
pub const EVENT_POST_HOOK_WARNING: &str = "post_hook_warning";

#[derive(Debug, Clone)]
pub struct ChallengeEvent {
    pub kind: String,
    pub challenge_id: ChallengeId,
    pub name: String,
    pub category: String,
    pub status: Option<Status>,
    pub message: String,
    pub duration: Duration,
    pub timestamp: DateTime<Utc>,
    pub metrics: HashMap<String, Metric>,
}

impl ChallengeEvent {
    pub fn new(kind: impl Into<String>, challenge_id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            challenge_id: challenge_id.into(),
            name: String::new(),
            category: String::new(),
            status: None,
            message: String::new(),
            duration: Duration::ZERO,
            timestamp: Utc::now(),
            metrics: HashMap::new(),
        }
    }

    pub fn with_status(mut self, status: Status) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_metrics(mut self, metrics: HashMap<String, Metric>) -> Self {
        self.metrics = metrics;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventStats {
    pub total: u64,
    pub passed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub timed_out: u64,
}

#[derive(Debug, Clone)]
pub struct DashboardSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub running: usize,
    pub pending: usize,
    pub pass_rate: f64,
    pub elapsed: std::time::Duration,
}

#[derive(Debug, Clone)]
pub struct DashboardData {
    pub states: HashMap<ChallengeId, Status>,
    pub summary: DashboardSummary,
}

type Observer = Arc<dyn Fn(&ChallengeEvent) + Send + Sync>;

struct Inner {
    events: Vec<ChallengeEvent>,
    stats: EventStats,
    states: HashMap<ChallengeId, Status>,
    start_time: DateTime<Utc>,
}

/// Thread-safe, append-only event log with tallies and an observer list.
/// Observers run outside the lock so a slow callback cannot stall emitters.
pub struct EventCollector {
    inner: Mutex<Inner>,
    observers: Mutex<Vec<Observer>>,
}

impl EventCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                events: Vec::new(),
                stats: EventStats::default(),
                states: HashMap::new(),
                start_time: Utc::now(),
            }),
            observers: Mutex::new(Vec::new()),
        }
    }

    pub fn on_event(&self, observer: Observer) {
        self.observers.lock().push(observer);
    }

    /// Marks a set of challenge IDs as pending before any events arrive,
    /// so the dashboard summary can report a meaningful `pending` count.
    pub fn seed_pending(&self, ids: &[ChallengeId]) {
        let mut inner = self.inner.lock();
        for id in ids {
            inner.states.entry(id.clone()).or_insert(Status::Pending);
        }
    }

    pub fn emit(&self, event: ChallengeEvent) {
        {
            let mut inner = self.inner.lock();
            inner.stats.total += 1;
            if let Some(status) = event.status {
                match status {
                    Status::Passed => inner.stats.passed += 1,
                    Status::Failed => inner.stats.failed += 1,
                    Status::Skipped => inner.stats.skipped += 1,
                    Status::TimedOut => inner.stats.timed_out += 1,
                    _ => {}
                }
                inner.states.insert(event.challenge_id.clone(), status);
            } else if event.kind == EVENT_STARTED {
                inner.states.insert(event.challenge_id.clone(), Status::Running);
            }
            inner.events.push(event.clone());
        }

        let observers = self.observers.lock().clone();
        for observer in observers {
            observer(&event);
        }
    }

    pub fn emit_started(&self, challenge_id: impl Into<String>) {
        self.emit(ChallengeEvent::new(EVENT_STARTED, challenge_id));
    }

    pub fn emit_completed(&self, challenge_id: impl Into<String>, status: Status) {
        self.emit(ChallengeEvent::new(EVENT_COMPLETED, challenge_id).with_status(status));
    }

    pub fn emit_failed(&self, challenge_id: impl Into<String>, message: impl Into<String>) {
        self.emit(
            ChallengeEvent::new(EVENT_FAILED, challenge_id)
                .with_status(Status::Error)
                .with_message(message),
        );
    }

    pub fn stats(&self) -> EventStats {
        self.inner.lock().stats
    }

    pub fn events(&self) -> Vec<ChallengeEvent> {
        self.inner.lock().events.clone()
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.events.clear();
        inner.stats = EventStats::default();
        inner.states.clear();
        inner.start_time = Utc::now();
    }

    /// Deep-copied snapshot of the dashboard state, taken under the lock.
    pub fn dashboard_data(&self) -> DashboardData {
        let inner = self.inner.lock();
        let states = inner.states.clone();

        let total = states.len();
        let passed = states.values().filter(|s| **s == Status::Passed).count();
        let failed = states.values().filter(|s| **s == Status::Failed).count();
        let skipped = states.values().filter(|s| **s == Status::Skipped).count();
        let running = states.values().filter(|s| **s == Status::Running).count();
        let pending = states.values().filter(|s| **s == Status::Pending).count();
        let pass_rate = if total == 0 {
            0.0
        } else {
            (passed as f64 / total as f64) * 100.0
        };
        let elapsed = (Utc::now() - inner.start_time)
            .to_std()
            .unwrap_or_default();

        DashboardData {
            states,
            summary: DashboardSummary {
                total,
                passed,
                failed,
                skipped,
                running,
                pending,
                pass_rate,
                elapsed,
            },
        }
    }
}

impl Default for EventCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_updates_tallies_by_status() {
        let collector = EventCollector::new();
        collector.emit_started("a");
        collector.emit_completed("a", Status::Passed);
        collector.emit_completed("b", Status::Failed);
        let stats = collector.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.passed, 1);
        assert_eq!(stats.failed, 1);
    }

    #[test]
    fn observers_run_outside_the_lock() {
        let collector = EventCollector::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        collector.on_event(Arc::new(move |_event| {
            calls2.fetch_add(1, Ordering::SeqCst);
        }));
        collector.emit_started("a");
        collector.emit_completed("a", Status::Passed);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dashboard_summary_reflects_seeded_and_completed_states() {
        let collector = EventCollector::new();
        collector.seed_pending(&["a".to_string(), "b".to_string()]);
        collector.emit_started("a");
        collector.emit_completed("a", Status::Passed);

        let dashboard = collector.dashboard_data();
        assert_eq!(dashboard.summary.total, 2);
        assert_eq!(dashboard.summary.passed, 1);
        assert_eq!(dashboard.summary.pending, 1);
        assert!((dashboard.summary.pass_rate - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn reset_clears_events_and_stats() {
        let collector = EventCollector::new();
        collector.emit_started("a");
        collector.reset();
        assert_eq!(collector.stats().total, 0);
        assert!(collector.events().is_empty());
    }
}
