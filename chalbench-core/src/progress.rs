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

//! Progress reporter: the non-blocking conduit a running challenge uses to
//! signal forward progress to the liveness monitor.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Recommended bounded-channel capacity.
pub const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub data: HashMap<String, JsonValue>,
}

struct Inner {
    last: Mutex<Option<ProgressUpdate>>,
    sender: mpsc::Sender<ProgressUpdate>,
    closed: AtomicBool,
}

/// Handle a challenge uses to report progress. Cheaply cloneable; all
/// clones share the same underlying channel and last-update cell.
#[derive(Clone)]
pub struct ProgressReporter {
    inner: Arc<Inner>,
}

/// Read-only side, handed to the liveness monitor.
pub struct ProgressChannel {
    receiver: mpsc::Receiver<ProgressUpdate>,
}

impl ProgressReporter {
    /// Creates a reporter/channel pair with the recommended buffer capacity.
    pub fn new() -> (Self, ProgressChannel) {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> (Self, ProgressChannel) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let reporter = Self {
            inner: Arc::new(Inner {
                last: Mutex::new(None),
                sender,
                closed: AtomicBool::new(false),
            }),
        };
        (reporter, ProgressChannel { receiver })
    }

    /// Stamps `now`, updates the stored last-update unconditionally, then
    /// attempts a non-blocking send. A full buffer silently drops the
    /// update from the stream — the last-update cell still reflects it.
    pub fn report_progress(&self, message: impl Into<String>, data: HashMap<String, JsonValue>) {
        let update = ProgressUpdate {
            timestamp: Utc::now(),
            message: message.into(),
            data,
        };
        *self.inner.last.lock() = Some(update.clone());

        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        // try_send: non-blocking, drops on a full buffer or after close.
        let _ = self.inner.sender.try_send(update);
    }

    pub fn last_update(&self) -> Option<ProgressUpdate> {
        self.inner.last.lock().clone()
    }

    /// Idempotent. After the first call, `report_progress` keeps updating
    /// `last_update` but never sends again.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
    }
}

impl ProgressChannel {
    pub async fn recv(&mut self) -> Option<ProgressUpdate> {
        self.receiver.recv().await
    }
}
