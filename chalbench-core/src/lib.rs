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

//! # chalbench-core
//!
//! Data model, progress reporting and liveness monitoring for the chalbench
//! challenge execution engine. This crate has no opinion on scheduling or
//! assertion evaluation — see `chalbench-runtime` and `chalbench-evals`.

pub mod cancel;
pub mod error;
pub mod liveness;
pub mod progress;
pub mod types;
pub mod value;

pub use cancel::CancellationToken;
pub use error::{CoreError, CoreResult};
pub use liveness::LivenessMonitor;
pub use progress::{ProgressChannel, ProgressReporter, ProgressUpdate};
pub use types::{
    all_passed, AssertionDef, AssertionResult, Challenge, ChallengeId, ChallengeOutcome, Config,
    Definition, ExecutionContext, ExecutionResult, Logs, Metric, Status,
};
pub use value::Value;
