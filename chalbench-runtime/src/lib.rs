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

//! # chalbench-runtime
//!
//! Registry, dependency resolver, runner, pipeline and event collector for
//! the chalbench challenge engine. Built on top of the lifecycle and
//! progress types in `chalbench-core`.

pub mod error;
pub mod events;
pub mod hooks;
pub mod pipeline;
pub mod registry;
pub mod resolver;
pub mod runner;

pub use error::{PipelineError, RunnerError};
pub use events::{
    ChallengeEvent, DashboardData, DashboardSummary, EventCollector, EventStats, EVENT_COMPLETED,
    EVENT_FAILED, EVENT_LOG, EVENT_METRIC, EVENT_POST_HOOK_WARNING, EVENT_SKIPPED, EVENT_STARTED,
    EVENT_STUCK, EVENT_TIMED_OUT,
};
pub use hooks::{pre_only, post_only, FnHook, RunnerHook};
pub use pipeline::Pipeline;
pub use registry::{ChallengeHandle, Registry, RegistryError};
pub use resolver::ResolverError;
pub use runner::{Runner, RunnerBuilder, RunnerConfig};
