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

//! Pre-execution configuration faults of the caller's request:
//! everything else discoverable about one challenge is encoded in its
//! `ExecutionResult` instead.

use crate::registry::RegistryError;
use chalbench_core::ChallengeId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("challenge {0} has unmet dependency: {1}")]
    UnmetDependency(ChallengeId, ChallengeId),

    #[error("failed to get challenge {0}: {1}")]
    LookupFailed(ChallengeId, String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Runner(#[from] RunnerError),
}
