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

//! Pipeline: a thin composable wrapper around a `Runner` with its own
//! pre/post hook chains, independent of the hooks registered on the runner
//! itself.

use crate::error::PipelineError;
use crate::hooks::RunnerHook;
use crate::runner::Runner;
use chalbench_core::cancel::CancellationToken;
use chalbench_core::{ChallengeId, Config, ExecutionResult, Logs, Status};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn pipeline_pre_hook_failure(id: &str, message: &str) -> ExecutionResult {
    let now = Utc::now();
    ExecutionResult {
        challenge_id: id.to_string(),
        challenge_name: id.to_string(),
        status: Status::Error,
        start_time: now,
        end_time: now,
        duration: Duration::ZERO,
        assertions: Vec::new(),
        metrics: HashMap::new(),
        outputs: HashMap::new(),
        logs: Logs::default(),
        error: format!("pipeline pre-hook failed: {message}"),
    }
}

/// Wraps a `Runner`, adding a second layer of pre/post hooks that run
/// around the runner's own lifecycle (including the runner's own hooks).
pub struct Pipeline {
    runner: Runner,
    pre_hooks: Vec<Arc<dyn RunnerHook>>,
    post_hooks: Vec<Arc<dyn RunnerHook>>,
}

impl Pipeline {
    pub fn new(runner: Runner) -> Self {
        Self {
            runner,
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
        }
    }

    pub fn with_pre_hook(mut self, hook: Arc<dyn RunnerHook>) -> Self {
        self.pre_hooks.push(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: Arc<dyn RunnerHook>) -> Self {
        self.post_hooks.push(hook);
        self
    }

    pub fn runner(&self) -> &Runner {
        &self.runner
    }

    /// Runs pipeline pre-hooks (first failure short-circuits to an `error`
    /// Result without ever reaching the runner), delegates to the runner,
    /// then runs pipeline post-hooks (failures logged as warnings only).
    pub async fn execute(
        &self,
        parent: &CancellationToken,
        id: &str,
        config: Config,
    ) -> Result<ExecutionResult, PipelineError> {
        for hook in &self.pre_hooks {
            if let Err(e) = hook.pre(&config).await {
                return Ok(pipeline_pre_hook_failure(id, &e));
            }
        }

        let result = self.runner.run(parent, id, config).await?;

        for hook in &self.post_hooks {
            if let Err(e) = hook.post(&result).await {
                tracing::warn!(challenge_id = %id, error = %e, "pipeline_post_hook_warning");
            }
        }

        Ok(result)
    }

    /// Clones `base_config` per challenge and invokes `execute` in order.
    pub async fn execute_sequence(
        &self,
        parent: &CancellationToken,
        ids: &[ChallengeId],
        base_config: Config,
    ) -> Result<Vec<ExecutionResult>, PipelineError> {
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let mut config = base_config.clone();
            config.challenge_id = id.clone();
            results.push(self.execute(parent, id, config).await?);
        }
        Ok(results)
    }
}
