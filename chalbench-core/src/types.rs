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

//! Core data model: challenges, definitions, config, results and status.

use crate::value::Value;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Opaque, non-empty identifier, unique within a single registry.
pub type ChallengeId = String;

/// Declarative metadata twin of a `Challenge`, bank-file-loadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub id: ChallengeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub dependencies: Vec<ChallengeId>,
    #[serde(default)]
    pub estimated_duration: Option<Duration>,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub outputs: Vec<String>,
    #[serde(default)]
    pub assertions: Vec<AssertionDef>,
    #[serde(default)]
    pub metrics: Vec<String>,
    #[serde(default)]
    pub configuration: serde_json::Value,
}

/// A single assertion to evaluate against a named produced value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionDef {
    #[serde(rename = "type")]
    pub assertion_type: String,
    pub target: String,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub values: Option<Vec<Value>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Outcome of evaluating one `AssertionDef`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionResult {
    #[serde(rename = "type")]
    pub assertion_type: String,
    pub target: String,
    pub expected: Option<Value>,
    pub actual: Option<Value>,
    pub passed: bool,
    pub message: String,
}

/// Every Assertion in the slice passed, per the `AllPassed` invariant.
pub fn all_passed(assertions: &[AssertionResult]) -> bool {
    assertions.iter().all(|a| a.passed)
}

/// Per-challenge runtime configuration. Produced by the caller, cloned and
/// mutated per-challenge by the runner.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub challenge_id: ChallengeId,
    pub results_dir: Option<PathBuf>,
    pub logs_dir: Option<PathBuf>,
    /// Zero means "use the runner default".
    pub timeout: Duration,
    /// Zero means "disable the liveness monitor".
    pub stale_threshold: Duration,
    pub verbose: bool,
    pub environment: HashMap<String, String>,
    /// Upstream challenge ID -> its result directory path.
    pub dependencies: HashMap<ChallengeId, PathBuf>,
}

/// Finite set of terminal (and two non-terminal) result statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    TimedOut,
    Stuck,
    Error,
}

impl Status {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::Pending | Status::Running)
    }

    /// The canonical snake_case string, matching the `#[serde(rename_all)]`
    /// wire form above.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Running => "running",
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Skipped => "skipped",
            Status::TimedOut => "timed_out",
            Status::Stuck => "stuck",
            Status::Error => "error",
        }
    }
}

/// Log file paths populated for a single execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Logs {
    pub challenge_log: Option<PathBuf>,
    pub output_log: Option<PathBuf>,
    pub api_requests: Option<PathBuf>,
    pub api_responses: Option<PathBuf>,
}

/// A single named metric with a unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

/// The structured result of one challenge execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub challenge_id: ChallengeId,
    pub challenge_name: String,
    pub status: Status,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub assertions: Vec<AssertionResult>,
    pub metrics: HashMap<String, Metric>,
    pub outputs: HashMap<String, String>,
    pub logs: Logs,
    pub error: String,
}

impl ExecutionResult {
    pub fn all_passed(&self) -> bool {
        all_passed(&self.assertions)
    }
}

/// The inner result a `Challenge::execute` returns, merged into the
/// framework `ExecutionResult` by the runner.
#[derive(Debug, Clone, Default)]
pub struct ChallengeOutcome {
    pub assertions: Vec<AssertionResult>,
    pub metrics: HashMap<String, Metric>,
    pub outputs: HashMap<String, String>,
}

/// The full lifecycle capability every challenge implements.
#[async_trait]
pub trait Challenge: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;
    fn description(&self) -> &str {
        ""
    }
    fn category(&self) -> &str {
        "general"
    }
    fn dependencies(&self) -> Vec<ChallengeId> {
        Vec::new()
    }

    async fn configure(&mut self, config: &Config) -> Result<(), String>;
    async fn validate(&self, ctx: &ExecutionContext) -> Result<(), String>;
    async fn execute(&mut self, ctx: &ExecutionContext) -> Result<ChallengeOutcome, String>;
    async fn cleanup(&mut self, ctx: &ExecutionContext) -> Result<(), String>;

    /// Optional capability: progress-aware challenges override this to
    /// retain the reporter handed to them by the runner. The default is a
    /// no-op, so challenges that never report progress need not implement
    /// this at all.
    fn set_progress_reporter(&mut self, _reporter: crate::progress::ProgressReporter) {}
}

/// Context handed into `validate`/`execute`/`cleanup`. Carries a
/// cancellation token in place of a language-native cancellable context.
#[derive(Clone)]
pub struct ExecutionContext {
    pub challenge_id: ChallengeId,
    pub cancellation: crate::cancel::CancellationToken,
}
