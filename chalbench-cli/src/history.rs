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

//! History log: an append-only JSON-Lines file, one record per
//! completed execution.

use chalbench_core::ExecutionResult;
use chrono::Utc;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to open history log {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write history log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize history record: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
struct HistoryRecord {
    timestamp: String,
    challenge_id: String,
    status: String,
    duration: String,
    assertions_passed: usize,
    assertions_total: usize,
    results_path: String,
}

/// Derives the per-challenge result directory from `logs.challenge_log`
/// (`<results_dir>/logs/challenge.log`), since the result type itself does
/// not carry `results_dir` directly.
fn results_path_of(result: &ExecutionResult) -> String {
    result
        .logs
        .challenge_log
        .as_deref()
        .and_then(Path::parent) // logs/
        .and_then(Path::parent) // results_dir
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Append-only JSON-Lines writer backing the history log.
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, result: &ExecutionResult) -> Result<(), HistoryError> {
        let record = HistoryRecord {
            timestamp: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true),
            challenge_id: result.challenge_id.clone(),
            status: result.status.as_str().to_string(),
            duration: format!("{:?}", result.duration),
            assertions_passed: result.assertions.iter().filter(|a| a.passed).count(),
            assertions_total: result.assertions.len(),
            results_path: results_path_of(result),
        };

        let line = serde_json::to_string(&record)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| HistoryError::Open {
                    path: self.path.clone(),
                    source: e,
                })?;
            }
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| HistoryError::Open {
                path: self.path.clone(),
                source: e,
            })?;

        writeln!(file, "{line}").map_err(|e| HistoryError::Write {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chalbench_core::{AssertionResult, Logs, Status};
    use std::collections::HashMap;
    use std::time::Duration;

    fn sample_result() -> ExecutionResult {
        ExecutionResult {
            challenge_id: "demo".to_string(),
            challenge_name: "Demo".to_string(),
            status: Status::Passed,
            start_time: Utc::now(),
            end_time: Utc::now(),
            duration: Duration::from_secs(1),
            assertions: vec![
                AssertionResult {
                    assertion_type: "not_empty".into(),
                    target: "out".into(),
                    expected: None,
                    actual: None,
                    passed: true,
                    message: String::new(),
                },
                AssertionResult {
                    assertion_type: "not_empty".into(),
                    target: "out2".into(),
                    expected: None,
                    actual: None,
                    passed: false,
                    message: "empty".into(),
                },
            ],
            metrics: HashMap::new(),
            outputs: HashMap::new(),
            logs: Logs {
                challenge_log: Some(PathBuf::from("/tmp/results/demo/2026/01/01/20260101_000000/logs/challenge.log")),
                output_log: None,
                api_requests: None,
                api_responses: None,
            },
            error: String::new(),
        }
    }

    #[test]
    fn append_writes_one_json_line_with_derived_results_path() {
        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("history.jsonl"));
        log.append(&sample_result()).unwrap();

        let contents = std::fs::read_to_string(tmp.path().join("history.jsonl")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 1);

        let record: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(record["challenge_id"], "demo");
        assert_eq!(record["status"], "passed");
        assert_eq!(record["assertions_passed"], 1);
        assert_eq!(record["assertions_total"], 2);
        assert_eq!(
            record["results_path"],
            "/tmp/results/demo/2026/01/01/20260101_000000"
        );
    }

    #[test]
    fn append_is_additive_across_calls() {
        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("history.jsonl"));
        log.append(&sample_result()).unwrap();
        log.append(&sample_result()).unwrap();

        let contents = std::fs::read_to_string(tmp.path().join("history.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn append_creates_parent_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("nested").join("history.jsonl"));
        log.append(&sample_result()).unwrap();
        assert!(tmp.path().join("nested").join("history.jsonl").exists());
    }

    #[test]
    fn append_writes_timed_out_as_snake_case_not_debug_format() {
        let mut result = sample_result();
        result.status = Status::TimedOut;

        let tmp = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(tmp.path().join("history.jsonl"));
        log.append(&result).unwrap();

        let contents = std::fs::read_to_string(tmp.path().join("history.jsonl")).unwrap();
        let record: serde_json::Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(record["status"], "timed_out");
    }
}
