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

//! The runner: the lifecycle driver. Owns timeouts, hooks, status
//! classification, dependency propagation and concurrency.

use crate::error::RunnerError;
use crate::events::{
    ChallengeEvent, EventCollector, EVENT_COMPLETED, EVENT_FAILED, EVENT_POST_HOOK_WARNING,
    EVENT_SKIPPED, EVENT_STARTED, EVENT_STUCK, EVENT_TIMED_OUT,
};
use crate::hooks::RunnerHook;
use crate::registry::Registry;
use chalbench_core::cancel::CancellationToken;
use chalbench_core::{
    Challenge, ChallengeId, Config, ExecutionContext, ExecutionResult, LivenessMonitor, Logs,
    ProgressReporter, Status,
};
use chrono::{Datelike, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Runner defaults, constructed via `RunnerBuilder`'s functional-options
/// pattern.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub default_timeout: Duration,
    pub default_stale_threshold: Duration,
    pub base_results_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(300),
            default_stale_threshold: Duration::from_secs(60),
            base_results_dir: PathBuf::from("./chalbench-results"),
        }
    }
}

/// Builds a `Runner` bound to a registry, a set of defaults, an event
/// collector, and ordered pre/post hook chains.
pub struct RunnerBuilder {
    registry: Arc<Registry>,
    config: RunnerConfig,
    events: Arc<EventCollector>,
    pre_hooks: Vec<Arc<dyn RunnerHook>>,
    post_hooks: Vec<Arc<dyn RunnerHook>>,
}

impl RunnerBuilder {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            config: RunnerConfig::default(),
            events: Arc::new(EventCollector::new()),
            pre_hooks: Vec::new(),
            post_hooks: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    pub fn with_default_stale_threshold(mut self, threshold: Duration) -> Self {
        self.config.default_stale_threshold = threshold;
        self
    }

    pub fn with_base_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.base_results_dir = dir.into();
        self
    }

    pub fn with_event_collector(mut self, events: Arc<EventCollector>) -> Self {
        self.events = events;
        self
    }

    /// Pre/post hooks registered on the same chain run in registration
    /// order.
    pub fn with_hook(mut self, hook: Arc<dyn RunnerHook>) -> Self {
        self.pre_hooks.push(Arc::clone(&hook));
        self.post_hooks.push(hook);
        self
    }

    pub fn with_pre_hook(mut self, hook: Arc<dyn RunnerHook>) -> Self {
        self.pre_hooks.push(hook);
        self
    }

    pub fn with_post_hook(mut self, hook: Arc<dyn RunnerHook>) -> Self {
        self.post_hooks.push(hook);
        self
    }

    pub fn build(self) -> Runner {
        Runner {
            registry: self.registry,
            config: Arc::new(self.config),
            events: self.events,
            pre_hooks: Arc::new(self.pre_hooks),
            post_hooks: Arc::new(self.post_hooks),
        }
    }
}

/// The lifecycle driver. Cheap to clone: every field is `Arc`-backed, which
/// `run_parallel` relies on to hand owned clones to spawned tasks.
#[derive(Clone)]
pub struct Runner {
    registry: Arc<Registry>,
    config: Arc<RunnerConfig>,
    events: Arc<EventCollector>,
    pre_hooks: Arc<Vec<Arc<dyn RunnerHook>>>,
    post_hooks: Arc<Vec<Arc<dyn RunnerHook>>>,
}

/// Internal result of one `execute_challenge` call: the public
/// `ExecutionResult` plus the results directory the runner picked, threaded
/// into downstream configs without appearing in the public Result shape.
struct ExecuteOutcome {
    result: ExecutionResult,
    results_dir: PathBuf,
}

fn synth_results_dir(base: &Path, challenge_id: &str, now: chrono::DateTime<Utc>) -> PathBuf {
    base.join(challenge_id)
        .join(format!("{:04}", now.year()))
        .join(format!("{:02}", now.month()))
        .join(format!("{:02}", now.day()))
        .join(now.format("%Y%m%d_%H%M%S").to_string())
}

fn empty_result(challenge_id: &str, start_time: chrono::DateTime<Utc>) -> ExecutionResult {
    ExecutionResult {
        challenge_id: challenge_id.to_string(),
        challenge_name: challenge_id.to_string(),
        status: Status::Running,
        start_time,
        end_time: start_time,
        duration: Duration::ZERO,
        assertions: Vec::new(),
        metrics: HashMap::new(),
        outputs: HashMap::new(),
        logs: Logs::default(),
        error: String::new(),
    }
}

fn finalize(result: &mut ExecutionResult) {
    result.end_time = Utc::now();
    result.duration = (result.end_time - result.start_time)
        .to_std()
        .unwrap_or(Duration::ZERO);
}

impl Runner {
    pub fn builder(registry: Arc<Registry>) -> RunnerBuilder {
        RunnerBuilder::new(registry)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<EventCollector> {
        &self.events
    }

    /// `RunOne`: drives a single registered challenge through its
    /// full lifecycle.
    pub async fn run(
        &self,
        parent: &CancellationToken,
        id: &str,
        base_config: Config,
    ) -> Result<ExecutionResult, RunnerError> {
        self.registry.get(id)?;
        let mut config = base_config;
        config.challenge_id = id.to_string();
        let outcome = self.execute_challenge(parent, id, config).await;
        Ok(outcome.result)
    }

    /// `RunAll`: topological order, tie-broken by sorted ID, threading
    /// each passed upstream's results directory into its dependents'
    /// `Config.Dependencies`.
    pub async fn run_all(
        &self,
        parent: &CancellationToken,
        base_config: Config,
    ) -> Result<Vec<ExecutionResult>, RunnerError> {
        let order = self.registry.dependency_order()?;
        self.events.seed_pending(&order);

        let mut dep_results: HashMap<ChallengeId, PathBuf> = HashMap::new();
        let mut results = Vec::with_capacity(order.len());
        for id in order {
            let mut config = base_config.clone();
            config.challenge_id = id.clone();
            config.dependencies = dep_results.clone();
            let outcome = self.execute_challenge(parent, &id, config).await;
            if outcome.result.status == Status::Passed {
                dep_results.insert(id.clone(), outcome.results_dir);
            }
            results.push(outcome.result);
        }
        Ok(results)
    }

    /// `RunSequence`: caller-provided order. Before executing each
    /// challenge, every declared dependency must already have passed
    /// earlier in this same sequence.
    pub async fn run_sequence(
        &self,
        parent: &CancellationToken,
        ids: &[ChallengeId],
        base_config: Config,
    ) -> Result<Vec<ExecutionResult>, RunnerError> {
        self.events.seed_pending(ids);

        let mut dep_results: HashMap<ChallengeId, PathBuf> = HashMap::new();
        let mut results = Vec::with_capacity(ids.len());
        for id in ids {
            let declared = self
                .registry
                .dependencies_of(id)
                .map_err(|e| RunnerError::LookupFailed(id.clone(), e.to_string()))?;
            for dep in &declared {
                if !dep_results.contains_key(dep) {
                    return Err(RunnerError::UnmetDependency(id.clone(), dep.clone()));
                }
            }

            let mut config = base_config.clone();
            config.challenge_id = id.clone();
            config.dependencies = dep_results.clone();
            let outcome = self.execute_challenge(parent, id, config).await;
            if outcome.result.status == Status::Passed {
                dep_results.insert(id.clone(), outcome.results_dir);
            }
            results.push(outcome.result);
        }
        Ok(results)
    }

    /// `RunParallel`: a counting semaphore bounds concurrency.
    /// Dependency ordering is NOT enforced — callers must level-partition
    /// themselves (intentional, not an oversight).
    pub async fn run_parallel(
        &self,
        parent: &CancellationToken,
        ids: &[ChallengeId],
        base_config: Config,
        max_concurrency: usize,
    ) -> Result<Vec<ExecutionResult>, RunnerError> {
        let max_concurrency = max_concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(max_concurrency));
        self.events.seed_pending(ids);

        let mut join_set = tokio::task::JoinSet::new();
        for (idx, id) in ids.iter().cloned().enumerate() {
            let runner = self.clone();
            let sem = Arc::clone(&semaphore);
            let parent_token = parent.clone();
            let mut config = base_config.clone();
            config.challenge_id = id.clone();

            join_set.spawn(async move {
                let permit = tokio::select! {
                    biased;
                    _ = parent_token.cancelled() => None,
                    permit = sem.acquire_owned() => permit.ok(),
                };
                match permit {
                    Some(_permit) => {
                        let outcome = runner.execute_challenge(&parent_token, &id, config).await;
                        (idx, id, Ok(outcome.result))
                    }
                    None => (
                        idx,
                        id.clone(),
                        Err(format!(
                            "challenge {id} cancelled while waiting for a concurrency slot"
                        )),
                    ),
                }
            });
        }

        let mut slots: Vec<Option<ExecutionResult>> = vec![None; ids.len()];
        let mut first_error: Option<RunnerError> = None;
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, _id, Ok(result))) => slots[idx] = Some(result),
                Ok((idx, id, Err(message))) => {
                    if first_error.is_none() {
                        first_error = Some(RunnerError::LookupFailed(
                            ids.get(idx).cloned().unwrap_or(id),
                            message,
                        ));
                    }
                }
                Err(join_error) => {
                    if first_error.is_none() {
                        first_error = Some(RunnerError::LookupFailed(
                            "<unknown>".to_string(),
                            join_error.to_string(),
                        ));
                    }
                }
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        // Ordered by submission index, not completion time.
        Ok(slots.into_iter().flatten().collect())
    }

    async fn run_cleanup(
        &self,
        guard: &mut Box<dyn Challenge>,
        id: &str,
        result: &mut ExecutionResult,
    ) {
        // Cleanup runs under a fresh, never-cancelled token: it must get a
        // chance to release resources even if execution was cancelled.
        let cleanup_ctx = ExecutionContext {
            challenge_id: id.to_string(),
            cancellation: CancellationToken::new(),
        };
        if let Err(e) = guard.cleanup(&cleanup_ctx).await {
            tracing::warn!(challenge_id = %id, error = %e, "cleanup_warning");
        }
    }

    /// The single-challenge state machine. Infallible by design: every
    /// framework-discoverable fault about *this* challenge is encoded into
    /// the returned `ExecutionResult`'s terminal `Status`, never returned as
    /// a Rust `Result::Err`.
    async fn execute_challenge(
        &self,
        parent: &CancellationToken,
        id: &str,
        mut config: Config,
    ) -> ExecuteOutcome {
        let start_time = Utc::now();
        let mut result = empty_result(id, start_time);
        config.challenge_id = id.to_string();

        if id.trim().is_empty() {
            result.status = Status::Error;
            result.error = chalbench_core::CoreError::EmptyChallengeId.to_string();
            self.events.emit(
                ChallengeEvent::new(EVENT_FAILED, id)
                    .with_status(Status::Error)
                    .with_message(result.error.clone()),
            );
            finalize(&mut result);
            return ExecuteOutcome {
                result,
                results_dir: self.config.base_results_dir.join(id),
            };
        }

        let handle = match self.registry.get(id) {
            Ok(handle) => handle,
            Err(e) => {
                result.status = Status::Error;
                result.error = format!("challenge lookup failed: {e}");
                self.events.emit(
                    ChallengeEvent::new(EVENT_FAILED, id)
                        .with_status(Status::Error)
                        .with_message(result.error.clone()),
                );
                finalize(&mut result);
                return ExecuteOutcome {
                    result,
                    results_dir: self.config.base_results_dir.join(id),
                };
            }
        };

        let mut guard = handle.lock().await;
        result.challenge_name = guard.name().to_string();

        // Step 2: set up the result directory.
        let results_dir = config
            .results_dir
            .clone()
            .unwrap_or_else(|| synth_results_dir(&self.config.base_results_dir, id, start_time));
        let logs_dir = results_dir.join("logs");
        if let Err(e) = std::fs::create_dir_all(results_dir.join("results"))
            .and_then(|_| std::fs::create_dir_all(&logs_dir))
            .and_then(|_| std::fs::create_dir_all(results_dir.join("config")))
        {
            let err = chalbench_core::CoreError::ResultDirCreate(e);
            result.status = Status::Error;
            result.error = err.to_string();
            tracing::error!(challenge_id = %id, error = %err, "challenge_error");
            self.events.emit(
                ChallengeEvent::new(EVENT_FAILED, id)
                    .with_status(Status::Error)
                    .with_message(result.error.clone()),
            );
            finalize(&mut result);
            return ExecuteOutcome { result, results_dir };
        }
        result.logs.challenge_log = Some(logs_dir.join("challenge.log"));
        result.logs.output_log = Some(logs_dir.join("output.log"));
        config.results_dir = Some(results_dir.clone());
        if config.logs_dir.is_none() {
            config.logs_dir = Some(logs_dir);
        }

        self.events.emit(
            ChallengeEvent::new(EVENT_STARTED, id)
                .with_name(result.challenge_name.clone())
                .with_category(guard.category().to_string()),
        );

        // Step 4: pre-hooks, in registration order.
        for hook in self.pre_hooks.iter() {
            if let Err(e) = hook.pre(&config).await {
                result.status = Status::Error;
                result.error = format!("pre-hook failed: {e}");
                self.events.emit(
                    ChallengeEvent::new(EVENT_FAILED, id)
                        .with_status(Status::Error)
                        .with_message(result.error.clone()),
                );
                finalize(&mut result);
                return ExecuteOutcome { result, results_dir };
            }
        }

        // Step 5: configure.
        if let Err(e) = guard.configure(&config).await {
            result.status = Status::Error;
            result.error = format!("configuration failed: {e}");
            self.events.emit(
                ChallengeEvent::new(EVENT_FAILED, id)
                    .with_status(Status::Error)
                    .with_message(result.error.clone()),
            );
            finalize(&mut result);
            return ExecuteOutcome { result, results_dir };
        }

        // Step 6: validate. A failed precondition is `skipped`, never an
        // `error` — the environment failed, not the challenge under test.
        let preflight_ctx = ExecutionContext {
            challenge_id: id.to_string(),
            cancellation: parent.child_token(),
        };
        if let Err(e) = guard.validate(&preflight_ctx).await {
            result.status = Status::Skipped;
            result.error = format!("validation failed: {e}");
            self.events.emit(
                ChallengeEvent::new(EVENT_SKIPPED, id)
                    .with_status(Status::Skipped)
                    .with_message(result.error.clone()),
            );
            finalize(&mut result);
            return ExecuteOutcome { result, results_dir };
        }

        // Step 7: attach progress. Always created; a challenge that never
        // overrides `set_progress_reporter` simply never reports, which is
        // indistinguishable from "no progress reporter" for the monitor.
        let (reporter, progress_channel) = ProgressReporter::new();
        guard.set_progress_reporter(reporter.clone());
        // Zero is an explicit "disable the liveness monitor" per `Config`,
        // not a "use the runner default" sentinel the way `timeout` is.
        let stale_threshold = config.stale_threshold;

        // Step 8: bound execution with both a deadline and the liveness
        // monitor, both closing over the same cancellation token.
        let timeout = if config.timeout.is_zero() {
            self.config.default_timeout
        } else {
            config.timeout
        };
        let token = parent.child_token();
        let exec_ctx = ExecutionContext {
            challenge_id: id.to_string(),
            cancellation: token.clone(),
        };
        let monitor =
            LivenessMonitor::spawn(progress_channel, stale_threshold, token.clone(), id.to_string());

        // Step 9: execute.
        let mut timed_out = false;
        let outcome = {
            let exec_fut = guard.execute(&exec_ctx);
            tokio::pin!(exec_fut);
            tokio::select! {
                biased;
                res = &mut exec_fut => res,
                _ = tokio::time::sleep(timeout) => {
                    token.cancel();
                    timed_out = true;
                    Err("challenge execution timed out".to_string())
                }
            }
        };
        monitor.stop();
        reporter.close();

        // Step 10: classify, in priority order.
        if monitor.is_stuck() {
            result.status = Status::Stuck;
            result.error = format!(
                "challenge stuck: no progress reported within {stale_threshold:?}"
            );
            self.events.emit(
                ChallengeEvent::new(EVENT_STUCK, id).with_status(Status::Stuck).with_message(result.error.clone()),
            );
            self.run_cleanup(&mut guard, id, &mut result).await;
            finalize(&mut result);
            return ExecuteOutcome { result, results_dir };
        }
        if timed_out {
            result.status = Status::TimedOut;
            result.error = "challenge execution timed out".to_string();
            self.events.emit(
                ChallengeEvent::new(EVENT_TIMED_OUT, id)
                    .with_status(Status::TimedOut)
                    .with_message(result.error.clone()),
            );
            self.run_cleanup(&mut guard, id, &mut result).await;
            finalize(&mut result);
            return ExecuteOutcome { result, results_dir };
        }
        match outcome {
            Err(e) => {
                result.status = Status::Error;
                result.error = format!("execution failed: {e}");
                self.events.emit(
                    ChallengeEvent::new(EVENT_FAILED, id)
                        .with_status(Status::Error)
                        .with_message(result.error.clone()),
                );
                self.run_cleanup(&mut guard, id, &mut result).await;
                finalize(&mut result);
                return ExecuteOutcome { result, results_dir };
            }
            Ok(challenge_outcome) => {
                result.assertions = challenge_outcome.assertions;
                result.metrics = challenge_outcome.metrics;
                result.outputs = challenge_outcome.outputs;
                result.status = if result.all_passed() {
                    Status::Passed
                } else {
                    Status::Failed
                };
            }
        }

        // Step 11: post-hooks. Errors are logged, never change Status.
        for hook in self.post_hooks.iter() {
            if let Err(e) = hook.post(&result).await {
                tracing::warn!(challenge_id = %id, error = %e, "post_hook_warning");
                self.events.emit(
                    ChallengeEvent::new(EVENT_POST_HOOK_WARNING, id).with_message(e),
                );
            }
        }

        // Step 12: emit completed.
        self.events.emit(
            ChallengeEvent::new(EVENT_COMPLETED, id)
                .with_name(result.challenge_name.clone())
                .with_status(result.status)
                .with_duration((Utc::now() - start_time).to_std().unwrap_or(Duration::ZERO))
                .with_metrics(result.metrics.clone()),
        );

        // Step 13: cleanup — always, under the parent context.
        self.run_cleanup(&mut guard, id, &mut result).await;

        // Step 14.
        finalize(&mut result);
        ExecuteOutcome { result, results_dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chalbench_core::ChallengeOutcome;
    use tempfile::TempDir;

    enum ExecuteBehavior {
        PassImmediately,
        FailAssertion,
        Sleep(Duration),
        SleepReporting(Duration, Duration),
        ExecuteError,
    }

    struct Scripted {
        id: &'static str,
        deps: Vec<ChallengeId>,
        validate_err: Option<String>,
        execute: ExecuteBehavior,
        reporter: Option<ProgressReporter>,
    }

    #[async_trait]
    impl Challenge for Scripted {
        fn id(&self) -> &str {
            self.id
        }
        fn name(&self) -> &str {
            self.id
        }
        fn dependencies(&self) -> Vec<ChallengeId> {
            self.deps.clone()
        }

        async fn configure(&mut self, _config: &Config) -> Result<(), String> {
            Ok(())
        }

        async fn validate(&self, _ctx: &ExecutionContext) -> Result<(), String> {
            match &self.validate_err {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }

        async fn execute(&mut self, ctx: &ExecutionContext) -> Result<ChallengeOutcome, String> {
            match &self.execute {
                ExecuteBehavior::PassImmediately => Ok(ChallengeOutcome::default()),
                ExecuteBehavior::FailAssertion => {
                    let mut outcome = ChallengeOutcome::default();
                    outcome.assertions.push(chalbench_core::AssertionResult {
                        assertion_type: "always_fails".into(),
                        target: "out".into(),
                        expected: None,
                        actual: None,
                        passed: false,
                        message: "nope".into(),
                    });
                    Ok(outcome)
                }
                ExecuteBehavior::ExecuteError => Err("boom".to_string()),
                ExecuteBehavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    let _ = ctx.cancellation.is_cancelled();
                    Ok(ChallengeOutcome::default())
                }
                ExecuteBehavior::SleepReporting(total, tick) => {
                    let reporter = self.reporter.clone();
                    let mut elapsed = Duration::ZERO;
                    while elapsed < *total {
                        tokio::time::sleep(*tick).await;
                        elapsed += *tick;
                        if let Some(r) = &reporter {
                            r.report_progress("tick", Default::default());
                        }
                    }
                    Ok(ChallengeOutcome::default())
                }
            }
        }

        async fn cleanup(&mut self, _ctx: &ExecutionContext) -> Result<(), String> {
            Ok(())
        }

        fn set_progress_reporter(&mut self, reporter: ProgressReporter) {
            self.reporter = Some(reporter);
        }
    }

    impl Scripted {
        fn new(id: &'static str, deps: &[&'static str], execute: ExecuteBehavior) -> Box<dyn Challenge> {
            Box::new(Scripted {
                id,
                deps: deps.iter().map(|s| s.to_string()).collect(),
                validate_err: None,
                execute,
                reporter: None,
            })
        }

        fn failing_validate(id: &'static str, message: &str) -> Box<dyn Challenge> {
            Box::new(Scripted {
                id,
                deps: Vec::new(),
                validate_err: Some(message.to_string()),
                execute: ExecuteBehavior::PassImmediately,
                reporter: None,
            })
        }
    }

    fn base_config() -> Config {
        Config {
            challenge_id: String::new(),
            results_dir: None,
            logs_dir: None,
            timeout: Duration::ZERO,
            stale_threshold: Duration::ZERO,
            verbose: false,
            environment: HashMap::new(),
            dependencies: HashMap::new(),
        }
    }

    #[tokio::test]
    async fn linear_chain_runs_in_order_and_all_pass() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .register(Scripted::new("a", &[], ExecuteBehavior::PassImmediately))
            .unwrap();
        registry
            .register(Scripted::new("b", &["a"], ExecuteBehavior::PassImmediately))
            .unwrap();
        registry
            .register(Scripted::new("c", &["b"], ExecuteBehavior::PassImmediately))
            .unwrap();

        let runner = Runner::builder(Arc::clone(&registry))
            .with_base_results_dir(tmp.path())
            .build();

        let parent = CancellationToken::new();
        let results = runner.run_all(&parent, base_config()).await.unwrap();

        assert_eq!(
            results.iter().map(|r| r.challenge_id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
        assert!(results.iter().all(|r| r.status == Status::Passed));
    }

    #[tokio::test]
    async fn diamond_places_root_first_and_leaf_last() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("d", &[], ExecuteBehavior::PassImmediately)).unwrap();
        registry.register(Scripted::new("b", &["d"], ExecuteBehavior::PassImmediately)).unwrap();
        registry.register(Scripted::new("c", &["d"], ExecuteBehavior::PassImmediately)).unwrap();
        registry.register(Scripted::new("a", &["b", "c"], ExecuteBehavior::PassImmediately)).unwrap();

        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let results = runner.run_all(&parent, base_config()).await.unwrap();
        let order: Vec<_> = results.iter().map(|r| r.challenge_id.clone()).collect();
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[tokio::test]
    async fn cycle_is_reported_as_an_error_not_a_result() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("a", &["b"], ExecuteBehavior::PassImmediately)).unwrap();
        registry.register(Scripted::new("b", &["a"], ExecuteBehavior::PassImmediately)).unwrap();

        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let err = runner.run_all(&parent, base_config()).await.unwrap_err();
        assert!(err.to_string().contains("a -> b -> a") || err.to_string().contains("b -> a -> b"));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_wins_with_no_progress_reporting() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .register(Scripted::new("slow", &[], ExecuteBehavior::Sleep(Duration::from_secs(10))))
            .unwrap();

        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let mut config = base_config();
        config.timeout = Duration::from_millis(200);

        let result = runner.run(&parent, "slow", config).await.unwrap();
        assert_eq!(result.status, Status::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_wins_over_a_generous_timeout_when_progress_goes_stale() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .register(Scripted::new("slow", &[], ExecuteBehavior::Sleep(Duration::from_secs(10))))
            .unwrap();

        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let mut config = base_config();
        config.timeout = Duration::from_secs(20);
        config.stale_threshold = Duration::from_millis(100);

        let result = runner.run(&parent, "slow", config).await.unwrap();
        assert_eq!(result.status, Status::Stuck);
    }

    #[tokio::test(start_paused = true)]
    async fn steady_progress_keeps_liveness_quiet_but_deadline_still_wins() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .register(Scripted::new(
                "slow",
                &[],
                ExecuteBehavior::SleepReporting(Duration::from_secs(10), Duration::from_millis(50)),
            ))
            .unwrap();

        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let mut config = base_config();
        config.timeout = Duration::from_millis(500);
        config.stale_threshold = Duration::from_millis(100);

        let result = runner.run(&parent, "slow", config).await.unwrap();
        assert_eq!(result.status, Status::TimedOut);
    }

    #[tokio::test]
    async fn failed_validate_is_skipped_not_error_and_execute_never_runs() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry
            .register(Scripted::failing_validate("c", "preconditions not met"))
            .unwrap();

        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let result = runner.run(&parent, "c", base_config()).await.unwrap();
        assert_eq!(result.status, Status::Skipped);
        assert!(result.error.contains("validation failed"));
    }

    #[tokio::test]
    async fn failing_assertion_yields_failed_status() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("c", &[], ExecuteBehavior::FailAssertion)).unwrap();
        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let result = runner.run(&parent, "c", base_config()).await.unwrap();
        assert_eq!(result.status, Status::Failed);
    }

    #[tokio::test]
    async fn execute_error_yields_error_status() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("c", &[], ExecuteBehavior::ExecuteError)).unwrap();
        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let result = runner.run(&parent, "c", base_config()).await.unwrap();
        assert_eq!(result.status, Status::Error);
        assert!(result.error.contains("execution failed"));
    }

    #[tokio::test]
    async fn blank_challenge_id_yields_error_status_without_touching_the_handle() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("", &[], ExecuteBehavior::PassImmediately)).unwrap();
        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();
        let results = runner.run_all(&parent, base_config()).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].status, Status::Error);
        assert!(results[0].error.contains("must not be empty"));
    }

    #[tokio::test]
    async fn run_sequence_rejects_unmet_dependencies() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("a", &[], ExecuteBehavior::PassImmediately)).unwrap();
        registry.register(Scripted::new("b", &["a"], ExecuteBehavior::PassImmediately)).unwrap();
        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();

        let err = runner
            .run_sequence(&parent, &["b".to_string(), "a".to_string()], base_config())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unmet dependency"));
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_bound_limits_concurrency() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        for i in 0..5 {
            let id: &'static str = Box::leak(format!("c{i}").into_boxed_str());
            registry
                .register(Scripted::new(id, &[], ExecuteBehavior::Sleep(Duration::from_millis(100))))
                .unwrap();
        }
        let ids: Vec<ChallengeId> = (0..5).map(|i| format!("c{i}")).collect();
        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();

        let start = tokio::time::Instant::now();
        let results = runner
            .run_parallel(&parent, &ids, base_config(), 2)
            .await
            .unwrap();
        let elapsed = start.elapsed();

        assert_eq!(results.len(), 5);
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn parallel_results_ordered_by_submission_index() {
        let tmp = TempDir::new().unwrap();
        let registry = Arc::new(Registry::new());
        registry.register(Scripted::new("z", &[], ExecuteBehavior::PassImmediately)).unwrap();
        registry.register(Scripted::new("a", &[], ExecuteBehavior::PassImmediately)).unwrap();
        let ids = vec!["z".to_string(), "a".to_string()];
        let runner = Runner::builder(Arc::clone(&registry)).with_base_results_dir(tmp.path()).build();
        let parent = CancellationToken::new();

        let results = runner
            .run_parallel(&parent, &ids, base_config(), 5)
            .await
            .unwrap();
        assert_eq!(
            results.iter().map(|r| r.challenge_id.clone()).collect::<Vec<_>>(),
            vec!["z".to_string(), "a".to_string()]
        );
    }
}
