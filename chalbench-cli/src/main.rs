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

//! chalbench CLI
//!
//! Command-line entry point for the chalbench challenge execution engine:
//! bank file validation, dependency-bank loading and `RunAll`/`RunSequence`.

mod bank;
mod history;

use anyhow::{Context, Result};
use chalbench_core::cancel::CancellationToken;
use chalbench_core::Config;
use chalbench_runtime::{Registry, Runner, RunnerBuilder};
use clap::{Parser, Subcommand};
use history::HistoryLog;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "chalbench")]
#[command(about = "Challenge execution engine", long_about = None)]
struct Cli {
    /// Directory new results are written under.
    #[arg(long, default_value = "./chalbench-results")]
    results_dir: PathBuf,

    /// Append-only execution history log.
    #[arg(long, default_value = "./chalbench-results/history.jsonl")]
    history_path: PathBuf,

    /// Verbose mode.
    #[arg(short, long)]
    verbose: bool,

    /// Output as JSON (machine-readable).
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a bank file against the accumulating validator.
    ValidateBank {
        /// Path to the bank file (JSON).
        path: PathBuf,
    },

    /// Load every `.json`/`.yaml`/`.yml` bank file in a directory
    /// (non-recursive) and list the definitions it registered.
    LoadBank {
        /// Directory containing bank files.
        dir: PathBuf,
    },

    /// Run every registered definition in topological dependency order.
    RunAll {
        /// Directory containing bank files to load first.
        #[arg(long)]
        bank_dir: Option<PathBuf>,

        /// Per-challenge timeout in seconds (0 = runner default).
        #[arg(long, default_value_t = 0)]
        timeout_secs: u64,
    },

    /// Run a caller-ordered subset of registered definitions; every
    /// declared dependency must already have passed earlier in the list.
    RunSequence {
        /// Directory containing bank files to load first.
        #[arg(long)]
        bank_dir: Option<PathBuf>,

        /// Challenge IDs, in the order to execute them.
        ids: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.to_string())),
        )
        .init();
}

/// Only a bank-registered `Definition` is needed for these subcommands —
/// none of them execute a live `Challenge`, so the registry built here never
/// has any instances registered, only definitions.
fn build_registry() -> Arc<Registry> {
    Arc::new(Registry::new())
}

fn print_result(result: &chalbench_core::ExecutionResult, json: bool) {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(rendered) => println!("{rendered}"),
            Err(e) => eprintln!("failed to render result as JSON: {e}"),
        }
        return;
    }

    println!(
        "{} [{:?}] {}/{} assertions passed in {:?}",
        result.challenge_id,
        result.status,
        result.assertions.iter().filter(|a| a.passed).count(),
        result.assertions.len(),
        result.duration,
    );
    if !result.error.is_empty() {
        println!("  error: {}", result.error);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::ValidateBank { path } => {
            let errors = bank::validate_bank_file(path);
            if errors.is_empty() {
                println!("✓ {} is a valid bank file", path.display());
                return Ok(());
            }
            for e in &errors {
                println!("✗ [{}] {}: {}", e.index, e.field, e.message);
            }
            std::process::exit(1);
        }

        Commands::LoadBank { dir } => {
            let registry = build_registry();
            let count = bank::load_bank_directory(dir, &registry)
                .with_context(|| format!("loading bank directory {}", dir.display()))?;
            info!(count, dir = %dir.display(), "loaded bank directory");
            for def in registry.list_definitions() {
                println!("{}: {} ({})", def.id, def.name, def.category);
            }
            println!("✓ registered {count} definition(s)");
        }

        Commands::RunAll {
            bank_dir,
            timeout_secs,
        } => {
            let registry = build_registry();
            if let Some(dir) = bank_dir {
                bank::load_bank_directory(dir, &registry)
                    .with_context(|| format!("loading bank directory {}", dir.display()))?;
            }

            let mut builder: RunnerBuilder =
                Runner::builder(Arc::clone(&registry)).with_base_results_dir(cli.results_dir.clone());
            if *timeout_secs > 0 {
                builder = builder.with_default_timeout(Duration::from_secs(*timeout_secs));
            }
            let runner = builder.build();

            let parent = CancellationToken::new();
            let results = runner
                .run_all(&parent, base_config())
                .await
                .context("run_all failed")?;

            let history = HistoryLog::new(cli.history_path.clone());
            for result in &results {
                print_result(result, cli.json);
                if let Err(e) = history.append(result) {
                    tracing::warn!(error = %e, "failed to append history record");
                }
            }

            if results.iter().any(|r| !r.all_passed()) {
                std::process::exit(1);
            }
        }

        Commands::RunSequence { bank_dir, ids } => {
            let registry = build_registry();
            if let Some(dir) = bank_dir {
                bank::load_bank_directory(dir, &registry)
                    .with_context(|| format!("loading bank directory {}", dir.display()))?;
            }

            let runner = Runner::builder(Arc::clone(&registry))
                .with_base_results_dir(cli.results_dir.clone())
                .build();

            let parent = CancellationToken::new();
            let results = runner
                .run_sequence(&parent, ids, base_config())
                .await
                .context("run_sequence failed")?;

            let history = HistoryLog::new(cli.history_path.clone());
            for result in &results {
                print_result(result, cli.json);
                if let Err(e) = history.append(result) {
                    tracing::warn!(error = %e, "failed to append history record");
                }
            }

            if results.iter().any(|r| !r.all_passed()) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
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
