//! restcheck - declarative HTTP contract-test runner
//!
//! The `restcheck` command reads endpoint contracts from a suite file and
//! executes them against a live service.
//!
//! ## Commands
//!
//! - `run-suite`: execute a suite file, print per-contract lines and an
//!   aggregate summary, exit 0 when every contract passes
//! - `validate`: check a suite file's static shape without executing it

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use restcheck_core::{RunMode, RunnerConfig, Suite, SuiteRunner};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "restcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Declarative HTTP contract-test runner", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a suite file against a live service
    RunSuite {
        /// Path to the suite file (JSON)
        suite: PathBuf,

        /// Override the suite's base URL (point the suite at another deployment)
        #[arg(long)]
        base_url: Option<String>,

        /// Per-call timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout_secs: u64,

        /// Run independent contracts concurrently
        #[arg(long)]
        parallel: bool,

        /// Maximum concurrent contracts in parallel mode
        #[arg(long, default_value_t = 4)]
        workers: usize,
    },

    /// Check a suite file without executing it
    Validate {
        /// Path to the suite file (JSON)
        suite: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    restcheck_core::init_tracing(cli.json, cli.verbose);

    match cli.command {
        Commands::RunSuite {
            suite,
            base_url,
            timeout_secs,
            parallel,
            workers,
        } => cmd_run_suite(&suite, base_url, timeout_secs, parallel, workers).await,
        Commands::Validate { suite } => cmd_validate(&suite),
    }
}

async fn cmd_run_suite(
    path: &Path,
    base_url: Option<String>,
    timeout_secs: u64,
    parallel: bool,
    workers: usize,
) -> Result<()> {
    let mut suite = Suite::load(path)
        .with_context(|| format!("failed to load suite {}", path.display()))?;

    if let Some(base_url) = base_url {
        suite.base_url = base_url;
    }

    let config = RunnerConfig {
        timeout: Duration::from_secs(timeout_secs),
        workers,
        mode: if parallel {
            RunMode::Parallel
        } else {
            RunMode::Serial
        },
    };

    println!("Suite: {} ({} contracts)", suite.name, suite.contracts.len());
    println!("Target: {}", suite.base_url);
    println!();

    let runner = SuiteRunner::with_defaults(config);
    let report = runner.run(&suite).await;

    for result in &report.results {
        let status = if result.passed { "✓" } else { "✗" };
        match &result.reason {
            Some(reason) => println!(
                "  {} {} ({}ms) - {}",
                status, result.contract_name, result.duration_ms, reason
            ),
            None => println!(
                "  {} {} ({}ms)",
                status, result.contract_name, result.duration_ms
            ),
        }
    }

    println!();
    println!(
        "Summary: {}/{} contracts passed ({}ms)",
        report.passed_count(),
        report.results.len(),
        report.duration_ms
    );

    if report.success {
        Ok(())
    } else {
        anyhow::bail!("{} contract(s) failed", report.failed_count())
    }
}

fn cmd_validate(path: &Path) -> Result<()> {
    let suite = Suite::load(path)
        .with_context(|| format!("suite {} is not valid", path.display()))?;

    println!(
        "Suite `{}` is well-formed: {} contracts, digest {}",
        suite.name,
        suite.contracts.len(),
        &suite.digest()[..12]
    );
    Ok(())
}
