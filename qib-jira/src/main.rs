//! qib-jira - download Jira Cloud issues into a local SQLite database
//!
//! One invocation performs one fetch-and-persist cycle; `--schedule N`
//! repeats the cycle every N minutes until interrupted. Credentials come
//! from flags or from the environment (a local `.env` file is honored),
//! with flags taking precedence.
//!
//! Logs go to $XDG_STATE_HOME/qib-jira/qib-jira.log (~/.local/state/...).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use qib_jira_core::config::{DEFAULT_DATABASE, DEFAULT_DAYS, DEFAULT_PROJECT, DEFAULT_SERVER};
use qib_jira_core::{SyncConfig, SyncOutcome, SyncRunner};

#[derive(Parser)]
#[command(name = "qib-jira")]
#[command(about = "Download records from Cloud JIRA to a local sqlite database")]
#[command(version)]
struct Args {
    /// JIRA Cloud admin email
    #[arg(long, env = "JIRA_EMAIL")]
    email: String,

    /// JIRA Cloud API token
    #[arg(long, env = "JIRA_TOKEN", hide_env_values = true)]
    token: String,

    /// Location of the database file
    #[arg(long, default_value = DEFAULT_DATABASE)]
    database: PathBuf,

    /// Project name
    #[arg(long, default_value = DEFAULT_PROJECT)]
    project: String,

    /// Number of days to query
    #[arg(long, default_value_t = DEFAULT_DAYS)]
    days: u32,

    /// Repeat the run every X minutes instead of exiting
    #[arg(long, value_name = "MINUTES")]
    schedule: Option<u64>,

    /// Health check URL to ping after each successful run
    #[arg(long = "health-check", env = "HEALTH_CHECK_URL", value_name = "URL")]
    health_check: Option<String>,

    /// JIRA Cloud base URL
    #[arg(long, env = "JIRA_SERVER", default_value = DEFAULT_SERVER)]
    server: String,

    /// Verbose output
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    // Pick up JIRA_EMAIL / JIRA_TOKEN / HEALTH_CHECK_URL from a local .env
    // before clap resolves its env fallbacks
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Initialize logging
    let _log_guard = qib_jira_core::logging::init().context("failed to initialize logging")?;

    tracing::info!("qib-jira starting");

    let config = SyncConfig {
        server: args.server,
        email: args.email,
        token: args.token,
        project: args.project,
        days: args.days,
        database: args.database,
        schedule: args.schedule,
        health_check: args.health_check,
        ..SyncConfig::default()
    };

    let runner = SyncRunner::new(&config).context("failed to set up sync")?;

    println!("Database: {}", config.database.display());

    match config.schedule {
        Some(minutes) => run_scheduled(&runner, minutes, args.verbose),
        None => run_single(&runner, args.verbose),
    }
}

/// Run a single sync cycle with a progress bar
fn run_single(runner: &SyncRunner, verbose: u8) -> Result<()> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap()
            .progress_chars("#>-"),
    );
    pb.set_message("fetching issues");

    let outcome = runner
        .run_once_with_progress(|fetched, total| {
            if pb.length().unwrap_or(0) == 0 {
                pb.set_length(total);
            }
            pb.set_position(fetched as u64);
        })
        .context("sync failed")?;

    pb.finish_and_clear();

    print_outcome(&outcome, verbose);

    tracing::info!(
        fetched = outcome.fetched,
        inserted = outcome.inserted,
        "qib-jira complete"
    );

    Ok(())
}

/// Repeat sync cycles at a fixed interval until Ctrl+C
fn run_scheduled(runner: &SyncRunner, minutes: u64, verbose: u8) -> Result<()> {
    // Set up signal handler for graceful shutdown
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        eprintln!("\nShutting down...");
        r.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let interval = Duration::from_secs(minutes.saturating_mul(60));

    println!(
        "Running every {} minute(s). Press Ctrl+C to stop.",
        minutes
    );
    println!();

    let mut iteration = 0u64;

    while running.load(Ordering::SeqCst) {
        iteration += 1;

        match runner.run_once() {
            Ok(outcome) => {
                let timestamp = chrono::Local::now().format("%H:%M:%S");
                println!(
                    "[{}] Synced: {} fetched, {} inserted, {} updated, {} unchanged",
                    timestamp, outcome.fetched, outcome.inserted, outcome.updated,
                    outcome.unchanged
                );
                if verbose >= 1 {
                    println!(
                        "  {} page(s) in {}ms{}",
                        outcome.pages,
                        outcome.duration_ms,
                        if outcome.health_pinged {
                            ", health check pinged"
                        } else {
                            ""
                        }
                    );
                }
                tracing::info!(
                    iteration,
                    fetched = outcome.fetched,
                    inserted = outcome.inserted,
                    "scheduled sync iteration"
                );
            }
            Err(e) => {
                // A failed cycle gets a fresh try at the next interval
                eprintln!("Sync failed: {:#}", e);
                tracing::error!(iteration, error = %e, "Scheduled sync iteration failed");
            }
        }

        sleep_until_next(interval, &running);
    }

    println!("Scheduler stopped.");
    tracing::info!("qib-jira scheduler stopped");

    Ok(())
}

/// Sleep for the interval in one-second slices so Ctrl+C stops us promptly
fn sleep_until_next(interval: Duration, running: &AtomicBool) {
    let slice = Duration::from_secs(1);
    let mut remaining = interval;
    while !remaining.is_zero() && running.load(Ordering::SeqCst) {
        let step = remaining.min(slice);
        thread::sleep(step);
        remaining -= step;
    }
}

/// Print a one-shot run summary
fn print_outcome(outcome: &SyncOutcome, verbose: u8) {
    println!("\nSync complete:");
    println!("  Issues fetched: {}", outcome.fetched);
    println!("  Inserted:       {}", outcome.inserted);
    println!("  Updated:        {}", outcome.updated);
    println!("  Unchanged:      {}", outcome.unchanged);

    if verbose >= 1 {
        println!("  Pages fetched:  {}", outcome.pages);
        println!("  Duration:       {}ms", outcome.duration_ms);
        if outcome.health_pinged {
            println!("  Health check:   pinged");
        }
    }
}
