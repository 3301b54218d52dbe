// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use zonesync::config::Settings;
use zonesync::constants::{DEFAULT_CYCLE_INTERVAL_SECS, TOKIO_WORKER_THREADS};
use zonesync::context::Context;
use zonesync::orchestrator::SyncOrchestrator;

/// DNS zone and monitoring config reconciler.
#[derive(Debug, Parser)]
#[command(name = "zonesync", version, about)]
struct Cli {
    /// Path to the settings file
    #[arg(short, long, default_value = "zonesync.yaml")]
    config: PathBuf,

    /// Run a single cycle and exit
    #[arg(long)]
    once: bool,

    /// Seconds between cycles
    #[arg(long, default_value_t = DEFAULT_CYCLE_INTERVAL_SECS)]
    interval: u64,
}

fn main() -> Result<()> {
    // Build Tokio runtime with custom thread names
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("zonesync-cycle")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Initialize logging with custom format
    //
    // Respects RUST_LOG environment variable if set, otherwise defaults to INFO level
    // Example: RUST_LOG=debug cargo run
    //
    // Respects RUST_LOG_FORMAT environment variable for output format
    // Example: RUST_LOG_FORMAT=json cargo run
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let cli = Cli::parse();

    info!(config = %cli.config.display(), "Starting zonesync");
    let settings = Settings::load(&cli.config)?;
    debug!(domain = %settings.domain, "Settings loaded");

    let ctx = Context::new(settings);
    let orchestrator = SyncOrchestrator::new(ctx);

    if cli.once {
        let Some(outcome) = orchestrator.try_run_cycle().await else {
            anyhow::bail!("another cycle is already in flight");
        };
        if !outcome.success {
            anyhow::bail!(
                "reconciliation cycle failed: {}",
                outcome.summary.errors.join("; ")
            );
        }
        return Ok(());
    }

    // Spread simultaneous daemon starts over a few seconds
    let jitter = rand::random::<u64>() % 5;
    debug!(jitter_secs = jitter, "Delaying first cycle");
    tokio::time::sleep(Duration::from_secs(jitter)).await;

    let mut ticker = tokio::time::interval(Duration::from_secs(cli.interval.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match orchestrator.try_run_cycle().await {
                    Some(outcome) if outcome.success => {
                        debug!(
                            pairs = outcome.summary.desired_pairs,
                            endpoints = outcome.summary.endpoints,
                            "Cycle complete"
                        );
                    }
                    Some(outcome) => {
                        error!(
                            errors = ?outcome.summary.errors,
                            "Cycle finished with errors"
                        );
                    }
                    None => {
                        // Previous cycle still in flight: reject, never queue
                        warn!("Cycle still in flight, skipping this tick");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal, exiting");
                return Ok(());
            }
        }
    }
}
