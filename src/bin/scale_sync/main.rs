// ABOUTME: scale-sync CLI - dispatches sync commands and renders the ordered result stream
// ABOUTME: Thin presentation layer over SyncOrchestrator; no business logic lives here
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors
//!
//! Usage:
//! ```bash
//! # Sync the seven most recent measurements from a Withings JSON export
//! scale-sync --measurements export.json recent
//!
//! # Sync everything taken today
//! scale-sync --measurements export.json today
//!
//! # Sync an explicit window (max 90 days)
//! scale-sync --measurements export.json range --start 2024-01-01 --end 2024-01-31
//!
//! # See what Garmin already has, then upload only the missing days
//! scale-sync --measurements export.json only-new
//!
//! # Forget the persisted Garmin session
//! scale-sync reset-session
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use scale_sync::config::SyncConfig;
use scale_sync::logging;
use scale_sync::models::{BatchSummary, SyncResult};
use scale_sync::providers::JsonFileFeed;
use scale_sync::session::{FileSessionStore, HttpAuthTransport, SessionManager};
use scale_sync::sync::{SyncOrchestrator, DEFAULT_RECENT_COUNT};
use scale_sync::upload::GarminClient;

#[derive(Parser)]
#[command(
    name = "scale-sync",
    about = "Mirror body-composition measurements into Garmin Connect",
    long_about = "Reconciles measurements from a Withings-style JSON export against Garmin \
                  Connect and uploads only the missing or changed days as FIT files."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to a JSON export of measurements (array of readings)
    #[arg(long, global = true)]
    measurements: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Sync the most recent measurements from the feed
    Recent {
        /// How many newest-first entries to sync
        #[arg(long, default_value_t = DEFAULT_RECENT_COUNT)]
        count: usize,
    },
    /// Sync every measurement taken today
    Today,
    /// Sync an explicit date range (at most 90 days)
    Range {
        /// First day of the window, YYYY-MM-DD
        #[arg(long)]
        start: NaiveDate,
        /// Last day of the window, YYYY-MM-DD
        #[arg(long)]
        end: NaiveDate,
    },
    /// Sync the selected measurement and everything newer, oldest first
    From {
        /// Timestamp of the selected measurement, RFC 3339
        #[arg(long)]
        timestamp: DateTime<Utc>,
    },
    /// Fetch the weight data Garmin already holds for the feed's window
    Check,
    /// Check Garmin, then upload only measurements missing or changed there
    OnlyNew,
    /// Erase the persisted Garmin session
    ResetSession,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init()?;

    let cli = Cli::parse();
    let config = SyncConfig::from_env();

    let sessions = Arc::new(SessionManager::new(
        Box::new(HttpAuthTransport::new(&config)),
        Box::new(FileSessionStore::new(config.session_file.clone())),
        config.username.clone(),
        config.password.clone(),
    ));

    if matches!(cli.command, Command::ResetSession) {
        sessions.reset().await?;
        println!("Garmin session cleared");
        return Ok(());
    }

    let Some(measurements_path) = cli.measurements else {
        bail!("--measurements <FILE> is required for this command");
    };

    let garmin = Arc::new(GarminClient::new(Arc::clone(&sessions), &config));
    let feed = Arc::new(JsonFileFeed::new(measurements_path));
    let orchestrator = SyncOrchestrator::new(feed, garmin, &config);

    match cli.command {
        Command::Recent { count } => render(&orchestrator.sync_recent(count).await?),
        Command::Today => render(&orchestrator.sync_today().await?),
        Command::Range { start, end } => render(&orchestrator.sync_range(start, end).await?),
        Command::From { timestamp } => render(&orchestrator.sync_from_selected(timestamp).await?),
        Command::Check => {
            let days = orchestrator.check_existing().await?;
            println!("Garmin already holds weight data for {days} day(s) in this window");
        }
        Command::OnlyNew => {
            let days = orchestrator.check_existing().await?;
            println!("Garmin already holds weight data for {days} day(s); diffing against it");
            render(&orchestrator.sync_only_new().await?);
        }
        Command::ResetSession => unreachable!("handled before feed wiring"),
    }

    Ok(())
}

/// Print one line per result plus the aggregate counts
fn render(results: &[SyncResult]) {
    for result in results {
        let marker = if result.success { " ok" } else { "ERR" };
        println!(
            "{marker}  {}  {}",
            result.measured_at.format("%Y-%m-%d %H:%M"),
            result.message
        );
    }

    let summary = BatchSummary::from_results(results);
    println!(
        "{} synced, {} failed ({} total)",
        summary.succeeded,
        summary.failed,
        results.len()
    );
}
