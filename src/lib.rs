// ABOUTME: Main library entry point for the scale-sync crate
// ABOUTME: Mirrors body-composition measurements from a Withings-style feed into Garmin Connect
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

#![deny(unsafe_code)]

//! # scale-sync
//!
//! Reconciles body-composition measurements pulled from a source feed against
//! the weight records already present in Garmin Connect, then uploads only the
//! missing or materially changed days as FIT files.
//!
//! ## Architecture
//!
//! - **Session**: Garmin credential login, cookie persistence, validity probing
//! - **Fit**: deterministic binary encoding of one measurement
//! - **Upload**: base64 form upload and the per-day weight index query
//! - **Reconcile**: the local-vs-remote diff deciding what is worth syncing
//! - **Sync**: the sequential, rate-limited orchestrator tying it together
//!
//! The source feed and the presentation layer live behind seams
//! ([`providers::MeasurementFeed`] and the [`SyncResult`](models::SyncResult)
//! stream returned by [`sync::SyncOrchestrator`]); this crate carries no UI
//! and no source-provider OAuth client of its own.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scale_sync::config::SyncConfig;
//! use scale_sync::providers::JsonFileFeed;
//! use scale_sync::session::{FileSessionStore, HttpAuthTransport, SessionManager};
//! use scale_sync::sync::SyncOrchestrator;
//! use scale_sync::upload::GarminClient;
//!
//! # async fn run() -> scale_sync::errors::AppResult<()> {
//! let config = SyncConfig::from_env();
//! let sessions = SessionManager::new(
//!     Box::new(HttpAuthTransport::new(&config)),
//!     Box::new(FileSessionStore::new(config.session_file.clone())),
//!     config.username.clone(),
//!     config.password.clone(),
//! );
//! let garmin = GarminClient::new(Arc::new(sessions), &config);
//! let feed = JsonFileFeed::new("measurements.json");
//! let orchestrator = SyncOrchestrator::new(Arc::new(feed), Arc::new(garmin), &config);
//! let results = orchestrator.sync_recent(7).await?;
//! println!("{} synced", results.iter().filter(|r| r.success).count());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod errors;
pub mod fit;
pub mod logging;
pub mod models;
pub mod providers;
pub mod reconcile;
pub mod session;
pub mod sync;
pub mod upload;

pub use errors::{AppResult, SyncError};
pub use models::{BatchSummary, DateKey, Measurement, RemoteWeightRecord, SyncResult, WeightIndex};
