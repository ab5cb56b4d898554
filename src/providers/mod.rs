// ABOUTME: Source-provider seam for measurement feeds
// ABOUTME: Defines the MeasurementFeed trait and a JSON-file feed used by the CLI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

//! The source side of the pipeline, behind a trait.
//!
//! The interactive OAuth client of the source provider is out of scope for
//! this crate; anything that can hand back an ordered measurement list can
//! drive a sync. Feed failures are surfaced unchanged as
//! [`SyncError::Feed`](crate::errors::SyncError::Feed).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::errors::{AppResult, SyncError};
use crate::models::Measurement;

/// An ordered source of measurements, newest-first.
///
/// Implementations wrap whatever provider the user tracks weight on; the
/// orchestrator only relies on the ordering contract and on failures being
/// reported, never swallowed.
#[async_trait]
pub trait MeasurementFeed: Send + Sync {
    /// List measurements, newest-first, within the half-open window
    /// `[start, end)`; either bound may be absent
    async fn list_measurements(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Measurement>>;

    /// Whether the feed currently holds usable source credentials
    async fn is_authorized(&self) -> bool;

    /// Run the provider's authorization flow, if it has one
    async fn authorize(&self) -> AppResult<()>;
}

/// Feed backed by a JSON export on disk.
///
/// The file holds an array of [`Measurement`] objects in any order; listing
/// re-sorts newest-first to honor the feed contract. This is what the CLI
/// uses, since the interactive source OAuth client lives outside this crate.
pub struct JsonFileFeed {
    path: PathBuf,
}

impl JsonFileFeed {
    /// Create a feed over the given export file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing export file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MeasurementFeed for JsonFileFeed {
    async fn list_measurements(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Measurement>> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| SyncError::feed(format!("cannot read {}: {e}", self.path.display())))?;

        let mut measurements: Vec<Measurement> = serde_json::from_str(&raw)
            .map_err(|e| SyncError::feed(format!("cannot parse {}: {e}", self.path.display())))?;

        measurements.retain(|m| {
            start.is_none_or(|s| m.timestamp >= s) && end.is_none_or(|e| m.timestamp < e)
        });
        measurements.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        debug!(
            count = measurements.len(),
            path = %self.path.display(),
            "loaded measurements from export file"
        );
        Ok(measurements)
    }

    async fn is_authorized(&self) -> bool {
        self.path.exists()
    }

    async fn authorize(&self) -> AppResult<()> {
        if self.path.exists() {
            Ok(())
        } else {
            Err(SyncError::feed(format!(
                "export file {} does not exist",
                self.path.display()
            )))
        }
    }
}
