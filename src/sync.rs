// ABOUTME: Sequential sync orchestrator: selection strategies, rate limiting, failure isolation
// ABOUTME: Drives ensure-auth, FIT encoding, and upload per measurement and aggregates SyncResults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

//! Upload orchestration.
//!
//! Every strategy builds an ordered measurement sequence and hands it to
//! [`SyncOrchestrator::sync_batch`], which runs items strictly one after
//! another with the mandatory courtesy delay in between. A failing item
//! becomes a failed [`SyncResult`]; it never aborts the rest of the batch
//! and never propagates an error past the orchestrator boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::errors::{AppResult, SyncError};
use crate::fit;
use crate::models::{BatchSummary, DateKey, Measurement, SyncPhase, SyncResult, WeightIndex};
use crate::providers::MeasurementFeed;
use crate::reconcile;
use crate::upload::GarminTransport;

/// How many newest-first feed entries a plain "sync recent" covers
pub const DEFAULT_RECENT_COUNT: usize = 7;
/// Longest span an explicit date-range sync may cover
pub const MAX_RANGE_DAYS: i64 = 90;

/// Cooperative cancellation signal polled between batch items.
///
/// A batch that has started an item finishes that item; cancellation only
/// takes effect at the seams between items.
#[derive(Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request that the running batch stop before its next item
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Sequences uploads over the feed and the Garmin transport
pub struct SyncOrchestrator {
    feed: Arc<dyn MeasurementFeed>,
    garmin: Arc<dyn GarminTransport>,
    include_blood_pressure: bool,
    upload_delay: Duration,
    cancel: CancelHandle,
    remote_index: Mutex<Option<WeightIndex>>,
}

impl SyncOrchestrator {
    /// Wire the orchestrator to a feed and a destination transport
    #[must_use]
    pub fn new(
        feed: Arc<dyn MeasurementFeed>,
        garmin: Arc<dyn GarminTransport>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            feed,
            garmin,
            include_blood_pressure: config.include_blood_pressure,
            upload_delay: config.upload_delay,
            cancel: CancelHandle::default(),
            remote_index: Mutex::new(None),
        }
    }

    /// Handle for cancelling a batch from another task
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Run the single-measurement pipeline, folding any error into a failed
    /// result; this never raises past the orchestrator boundary
    pub async fn sync_one(&self, measurement: &Measurement) -> SyncResult {
        match self.run_pipeline(measurement).await {
            Ok(()) => {
                debug!(phase = ?SyncPhase::Succeeded, measured_at = %measurement.timestamp, "measurement synced");
                SyncResult {
                    success: true,
                    message: "synced to Garmin".to_owned(),
                    measured_at: measurement.timestamp,
                }
            }
            Err(e) => {
                warn!(phase = ?SyncPhase::Failed, measured_at = %measurement.timestamp, error = %e, "sync failed");
                SyncResult {
                    success: false,
                    message: e.to_string(),
                    measured_at: measurement.timestamp,
                }
            }
        }
    }

    async fn run_pipeline(&self, measurement: &Measurement) -> AppResult<()> {
        debug!(phase = ?SyncPhase::Authenticating, "ensuring Garmin session");
        self.garmin.ensure_authenticated().await?;

        debug!(phase = ?SyncPhase::Encoding, "building FIT payload");
        let payload = fit::encode(measurement, self.include_blood_pressure);

        debug!(phase = ?SyncPhase::Uploading, bytes = payload.len(), "uploading");
        self.garmin.upload_fit(&payload).await
    }

    /// Sync an ordered sequence strictly sequentially.
    ///
    /// The configured delay is inserted between items (never concurrently,
    /// never pipelined); a failure on item *i* does not abort the rest, and
    /// each attempted item yields exactly one result in input order. The
    /// cancellation handle is polled between items.
    pub async fn sync_batch(&self, items: &[Measurement]) -> Vec<SyncResult> {
        let mut results = Vec::with_capacity(items.len());

        for (index, measurement) in items.iter().enumerate() {
            if index > 0 {
                if self.cancel.is_cancelled() {
                    warn!(
                        completed = results.len(),
                        remaining = items.len() - results.len(),
                        "batch cancelled between items"
                    );
                    break;
                }
                tokio::time::sleep(self.upload_delay).await;
            }
            results.push(self.sync_one(measurement).await);
        }

        let summary = BatchSummary::from_results(&results);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch finished"
        );
        results
    }

    /// Sync the first `count` entries of the newest-first feed
    ///
    /// # Errors
    ///
    /// Propagates feed failures; per-item upload errors are folded into the
    /// returned results instead.
    pub async fn sync_recent(&self, count: usize) -> AppResult<Vec<SyncResult>> {
        let measurements = self.feed.list_measurements(None, None).await?;
        let batch: Vec<Measurement> = measurements.into_iter().take(count).collect();
        Ok(self.sync_batch(&batch).await)
    }

    /// Sync every measurement taken on today's UTC calendar day
    ///
    /// # Errors
    ///
    /// Propagates feed failures.
    pub async fn sync_today(&self) -> AppResult<Vec<SyncResult>> {
        let today = Utc::now().date_naive();
        let measurements = self.feed.list_measurements(None, None).await?;
        let batch: Vec<Measurement> = measurements
            .into_iter()
            .filter(|m| m.date_key() == today)
            .collect();
        Ok(self.sync_batch(&batch).await)
    }

    /// Sync an explicit date range fetched fresh from the feed.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidDateRange`] before any network call when the
    /// bounds are inverted or span more than [`MAX_RANGE_DAYS`]; feed
    /// failures otherwise.
    pub async fn sync_range(&self, start: DateKey, end: DateKey) -> AppResult<Vec<SyncResult>> {
        validate_range(start, end)?;

        let start_at = start.and_time(NaiveTime::MIN).and_utc();
        // Exclusive upper bound at the midnight after the end day, so the
        // last sub-second of the end day stays inside the window
        let end_before = end
            .succ_opt()
            .map(|next| next.and_time(NaiveTime::MIN).and_utc());

        let measurements = self
            .feed
            .list_measurements(Some(start_at), end_before)
            .await?;
        info!(count = measurements.len(), %start, %end, "syncing explicit range");
        Ok(self.sync_batch(&measurements).await)
    }

    /// Sync the feed prefix through the selected measurement, oldest-first.
    ///
    /// The newest-first prefix is reversed before upload so records arrive
    /// at Garmin in chronological order.
    ///
    /// # Errors
    ///
    /// [`SyncError::SelectionNotFound`] when no feed entry matches the
    /// timestamp; feed failures otherwise.
    pub async fn sync_from_selected(
        &self,
        selected_at: DateTime<Utc>,
    ) -> AppResult<Vec<SyncResult>> {
        let measurements = self.feed.list_measurements(None, None).await?;
        let position = measurements
            .iter()
            .position(|m| m.timestamp == selected_at)
            .ok_or(SyncError::SelectionNotFound)?;

        let mut batch: Vec<Measurement> = measurements[..=position].to_vec();
        batch.reverse();
        info!(count = batch.len(), "syncing selection and everything newer, oldest first");
        Ok(self.sync_batch(&batch).await)
    }

    /// Fetch and cache the Garmin weight index covering the feed's own
    /// oldest-to-newest window; returns the number of remote days found.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidDateRange`] when the feed holds no measurements
    /// to derive a window from; feed or transport failures otherwise.
    pub async fn check_existing(&self) -> AppResult<usize> {
        let measurements = self.feed.list_measurements(None, None).await?;
        let (Some(newest), Some(oldest)) = (measurements.first(), measurements.last()) else {
            return Err(SyncError::InvalidDateRange {
                reason: "the feed returned no measurements to derive a window from".to_owned(),
            });
        };

        let index = self
            .garmin
            .weight_index(oldest.date_key(), newest.date_key())
            .await?;
        let days = index.len();
        *self.remote_index.lock().await = Some(index);
        info!(days, "Garmin weight index cached");
        Ok(days)
    }

    /// Sync only what the reconciliation diff says is missing or changed.
    ///
    /// Requires [`Self::check_existing`] to have populated the remote index
    /// first; this never fetches it implicitly.
    ///
    /// # Errors
    ///
    /// [`SyncError::RemoteIndexMissing`] when no index was fetched, with
    /// zero uploads issued; feed failures otherwise.
    pub async fn sync_only_new(&self) -> AppResult<Vec<SyncResult>> {
        let index = self
            .remote_index
            .lock()
            .await
            .clone()
            .ok_or(SyncError::RemoteIndexMissing)?;

        let measurements = self.feed.list_measurements(None, None).await?;
        let fresh = reconcile::diff(&measurements, &index);
        if fresh.is_empty() {
            info!("every measurement already exists in Garmin");
        } else {
            info!(count = fresh.len(), "syncing measurements missing from Garmin");
        }
        Ok(self.sync_batch(&fresh).await)
    }
}

/// Validate explicit range bounds; rejected ranges never reach the network
///
/// # Errors
///
/// [`SyncError::InvalidDateRange`] for inverted bounds or a span beyond
/// [`MAX_RANGE_DAYS`].
pub fn validate_range(start: DateKey, end: DateKey) -> AppResult<()> {
    if start > end {
        return Err(SyncError::InvalidDateRange {
            reason: "start date is after end date".to_owned(),
        });
    }

    let span = end.signed_duration_since(start).num_days();
    if span > MAX_RANGE_DAYS {
        return Err(SyncError::InvalidDateRange {
            reason: format!("{span}-day span exceeds the {MAX_RANGE_DAYS}-day limit"),
        });
    }

    Ok(())
}
