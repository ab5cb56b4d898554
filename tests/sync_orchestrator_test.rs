// ABOUTME: Tests for the sync orchestrator: strategies, ordering, rate limiting, isolation
// ABOUTME: Drives batches against fake feed and Garmin transports with scripted outcomes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::StatusCode;
use scale_sync::config::SyncConfig;
use scale_sync::errors::{AppResult, SyncError};
use scale_sync::fit;
use scale_sync::models::{Measurement, RemoteWeightRecord, WeightIndex};
use scale_sync::providers::MeasurementFeed;
use scale_sync::sync::{validate_range, SyncOrchestrator, MAX_RANGE_DAYS};
use scale_sync::upload::GarminTransport;

fn measurement(timestamp: &str, weight_kg: Option<f64>) -> Measurement {
    Measurement {
        timestamp: timestamp.parse().unwrap(),
        weight_kg,
        body_fat_pct: None,
        body_water_pct: None,
        bone_mass_kg: None,
        muscle_mass_kg: None,
        systolic_mmhg: None,
        diastolic_mmhg: None,
        heart_rate_bpm: None,
    }
}

/// Newest-first in-memory feed, counting list calls
struct FakeFeed {
    items: Vec<Measurement>,
    list_calls: AtomicUsize,
}

impl FakeFeed {
    fn new(mut items: Vec<Measurement>) -> Self {
        items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Self {
            items,
            list_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MeasurementFeed for FakeFeed {
    async fn list_measurements(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<Measurement>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .items
            .iter()
            .filter(|m| {
                start.is_none_or(|s| m.timestamp >= s) && end.is_none_or(|e| m.timestamp < e)
            })
            .cloned()
            .collect())
    }

    async fn is_authorized(&self) -> bool {
        true
    }

    async fn authorize(&self) -> AppResult<()> {
        Ok(())
    }
}

/// Garmin double recording uploads and popping scripted outcomes
#[derive(Default)]
struct FakeGarmin {
    uploads: std::sync::Mutex<Vec<Vec<u8>>>,
    script: std::sync::Mutex<VecDeque<AppResult<()>>>,
    index: WeightIndex,
    index_calls: AtomicUsize,
}

impl FakeGarmin {
    fn with_script(outcomes: Vec<AppResult<()>>) -> Self {
        Self {
            script: std::sync::Mutex::new(outcomes.into()),
            ..Self::default()
        }
    }

    fn with_index(index: WeightIndex) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl GarminTransport for FakeGarmin {
    async fn ensure_authenticated(&self) -> AppResult<()> {
        Ok(())
    }

    async fn upload_fit(&self, payload: &[u8]) -> AppResult<()> {
        self.uploads.lock().unwrap().push(payload.to_vec());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(()))
    }

    async fn weight_index(
        &self,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> AppResult<WeightIndex> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.index.clone())
    }
}

fn test_config() -> SyncConfig {
    SyncConfig {
        upload_delay: Duration::from_millis(1000),
        ..SyncConfig::default()
    }
}

fn orchestrator(feed: &Arc<FakeFeed>, garmin: &Arc<FakeGarmin>) -> SyncOrchestrator {
    let feed: Arc<dyn MeasurementFeed> = feed.clone();
    let garmin: Arc<dyn GarminTransport> = garmin.clone();
    SyncOrchestrator::new(feed, garmin, &test_config())
}

fn day(date: &str) -> NaiveDate {
    date.parse().unwrap()
}

#[test]
fn test_inverted_range_rejected() {
    let err = validate_range(day("2024-01-10"), day("2024-01-05")).unwrap_err();
    assert!(matches!(err, SyncError::InvalidDateRange { .. }));
}

#[test]
fn test_oversized_range_rejected() {
    // 91 days end to end
    let err = validate_range(day("2024-01-01"), day("2024-04-01")).unwrap_err();
    assert!(matches!(err, SyncError::InvalidDateRange { .. }));
    assert_eq!(
        day("2024-04-01").signed_duration_since(day("2024-01-01")).num_days(),
        MAX_RANGE_DAYS + 1
    );
}

#[test]
fn test_maximum_range_accepted() {
    validate_range(day("2024-01-01"), day("2024-03-31")).unwrap();
}

#[tokio::test]
async fn test_rejected_range_issues_zero_network_calls() {
    let feed = Arc::new(FakeFeed::new(vec![measurement(
        "2024-01-07T08:00:00Z",
        Some(80.0),
    )]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let err = sync
        .sync_range(day("2024-01-10"), day("2024-01-05"))
        .await
        .unwrap_err();

    assert!(matches!(err, SyncError::InvalidDateRange { .. }));
    assert_eq!(feed.list_calls.load(Ordering::SeqCst), 0);
    assert_eq!(garmin.upload_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_batch_isolates_failures_and_preserves_order() {
    let m1 = measurement("2024-01-07T08:00:00Z", Some(80.0));
    let m2 = measurement("2024-01-06T08:00:00Z", Some(80.2));
    let m3 = measurement("2024-01-05T08:00:00Z", Some(80.4));

    let feed = Arc::new(FakeFeed::new(vec![m1.clone(), m2.clone(), m3.clone()]));
    let garmin = Arc::new(FakeGarmin::with_script(vec![
        Ok(()),
        Err(SyncError::UploadTransport {
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }),
        Ok(()),
    ]));
    let sync = orchestrator(&feed, &garmin);

    let started = tokio::time::Instant::now();
    let results = sync.sync_batch(&[m1.clone(), m2.clone(), m3.clone()]).await;

    assert_eq!(results.len(), 3);
    assert!(results[0].success);
    assert!(!results[1].success);
    assert!(results[1].message.contains("500"));
    assert!(results[2].success);
    assert_eq!(results[0].measured_at, m1.timestamp);
    assert_eq!(results[1].measured_at, m2.timestamp);
    assert_eq!(results[2].measured_at, m3.timestamp);

    // Two inter-item delays of one second each
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert_eq!(garmin.upload_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_range_end_day_includes_final_subsecond() {
    let late = measurement("2024-01-31T23:59:59.500Z", Some(80.0));
    let next_day = measurement("2024-02-01T00:00:00Z", Some(80.5));

    let feed = Arc::new(FakeFeed::new(vec![late.clone(), next_day]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let results = sync
        .sync_range(day("2024-01-01"), day("2024-01-31"))
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].measured_at, late.timestamp);
}

#[tokio::test(start_paused = true)]
async fn test_recent_syncs_first_n_feed_entries() {
    let items: Vec<Measurement> = (1..=10)
        .map(|d| measurement(&format!("2024-01-{d:02}T08:00:00Z"), Some(80.0)))
        .collect();
    let feed = Arc::new(FakeFeed::new(items));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let results = sync.sync_recent(7).await.unwrap();
    assert_eq!(results.len(), 7);
    // Feed is newest-first, so the newest day comes out first
    assert_eq!(results[0].measured_at, "2024-01-10T08:00:00Z".parse::<DateTime<Utc>>().unwrap());
}

#[tokio::test(start_paused = true)]
async fn test_today_filters_by_utc_date_key() {
    let now = Utc::now();
    let today = measurement(&now.to_rfc3339(), Some(80.0));
    let last_week = measurement(
        &(now - chrono::Duration::days(7)).to_rfc3339(),
        Some(81.0),
    );

    let feed = Arc::new(FakeFeed::new(vec![today.clone(), last_week]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let results = sync.sync_today().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].measured_at, today.timestamp);
}

#[tokio::test(start_paused = true)]
async fn test_from_selected_replays_prefix_oldest_first() {
    let newest = measurement("2024-01-07T08:00:00Z", Some(80.0));
    let selected = measurement("2024-01-06T08:00:00Z", Some(80.2));
    let older = measurement("2024-01-05T08:00:00Z", Some(80.4));

    let feed = Arc::new(FakeFeed::new(vec![
        newest.clone(),
        selected.clone(),
        older.clone(),
    ]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let results = sync.sync_from_selected(selected.timestamp).await.unwrap();
    assert_eq!(results.len(), 2);

    // Uploads arrive oldest-first; payload determinism identifies each item
    let uploads = garmin.uploads.lock().unwrap();
    assert_eq!(uploads[0], fit::encode(&selected, false));
    assert_eq!(uploads[1], fit::encode(&newest, false));
}

#[tokio::test]
async fn test_from_selected_unknown_timestamp_fails() {
    let feed = Arc::new(FakeFeed::new(vec![measurement(
        "2024-01-07T08:00:00Z",
        Some(80.0),
    )]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let err = sync
        .sync_from_selected("2030-01-01T00:00:00Z".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::SelectionNotFound));
    assert_eq!(garmin.upload_count(), 0);
}

#[tokio::test]
async fn test_only_new_without_prior_check_fails_fast() {
    let feed = Arc::new(FakeFeed::new(vec![measurement(
        "2024-01-07T08:00:00Z",
        Some(80.0),
    )]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let err = sync.sync_only_new().await.unwrap_err();
    assert!(matches!(err, SyncError::RemoteIndexMissing));
    assert_eq!(garmin.upload_count(), 0);
    assert_eq!(garmin.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_only_new_skips_days_already_in_garmin() {
    let changed = measurement("2024-01-07T08:00:00Z", Some(80.0));
    let unchanged = measurement("2024-01-06T08:00:00Z", Some(80.2));
    let missing = measurement("2024-01-05T08:00:00Z", Some(80.4));

    let mut index = WeightIndex::new();
    index.insert(day("2024-01-07"), RemoteWeightRecord { weight_kg: 81.0 });
    index.insert(day("2024-01-06"), RemoteWeightRecord { weight_kg: 80.2 });

    let feed = Arc::new(FakeFeed::new(vec![
        changed.clone(),
        unchanged.clone(),
        missing.clone(),
    ]));
    let garmin = Arc::new(FakeGarmin::with_index(index));
    let sync = orchestrator(&feed, &garmin);

    let found = sync.check_existing().await.unwrap();
    assert_eq!(found, 2);
    assert_eq!(garmin.index_calls.load(Ordering::SeqCst), 1);

    let results = sync.sync_only_new().await.unwrap();
    assert_eq!(results.len(), 2);

    let uploads = garmin.uploads.lock().unwrap();
    assert_eq!(uploads[0], fit::encode(&changed, false));
    assert_eq!(uploads[1], fit::encode(&missing, false));
}

#[tokio::test]
async fn test_check_existing_with_empty_feed_fails() {
    let feed = Arc::new(FakeFeed::new(vec![]));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    let err = sync.check_existing().await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidDateRange { .. }));
    assert_eq!(garmin.index_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_stops_between_items() {
    let items: Vec<Measurement> = (1..=3)
        .map(|d| measurement(&format!("2024-01-{d:02}T08:00:00Z"), Some(80.0)))
        .collect();
    let feed = Arc::new(FakeFeed::new(items.clone()));
    let garmin = Arc::new(FakeGarmin::default());
    let sync = orchestrator(&feed, &garmin);

    // Cancel before the batch: the in-flight item finishes, the rest do not run
    sync.cancel_handle().cancel();
    let results = sync.sync_batch(&items).await;

    assert_eq!(results.len(), 1);
    assert_eq!(garmin.upload_count(), 1);
}
