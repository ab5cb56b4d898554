// ABOUTME: Garmin Connect upload client: FIT import posts and the weight index query
// ABOUTME: Interprets detailedImportResult and performs one transparent re-login on 401/403
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

//! The destination HTTP surface.
//!
//! [`GarminClient`] is the production implementation; the orchestrator only
//! depends on the [`GarminTransport`] trait so batches can be exercised
//! against doubles. A 2xx on the import endpoint is not success by itself:
//! Garmin reports per-item outcomes in `detailedImportResult`, and an empty
//! success list means the upload was rejected despite the transport working.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::errors::{AppResult, SyncError};
use crate::models::{DateKey, RemoteWeightRecord, Session, WeightIndex};
use crate::session::{http_client, SessionManager, USER_AGENT};

/// Destination seam the orchestrator drives
#[async_trait]
pub trait GarminTransport: Send + Sync {
    /// Make sure a valid session exists before work that needs one
    async fn ensure_authenticated(&self) -> AppResult<()>;

    /// Upload one encoded FIT payload; `Ok` means Garmin imported it
    async fn upload_fit(&self, payload: &[u8]) -> AppResult<()>;

    /// Fetch the per-day weight mapping for the bounded window
    async fn weight_index(&self, start: DateKey, end: DateKey) -> AppResult<WeightIndex>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    detailed_import_result: DetailedImportResult,
}

#[derive(Debug, Deserialize)]
struct DetailedImportResult {
    #[serde(default)]
    successes: Vec<serde_json::Value>,
    #[serde(default)]
    failures: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeightIndexResponse {
    #[serde(default)]
    date_weight_list: Vec<DateWeightEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DateWeightEntry {
    calendar_date: DateKey,
    /// Garmin reports weight in grams
    weight: f64,
}

/// Map a Garmin service status to the session and transport errors.
///
/// # Errors
///
/// [`SyncError::SessionInvalid`] on 401/403 (the caller performs one
/// transparent re-login), [`SyncError::UploadTransport`] on any other
/// non-success status.
pub fn interpret_status(status: StatusCode) -> AppResult<()> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(SyncError::SessionInvalid);
    }
    if !status.is_success() {
        return Err(SyncError::UploadTransport { status });
    }
    Ok(())
}

/// Decide whether a 2xx import response actually imported anything.
///
/// # Errors
///
/// [`SyncError::UploadRejected`] when `detailedImportResult.successes` is
/// empty, [`SyncError::Serialization`] when the body is not the expected
/// shape.
pub fn interpret_import_result(raw: &str) -> AppResult<()> {
    let result: UploadResponse = serde_json::from_str(raw)?;
    if result.detailed_import_result.successes.is_empty() {
        debug!(
            failures = result.detailed_import_result.failures.len(),
            "Garmin reported zero successful imports"
        );
        return Err(SyncError::UploadRejected);
    }

    info!(
        imported = result.detailed_import_result.successes.len(),
        "Garmin accepted the upload"
    );
    Ok(())
}

/// Fold a weight-service date-range body into the per-day index.
///
/// Garmin reports weight in grams; the index carries kilograms.
///
/// # Errors
///
/// [`SyncError::Serialization`] when the body is not the expected shape.
pub fn parse_weight_index(raw: &str) -> AppResult<WeightIndex> {
    let result: WeightIndexResponse = serde_json::from_str(raw)?;
    Ok(result
        .date_weight_list
        .into_iter()
        .map(|entry| {
            (
                entry.calendar_date,
                RemoteWeightRecord {
                    weight_kg: entry.weight / 1000.0,
                },
            )
        })
        .collect())
}

/// Run one session-scoped call, re-authenticating at most once.
///
/// When the call reports [`SyncError::SessionInvalid`] the cached session is
/// invalidated and the call retried against a fresh one; a second rejection
/// surfaces as the error. This never loops.
///
/// # Errors
///
/// Whatever the call or the re-authentication returns.
pub async fn with_reauth<T, Op, Fut>(sessions: &SessionManager, op: Op) -> AppResult<T>
where
    Op: Fn(Session) -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let session = sessions.ensure_authenticated().await?;
    match op(session).await {
        Err(SyncError::SessionInvalid) => {
            warn!("Garmin rejected the session mid-call; re-authenticating once");
            sessions.invalidate().await;
            let session = sessions.ensure_authenticated().await?;
            op(session).await
        }
        other => other,
    }
}

/// HTTP client for the Garmin Connect import and weight services
pub struct GarminClient {
    sessions: Arc<SessionManager>,
    client: Client,
    connect_url: String,
}

impl GarminClient {
    /// Build the client with the per-call timeouts from configuration
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>, config: &SyncConfig) -> Self {
        Self {
            sessions,
            client: http_client(config),
            connect_url: config.connect_url.clone(),
        }
    }

    async fn try_upload(&self, session: &Session, payload: &[u8]) -> AppResult<()> {
        let url = format!(
            "{}/modern/proxy/upload-service/upload/.fit",
            self.connect_url
        );
        let encoded = BASE64.encode(payload);

        debug!(bytes = payload.len(), "posting FIT payload to Garmin");
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(COOKIE, session.cookie_header())
            .form(&[("file", encoded.as_str())])
            .send()
            .await?;

        interpret_status(response.status())?;
        let raw = response.text().await?;
        interpret_import_result(&raw)
    }

    async fn try_weight_index(
        &self,
        session: &Session,
        start: DateKey,
        end: DateKey,
    ) -> AppResult<WeightIndex> {
        let url = format!(
            "{}/modern/proxy/weight-service/weight/dateRange?startDate={start}&endDate={end}",
            self.connect_url
        );

        debug!(%start, %end, "fetching Garmin weight index");
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(COOKIE, session.cookie_header())
            .send()
            .await?;

        interpret_status(response.status())?;
        let raw = response.text().await?;
        let index = parse_weight_index(&raw)?;

        debug!(days = index.len(), "Garmin weight index fetched");
        Ok(index)
    }
}

#[async_trait]
impl GarminTransport for GarminClient {
    async fn ensure_authenticated(&self) -> AppResult<()> {
        self.sessions.ensure_authenticated().await.map(|_| ())
    }

    async fn upload_fit(&self, payload: &[u8]) -> AppResult<()> {
        with_reauth(&self.sessions, |session| async move {
            self.try_upload(&session, payload).await
        })
        .await
    }

    async fn weight_index(&self, start: DateKey, end: DateKey) -> AppResult<WeightIndex> {
        with_reauth(&self.sessions, |session| async move {
            self.try_weight_index(&session, start, end).await
        })
        .await
    }
}
