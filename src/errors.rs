// ABOUTME: Unified error types for session, upload, and sync operations
// ABOUTME: Defines the SyncError enum and the AppResult alias used across the crate
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

//! Error handling for the sync pipeline.
//!
//! Validation errors short-circuit before any network call. `SessionInvalid`
//! is handled internally by exactly one transparent re-login; every other
//! failure surfaces as-is and, inside a batch, is folded into a failed
//! [`SyncResult`](crate::models::SyncResult) for that single item.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias used throughout the crate
pub type AppResult<T> = Result<T, SyncError>;

/// Errors produced by the session, upload, and orchestration layers
#[derive(Debug, Error)]
pub enum SyncError {
    /// Garmin username or password is not configured
    #[error("Garmin credentials are missing; set GARMIN_USERNAME and GARMIN_PASSWORD")]
    CredentialsMissing,

    /// The Garmin sign-in endpoint rejected the credential login
    #[error("Garmin sign-in rejected with status {status}")]
    AuthRejected {
        /// HTTP status returned by the sign-in endpoint
        status: StatusCode,
    },

    /// The cached session no longer authenticates requests
    #[error("Garmin session is no longer valid")]
    SessionInvalid,

    /// The upload request itself failed at the transport level
    #[error("upload to Garmin failed with status {status}")]
    UploadTransport {
        /// Non-success HTTP status returned by the import endpoint
        status: StatusCode,
    },

    /// Garmin answered 2xx but reported zero successful imports
    #[error("Garmin accepted the upload request but imported no records")]
    UploadRejected,

    /// A date-range request failed validation before any network call
    #[error("invalid date range: {reason}")]
    InvalidDateRange {
        /// Why the range was rejected
        reason: String,
    },

    /// Sync-only-new was invoked before a remote weight index was fetched
    #[error("no Garmin weight index available; run a check-existing pass first")]
    RemoteIndexMissing,

    /// The requested measurement does not exist in the feed
    #[error("selected measurement not found in the feed")]
    SelectionNotFound,

    /// Reading or writing the persisted session blob failed
    #[error("failed to access the persisted session")]
    SessionStore {
        /// Underlying filesystem error
        #[source]
        source: std::io::Error,
    },

    /// An HTTP request failed below the protocol level
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failed
    #[error("serialization failed")]
    Serialization(#[from] serde_json::Error),

    /// The source measurement feed reported a failure, surfaced unchanged
    #[error("measurement feed error: {message}")]
    Feed {
        /// Message from the source feed
        message: String,
    },
}

impl SyncError {
    /// Wrap a source-feed failure without reinterpreting it
    pub fn feed(message: impl Into<String>) -> Self {
        Self::Feed {
            message: message.into(),
        }
    }
}
