// ABOUTME: Domain models shared across the sync pipeline
// ABOUTME: Measurement snapshots, Garmin sessions, remote weight records, and sync results
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Calendar-day join key between local measurements and remote records.
///
/// Both sides must truncate to the UTC calendar day; deriving the key any
/// other way silently misclassifies records during reconciliation.
pub type DateKey = NaiveDate;

/// One timestamped body-composition or blood-pressure reading from the feed.
///
/// Produced by the source provider and never mutated; every physiological
/// field is optional because scales and cuffs report different subsets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Moment the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Body weight in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    /// Body fat as a percentage of total weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_fat_pct: Option<f64>,
    /// Body water as a percentage of total weight
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_water_pct: Option<f64>,
    /// Bone mass in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bone_mass_kg: Option<f64>,
    /// Muscle mass in kilograms
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub muscle_mass_kg: Option<f64>,
    /// Systolic blood pressure in mmHg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic_mmhg: Option<u16>,
    /// Diastolic blood pressure in mmHg
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic_mmhg: Option<u16>,
    /// Heart rate in beats per minute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate_bpm: Option<u8>,
}

impl Measurement {
    /// The reconciliation join key: the UTC calendar day of the timestamp
    #[must_use]
    pub fn date_key(&self) -> DateKey {
        self.timestamp.date_naive()
    }

    /// Whether the reading carries a complete blood-pressure pair
    #[must_use]
    pub fn has_blood_pressure(&self) -> bool {
        self.systolic_mmhg.is_some() && self.diastolic_mmhg.is_some()
    }
}

/// Opaque Garmin authentication artifact: the cookie set issued at sign-in.
///
/// Exactly one session is cached per process and persisted as a single JSON
/// blob; a new login fully replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Cookies captured from the sign-in response, as `name=value` pairs
    pub cookies: Vec<String>,
}

impl Session {
    /// Render the cookie set as a single `Cookie` request-header value
    #[must_use]
    pub fn cookie_header(&self) -> String {
        self.cookies.join("; ")
    }
}

/// Weight Garmin reports for one calendar day of the queried window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteWeightRecord {
    /// Weight in kilograms
    pub weight_kg: f64,
}

/// Per-day weight mapping fetched from Garmin for a bounded window.
///
/// At most one record per [`DateKey`] is assumed to exist remotely.
pub type WeightIndex = BTreeMap<DateKey, RemoteWeightRecord>;

/// Outcome of one upload attempt, kept in memory for the current batch only
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    /// Whether the measurement reached Garmin
    pub success: bool,
    /// Human-readable outcome, an error message on failure
    pub message: String,
    /// Timestamp of the originating measurement
    pub measured_at: DateTime<Utc>,
}

/// Pipeline phase of a single measurement; terminal states are recorded once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Queued, nothing attempted yet
    Pending,
    /// Ensuring a valid Garmin session
    Authenticating,
    /// Building the FIT payload
    Encoding,
    /// Posting to the import endpoint
    Uploading,
    /// Imported by Garmin
    Succeeded,
    /// Terminal failure; no automatic re-entry
    Failed,
}

/// Aggregate counts rendered after a batch completes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Items Garmin imported
    pub succeeded: usize,
    /// Items that failed anywhere in the pipeline
    pub failed: usize,
}

impl BatchSummary {
    /// Tally an ordered result sequence
    #[must_use]
    pub fn from_results(results: &[SyncResult]) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            succeeded,
            failed: results.len() - succeeded,
        }
    }
}
