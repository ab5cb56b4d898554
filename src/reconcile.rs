// ABOUTME: Reconciliation between local measurements and the Garmin weight index
// ABOUTME: Pure diff deciding which measurements are missing or materially changed remotely
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

use crate::models::{Measurement, WeightIndex};

/// Minimum weight delta, in kilograms, below which two readings for the same
/// day count as the same value
pub const WEIGHT_TOLERANCE_KG: f64 = 0.1;

/// Select the measurements worth uploading, preserving input order.
///
/// A measurement is included when its calendar day has no remote entry, or
/// when it carries a weight differing from the remote one by at least
/// [`WEIGHT_TOLERANCE_KG`]. A weightless measurement whose day *is* present
/// remotely is excluded: there is nothing to compare it against, and the
/// weight index is the only remote signal available. That also covers
/// blood-pressure-only readings on days that already hold a weight, which is
/// a deliberate policy, not an oversight.
#[must_use]
pub fn diff(local: &[Measurement], remote: &WeightIndex) -> Vec<Measurement> {
    local
        .iter()
        .filter(|measurement| match remote.get(&measurement.date_key()) {
            None => true,
            Some(record) => measurement
                .weight_kg
                .is_some_and(|weight| (weight - record.weight_kg).abs() >= WEIGHT_TOLERANCE_KG),
        })
        .cloned()
        .collect()
}
