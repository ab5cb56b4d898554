// ABOUTME: Deterministic FIT encoding of one measurement for the Garmin import endpoint
// ABOUTME: Emits header, file_id, weight_scale, optional blood_pressure, and the trailing CRC
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

//! Binary FIT container for a single measurement.
//!
//! Layout: a 14-byte header (length, protocol version, profile version, data
//! size, `.FIT` tag, header CRC), little-endian definition/data message pairs
//! for `file_id` and `weight_scale` (plus `blood_pressure` when a complete
//! pressure pair is present and the configuration flag asks for it), and a
//! trailing CRC-16 over everything before it.
//!
//! Encoding is a pure function of the measurement and the flag: timestamps
//! come from the measurement (stored as offsets from the FIT epoch), absent
//! quantities encode the profile's invalid sentinels, and there is no
//! padding or time-of-encoding anywhere. Identical input yields
//! byte-identical output, which the upload path relies on.

pub mod crc;
pub mod profile;

use chrono::{DateTime, Utc};

use crate::models::Measurement;
use profile::{blood_pressure, file_id, weight_scale};

/// Record header for a definition message with the given local type
const fn definition_header(local_type: u8) -> u8 {
    0x40 | local_type
}

/// Local message types assigned by this encoder
const LOCAL_FILE_ID: u8 = 0;
const LOCAL_WEIGHT_SCALE: u8 = 1;
const LOCAL_BLOOD_PRESSURE: u8 = 2;

/// One field entry of a definition message: number, size, base type
type FieldDef = (u8, u8, u8);

/// Encode one measurement into a complete FIT file.
///
/// The blood-pressure record is emitted only when both systolic and
/// diastolic values are present *and* `include_blood_pressure` is set;
/// a heart rate without a pressure pair never produces a record.
#[must_use]
pub fn encode(measurement: &Measurement, include_blood_pressure: bool) -> Vec<u8> {
    let mut body = Vec::with_capacity(128);

    write_file_id(&mut body, measurement.timestamp);
    write_weight_scale(&mut body, measurement);
    if include_blood_pressure && measurement.has_blood_pressure() {
        write_blood_pressure(&mut body, measurement);
    }

    let mut file = Vec::with_capacity(usize::from(profile::HEADER_LEN) + body.len() + 2);
    write_header(&mut file, body.len() as u32);
    file.extend_from_slice(&body);

    let file_crc = crc::checksum(&file);
    file.extend_from_slice(&file_crc.to_le_bytes());
    file
}

fn write_header(out: &mut Vec<u8>, data_size: u32) {
    out.push(profile::HEADER_LEN);
    out.push(profile::PROTOCOL_VERSION);
    out.extend_from_slice(&profile::PROFILE_VERSION.to_le_bytes());
    out.extend_from_slice(&data_size.to_le_bytes());
    out.extend_from_slice(profile::DATA_TYPE_TAG);

    let header_crc = crc::checksum(&out[..12]);
    out.extend_from_slice(&header_crc.to_le_bytes());
}

fn write_definition(out: &mut Vec<u8>, local_type: u8, global: u16, fields: &[FieldDef]) {
    out.push(definition_header(local_type));
    out.push(0); // reserved
    out.push(0); // architecture: little-endian
    out.extend_from_slice(&global.to_le_bytes());
    out.push(fields.len() as u8);
    for &(number, size, base_type) in fields {
        out.push(number);
        out.push(size);
        out.push(base_type);
    }
}

fn write_file_id(out: &mut Vec<u8>, timestamp: DateTime<Utc>) {
    write_definition(
        out,
        LOCAL_FILE_ID,
        file_id::GLOBAL,
        &[
            (file_id::FIELD_TYPE, 1, profile::BASE_ENUM),
            (file_id::FIELD_MANUFACTURER, 2, profile::BASE_UINT16),
            (file_id::FIELD_PRODUCT, 2, profile::BASE_UINT16),
            (file_id::FIELD_TIME_CREATED, 4, profile::BASE_UINT32),
        ],
    );

    out.push(LOCAL_FILE_ID);
    out.push(file_id::TYPE_WEIGHT);
    out.extend_from_slice(&file_id::MANUFACTURER_DEVELOPMENT.to_le_bytes());
    out.extend_from_slice(&file_id::PRODUCT.to_le_bytes());
    // time_created carries the measurement timestamp, not the encoding time,
    // so identical input stays byte-identical
    out.extend_from_slice(&fit_timestamp(timestamp).to_le_bytes());
}

fn write_weight_scale(out: &mut Vec<u8>, measurement: &Measurement) {
    write_definition(
        out,
        LOCAL_WEIGHT_SCALE,
        weight_scale::GLOBAL,
        &[
            (weight_scale::FIELD_TIMESTAMP, 4, profile::BASE_UINT32),
            (weight_scale::FIELD_WEIGHT, 2, profile::BASE_UINT16),
            (weight_scale::FIELD_PERCENT_FAT, 2, profile::BASE_UINT16),
            (weight_scale::FIELD_PERCENT_HYDRATION, 2, profile::BASE_UINT16),
            (weight_scale::FIELD_BONE_MASS, 2, profile::BASE_UINT16),
            (weight_scale::FIELD_MUSCLE_MASS, 2, profile::BASE_UINT16),
        ],
    );

    out.push(LOCAL_WEIGHT_SCALE);
    out.extend_from_slice(&fit_timestamp(measurement.timestamp).to_le_bytes());
    out.extend_from_slice(&scaled_u16(measurement.weight_kg).to_le_bytes());
    out.extend_from_slice(&scaled_u16(measurement.body_fat_pct).to_le_bytes());
    out.extend_from_slice(&scaled_u16(measurement.body_water_pct).to_le_bytes());
    out.extend_from_slice(&scaled_u16(measurement.bone_mass_kg).to_le_bytes());
    out.extend_from_slice(&scaled_u16(measurement.muscle_mass_kg).to_le_bytes());
}

fn write_blood_pressure(out: &mut Vec<u8>, measurement: &Measurement) {
    write_definition(
        out,
        LOCAL_BLOOD_PRESSURE,
        blood_pressure::GLOBAL,
        &[
            (blood_pressure::FIELD_TIMESTAMP, 4, profile::BASE_UINT32),
            (blood_pressure::FIELD_SYSTOLIC, 2, profile::BASE_UINT16),
            (blood_pressure::FIELD_DIASTOLIC, 2, profile::BASE_UINT16),
            (blood_pressure::FIELD_HEART_RATE, 1, profile::BASE_UINT8),
        ],
    );

    out.push(LOCAL_BLOOD_PRESSURE);
    out.extend_from_slice(&fit_timestamp(measurement.timestamp).to_le_bytes());
    out.extend_from_slice(
        &measurement
            .systolic_mmhg
            .unwrap_or(profile::INVALID_U16)
            .to_le_bytes(),
    );
    out.extend_from_slice(
        &measurement
            .diastolic_mmhg
            .unwrap_or(profile::INVALID_U16)
            .to_le_bytes(),
    );
    out.push(measurement.heart_rate_bpm.unwrap_or(profile::INVALID_U8));
}

/// Seconds since the FIT epoch, clamped at zero for pre-epoch timestamps
fn fit_timestamp(timestamp: DateTime<Utc>) -> u32 {
    (timestamp.timestamp() - profile::FIT_EPOCH_OFFSET_SECS).max(0) as u32
}

/// Fixed-point x100 encoding; absent values become the uint16 invalid sentinel
fn scaled_u16(value: Option<f64>) -> u16 {
    value.map_or(profile::INVALID_U16, |v| {
        let scaled = (v * profile::SCALE_100).round();
        // 0xFFFF is reserved for "invalid", so clamp just below it
        scaled.clamp(0.0, f64::from(profile::INVALID_U16 - 1)) as u16
    })
}
