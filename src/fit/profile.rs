// ABOUTME: FIT profile constants used by the encoder
// ABOUTME: Global message numbers, field numbers, base types, scales, and invalid values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

/// Fixed header length in bytes
pub const HEADER_LEN: u8 = 14;
/// Protocol version 1.0 in the FIT major/minor packing
pub const PROTOCOL_VERSION: u8 = 0x10;
/// Profile version advertised in the header
pub const PROFILE_VERSION: u16 = 2105;
/// ".FIT" data-type tag at header offset 8
pub const DATA_TYPE_TAG: &[u8; 4] = b".FIT";

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
pub const FIT_EPOCH_OFFSET_SECS: i64 = 631_065_600;

/// Base type byte for enum fields
pub const BASE_ENUM: u8 = 0x00;
/// Base type byte for uint8 fields
pub const BASE_UINT8: u8 = 0x02;
/// Base type byte for uint16 fields
pub const BASE_UINT16: u8 = 0x84;
/// Base type byte for uint32 fields
pub const BASE_UINT32: u8 = 0x86;

/// Invalid-value sentinel for uint16 fields
pub const INVALID_U16: u16 = 0xFFFF;
/// Invalid-value sentinel for uint8 fields
pub const INVALID_U8: u8 = 0xFF;

/// Fixed-point scale applied to weights, masses, and percentages
pub const SCALE_100: f64 = 100.0;

/// `file_id` message and the fields the encoder emits
pub mod file_id {
    /// Global message number
    pub const GLOBAL: u16 = 0;
    /// `type` field number
    pub const FIELD_TYPE: u8 = 0;
    /// `manufacturer` field number
    pub const FIELD_MANUFACTURER: u8 = 1;
    /// `product` field number
    pub const FIELD_PRODUCT: u8 = 2;
    /// `time_created` field number
    pub const FIELD_TIME_CREATED: u8 = 4;

    /// File type enum value for weight files
    pub const TYPE_WEIGHT: u8 = 9;
    /// Manufacturer id reserved for development use
    pub const MANUFACTURER_DEVELOPMENT: u16 = 255;
    /// Product id we report under the development manufacturer
    pub const PRODUCT: u16 = 0;
}

/// `weight_scale` message and its body-composition fields
pub mod weight_scale {
    /// Global message number
    pub const GLOBAL: u16 = 30;
    /// `timestamp` field number (common to all messages)
    pub const FIELD_TIMESTAMP: u8 = 253;
    /// `weight` field number, kg x100
    pub const FIELD_WEIGHT: u8 = 0;
    /// `percent_fat` field number, percent x100
    pub const FIELD_PERCENT_FAT: u8 = 1;
    /// `percent_hydration` field number, percent x100
    pub const FIELD_PERCENT_HYDRATION: u8 = 2;
    /// `bone_mass` field number, kg x100
    pub const FIELD_BONE_MASS: u8 = 4;
    /// `muscle_mass` field number, kg x100
    pub const FIELD_MUSCLE_MASS: u8 = 5;
}

/// `blood_pressure` message and the fields the encoder emits
pub mod blood_pressure {
    /// Global message number
    pub const GLOBAL: u16 = 51;
    /// `timestamp` field number
    pub const FIELD_TIMESTAMP: u8 = 253;
    /// `systolic_pressure` field number, mmHg
    pub const FIELD_SYSTOLIC: u8 = 0;
    /// `diastolic_pressure` field number, mmHg
    pub const FIELD_DIASTOLIC: u8 = 1;
    /// `heart_rate` field number, bpm
    pub const FIELD_HEART_RATE: u8 = 6;
}
