// ABOUTME: FIT CRC-16 implementation using the nibble lookup table from the FIT SDK
// ABOUTME: Used for both the header CRC and the trailing file checksum
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

const CRC_TABLE: [u16; 16] = [
    0x0000, 0xCC01, 0xD801, 0x1400, 0xF001, 0x3C00, 0x2800, 0xE401, 0xA001, 0x6C00, 0x7800,
    0xB401, 0x5000, 0x9C01, 0x8801, 0x4400,
];

/// Fold one byte into a running CRC, low nibble first
#[must_use]
pub fn update(mut crc: u16, byte: u8) -> u16 {
    let tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc = crc ^ tmp ^ CRC_TABLE[(byte & 0xF) as usize];

    let tmp = CRC_TABLE[(crc & 0xF) as usize];
    crc = (crc >> 4) & 0x0FFF;
    crc ^ tmp ^ CRC_TABLE[((byte >> 4) & 0xF) as usize]
}

/// CRC-16 over a full byte slice, starting from zero
#[must_use]
pub fn checksum(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0, |crc, &byte| update(crc, byte))
}
