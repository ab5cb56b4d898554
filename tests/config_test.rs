// ABOUTME: Tests for environment-driven configuration loading and defaults
// ABOUTME: Serialized because environment variables are process-global state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

use std::env;
use std::time::Duration;

use scale_sync::config::{
    SyncConfig, DEFAULT_CONNECT_URL, DEFAULT_SSO_URL, DEFAULT_UPLOAD_DELAY_MS,
};
use serial_test::serial;

const ALL_VARS: &[&str] = &[
    "GARMIN_USERNAME",
    "GARMIN_PASSWORD",
    "INCLUDE_BLOOD_PRESSURE",
    "GARMIN_SSO_URL",
    "GARMIN_CONNECT_URL",
    "HTTP_TIMEOUT_SECS",
    "HTTP_CONNECT_TIMEOUT_SECS",
    "SYNC_DELAY_MS",
    "GARMIN_SESSION_FILE",
];

fn clear_env() {
    for var in ALL_VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn test_defaults_with_clean_environment() {
    clear_env();
    let config = SyncConfig::from_env();

    assert_eq!(config.username, None);
    assert_eq!(config.password, None);
    assert!(!config.include_blood_pressure);
    assert_eq!(config.sso_url, DEFAULT_SSO_URL);
    assert_eq!(config.connect_url, DEFAULT_CONNECT_URL);
    assert_eq!(
        config.upload_delay,
        Duration::from_millis(DEFAULT_UPLOAD_DELAY_MS)
    );
}

#[test]
#[serial]
fn test_environment_overrides() {
    clear_env();
    env::set_var("GARMIN_USERNAME", "user@example.com");
    env::set_var("GARMIN_PASSWORD", "hunter2");
    env::set_var("INCLUDE_BLOOD_PRESSURE", "true");
    env::set_var("GARMIN_CONNECT_URL", "https://connect.example.test");
    env::set_var("SYNC_DELAY_MS", "250");
    env::set_var("HTTP_TIMEOUT_SECS", "5");
    env::set_var("GARMIN_SESSION_FILE", "/tmp/session-override.json");

    let config = SyncConfig::from_env();
    clear_env();

    assert_eq!(config.username.as_deref(), Some("user@example.com"));
    assert_eq!(config.password.as_deref(), Some("hunter2"));
    assert!(config.include_blood_pressure);
    assert_eq!(config.connect_url, "https://connect.example.test");
    assert_eq!(config.upload_delay, Duration::from_millis(250));
    assert_eq!(config.request_timeout, Duration::from_secs(5));
    assert_eq!(
        config.session_file,
        std::path::PathBuf::from("/tmp/session-override.json")
    );
}

#[test]
#[serial]
fn test_blank_credentials_treated_as_unset() {
    clear_env();
    env::set_var("GARMIN_USERNAME", "   ");
    env::set_var("GARMIN_PASSWORD", "");

    let config = SyncConfig::from_env();
    clear_env();

    assert_eq!(config.username, None);
    assert_eq!(config.password, None);
}

#[test]
#[serial]
fn test_unparseable_numbers_fall_back_to_defaults() {
    clear_env();
    env::set_var("SYNC_DELAY_MS", "soon");

    let config = SyncConfig::from_env();
    clear_env();

    assert_eq!(
        config.upload_delay,
        Duration::from_millis(DEFAULT_UPLOAD_DELAY_MS)
    );
}

#[test]
#[serial]
fn test_flag_accepts_common_truthy_spellings() {
    for value in ["1", "true", "YES", "on"] {
        clear_env();
        env::set_var("INCLUDE_BLOOD_PRESSURE", value);
        assert!(SyncConfig::from_env().include_blood_pressure, "{value}");
    }

    clear_env();
    env::set_var("INCLUDE_BLOOD_PRESSURE", "0");
    let config = SyncConfig::from_env();
    clear_env();
    assert!(!config.include_blood_pressure);
}
