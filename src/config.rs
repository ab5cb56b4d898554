// ABOUTME: Environment-only configuration for credentials, endpoints, and timing
// ABOUTME: Loads GARMIN_* and sync tuning variables with production defaults
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 scale-sync contributors

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default Garmin single-sign-on base URL
pub const DEFAULT_SSO_URL: &str = "https://sso.garmin.com/sso";
/// Default Garmin Connect base URL
pub const DEFAULT_CONNECT_URL: &str = "https://connect.garmin.com";
/// Mandatory courtesy delay between sequential uploads
pub const DEFAULT_UPLOAD_DELAY_MS: u64 = 1000;
/// Per-request timeout applied to every Garmin call
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// TCP connect timeout applied to every Garmin call
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration, loaded once from the environment.
///
/// There is no configuration file; every knob is an environment variable so
/// deployments stay declarative and secrets never touch the repository.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Garmin account username (`GARMIN_USERNAME`)
    pub username: Option<String>,
    /// Garmin account password (`GARMIN_PASSWORD`)
    pub password: Option<String>,
    /// Whether to emit blood-pressure records alongside weight
    /// (`INCLUDE_BLOOD_PRESSURE`, default off)
    pub include_blood_pressure: bool,
    /// Garmin SSO base URL (`GARMIN_SSO_URL`)
    pub sso_url: String,
    /// Garmin Connect base URL (`GARMIN_CONNECT_URL`)
    pub connect_url: String,
    /// Request timeout (`HTTP_TIMEOUT_SECS`)
    pub request_timeout: Duration,
    /// Connect timeout (`HTTP_CONNECT_TIMEOUT_SECS`)
    pub connect_timeout: Duration,
    /// Delay inserted between batch items (`SYNC_DELAY_MS`)
    pub upload_delay: Duration,
    /// Location of the persisted session blob (`GARMIN_SESSION_FILE`)
    pub session_file: PathBuf,
}

impl SyncConfig {
    /// Load configuration from the environment, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            username: non_empty(env::var("GARMIN_USERNAME").ok()),
            password: non_empty(env::var("GARMIN_PASSWORD").ok()),
            include_blood_pressure: env_flag("INCLUDE_BLOOD_PRESSURE"),
            sso_url: env_or("GARMIN_SSO_URL", DEFAULT_SSO_URL),
            connect_url: env_or("GARMIN_CONNECT_URL", DEFAULT_CONNECT_URL),
            request_timeout: Duration::from_secs(env_parse(
                "HTTP_TIMEOUT_SECS",
                DEFAULT_TIMEOUT_SECS,
            )),
            connect_timeout: Duration::from_secs(env_parse(
                "HTTP_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
            )),
            upload_delay: Duration::from_millis(env_parse(
                "SYNC_DELAY_MS",
                DEFAULT_UPLOAD_DELAY_MS,
            )),
            session_file: env::var("GARMIN_SESSION_FILE")
                .map_or_else(|_| default_session_file(), PathBuf::from),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            username: None,
            password: None,
            include_blood_pressure: false,
            sso_url: DEFAULT_SSO_URL.to_owned(),
            connect_url: DEFAULT_CONNECT_URL.to_owned(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            upload_delay: Duration::from_millis(DEFAULT_UPLOAD_DELAY_MS),
            session_file: default_session_file(),
        }
    }
}

/// Single fixed location for the one persisted session blob
fn default_session_file() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("scale-sync")
        .join("garmin_session.json")
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
