//! Health check endpoint.
//!
//! A liveness check: answers as long as the process can serve HTTP. It does
//! no I/O and touches no shared mutable state.

use axum::Json;
use chrono::Utc;
use serde::Serialize;

/// Version of the Rust toolchain the binary was built with.
pub const RUNTIME_VERSION: &str = env!("HEALTH_API_RUSTC_VERSION");

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Runtime version of the host environment.
    pub python_version: &'static str,
    pub system: &'static str,
}

impl HealthResponse {
    pub fn now() -> Self {
        Self {
            status: "ok",
            timestamp: unix_timestamp(),
            python_version: RUNTIME_VERSION,
            system: platform_name(),
        }
    }
}

/// GET /health — returns liveness status with runtime metadata.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse::now())
}

/// Current wall-clock time as fractional seconds since the epoch.
pub fn unix_timestamp() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}

/// Operating system name, spelled the way `uname -s` reports it.
pub fn platform_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        "netbsd" => "NetBSD",
        "openbsd" => "OpenBSD",
        "android" => "Android",
        "ios" => "iOS",
        other => other,
    }
}
