//! `GET /health`: liveness of the booking API.
//!
//! Answers from the process alone so load balancers keep routing while the
//! database is briefly unreachable; store failures surface on the booking
//! routes as 500s instead.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Body of a liveness answer
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"` when the process can answer
    pub status: &'static str,
    /// Service name, so a shared gateway can tell backends apart
    pub service: &'static str,
    /// Crate version of the running binary
    pub version: &'static str,
}

impl HealthResponse {
    const fn live() -> Self {
        Self {
            status: "ok",
            service: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}

/// `{"status":"ok","service":"cinema-booking","version":"0.1.0"}` with 200.
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (StatusCode::OK, Json(HealthResponse::live()))
}
