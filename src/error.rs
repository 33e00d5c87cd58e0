//! Error taxonomy for the pickup workflow.
//!
//! Capture and lookup failures are typed errors. Verification transport
//! and status handling never surfaces as a Rust error: it reduces to
//! [`crate::verify::VerificationOutcome`] at the network edge, so the
//! state machine only ever sees the closed outcome union.

use thiserror::Error;

/// Failures while acquiring pickup evidence on-device.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("{what} permission denied")]
    PermissionDenied { what: &'static str },

    #[error("capture cancelled by user")]
    Cancelled,

    #[error("camera produced no photo")]
    PhotoUnavailable,

    #[error("no location fix available")]
    LocationUnavailable,
}

impl CaptureError {
    pub fn camera_permission() -> Self {
        Self::PermissionDenied { what: "camera" }
    }

    pub fn location_permission() -> Self {
        Self::PermissionDenied { what: "location" }
    }
}

/// Failures talking to the nearby-items and issue-reporting endpoints.
#[derive(Debug, Error)]
pub enum NearbyError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("malformed backend response: {0}")]
    MalformedResponse(#[source] serde_json::Error),
}
