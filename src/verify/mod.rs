//! Pickup verification: evidence assembly, submission, and flow state.

pub mod client;
pub mod flow;

use crate::capture::CaptureBundle;
use crate::geo;
use crate::report::LitterReport;

/// One submission-ready attempt. Re-attempts replace it wholesale so
/// stale evidence can never leak into a new submission.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationAttempt {
    pub target: LitterReport,
    pub bundle: CaptureBundle,
    pub distance_meters: f64,
}

impl VerificationAttempt {
    pub fn new(target: LitterReport, bundle: CaptureBundle) -> Self {
        let distance_meters =
            geo::distance_meters(bundle.live_location.coordinate, target.location);
        Self {
            target,
            bundle,
            distance_meters,
        }
    }
}

/// The closed outcome union every submission reduces to. All HTTP status
/// and transport handling funnels into this at the network edge; nothing
/// downstream ever sees a raw response.
#[derive(Debug, Clone, PartialEq)]
pub enum VerificationOutcome {
    /// Points are server-reported, never client-estimated.
    Accepted {
        points_earned: i64,
        match_confidence: Option<f64>,
    },
    RejectedByServer {
        reason: String,
    },
    RejectedByProximity {
        distance_meters: f64,
        threshold_meters: f64,
    },
    /// Transport-level failure; the evidence itself was not judged, so a
    /// retry with the same bundle is legitimate.
    TransientError {
        cause: String,
    },
}

impl VerificationOutcome {
    pub fn is_retryable(&self) -> bool {
        matches!(self, VerificationOutcome::TransientError { .. })
    }
}
