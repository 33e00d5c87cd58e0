//! State machine driving the user-facing pickup flow.
//!
//! Exactly one attempt is active at a time. Terminal `Accepted`/`Rejected`
//! states leave only on explicit user action; `TransientError` offers a
//! retry that reuses the existing bundle (the evidence was never judged
//! faulty, only the transport), while a rejection forces a full retake
//! because the rejected evidence is presumed invalid for that attempt.

use tracing::{debug, info, warn};

use crate::capture::{CaptureBundle, CaptureCoordinator};
use crate::error::CaptureError;
use crate::geo::ProximityGate;
use crate::report::LitterReport;

use super::client::VerificationClient;
use super::{VerificationAttempt, VerificationOutcome};

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    Proximity {
        distance_meters: f64,
        threshold_meters: f64,
    },
    Server {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle,
    Capturing,
    Evaluating,
    Submitting,
    Accepted { points_earned: i64 },
    Rejected(RejectReason),
    TransientError { cause: String },
}

/// The pickup flow for one target report.
pub struct PickupFlow {
    target: LitterReport,
    gate: ProximityGate,
    state: FlowState,
    bundle: Option<CaptureBundle>,
    /// Bumped on cancel; outcomes tagged with an older generation are
    /// discarded so a late server answer never lands on stale state.
    generation: u64,
}

impl PickupFlow {
    pub fn new(target: LitterReport, gate: ProximityGate) -> Self {
        Self {
            target,
            gate,
            state: FlowState::Idle,
            bundle: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> &FlowState {
        &self.state
    }

    pub fn target(&self) -> &LitterReport {
        &self.target
    }

    pub fn bundle(&self) -> Option<&CaptureBundle> {
        self.bundle.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// `Idle -> Capturing`. A no-op while an attempt is already in
    /// flight, so two submissions can never race the server for the same
    /// target.
    pub fn begin_capture(&mut self) -> bool {
        if self.state != FlowState::Idle {
            debug!(state = ?self.state, "begin_capture ignored, attempt in flight");
            return false;
        }
        self.state = FlowState::Capturing;
        true
    }

    /// Capture failed before producing a bundle; back to `Idle` so the
    /// user can resolve permissions and start over.
    pub fn capture_failed(&mut self) {
        if self.state == FlowState::Capturing {
            self.state = FlowState::Idle;
            self.bundle = None;
        }
    }

    /// `Capturing -> Evaluating` with a freshly acquired bundle.
    pub fn bundle_ready(&mut self, bundle: CaptureBundle) -> bool {
        if self.state != FlowState::Capturing {
            return false;
        }
        self.bundle = Some(bundle);
        self.state = FlowState::Evaluating;
        true
    }

    /// Runs the proximity gate over the current bundle.
    ///
    /// `Evaluating -> Submitting` with the assembled attempt when the
    /// gate allows, `Evaluating -> Rejected` otherwise.
    pub fn evaluate(&mut self) -> Option<VerificationAttempt> {
        if self.state != FlowState::Evaluating {
            return None;
        }
        let bundle = self.bundle.as_ref()?;

        let check = self.gate.check(&bundle.live_location, self.target.location);
        if !check.allowed {
            info!(
                distance = check.distance_meters,
                threshold = check.threshold_meters,
                "proximity gate rejected attempt"
            );
            self.state = FlowState::Rejected(RejectReason::Proximity {
                distance_meters: check.distance_meters,
                threshold_meters: check.threshold_meters,
            });
            return None;
        }
        if !check.trusted {
            warn!("submitting with fallback location, distance is untrusted");
        }

        self.state = FlowState::Submitting;
        Some(VerificationAttempt::new(
            self.target.clone(),
            bundle.clone(),
        ))
    }

    /// Applies a submission outcome, unless it belongs to a cancelled
    /// generation or arrives outside `Submitting`.
    pub fn apply_outcome(&mut self, generation: u64, outcome: VerificationOutcome) -> bool {
        if generation != self.generation || self.state != FlowState::Submitting {
            debug!("discarding stale submission outcome");
            return false;
        }
        self.state = match outcome {
            VerificationOutcome::Accepted { points_earned, .. } => {
                info!(points = points_earned, "pickup verified");
                FlowState::Accepted { points_earned }
            }
            VerificationOutcome::RejectedByServer { reason } => {
                FlowState::Rejected(RejectReason::Server { reason })
            }
            VerificationOutcome::RejectedByProximity {
                distance_meters,
                threshold_meters,
            } => FlowState::Rejected(RejectReason::Proximity {
                distance_meters,
                threshold_meters,
            }),
            VerificationOutcome::TransientError { cause } => {
                FlowState::TransientError { cause }
            }
        };
        true
    }

    /// `TransientError -> Submitting`, reusing the existing bundle and
    /// therefore the same idempotency key.
    pub fn retry(&mut self) -> Option<VerificationAttempt> {
        if !matches!(self.state, FlowState::TransientError { .. }) {
            return None;
        }
        let bundle = self.bundle.as_ref()?;
        self.state = FlowState::Submitting;
        Some(VerificationAttempt::new(
            self.target.clone(),
            bundle.clone(),
        ))
    }

    /// `Rejected -> Capturing`, discarding the bundle wholesale: the next
    /// evaluation requires a brand-new photo and location.
    pub fn retake(&mut self) -> bool {
        if !matches!(self.state, FlowState::Rejected(_)) {
            return false;
        }
        self.bundle = None;
        self.state = FlowState::Capturing;
        true
    }

    /// `Accepted -> Idle`; navigation away is the caller's business.
    pub fn done(&mut self) -> bool {
        if !matches!(self.state, FlowState::Accepted { .. }) {
            return false;
        }
        self.bundle = None;
        self.state = FlowState::Idle;
        true
    }

    /// Abandons whatever is in flight. Any submission outcome still in
    /// transit is orphaned by the generation bump.
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.bundle = None;
        self.state = FlowState::Idle;
    }

    /// Drives one full attempt end to end: capture, gate, submit.
    pub async fn run_attempt(
        &mut self,
        coordinator: &CaptureCoordinator,
        client: &VerificationClient,
    ) -> Result<&FlowState, CaptureError> {
        if !self.begin_capture() {
            return Ok(self.state());
        }

        let bundle = match coordinator.capture().await {
            Ok(bundle) => bundle,
            Err(err) => {
                self.capture_failed();
                return Err(err);
            }
        };
        self.bundle_ready(bundle);

        if let Some(attempt) = self.evaluate() {
            let generation = self.generation;
            let outcome = client.submit(&attempt).await;
            self.apply_outcome(generation, outcome);
        }
        Ok(self.state())
    }

    /// Re-submits after a transient failure, reusing the existing bundle.
    pub async fn retry_submission(&mut self, client: &VerificationClient) -> &FlowState {
        if let Some(attempt) = self.retry() {
            let generation = self.generation;
            let outcome = client.submit(&attempt).await;
            self.apply_outcome(generation, outcome);
        }
        self.state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::capture::Photo;
    use crate::geo::{Coordinate, LocationFix};
    use crate::report::ReportStatus;

    fn coord(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn target_at(lat: f64, lon: f64) -> LitterReport {
        LitterReport {
            id: "trash-1".into(),
            location: coord(lat, lon),
            description: "bottles by the bench".into(),
            reported_at: Utc::now(),
            points_offered: 10,
            status: ReportStatus::Pending,
        }
    }

    fn bundle_at(lat: f64, lon: f64) -> CaptureBundle {
        CaptureBundle {
            photo: Photo {
                data: vec![1, 2, 3],
                local_uri: "file:///tmp/p.jpg".into(),
            },
            captured_at: Utc::now(),
            live_location: LocationFix::live(coord(lat, lon)),
            idempotency_key: Uuid::new_v4(),
        }
    }

    fn flow_at_target() -> PickupFlow {
        PickupFlow::new(target_at(46.0569, 14.5058), ProximityGate::default())
    }

    #[test]
    fn happy_path_reaches_accepted_and_exits() {
        let mut flow = flow_at_target();
        assert!(flow.begin_capture());
        assert!(flow.bundle_ready(bundle_at(46.0569, 14.5058)));

        let attempt = flow.evaluate().expect("in range, should submit");
        assert_eq!(*flow.state(), FlowState::Submitting);
        assert_eq!(attempt.distance_meters, 0.0);

        let generation = flow.generation();
        assert!(flow.apply_outcome(
            generation,
            VerificationOutcome::Accepted {
                points_earned: 10,
                match_confidence: Some(0.93),
            },
        ));
        assert_eq!(*flow.state(), FlowState::Accepted { points_earned: 10 });

        assert!(flow.done());
        assert_eq!(*flow.state(), FlowState::Idle);
        assert!(flow.bundle().is_none());
    }

    #[test]
    fn begin_capture_is_noop_while_in_flight() {
        let mut flow = flow_at_target();
        assert!(flow.begin_capture());
        assert!(!flow.begin_capture());
        flow.bundle_ready(bundle_at(46.0569, 14.5058));
        assert!(!flow.begin_capture());
    }

    #[test]
    fn out_of_range_bundle_is_rejected_before_submission() {
        let mut flow = flow_at_target();
        flow.begin_capture();
        // ~67m north of the target.
        flow.bundle_ready(bundle_at(46.0575, 14.5058));

        assert!(flow.evaluate().is_none());
        match flow.state() {
            FlowState::Rejected(RejectReason::Proximity {
                distance_meters,
                threshold_meters,
            }) => {
                assert!((distance_meters - 67.0).abs() < 1.0);
                assert_eq!(*threshold_meters, 50.0);
            }
            other => panic!("expected proximity rejection, got {other:?}"),
        }
    }

    #[test]
    fn transient_error_keeps_the_bundle_for_retry() {
        let mut flow = flow_at_target();
        flow.begin_capture();
        flow.bundle_ready(bundle_at(46.0569, 14.5058));
        let original_key = flow.bundle().unwrap().idempotency_key;

        flow.evaluate().unwrap();
        let generation = flow.generation();
        flow.apply_outcome(
            generation,
            VerificationOutcome::TransientError {
                cause: "timeout".into(),
            },
        );
        assert!(matches!(flow.state(), FlowState::TransientError { .. }));

        let retry_attempt = flow.retry().expect("retry must reuse the bundle");
        assert_eq!(retry_attempt.bundle.idempotency_key, original_key);
        assert_eq!(*flow.state(), FlowState::Submitting);
    }

    #[test]
    fn retake_discards_the_bundle() {
        let mut flow = flow_at_target();
        flow.begin_capture();
        flow.bundle_ready(bundle_at(46.0575, 14.5058));
        flow.evaluate();
        assert!(matches!(flow.state(), FlowState::Rejected(_)));

        assert!(flow.retake());
        assert_eq!(*flow.state(), FlowState::Capturing);
        assert!(flow.bundle().is_none());

        // Without a brand-new bundle, evaluation cannot proceed.
        assert!(flow.evaluate().is_none());
        assert_eq!(*flow.state(), FlowState::Capturing);
    }

    #[test]
    fn server_rejection_forces_retake_not_retry() {
        let mut flow = flow_at_target();
        flow.begin_capture();
        flow.bundle_ready(bundle_at(46.0569, 14.5058));
        flow.evaluate().unwrap();
        let generation = flow.generation();
        flow.apply_outcome(
            generation,
            VerificationOutcome::RejectedByServer {
                reason: "already picked up by someone else".into(),
            },
        );

        assert!(flow.retry().is_none());
        assert!(flow.retake());
    }

    #[test]
    fn cancelled_generation_orphans_late_outcomes() {
        let mut flow = flow_at_target();
        flow.begin_capture();
        flow.bundle_ready(bundle_at(46.0569, 14.5058));
        flow.evaluate().unwrap();
        let stale_generation = flow.generation();

        flow.cancel();
        assert_eq!(*flow.state(), FlowState::Idle);

        // The server's late acceptance must not be applied.
        let applied = flow.apply_outcome(
            stale_generation,
            VerificationOutcome::Accepted {
                points_earned: 10,
                match_confidence: None,
            },
        );
        assert!(!applied);
        assert_eq!(*flow.state(), FlowState::Idle);
    }

    #[test]
    fn capture_failure_returns_to_idle() {
        let mut flow = flow_at_target();
        flow.begin_capture();
        flow.capture_failed();
        assert_eq!(*flow.state(), FlowState::Idle);
        assert!(flow.begin_capture());
    }
}
