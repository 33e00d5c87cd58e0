//! HTTP client for the pickup-verification endpoint.
//!
//! Single-shot per attempt: no auto-retry here. A retry is a new
//! user-initiated submission of the same attempt, carrying the same
//! client-generated idempotency key so a timeout followed by a retry
//! cannot award points twice.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::auth::TokenSource;
use crate::config::WorkflowConfig;

use super::{VerificationAttempt, VerificationOutcome};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    points_earned: Option<i64>,
    #[serde(default)]
    match_confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub struct VerificationClient {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
    threshold_meters: f64,
}

impl VerificationClient {
    pub fn new(config: &WorkflowConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.submit_timeout)
                .build()
                .unwrap_or_default(),
            base_url: config.api_base_url.clone(),
            tokens,
            threshold_meters: config.proximity_threshold_meters,
        }
    }

    /// Submits one attempt and reduces the server's answer to a
    /// [`VerificationOutcome`].
    ///
    /// Proximity and authentication are re-validated here even though the
    /// flow gates both upstream; either violation short-circuits without
    /// any network I/O. A photo cannot be absent by construction of
    /// [`crate::capture::CaptureBundle`].
    pub async fn submit(&self, attempt: &VerificationAttempt) -> VerificationOutcome {
        if attempt.distance_meters > self.threshold_meters {
            return VerificationOutcome::RejectedByProximity {
                distance_meters: attempt.distance_meters,
                threshold_meters: self.threshold_meters,
            };
        }

        let Some(token) = self.tokens.bearer_token().await else {
            return VerificationOutcome::RejectedByServer {
                reason: "authentication required".into(),
            };
        };

        let bundle = &attempt.bundle;
        let live = bundle.live_location.coordinate;
        let target = attempt.target.location;

        let image = match Part::bytes(bundle.photo.data.clone())
            .file_name("pickup_verification.jpg")
            .mime_str("image/jpeg")
        {
            Ok(part) => part,
            Err(err) => {
                return VerificationOutcome::TransientError {
                    cause: format!("could not encode verification image: {err}"),
                }
            }
        };

        let form = Form::new()
            .text("trashId", attempt.target.id.clone())
            .text("userLatitude", live.latitude.to_string())
            .text("userLongitude", live.longitude.to_string())
            .text(
                "locationAccuracy",
                live.accuracy_meters.unwrap_or(0.0).to_string(),
            )
            .text("trashLatitude", target.latitude.to_string())
            .text("trashLongitude", target.longitude.to_string())
            .text("distanceFromTrash", attempt.distance_meters.to_string())
            .text("timestamp", bundle.captured_at.to_rfc3339())
            .text("idempotencyKey", bundle.idempotency_key.to_string())
            .part("verificationImage", image);

        debug!(
            trash_id = %attempt.target.id,
            key = %bundle.idempotency_key,
            distance = attempt.distance_meters,
            "submitting pickup verification"
        );

        let response = match self
            .http
            .post(format!("{}/trash/verify-pickup", self.base_url))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!("verification request failed: {err}");
                return VerificationOutcome::TransientError {
                    cause: err.to_string(),
                };
            }
        };

        Self::outcome_from_response(response).await
    }

    /// The status-code mapping encodes business rules, not generic HTTP
    /// semantics, and must stay exact.
    async fn outcome_from_response(response: Response) -> VerificationOutcome {
        let status = response.status();

        if status.is_success() {
            return match response.json::<VerifyResponse>().await {
                Ok(body) if body.success => VerificationOutcome::Accepted {
                    points_earned: body.points_earned.unwrap_or(0),
                    match_confidence: body.match_confidence,
                },
                Ok(body) => VerificationOutcome::RejectedByServer {
                    reason: body
                        .message
                        .unwrap_or_else(|| "verification failed, try again".into()),
                },
                // A malformed body must not crash the flow; degrade to a
                // retryable error, never treat it as success.
                Err(err) => {
                    warn!("unparseable verification response: {err}");
                    VerificationOutcome::TransientError {
                        cause: format!("malformed server response: {err}"),
                    }
                }
            };
        }

        let reason = match status {
            StatusCode::BAD_REQUEST => response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.message)
                .unwrap_or_else(|| "invalid verification data".into()),
            StatusCode::NOT_FOUND => "item not found or already collected".into(),
            StatusCode::CONFLICT => "already picked up by someone else".into(),
            StatusCode::UNPROCESSABLE_ENTITY => "out of range or photo mismatch".into(),
            _ => "verification failed, try again".into(),
        };
        VerificationOutcome::RejectedByServer { reason }
    }
}
