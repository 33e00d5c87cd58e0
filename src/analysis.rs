//! Fail-open AI photo classification for the report-creation flow.
//!
//! This is the deliberate mirror image of verification: any analysis
//! failure yields a usable placeholder record so the user is never
//! blocked from reporting trash just because classification broke.
//! Verification, by contrast, never treats missing confirmation as
//! success. The two concerns use distinct result types so callers are
//! forced to handle them differently.

use std::sync::Arc;

use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::TokenSource;
use crate::capture::Photo;
use crate::config::WorkflowConfig;

/// Backend classification of a trash photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashAnalysis {
    pub category: String,
    pub materials: Vec<String>,
    pub quantity: String,
    #[serde(default)]
    pub estimated_weight: String,
    #[serde(default)]
    pub hazard_level: String,
    #[serde(default)]
    pub cleanup_difficulty: String,
    #[serde(default)]
    pub points: i64,
}

impl TrashAnalysis {
    /// Generic "unspecified trash, medium severity" record used whenever
    /// the analysis service cannot produce a real classification.
    pub fn placeholder() -> Self {
        Self {
            category: "general".into(),
            materials: vec!["unspecified trash".into()],
            quantity: "medium".into(),
            estimated_weight: "1-2 kg".into(),
            hazard_level: "low".into(),
            cleanup_difficulty: "moderate".into(),
            points: 25,
        }
    }
}

/// Analysis result. `Placeholder` means the service failed and the
/// generic record was substituted; report submission proceeds either way.
#[derive(Debug, Clone, PartialEq)]
pub enum PhotoAnalysis {
    Classified(TrashAnalysis),
    Placeholder { reason: String, analysis: TrashAnalysis },
}

impl PhotoAnalysis {
    pub fn analysis(&self) -> &TrashAnalysis {
        match self {
            PhotoAnalysis::Classified(analysis) => analysis,
            PhotoAnalysis::Placeholder { analysis, .. } => analysis,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PhotoAnalysis::Placeholder { .. })
    }

    fn degraded(reason: impl Into<String>) -> Self {
        PhotoAnalysis::Placeholder {
            reason: reason.into(),
            analysis: TrashAnalysis::placeholder(),
        }
    }
}

/// Whether a photo shows outdoor trash at all. Fail-open: a broken
/// validation service never blocks a report.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoValidation {
    pub is_valid: bool,
    pub reason: String,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    analysis: Option<TrashAnalysis>,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    validation: Option<ValidationBody>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationBody {
    #[serde(default)]
    is_valid: bool,
    #[serde(default)]
    reason: Option<String>,
}

pub struct PhotoAnalyzer {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl PhotoAnalyzer {
    pub fn new(config: &WorkflowConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: Client::builder()
                .timeout(config.submit_timeout)
                .build()
                .unwrap_or_default(),
            base_url: config.api_base_url.clone(),
            tokens,
        }
    }

    /// Classifies a trash photo, substituting the placeholder record on
    /// any failure. Never returns an error.
    pub async fn analyze(&self, photo: &Photo) -> PhotoAnalysis {
        debug!("analyzing trash photo ({} bytes)", photo.data.len());

        let response = match self.post_image("/ai/analyze-trash-photo", photo).await {
            Ok(response) => response,
            Err(err) => {
                warn!("analysis request failed, using placeholder: {err}");
                return PhotoAnalysis::degraded(format!("analysis service unreachable: {err}"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("analysis service returned {status}, using placeholder");
            return PhotoAnalysis::degraded(format!("analysis service returned {status}"));
        }

        match response.json::<AnalyzeResponse>().await {
            Ok(AnalyzeResponse {
                success: true,
                analysis: Some(analysis),
            }) => PhotoAnalysis::Classified(analysis),
            Ok(_) => PhotoAnalysis::degraded("analysis service returned no classification"),
            Err(err) => PhotoAnalysis::degraded(format!("malformed analysis response: {err}")),
        }
    }

    /// Checks that a photo plausibly shows outdoor trash. Any service
    /// failure yields "valid, proceed".
    pub async fn validate(&self, photo: &Photo) -> PhotoValidation {
        let response = match self.post_image("/ai/validate-trash-photo", photo).await {
            Ok(response) => response,
            Err(err) => {
                warn!("validation request failed, proceeding: {err}");
                return PhotoValidation {
                    is_valid: true,
                    reason: "validation service unavailable, proceeding with submission".into(),
                };
            }
        };

        if !response.status().is_success() {
            return PhotoValidation {
                is_valid: true,
                reason: "validation service unavailable, proceeding with submission".into(),
            };
        }

        match response.json::<ValidateResponse>().await {
            Ok(ValidateResponse {
                success: true,
                validation: Some(validation),
            }) => PhotoValidation {
                is_valid: validation.is_valid,
                reason: validation
                    .reason
                    .unwrap_or_else(|| "photo validation completed".into()),
            },
            _ => PhotoValidation {
                is_valid: true,
                reason: "validation completed, proceeding with submission".into(),
            },
        }
    }

    async fn post_image(&self, path: &str, photo: &Photo) -> Result<reqwest::Response, reqwest::Error> {
        let image = Part::bytes(photo.data.clone())
            .file_name("photo.jpg")
            .mime_str("image/jpeg")?;
        let form = Form::new().part("image", image);

        let mut request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .multipart(form);
        if let Some(token) = self.tokens.bearer_token().await {
            request = request.bearer_auth(token);
        }
        request.send().await
    }
}
