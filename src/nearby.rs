//! Nearby litter-report lookup and pickup-issue reporting.
//!
//! Responses are parsed strictly at this edge; raw JSON never travels
//! further into the workflow.

use std::sync::Arc;

use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::auth::TokenSource;
use crate::config::WorkflowConfig;
use crate::error::NearbyError;
use crate::geo::{self, Coordinate};
use crate::report::LitterReport;

/// Why a pickup could not be completed for a reported item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueType {
    NotFound,
    AlreadyCleaned,
    Inaccessible,
    WrongLocation,
}

impl IssueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueType::NotFound => "not_found",
            IssueType::AlreadyCleaned => "already_cleaned",
            IssueType::Inaccessible => "inaccessible",
            IssueType::WrongLocation => "wrong_location",
        }
    }
}

#[derive(Debug, Deserialize)]
struct NearbyResponse {
    #[serde(default)]
    items: Vec<LitterReport>,
}

/// Fetches candidate pickup targets around the user.
pub struct NearbyResolver {
    http: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl NearbyResolver {
    pub fn new(config: &WorkflowConfig, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            http: Client::new(),
            base_url: config.api_base_url.clone(),
            tokens,
        }
    }

    /// Pending reports within `radius_meters` of `center`, ordered
    /// ascending by distance. An empty result is a valid outcome, not an
    /// error.
    pub async fn list_nearby(
        &self,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<LitterReport>, NearbyError> {
        debug!(
            lat = center.latitude,
            lon = center.longitude,
            radius = radius_meters,
            "fetching nearby litter reports"
        );

        let mut request = self
            .http
            .get(format!("{}/trash/nearby", self.base_url))
            .query(&[
                ("latitude", center.latitude),
                ("longitude", center.longitude),
                ("radius", radius_meters),
            ]);
        if let Some(token) = self.tokens.bearer_token().await {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NearbyError::Status(status));
        }

        let body = response.bytes().await?;
        let parsed: NearbyResponse =
            serde_json::from_slice(&body).map_err(NearbyError::MalformedResponse)?;

        Ok(rank_by_distance(parsed.items, center))
    }

    /// Flags a problem with a reported item (gone, unreachable, mislocated).
    pub async fn report_issue(
        &self,
        trash_id: &str,
        issue: IssueType,
        description: &str,
    ) -> Result<(), NearbyError> {
        let mut request = self
            .http
            .post(format!("{}/trash/{}/report-issue", self.base_url, trash_id))
            .json(&json!({
                "issueType": issue.as_str(),
                "description": description,
                "timestamp": Utc::now().to_rfc3339(),
            }));
        if let Some(token) = self.tokens.bearer_token().await {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NearbyError::Status(status));
        }
        Ok(())
    }
}

fn rank_by_distance(items: Vec<LitterReport>, center: Coordinate) -> Vec<LitterReport> {
    let mut ranked: Vec<(f64, LitterReport)> = items
        .into_iter()
        .map(|item| (geo::distance_meters(center, item.location), item))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
    ranked.into_iter().map(|(_, item)| item).collect()
}
