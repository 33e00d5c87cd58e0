//! Workflow configuration.

use std::time::Duration;

use crate::geo::Coordinate;

/// Users must be within this many meters of the reported location to
/// submit pickup proof. Tunable here, never per call site.
pub const DEFAULT_PROXIMITY_THRESHOLD_METERS: f64 = 50.0;

/// Default search radius for nearby litter reports.
pub const DEFAULT_NEARBY_RADIUS_METERS: f64 = 100.0;

/// Evidence uploads carry a photo, so the submit timeout is generous.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Backend base URL, e.g. `https://api.example.com/api`.
    pub api_base_url: String,
    pub proximity_threshold_meters: f64,
    pub nearby_radius_meters: f64,
    pub submit_timeout: Duration,
    /// Substitute coordinate when no location fix can be obtained.
    /// When `None`, a failed fix fails the whole capture instead.
    pub fallback_location: Option<Coordinate>,
}

impl WorkflowConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into(),
            proximity_threshold_meters: DEFAULT_PROXIMITY_THRESHOLD_METERS,
            nearby_radius_meters: DEFAULT_NEARBY_RADIUS_METERS,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
            fallback_location: None,
        }
    }
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self::new("http://localhost:3000/api")
    }
}
