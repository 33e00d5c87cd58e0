//! Geodesic math and proximity gating.
//!
//! Distances are great-circle (haversine) against a mean Earth radius,
//! which is accurate to well under 1% at the pickup-threshold scale.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::DEFAULT_PROXIMITY_THRESHOLD_METERS;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// A WGS-84 point, immutable once captured.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// Reported GPS accuracy, when the fix carried one.
    #[serde(
        default,
        rename = "accuracy",
        skip_serializing_if = "Option::is_none"
    )]
    pub accuracy_meters: Option<f64>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
            accuracy_meters: None,
        })
    }

    pub fn with_accuracy(mut self, accuracy_meters: f64) -> Self {
        self.accuracy_meters = Some(accuracy_meters);
        self
    }
}

/// A location measurement for one capture attempt.
///
/// `from_fallback` marks a substituted default coordinate (no real fix was
/// available), meaning any distance computed from it cannot be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub from_fallback: bool,
}

impl LocationFix {
    pub fn live(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            from_fallback: false,
        }
    }

    pub fn fallback(coordinate: Coordinate) -> Self {
        Self {
            coordinate,
            from_fallback: true,
        }
    }
}

/// Haversine great-circle distance in meters.
///
/// Pure and total: symmetric, and zero for identical points.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let delta_phi = (b.latitude - a.latitude).to_radians();
    let delta_lambda = (b.longitude - a.longitude).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Result of a proximity check against a pickup target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityCheck {
    pub allowed: bool,
    pub distance_meters: f64,
    pub threshold_meters: f64,
    /// False when the fix was a fallback substitute; the distance is then
    /// meaningless and the caller should warn the user.
    pub trusted: bool,
}

/// Threshold gate deciding whether a user is close enough to a reported
/// item to submit pickup proof. No side effects.
#[derive(Debug, Clone, Copy)]
pub struct ProximityGate {
    threshold_meters: f64,
}

impl ProximityGate {
    pub fn new(threshold_meters: f64) -> Self {
        Self { threshold_meters }
    }

    pub fn threshold_meters(&self) -> f64 {
        self.threshold_meters
    }

    /// Evaluates strictly against the point estimate, even when the fix
    /// reports an accuracy worse than the threshold itself.
    pub fn check(&self, live: &LocationFix, target: Coordinate) -> ProximityCheck {
        let distance_meters = distance_meters(live.coordinate, target);
        ProximityCheck {
            allowed: distance_meters <= self.threshold_meters,
            distance_meters,
            threshold_meters: self.threshold_meters,
            trusted: !live.from_fallback,
        }
    }
}

impl Default for ProximityGate {
    fn default() -> Self {
        Self::new(DEFAULT_PROXIMITY_THRESHOLD_METERS)
    }
}
