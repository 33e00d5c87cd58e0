//! Trash Clean — pickup verification core
//!
//! The workflow that turns a reported litter item into a verified pickup:
//! - Nearby-item lookup ranked by distance
//! - Concurrent photo + location capture (photo fails closed, location
//!   fails open into a flagged fallback)
//! - Haversine proximity gating against a configurable threshold
//! - Idempotent multipart submission with a closed outcome taxonomy
//! - A state machine owning retry/retake/cancel transitions

pub mod analysis;
pub mod auth;
pub mod capture;
pub mod config;
pub mod error;
pub mod geo;
pub mod nearby;
pub mod report;
pub mod verify;

// Re-exports for convenience
pub use auth::{StaticTokenSource, TokenSource};
pub use capture::{CameraSource, CaptureBundle, CaptureCoordinator, LocationSource, Photo};
pub use config::WorkflowConfig;
pub use error::{CaptureError, NearbyError};
pub use geo::{Coordinate, LocationFix, ProximityCheck, ProximityGate};
pub use nearby::NearbyResolver;
pub use report::{LitterReport, ReportStatus};
pub use verify::client::VerificationClient;
pub use verify::flow::{FlowState, PickupFlow};
pub use verify::{VerificationAttempt, VerificationOutcome};
