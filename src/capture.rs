//! Photo + location acquisition for a verification attempt.
//!
//! The two acquisitions are independent I/O with no ordering dependency,
//! so they run concurrently and are both awaited (a join, not a race).
//! The failure modes are deliberately asymmetric: a photo is mandatory
//! evidence and fails closed, while location is best-effort context and
//! fails open into a flagged fallback coordinate.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::CaptureError;
use crate::geo::{Coordinate, LocationFix};

/// A captured photo: the raw bytes plus the device-local URI they were
/// written to. Opaque to this core beyond being uploaded as evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub data: Vec<u8>,
    pub local_uri: String,
}

/// Evidence gathered for one verification attempt.
///
/// Created whole and discarded whole: a retake never reuses a stale
/// location with a new photo or vice versa. The idempotency key is
/// minted with the bundle so a transport-level retry of the same
/// evidence reuses the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureBundle {
    pub photo: Photo,
    pub captured_at: DateTime<Utc>,
    pub live_location: LocationFix,
    pub idempotency_key: Uuid,
}

/// Device camera seam. Permission denial and user cancellation both
/// surface as errors; there is no photo fallback.
#[async_trait]
pub trait CameraSource: Send + Sync {
    async fn take_photo(&self) -> Result<Photo, CaptureError>;
}

/// Device location seam.
#[async_trait]
pub trait LocationSource: Send + Sync {
    async fn current_location(&self) -> Result<Coordinate, CaptureError>;
}

/// Orchestrates concurrent photo + location acquisition.
pub struct CaptureCoordinator {
    camera: Arc<dyn CameraSource>,
    location: Arc<dyn LocationSource>,
    fallback_location: Option<Coordinate>,
}

impl CaptureCoordinator {
    pub fn new(
        camera: Arc<dyn CameraSource>,
        location: Arc<dyn LocationSource>,
        fallback_location: Option<Coordinate>,
    ) -> Self {
        Self {
            camera,
            location,
            fallback_location,
        }
    }

    /// Acquires one photo and one location fix, concurrently.
    ///
    /// Photo failure fails the capture. Location failure substitutes the
    /// configured fallback coordinate, flagged so the proximity gate and
    /// UI can warn that the distance cannot be trusted; with no fallback
    /// configured the location error propagates instead.
    pub async fn capture(&self) -> Result<CaptureBundle, CaptureError> {
        let (photo, fix) = tokio::join!(
            self.camera.take_photo(),
            self.location.current_location()
        );

        let photo = photo?;

        let live_location = match fix {
            Ok(coordinate) => LocationFix::live(coordinate),
            Err(err) => match self.fallback_location {
                Some(coordinate) => {
                    warn!("location fix failed ({err}), substituting fallback coordinate");
                    LocationFix::fallback(coordinate)
                }
                None => return Err(err),
            },
        };

        let bundle = CaptureBundle {
            photo,
            captured_at: Utc::now(),
            live_location,
            idempotency_key: Uuid::new_v4(),
        };
        debug!(
            key = %bundle.idempotency_key,
            fallback = bundle.live_location.from_fallback,
            "capture bundle assembled"
        );
        Ok(bundle)
    }
}
