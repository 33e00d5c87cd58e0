//! Litter report entities as served by the backend.
//!
//! The reporting subsystem owns the lifecycle; this core only reads
//! pending items and later observes `status` flip to `Cleaned` as a side
//! effect of a successful verification.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Pending,
    Cleaned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LitterReport {
    pub id: String,
    pub location: Coordinate,
    #[serde(default)]
    pub description: String,
    pub reported_at: DateTime<Utc>,
    #[serde(default)]
    pub points_offered: i64,
    pub status: ReportStatus,
}
