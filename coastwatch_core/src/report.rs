//! Hazard report snapshot - the read-only input contract.
//!
//! The ingestion/API edge owns fetching, persistence, and the full
//! report schema; the engine sees only this frozen snapshot and never
//! writes to it.

use crate::coastline::GeoPoint;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of coastal hazard being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HazardKind {
    Tsunami,
    StormSurge,
    HighWaves,
    SwellSurge,
    CoastalFlooding,
    AbnormalTide,
    Erosion,
    Other,
}

impl std::fmt::Display for HazardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HazardKind::Tsunami => "tsunami",
            HazardKind::StormSurge => "storm surge",
            HazardKind::HighWaves => "high waves",
            HazardKind::SwellSurge => "swell surge",
            HazardKind::CoastalFlooding => "coastal flooding",
            HazardKind::AbnormalTide => "abnormal tide",
            HazardKind::Erosion => "erosion",
            HazardKind::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Immutable snapshot of one citizen-submitted hazard report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HazardReportSnapshot {
    /// Report identifier assigned by the ingestion layer
    pub report_id: Uuid,

    /// Reported location
    pub location: GeoPoint,

    /// Reported hazard category
    pub hazard: HazardKind,

    /// Free-text description from the reporter
    pub description: String,

    /// Opaque handles to attached media (resolved by the image layer)
    pub image_references: Vec<String>,

    /// Reporter identifier
    pub reporter_id: Uuid,

    /// Submission time (Unix milliseconds)
    pub submitted_at_ms: i64,
}

impl HazardReportSnapshot {
    /// Convenience constructor for a minimal snapshot.
    pub fn new(location: GeoPoint, hazard: HazardKind, description: impl Into<String>) -> Self {
        Self {
            report_id: Uuid::new_v4(),
            location,
            hazard,
            description: description.into(),
            image_references: Vec::new(),
            reporter_id: Uuid::new_v4(),
            submitted_at_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_serde_round_trip() {
        let snapshot = HazardReportSnapshot {
            report_id: Uuid::new_v4(),
            location: GeoPoint::new(18.95, 72.78).unwrap(),
            hazard: HazardKind::HighWaves,
            description: "Waves breaking over the sea wall near the jetty".to_string(),
            image_references: vec!["media/abc123.jpg".to_string()],
            reporter_id: Uuid::new_v4(),
            submitted_at_ms: 1_722_000_000_000,
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: HazardReportSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.report_id, snapshot.report_id);
        assert_eq!(back.hazard, snapshot.hazard);
        assert_eq!(back.location, snapshot.location);
    }
}
