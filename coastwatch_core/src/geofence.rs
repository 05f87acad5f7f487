//! The Geofence Layer - Geographic Plausibility Validator
//!
//! Answers one question per report: is the reported location plausibly
//! on or near the coastline the system monitors?
//!
//! The check is geometric, not cartographic:
//! 1. Find the nearest coastline reference point (haversine scan).
//! 2. Classify the report as *inland* or *offshore* of that reference
//!    using a per-region longitude heuristic (west coast: water lies
//!    west; east coast: water lies east; islands: beyond a short radius).
//! 3. Apply the distance limit for that classification. Over the limit
//!    is a hard FAIL - the one veto in the pipeline.
//!
//! The inland/offshore heuristic is a deliberate approximation. A true
//! land/water polygon test would change accept/reject outcomes for
//! borderline reports and is a follow-on design change, not a drop-in
//! swap.

use crate::coastline::{CoastalRegion, GeoPoint, NearestCoastline, NearestReference};
use crate::layer::{LayerData, LayerError, LayerName, LayerResult, VerificationLayer};
use crate::report::HazardReportSnapshot;
use async_trait::async_trait;
use coastwatch_env::CoastwatchContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Geometry is reliable; only the region classification is approximate.
const GEOFENCE_CONFIDENCE: f64 = 0.95;

/// Beyond this radius an island-region point counts as offshore.
const ISLAND_OFFSHORE_RADIUS_KM: f64 = 5.0;

/// Fraction of score shed at the distance limit (borderline-valid
/// points never drop below 0.8).
const DISTANCE_PENALTY: f64 = 0.2;

/// Operator-tunable distance limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceConfig {
    /// Maximum distance from the coastline for inland reports (km)
    pub inland_limit_km: f64,

    /// Maximum distance from the coastline for offshore reports (km)
    pub offshore_limit_km: f64,
}

impl Default for GeofenceConfig {
    fn default() -> Self {
        Self {
            inland_limit_km: 20.0,
            offshore_limit_km: 30.0,
        }
    }
}

/// Which side of the coastline a report falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShoreSide {
    /// Landward of the nearest reference point
    Inland,

    /// Seaward of the nearest reference point
    Offshore,
}

impl std::fmt::Display for ShoreSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ShoreSide::Inland => "inland",
            ShoreSide::Offshore => "offshore",
        };
        write!(f, "{}", name)
    }
}

/// Audit payload for a geofence evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceAssessment {
    /// Distance to the nearest reference point (km)
    pub distance_km: f64,

    /// Name of the nearest reference point
    pub nearest_name: String,

    /// Region of the nearest reference point
    pub region: CoastalRegion,

    /// Inland/offshore classification used
    pub classification: ShoreSide,

    /// Distance limit that was applied (km)
    pub limit_km: f64,
}

/// Classifies a point relative to its nearest coastline reference.
fn classify(point: &GeoPoint, nearest: &NearestReference<'_>) -> ShoreSide {
    match nearest.point.region {
        CoastalRegion::WestCoast => {
            if point.longitude < nearest.point.location.longitude {
                ShoreSide::Offshore
            } else {
                ShoreSide::Inland
            }
        }
        CoastalRegion::EastCoast => {
            if point.longitude > nearest.point.location.longitude {
                ShoreSide::Offshore
            } else {
                ShoreSide::Inland
            }
        }
        CoastalRegion::Islands => {
            if nearest.distance_km > ISLAND_OFFSHORE_RADIUS_KM {
                ShoreSide::Offshore
            } else {
                ShoreSide::Inland
            }
        }
    }
}

/// The geofence validation layer.
///
/// Pure geometry over the static index plus the input point; the context
/// is only used to stamp result timestamps. Safe to share across
/// concurrent verifications.
pub struct GeofenceLayer<Ctx: CoastwatchContext> {
    ctx: Arc<Ctx>,
    index: Arc<dyn NearestCoastline>,
    config: GeofenceConfig,
}

impl<Ctx: CoastwatchContext> GeofenceLayer<Ctx> {
    /// Creates a geofence layer over the given reference index.
    pub fn new(ctx: Arc<Ctx>, index: Arc<dyn NearestCoastline>, config: GeofenceConfig) -> Self {
        Self { ctx, index, config }
    }

    /// Evaluates a single point. Pure function of the index, the config,
    /// the point, and the supplied timestamp.
    pub fn assess(&self, point: &GeoPoint, processed_at_ms: i64) -> LayerResult {
        let nearest = match self.index.nearest(point) {
            Some(nearest) => nearest,
            None => {
                // Fail-safe: an unloaded index must never pass reports
                return LayerResult::fail(
                    LayerName::Geofence,
                    GEOFENCE_CONFIDENCE,
                    "no coastline reference points loaded; cannot establish coastal proximity",
                    LayerData::Empty,
                    processed_at_ms,
                );
            }
        };

        let classification = classify(point, &nearest);
        let limit_km = match classification {
            ShoreSide::Inland => self.config.inland_limit_km,
            ShoreSide::Offshore => self.config.offshore_limit_km,
        };

        let assessment = GeofenceAssessment {
            distance_km: nearest.distance_km,
            nearest_name: nearest.point.name.clone(),
            region: nearest.point.region,
            classification,
            limit_km,
        };

        if nearest.distance_km > limit_km {
            let reasoning = format!(
                "{:.1} km from nearest coastline reference '{}' ({}), {} limit is {:.0} km",
                nearest.distance_km,
                nearest.point.name,
                nearest.point.region,
                classification,
                limit_km,
            );
            LayerResult::fail(
                LayerName::Geofence,
                GEOFENCE_CONFIDENCE,
                reasoning,
                LayerData::Geofence(assessment),
                processed_at_ms,
            )
        } else {
            let score = 1.0 - (nearest.distance_km / limit_km) * DISTANCE_PENALTY;
            let reasoning = format!(
                "{:.1} km from nearest coastline reference '{}' ({}), within {} limit of {:.0} km",
                nearest.distance_km,
                nearest.point.name,
                nearest.point.region,
                classification,
                limit_km,
            );
            LayerResult::pass(
                LayerName::Geofence,
                score,
                GEOFENCE_CONFIDENCE,
                reasoning,
                LayerData::Geofence(assessment),
                processed_at_ms,
            )
        }
    }
}

#[async_trait]
impl<Ctx: CoastwatchContext> VerificationLayer for GeofenceLayer<Ctx> {
    fn name(&self) -> LayerName {
        LayerName::Geofence
    }

    async fn evaluate(
        &self,
        snapshot: &HazardReportSnapshot,
        _budget: Duration,
    ) -> Result<LayerResult, LayerError> {
        Ok(self.assess(&snapshot.location, self.ctx.unix_time_ms()))
    }
}
