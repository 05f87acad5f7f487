//! The Layer Contract - Uniform Validation Signal Interface
//!
//! Every validation signal (geofence, weather, text, image, reporter
//! track record) is a *layer* behind one contract: evaluate a report
//! snapshot within a time budget and emit exactly one [`LayerResult`].
//!
//! Two rules make the pipeline survivable:
//! 1. A layer never lets an error escape as anything other than
//!    `Err(LayerError)` - the orchestrator converts it to a SKIPPED
//!    result, so one dead model cannot corrupt the verdict.
//! 2. SKIPPED ("no usable signal") is distinct from FAIL ("signal
//!    obtained, report did not pass"). Only FAIL ever carries veto
//!    semantics; SKIPPED merely drops out of the weighted sum.

use crate::geofence::GeofenceAssessment;
use crate::report::HazardReportSnapshot;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// The closed set of validation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerName {
    /// Geographic plausibility against the coastline reference index
    Geofence,

    /// Weather plausibility (marine conditions vs. reported hazard)
    Weather,

    /// Textual content analysis of the report description
    Text,

    /// Image content analysis of attached media
    Image,

    /// Reporter track record / credibility
    Reporter,
}

impl LayerName {
    /// All layers, in canonical audit order.
    pub fn all() -> [LayerName; 5] {
        [
            LayerName::Geofence,
            LayerName::Weather,
            LayerName::Text,
            LayerName::Image,
            LayerName::Reporter,
        ]
    }
}

impl std::fmt::Display for LayerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LayerName::Geofence => "geofence",
            LayerName::Weather => "weather",
            LayerName::Text => "text",
            LayerName::Image => "image",
            LayerName::Reporter => "reporter",
        };
        write!(f, "{}", name)
    }
}

/// Outcome discriminant of one layer evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LayerStatus {
    /// Signal obtained, report passed this check
    Pass,

    /// Signal obtained, report did not pass this check
    Fail,

    /// No usable signal (timeout, internal error, missing dependency)
    Skipped,
}

/// Weather layer payload: marine conditions at the reported location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAssessment {
    /// Short summary of observed conditions ("wind 45 km/h SW, swell 3.2 m")
    pub conditions: String,

    /// How consistent the conditions are with the reported hazard [0,1]
    pub consistency: f64,
}

/// Text layer payload: description content analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextAssessment {
    /// Hazard-vocabulary hits found in the description
    pub keyword_hits: u32,

    /// Topical relevance of the description [0,1]
    pub relevance: f64,
}

/// Image layer payload: attached media analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageAssessment {
    /// Number of attached images that were analysed
    pub images_checked: u32,

    /// Fraction of analysed images showing the reported hazard [0,1]
    pub hazard_visible: f64,
}

/// Reporter layer payload: submitter track record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReporterAssessment {
    /// Reports previously submitted by this reporter
    pub prior_reports: u32,

    /// Fraction of prior reports confirmed genuine [0,1]
    pub accuracy_rate: f64,
}

/// Strongly-typed per-layer payload.
///
/// Tagged variant instead of a free-form dictionary: the orchestrator
/// reasons about every layer through `status`/`score`/`weight` alone and
/// treats this payload as audit detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LayerData {
    Geofence(GeofenceAssessment),
    Weather(WeatherAssessment),
    Text(TextAssessment),
    Image(ImageAssessment),
    Reporter(ReporterAssessment),

    /// No payload (SKIPPED results, minimal implementations)
    Empty,
}

/// The uniform result every layer emits - one per layer per attempt.
///
/// Numeric fields are clamped to [0,1] at construction. The configured
/// weight is applied by the orchestrator via [`LayerResult::with_weight`];
/// after that the value is never rewritten.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerResult {
    /// Which layer produced this result
    pub layer: LayerName,

    /// Pass / Fail / Skipped discriminant
    pub status: LayerStatus,

    /// Layer score in [0,1] (0 for FAIL and SKIPPED)
    pub score: f64,

    /// Layer self-reported confidence in [0,1] (0 for SKIPPED)
    pub confidence: f64,

    /// Configured aggregation weight in [0,1]
    pub weight: f64,

    /// Human-readable explanation for the analyst queue
    pub reasoning: String,

    /// Layer-specific audit payload
    pub data: LayerData,

    /// Wall-clock completion time (Unix milliseconds)
    pub processed_at_ms: i64,
}

impl LayerResult {
    /// A passing result.
    pub fn pass(
        layer: LayerName,
        score: f64,
        confidence: f64,
        reasoning: impl Into<String>,
        data: LayerData,
        processed_at_ms: i64,
    ) -> Self {
        Self {
            layer,
            status: LayerStatus::Pass,
            score: score.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
            weight: 0.0,
            reasoning: reasoning.into(),
            data,
            processed_at_ms,
        }
    }

    /// A failing result. Score is 0 by definition.
    pub fn fail(
        layer: LayerName,
        confidence: f64,
        reasoning: impl Into<String>,
        data: LayerData,
        processed_at_ms: i64,
    ) -> Self {
        Self {
            layer,
            status: LayerStatus::Fail,
            score: 0.0,
            confidence: confidence.clamp(0.0, 1.0),
            weight: 0.0,
            reasoning: reasoning.into(),
            data,
            processed_at_ms,
        }
    }

    /// A skipped result: no usable signal was obtained.
    pub fn skipped(layer: LayerName, reasoning: impl Into<String>, processed_at_ms: i64) -> Self {
        Self {
            layer,
            status: LayerStatus::Skipped,
            score: 0.0,
            confidence: 0.0,
            weight: 0.0,
            reasoning: reasoning.into(),
            data: LayerData::Empty,
            processed_at_ms,
        }
    }

    /// Applies the configured aggregation weight (orchestrator only).
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight.clamp(0.0, 1.0);
        self
    }

    /// True when this result contributes no signal.
    pub fn is_skipped(&self) -> bool {
        self.status == LayerStatus::Skipped
    }
}

/// Errors a layer may surface to the orchestrator.
///
/// All of these are contained at the aggregation boundary: the
/// orchestrator records them as SKIPPED results, they never propagate
/// to the engine's caller.
#[derive(Debug, Error)]
pub enum LayerError {
    /// The layer gave up before producing a signal
    #[error("Layer timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The layer raised internally (model failure, bad response, panic guard)
    #[error("Layer internal error: {0}")]
    Internal(String),

    /// A dependency the layer needs is not reachable/configured
    #[error("Layer unavailable: {0}")]
    Unavailable(String),
}

/// One independent validation signal.
///
/// Implementations must be read-only over the snapshot and should bound
/// their own upstream calls by `budget`; the orchestrator additionally
/// races every evaluation against the same budget, so an implementation
/// that ignores it is cut off rather than awaited.
#[async_trait]
pub trait VerificationLayer: Send + Sync {
    /// Which layer this is.
    fn name(&self) -> LayerName;

    /// Evaluates one report snapshot within the given time budget.
    async fn evaluate(
        &self,
        snapshot: &HazardReportSnapshot,
        budget: Duration,
    ) -> Result<LayerResult, LayerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scores_clamped_at_construction() {
        let r = LayerResult::pass(
            LayerName::Weather,
            1.7,
            -0.3,
            "out of range inputs",
            LayerData::Empty,
            0,
        );
        assert_eq!(r.score, 1.0);
        assert_eq!(r.confidence, 0.0);

        let r = r.with_weight(2.5);
        assert_eq!(r.weight, 1.0);
    }

    #[test]
    fn test_fail_forces_zero_score() {
        let r = LayerResult::fail(LayerName::Geofence, 0.95, "outside fence", LayerData::Empty, 0);
        assert_eq!(r.status, LayerStatus::Fail);
        assert_eq!(r.score, 0.0);
    }

    #[test]
    fn test_skipped_has_no_signal() {
        let r = LayerResult::skipped(LayerName::Image, "model offline", 0);
        assert!(r.is_skipped());
        assert_eq!(r.score, 0.0);
        assert_eq!(r.confidence, 0.0);
        assert_eq!(r.data, LayerData::Empty);
    }

    #[test]
    fn test_layer_result_serde_round_trip() {
        let r = LayerResult::pass(
            LayerName::Text,
            0.8,
            0.6,
            "storm vocabulary present",
            LayerData::Text(TextAssessment {
                keyword_hits: 4,
                relevance: 0.8,
            }),
            1_722_000_000_000,
        )
        .with_weight(0.2);

        let json = serde_json::to_string(&r).unwrap();
        let back: LayerResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.layer, r.layer);
        assert_eq!(back.status, r.status);
        assert_eq!(back.score, r.score);
        assert_eq!(back.weight, r.weight);
        assert_eq!(back.data, r.data);
    }
}
