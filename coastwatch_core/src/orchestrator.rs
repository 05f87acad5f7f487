//! The Orchestrator - Composite Verification over All Layers
//!
//! Coordinates one verification attempt per report: fan out every
//! configured layer concurrently, race each against its own timeout,
//! collect exactly one result per layer, aggregate, decide.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     VerificationEngine                       │
//! │  ┌───────────────────────────────────────────────────────┐   │
//! │  │            Context: CoastwatchContext                 │   │
//! │  │  • sleep() → per-layer timeout race                   │   │
//! │  │  • unix_time_ms() → audit timestamps                  │   │
//! │  └───────────────────────────────────────────────────────┘   │
//! │                             │                                │
//! │  ┌──────────┐ ┌─────────┐ ┌──────┐ ┌───────┐ ┌──────────┐   │
//! │  │ GEOFENCE │ │ WEATHER │ │ TEXT │ │ IMAGE │ │ REPORTER │   │
//! │  └──────────┘ └─────────┘ └──────┘ └───────┘ └──────────┘   │
//! │                             │                                │
//! │                    join-all → score → decide                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine's public contract is narrow: `verify` surfaces only
//! `LocationError` (bad input coordinates, caught before orchestration).
//! Every other failure - a dead model, a hung upstream, a malformed
//! weight table - degrades into the returned `VerificationResult`.

use crate::coastline::{CoastlineIndex, LocationError};
use crate::geofence::{GeofenceConfig, GeofenceLayer};
use crate::layer::{LayerName, LayerResult, VerificationLayer};
use crate::report::HazardReportSnapshot;
use crate::scoring::{
    composite_score, decide, AiRecommendation, Decision, DecisionThresholds, VerificationResult,
};
use coastwatch_env::CoastwatchContext;
use futures::channel::oneshot;
use futures::future::{select, Either};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Configuration faults caught by `EngineConfig::validate`.
///
/// These never escape `verify`; they are folded into a fail-safe
/// manual-review result.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Weight for {layer} layer is {value}, expected [0, 1]")]
    InvalidWeight { layer: LayerName, value: f64 },

    #[error("Threshold {name} is {value}, expected [0, 100]")]
    InvalidThreshold { name: &'static str, value: f64 },

    #[error("auto_approve threshold {auto_approve} below manual_review threshold {manual_review}")]
    InvertedThresholds { auto_approve: f64, manual_review: f64 },

    #[error("per_layer_timeout_ms must be positive")]
    ZeroTimeout,

    #[error("Config parse error: {0}")]
    Parse(String),
}

/// Engine configuration - externally tunable, JSON-loadable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Aggregation weight per layer; a missing entry means weight 0
    pub layer_weights: HashMap<LayerName, f64>,

    /// Geofence distance limits
    pub geofence: GeofenceConfig,

    /// Time budget per layer (default 5000)
    pub per_layer_timeout_ms: u64,

    /// Composite score for automatic approval (default 85)
    pub auto_approve_threshold: f64,

    /// Composite score floor for manual review (default 40)
    pub manual_review_threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let layer_weights = HashMap::from([
            (LayerName::Geofence, 0.25),
            (LayerName::Weather, 0.20),
            (LayerName::Text, 0.20),
            (LayerName::Image, 0.20),
            (LayerName::Reporter, 0.15),
        ]);
        Self {
            layer_weights,
            geofence: GeofenceConfig::default(),
            per_layer_timeout_ms: 5000,
            auto_approve_threshold: 85.0,
            manual_review_threshold: 40.0,
        }
    }
}

impl EngineConfig {
    /// Loads a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks the weight table and thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (&layer, &value) in &self.layer_weights {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidWeight { layer, value });
            }
        }
        for (name, value) in [
            ("auto_approve", self.auto_approve_threshold),
            ("manual_review", self.manual_review_threshold),
        ] {
            if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::InvalidThreshold { name, value });
            }
        }
        if self.auto_approve_threshold < self.manual_review_threshold {
            return Err(ConfigError::InvertedThresholds {
                auto_approve: self.auto_approve_threshold,
                manual_review: self.manual_review_threshold,
            });
        }
        if self.per_layer_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Configured weight for a layer (0 when absent from the table).
    pub fn weight_for(&self, layer: LayerName) -> f64 {
        self.layer_weights.get(&layer).copied().unwrap_or(0.0)
    }

    /// The decision brackets as a value.
    pub fn thresholds(&self) -> DecisionThresholds {
        DecisionThresholds {
            auto_approve: self.auto_approve_threshold,
            manual_review: self.manual_review_threshold,
        }
    }
}

/// The verification engine - one explicitly constructed instance per
/// deployment, no ambient global state.
///
/// Generic over the context so the same engine runs in production
/// (tokio clock) and simulation (virtual clock). Shared read-only
/// across concurrent verifications; each `verify` call is an
/// independent, stateless computation over its own snapshot.
pub struct VerificationEngine<Ctx: CoastwatchContext> {
    /// Environment context
    ctx: Arc<Ctx>,

    /// All configured layers in dispatch (and audit) order;
    /// geofence is always present and always first
    layers: Vec<Arc<dyn VerificationLayer>>,

    /// Engine configuration
    config: EngineConfig,
}

impl<Ctx: CoastwatchContext> VerificationEngine<Ctx> {
    /// Creates an engine with the geofence layer over the given index.
    /// External layers are added with [`VerificationEngine::register_layer`].
    pub fn new(ctx: Arc<Ctx>, index: CoastlineIndex, config: EngineConfig) -> Self {
        let geofence = GeofenceLayer::new(ctx.clone(), Arc::new(index), config.geofence.clone());
        Self {
            ctx,
            layers: vec![Arc::new(geofence)],
            config,
        }
    }

    /// Registers an external layer. Re-registering a layer name replaces
    /// the previous implementation, preserving one-result-per-layer.
    pub fn register_layer(mut self, layer: Arc<dyn VerificationLayer>) -> Self {
        match self.layers.iter().position(|l| l.name() == layer.name()) {
            Some(existing) => self.layers[existing] = layer,
            None => self.layers.push(layer),
        }
        self
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Names of all configured layers in dispatch order.
    pub fn layer_names(&self) -> Vec<LayerName> {
        self.layers.iter().map(|l| l.name()).collect()
    }

    /// Verifies one report snapshot.
    ///
    /// Always returns a complete `VerificationResult`; the only error
    /// surfaced is an out-of-range location, rejected before any layer
    /// is dispatched.
    pub async fn verify(
        &self,
        snapshot: &HazardReportSnapshot,
    ) -> Result<VerificationResult, LocationError> {
        snapshot.location.validate()?;

        if let Err(fault) = self.config.validate() {
            warn!(report = %snapshot.report_id, fault = %fault, "orchestration fault, forcing manual review");
            return Ok(self.fault_result(snapshot, &fault.to_string()));
        }

        // Fan out: one task per configured layer, each bounded by its
        // own timeout. Tasks outlive an abandoned verification; their
        // results are simply discarded with the dropped receivers.
        let budget = Duration::from_millis(self.config.per_layer_timeout_ms);
        let mut pending: Vec<(LayerName, oneshot::Receiver<LayerResult>)> =
            Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let name = layer.name();
            let (tx, rx) = oneshot::channel();
            let evaluation =
                evaluate_bounded(self.ctx.clone(), layer.clone(), snapshot.clone(), budget);
            self.ctx.spawn(&format!("verify-{}", name), async move {
                let _ = tx.send(evaluation.await);
            });
            pending.push((name, rx));
        }

        // Join: exactly one result per layer, SKIPPED when the task's
        // sender vanished without delivering.
        let mut layer_results = Vec::with_capacity(pending.len());
        for (name, rx) in pending {
            let result = match rx.await {
                Ok(result) => result,
                Err(_) => LayerResult::skipped(
                    name,
                    "layer task dropped before completion",
                    self.ctx.unix_time_ms(),
                ),
            };
            layer_results.push(result.with_weight(self.config.weight_for(name)));
        }

        let composite = composite_score(&layer_results);
        let (decision, ai_recommendation) =
            decide(&layer_results, composite, &self.config.thresholds());
        let requires_authority_confirmation = decision == Decision::AutoApproved;

        let scored = layer_results.iter().filter(|r| !r.is_skipped()).count();
        let summary = format!(
            "composite {:.1} from {}/{} layers, decision {}",
            composite,
            scored,
            layer_results.len(),
            decision,
        );
        info!(
            report = %snapshot.report_id,
            composite = composite,
            decision = %decision,
            "verification complete"
        );

        Ok(VerificationResult {
            report_id: snapshot.report_id,
            layer_results,
            composite_score: composite,
            decision,
            ai_recommendation,
            requires_authority_confirmation,
            summary,
            computed_at_ms: self.ctx.unix_time_ms(),
            authority_confirmation: None,
        })
    }

    /// Fail-safe verdict for faults inside the orchestrator itself:
    /// every layer recorded as SKIPPED, decision forced to manual review.
    fn fault_result(&self, snapshot: &HazardReportSnapshot, fault: &str) -> VerificationResult {
        let now_ms = self.ctx.unix_time_ms();
        let layer_results: Vec<LayerResult> = self
            .layers
            .iter()
            .map(|layer| {
                LayerResult::skipped(
                    layer.name(),
                    format!("orchestration fault: {}", fault),
                    now_ms,
                )
            })
            .collect();

        VerificationResult {
            report_id: snapshot.report_id,
            layer_results,
            composite_score: 0.0,
            decision: Decision::ManualReview,
            ai_recommendation: AiRecommendation::Review,
            requires_authority_confirmation: false,
            summary: format!("orchestration fault: {}", fault),
            computed_at_ms: now_ms,
            authority_confirmation: None,
        }
    }
}

/// Evaluates one layer inside its own task, racing the evaluation
/// against the time budget.
///
/// The select is inherently biased toward the layer: a result that is
/// ready on the same poll as the expiring clock still counts. Every
/// outcome - result, error, timeout - collapses into one `LayerResult`.
async fn evaluate_bounded<Ctx: CoastwatchContext>(
    ctx: Arc<Ctx>,
    layer: Arc<dyn VerificationLayer>,
    snapshot: HazardReportSnapshot,
    budget: Duration,
) -> LayerResult {
    let name = layer.name();
    match select(layer.evaluate(&snapshot, budget), ctx.sleep(budget)).await {
        Either::Left((Ok(result), _)) => {
            debug!(layer = %name, status = ?result.status, score = result.score, "layer completed");
            result
        }
        Either::Left((Err(error), _)) => {
            warn!(layer = %name, error = %error, "layer error, recording as skipped");
            LayerResult::skipped(name, error.to_string(), ctx.unix_time_ms())
        }
        Either::Right(((), _)) => {
            warn!(layer = %name, budget_ms = budget.as_millis() as u64, "layer timed out, recording as skipped");
            LayerResult::skipped(
                name,
                format!("no response within {}ms budget", budget.as_millis()),
                ctx.unix_time_ms(),
            )
        }
    }
}

/// Sanity check used by tests and the sim oracle: a verdict must carry
/// exactly one result per configured layer, in dispatch order.
pub fn audit_is_complete(verdict: &VerificationResult, configured: &[LayerName]) -> bool {
    verdict.layer_results.len() == configured.len()
        && verdict
            .layer_results
            .iter()
            .zip(configured)
            .all(|(result, &name)| result.layer == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coastline::GeoPoint;
    use crate::layer::{LayerData, LayerError, LayerStatus};
    use crate::report::HazardKind;
    use async_trait::async_trait;
    use coastwatch_env::TokioContext;

    /// Minimal scripted layer for orchestrator tests.
    struct FixedLayer {
        name: LayerName,
        score: f64,
    }

    #[async_trait]
    impl VerificationLayer for FixedLayer {
        fn name(&self) -> LayerName {
            self.name
        }

        async fn evaluate(
            &self,
            _snapshot: &HazardReportSnapshot,
            _budget: Duration,
        ) -> Result<LayerResult, LayerError> {
            Ok(LayerResult::pass(
                self.name,
                self.score,
                0.9,
                "scripted",
                LayerData::Empty,
                0,
            ))
        }
    }

    /// A layer that never responds.
    struct HangingLayer {
        name: LayerName,
    }

    #[async_trait]
    impl VerificationLayer for HangingLayer {
        fn name(&self) -> LayerName {
            self.name
        }

        async fn evaluate(
            &self,
            _snapshot: &HazardReportSnapshot,
            _budget: Duration,
        ) -> Result<LayerResult, LayerError> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    /// A layer that raises internally.
    struct BrokenLayer {
        name: LayerName,
    }

    #[async_trait]
    impl VerificationLayer for BrokenLayer {
        fn name(&self) -> LayerName {
            self.name
        }

        async fn evaluate(
            &self,
            _snapshot: &HazardReportSnapshot,
            _budget: Duration,
        ) -> Result<LayerResult, LayerError> {
            Err(LayerError::Internal("model returned garbage".to_string()))
        }
    }

    fn engine_with_externals(
        config: EngineConfig,
        externals: Vec<Arc<dyn VerificationLayer>>,
    ) -> VerificationEngine<TokioContext> {
        let mut engine = VerificationEngine::new(
            TokioContext::shared(),
            CoastlineIndex::indian_coastline(),
            config,
        );
        for layer in externals {
            engine = engine.register_layer(layer);
        }
        engine
    }

    fn perfect_externals() -> Vec<Arc<dyn VerificationLayer>> {
        vec![
            Arc::new(FixedLayer { name: LayerName::Weather, score: 1.0 }),
            Arc::new(FixedLayer { name: LayerName::Text, score: 1.0 }),
            Arc::new(FixedLayer { name: LayerName::Image, score: 1.0 }),
            Arc::new(FixedLayer { name: LayerName::Reporter, score: 1.0 }),
        ]
    }

    fn offshore_mumbai_report() -> HazardReportSnapshot {
        HazardReportSnapshot::new(
            GeoPoint::new(18.9500, 72.7800).unwrap(),
            HazardKind::HighWaves,
            "large swells approaching the harbour",
        )
    }

    fn new_delhi_report() -> HazardReportSnapshot {
        HazardReportSnapshot::new(
            GeoPoint::new(28.6139, 77.2090).unwrap(),
            HazardKind::CoastalFlooding,
            "flooding near the river",
        )
    }

    #[tokio::test]
    async fn test_offshore_report_auto_approved() {
        let engine = engine_with_externals(EngineConfig::default(), perfect_externals());
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();

        assert!(verdict.composite_score >= 85.0);
        assert_eq!(verdict.decision, Decision::AutoApproved);
        assert_eq!(verdict.ai_recommendation, AiRecommendation::Approve);
        assert!(verdict.requires_authority_confirmation);
        assert!(audit_is_complete(&verdict, &engine.layer_names()));
    }

    #[tokio::test]
    async fn test_geofence_veto_with_perfect_externals() {
        let engine = engine_with_externals(EngineConfig::default(), perfect_externals());
        let verdict = engine.verify(&new_delhi_report()).await.unwrap();

        assert_eq!(verdict.decision, Decision::AutoRejected);
        assert_eq!(verdict.ai_recommendation, AiRecommendation::Reject);
        assert!(!verdict.requires_authority_confirmation);

        // Veto is evaluated after collection: audit data stays complete
        assert!(audit_is_complete(&verdict, &engine.layer_names()));
        for name in [LayerName::Weather, LayerName::Text, LayerName::Image, LayerName::Reporter] {
            let result = verdict.layer(name).unwrap();
            assert_eq!(result.status, LayerStatus::Pass);
        }
    }

    #[tokio::test]
    async fn test_layer_error_recorded_as_skipped() {
        let externals: Vec<Arc<dyn VerificationLayer>> = vec![
            Arc::new(BrokenLayer { name: LayerName::Weather }),
            Arc::new(FixedLayer { name: LayerName::Text, score: 1.0 }),
            Arc::new(FixedLayer { name: LayerName::Image, score: 1.0 }),
            Arc::new(FixedLayer { name: LayerName::Reporter, score: 1.0 }),
        ];
        let engine = engine_with_externals(EngineConfig::default(), externals);
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();

        let weather = verdict.layer(LayerName::Weather).unwrap();
        assert_eq!(weather.status, LayerStatus::Skipped);
        assert!(weather.reasoning.contains("model returned garbage"));

        // Remaining layers still scored; verdict is well-formed
        assert!(verdict.composite_score > 0.0);
        assert!(audit_is_complete(&verdict, &engine.layer_names()));
    }

    #[tokio::test]
    async fn test_hung_layers_time_out_as_skipped() {
        // Scenario C: every external hangs, geofence still passes.
        // Short budget keeps the wall-clock cost of this test small.
        let mut config = EngineConfig::default();
        config.per_layer_timeout_ms = 50;
        let externals: Vec<Arc<dyn VerificationLayer>> = vec![
            Arc::new(HangingLayer { name: LayerName::Weather }),
            Arc::new(HangingLayer { name: LayerName::Text }),
            Arc::new(HangingLayer { name: LayerName::Image }),
            Arc::new(HangingLayer { name: LayerName::Reporter }),
        ];
        let engine = engine_with_externals(config, externals);
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();

        for name in [LayerName::Weather, LayerName::Text, LayerName::Image, LayerName::Reporter] {
            let result = verdict.layer(name).unwrap();
            assert_eq!(result.status, LayerStatus::Skipped);
            assert!(result.reasoning.contains("budget"));
        }

        // Composite renormalises onto the geofence alone
        let geofence = verdict.layer(LayerName::Geofence).unwrap();
        assert_eq!(geofence.status, LayerStatus::Pass);
        assert!(verdict.composite_score > 90.0);
        assert_eq!(verdict.decision, Decision::AutoApproved);
    }

    #[tokio::test]
    async fn test_geofence_alone_can_reach_each_bracket() {
        // Degraded stack with raised thresholds: the single remaining
        // geofence signal must land in the bracket its score earns.
        let mut config = EngineConfig::default();
        config.manual_review_threshold = 90.0;
        config.auto_approve_threshold = 99.0;
        let externals: Vec<Arc<dyn VerificationLayer>> = vec![
            Arc::new(BrokenLayer { name: LayerName::Weather }),
            Arc::new(BrokenLayer { name: LayerName::Text }),
            Arc::new(BrokenLayer { name: LayerName::Image }),
            Arc::new(BrokenLayer { name: LayerName::Reporter }),
        ];
        let engine = engine_with_externals(config, externals);
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();

        // Geofence ~0.957 → composite ~95.7 → manual review bracket
        assert_eq!(verdict.decision, Decision::ManualReview);
    }

    #[tokio::test]
    async fn test_invalid_location_surfaced_to_caller() {
        let engine = engine_with_externals(EngineConfig::default(), perfect_externals());
        let mut snapshot = offshore_mumbai_report();
        snapshot.location = GeoPoint {
            latitude: 99.0,
            longitude: 72.78,
        };

        assert!(engine.verify(&snapshot).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_config_forces_manual_review() {
        let mut config = EngineConfig::default();
        config.layer_weights.insert(LayerName::Weather, 1.7);
        let engine = engine_with_externals(config, perfect_externals());
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();

        assert_eq!(verdict.decision, Decision::ManualReview);
        assert_eq!(verdict.composite_score, 0.0);
        assert!(verdict.summary.contains("orchestration fault"));
        assert!(verdict.layer_results.iter().all(|r| r.is_skipped()));
        assert!(audit_is_complete(&verdict, &engine.layer_names()));
    }

    #[tokio::test]
    async fn test_inverted_thresholds_rejected_by_validation() {
        let mut config = EngineConfig::default();
        config.auto_approve_threshold = 30.0;
        config.manual_review_threshold = 60.0;
        assert!(config.validate().is_err());

        let engine = engine_with_externals(config, perfect_externals());
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();
        assert_eq!(verdict.decision, Decision::ManualReview);
    }

    #[tokio::test]
    async fn test_reregistering_layer_replaces() {
        let engine = engine_with_externals(EngineConfig::default(), perfect_externals())
            .register_layer(Arc::new(FixedLayer { name: LayerName::Weather, score: 0.1 }));

        assert_eq!(engine.layer_names().len(), 5);
        let verdict = engine.verify(&offshore_mumbai_report()).await.unwrap();
        let weather = verdict.layer(LayerName::Weather).unwrap();
        assert!(weather.score < 0.2);
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let back = EngineConfig::from_json(&json).unwrap();
        assert_eq!(back.per_layer_timeout_ms, config.per_layer_timeout_ms);
        assert_eq!(back.layer_weights.len(), config.layer_weights.len());
        back.validate().unwrap();

        assert!(EngineConfig::from_json("{not json").is_err());
    }
}
