//! Scripted stand-ins for the four external validation layers.
//!
//! The real weather/text/image/reporter layers are models behind network
//! calls and out of scope here; these stubs exist to exercise the layer
//! *contract* - uniform results, typed payloads, contained errors, and
//! the timeout race - under scenario control.

use async_trait::async_trait;
use coastwatch_core::layer::{
    ImageAssessment, LayerData, LayerError, LayerName, LayerResult, LayerStatus,
    ReporterAssessment, TextAssessment, VerificationLayer, WeatherAssessment,
};
use coastwatch_core::report::HazardReportSnapshot;
use coastwatch_env::CoastwatchContext;
use std::sync::Arc;
use std::time::Duration;

/// What a stub layer does when evaluated.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Produce a result with the given status and score
    Respond {
        status: LayerStatus,
        score: f64,
        confidence: f64,
    },

    /// Surface an internal error (the orchestrator records SKIPPED)
    Degraded { error: String },

    /// Never respond; the orchestrator's timeout race cuts this off
    Hang,

    /// Respond after a delay, honouring the caller's budget: a delay
    /// beyond the budget self-reports as a timeout error instead of
    /// responding (the well-behaved half of the double-walled timeout)
    Slow { delay: Duration, score: f64 },
}

/// A scripted external layer.
pub struct StubLayer<Ctx: CoastwatchContext> {
    ctx: Arc<Ctx>,
    name: LayerName,
    behavior: StubBehavior,
}

impl<Ctx: CoastwatchContext> StubLayer<Ctx> {
    pub fn new(ctx: Arc<Ctx>, name: LayerName, behavior: StubBehavior) -> Self {
        Self {
            ctx,
            name,
            behavior,
        }
    }

    /// Arc-wrapped, ready for `register_layer`.
    pub fn shared(ctx: Arc<Ctx>, name: LayerName, behavior: StubBehavior) -> Arc<Self> {
        Arc::new(Self::new(ctx, name, behavior))
    }

    /// Builds the typed payload this layer name is expected to carry.
    fn payload(&self, score: f64) -> LayerData {
        match self.name {
            LayerName::Weather => LayerData::Weather(WeatherAssessment {
                conditions: "scripted marine conditions".to_string(),
                consistency: score,
            }),
            LayerName::Text => LayerData::Text(TextAssessment {
                keyword_hits: (score * 5.0).round() as u32,
                relevance: score,
            }),
            LayerName::Image => LayerData::Image(ImageAssessment {
                images_checked: 1,
                hazard_visible: score,
            }),
            LayerName::Reporter => LayerData::Reporter(ReporterAssessment {
                prior_reports: 12,
                accuracy_rate: score,
            }),
            LayerName::Geofence => LayerData::Empty,
        }
    }

    fn respond(&self, status: LayerStatus, score: f64, confidence: f64) -> LayerResult {
        let now_ms = self.ctx.unix_time_ms();
        match status {
            LayerStatus::Pass => LayerResult::pass(
                self.name,
                score,
                confidence,
                format!("scripted {} signal", self.name),
                self.payload(score),
                now_ms,
            ),
            LayerStatus::Fail => LayerResult::fail(
                self.name,
                confidence,
                format!("scripted {} rejection", self.name),
                self.payload(0.0),
                now_ms,
            ),
            LayerStatus::Skipped => {
                LayerResult::skipped(self.name, "scripted skip", now_ms)
            }
        }
    }
}

#[async_trait]
impl<Ctx: CoastwatchContext> VerificationLayer for StubLayer<Ctx> {
    fn name(&self) -> LayerName {
        self.name
    }

    async fn evaluate(
        &self,
        _snapshot: &HazardReportSnapshot,
        budget: Duration,
    ) -> Result<LayerResult, LayerError> {
        match &self.behavior {
            StubBehavior::Respond {
                status,
                score,
                confidence,
            } => Ok(self.respond(*status, *score, *confidence)),
            StubBehavior::Degraded { error } => Err(LayerError::Internal(error.clone())),
            StubBehavior::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            StubBehavior::Slow { delay, score } => {
                if *delay > budget {
                    self.ctx.sleep(budget).await;
                    return Err(LayerError::Timeout {
                        elapsed_ms: budget.as_millis() as u64,
                    });
                }
                self.ctx.sleep(*delay).await;
                Ok(self.respond(LayerStatus::Pass, *score, 0.8))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SimContext;
    use coastwatch_core::coastline::GeoPoint;
    use coastwatch_core::report::HazardKind;

    fn snapshot() -> HazardReportSnapshot {
        HazardReportSnapshot::new(
            GeoPoint::new(18.95, 72.78).unwrap(),
            HazardKind::HighWaves,
            "test report",
        )
    }

    #[tokio::test]
    async fn test_respond_carries_typed_payload() {
        let ctx = SimContext::shared(1);
        for name in [LayerName::Weather, LayerName::Text, LayerName::Image, LayerName::Reporter] {
            let stub = StubLayer::new(
                ctx.clone(),
                name,
                StubBehavior::Respond {
                    status: LayerStatus::Pass,
                    score: 0.8,
                    confidence: 0.9,
                },
            );
            let result = stub
                .evaluate(&snapshot(), Duration::from_secs(5))
                .await
                .unwrap();

            assert_eq!(result.layer, name);
            assert_eq!(result.status, LayerStatus::Pass);
            let matches = matches!(
                (name, &result.data),
                (LayerName::Weather, LayerData::Weather(_))
                    | (LayerName::Text, LayerData::Text(_))
                    | (LayerName::Image, LayerData::Image(_))
                    | (LayerName::Reporter, LayerData::Reporter(_))
            );
            assert!(matches, "payload {:?} does not match layer {}", result.data, name);
        }
    }

    #[tokio::test]
    async fn test_degraded_surfaces_layer_error() {
        let stub = StubLayer::new(
            SimContext::shared(1),
            LayerName::Weather,
            StubBehavior::Degraded {
                error: "upstream 502".to_string(),
            },
        );
        let err = stub
            .evaluate(&snapshot(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("upstream 502"));
    }

    #[tokio::test]
    async fn test_slow_beyond_budget_times_out() {
        let ctx = SimContext::shared(1);
        let stub = StubLayer::new(
            ctx.clone(),
            LayerName::Reporter,
            StubBehavior::Slow {
                delay: Duration::from_secs(9),
                score: 0.6,
            },
        );
        let err = stub
            .evaluate(&snapshot(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, LayerError::Timeout { elapsed_ms: 5000 }));
    }

    #[tokio::test]
    async fn test_slow_consumes_virtual_time() {
        let ctx = SimContext::shared(1);
        let stub = StubLayer::new(
            ctx.clone(),
            LayerName::Image,
            StubBehavior::Slow {
                delay: Duration::from_secs(3),
                score: 0.6,
            },
        );
        let result = stub
            .evaluate(&snapshot(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(result.status, LayerStatus::Pass);
        assert_eq!(ctx.now(), Duration::from_secs(3));
    }
}
