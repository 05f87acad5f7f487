//! Composite Scoring - Weighted Aggregation and the Decision Rule
//!
//! Turns the per-layer results into the one number authorities see:
//!
//! ```text
//! composite = 100 * Σ(score_i * weight_i) / Σ(weight_i)    (non-SKIPPED i)
//! ```
//!
//! SKIPPED layers drop out of numerator and denominator, so a dead model
//! renormalises the remaining signals instead of dragging the score down.
//! The decision rule is evaluated strictly in order: geofence veto,
//! no-signal fail-safe, then the score brackets.
//!
//! Everything in this module is a pure function of the layer results and
//! the configured thresholds - no clock, no I/O, no hidden state.

use crate::layer::{LayerName, LayerResult, LayerStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Final routing decision for a verified report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    /// High composite score - approved without a human in the loop
    AutoApproved,

    /// Mid score or degraded signal - queued for an analyst
    ManualReview,

    /// Low composite score
    Rejected,

    /// Geofence veto - geographically implausible
    AutoRejected,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Decision::AutoApproved => "AUTO_APPROVED",
            Decision::ManualReview => "MANUAL_REVIEW",
            Decision::Rejected => "REJECTED",
            Decision::AutoRejected => "AUTO_REJECTED",
        };
        write!(f, "{}", name)
    }
}

/// The engine's recommendation to downstream reviewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AiRecommendation {
    Approve,
    Review,
    Reject,
}

impl std::fmt::Display for AiRecommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AiRecommendation::Approve => "APPROVE",
            AiRecommendation::Review => "REVIEW",
            AiRecommendation::Reject => "REJECT",
        };
        write!(f, "{}", name)
    }
}

/// Score brackets for the decision rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionThresholds {
    /// Composite at or above this auto-approves (default 85)
    pub auto_approve: f64,

    /// Composite at or above this goes to manual review (default 40)
    pub manual_review: f64,
}

impl Default for DecisionThresholds {
    fn default() -> Self {
        Self {
            auto_approve: 85.0,
            manual_review: 40.0,
        }
    }
}

/// Human ratification record, appended after the fact by an authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityConfirmation {
    /// Reviewing authority
    pub authority_id: Uuid,

    /// Whether the authority upheld the report
    pub confirmed: bool,

    /// Free-text note from the reviewer
    pub note: String,

    /// Confirmation time (Unix milliseconds)
    pub confirmed_at_ms: i64,
}

/// Errors on the append-only audit surface.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Authority confirmation already attached")]
    AlreadyConfirmed,
}

/// The persisted, auditable outcome of one verification attempt.
///
/// Immutable after construction except for the append-only
/// `authority_confirmation`: layer scores and the composite are never
/// recomputed once emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Report this verdict belongs to
    pub report_id: Uuid,

    /// Exactly one result per configured layer, in dispatch order
    pub layer_results: Vec<LayerResult>,

    /// Weighted aggregate in [0, 100]
    pub composite_score: f64,

    /// Final routing decision
    pub decision: Decision,

    /// Recommendation surfaced to reviewers
    pub ai_recommendation: AiRecommendation,

    /// Automated approvals are always logged for human ratification
    pub requires_authority_confirmation: bool,

    /// One-line outcome for logs and queue listings
    pub summary: String,

    /// When the verdict was computed (Unix milliseconds)
    pub computed_at_ms: i64,

    /// Appended later by a human reviewer, never by the engine
    pub authority_confirmation: Option<AuthorityConfirmation>,
}

impl VerificationResult {
    /// Looks up the result of a specific layer.
    pub fn layer(&self, name: LayerName) -> Option<&LayerResult> {
        self.layer_results.iter().find(|r| r.layer == name)
    }

    /// Appends the human ratification record. Errors if one is already
    /// attached - the audit trail is append-only.
    pub fn attach_confirmation(
        &mut self,
        confirmation: AuthorityConfirmation,
    ) -> Result<(), AuditError> {
        if self.authority_confirmation.is_some() {
            return Err(AuditError::AlreadyConfirmed);
        }
        self.authority_confirmation = Some(confirmation);
        Ok(())
    }
}

/// True when at least one layer produced a scorable signal.
///
/// A layer counts only if it was not SKIPPED *and* carries non-zero
/// weight - an all-zero weight table is as blind as an all-SKIPPED run.
pub fn has_scorable_signal(results: &[LayerResult]) -> bool {
    results.iter().any(|r| !r.is_skipped() && r.weight > 0.0)
}

/// Weighted composite score over non-SKIPPED layers, in [0, 100].
///
/// Returns 0.0 when no scorable signal exists; the decision rule routes
/// that case to manual review rather than interpreting it as a score.
pub fn composite_score(results: &[LayerResult]) -> f64 {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    for result in results.iter().filter(|r| !r.is_skipped()) {
        weighted_sum += result.score * result.weight;
        weight_total += result.weight;
    }
    if weight_total <= 0.0 {
        return 0.0;
    }
    (100.0 * weighted_sum / weight_total).clamp(0.0, 100.0)
}

/// Applies the decision rule, in order:
///
/// 1. Geofence FAIL vetoes everything: AUTO_REJECTED.
/// 2. No scorable signal: MANUAL_REVIEW (never silently approve blind).
/// 3. Composite >= auto_approve: AUTO_APPROVED.
/// 4. Composite >= manual_review: MANUAL_REVIEW.
/// 5. Otherwise: REJECTED.
pub fn decide(
    results: &[LayerResult],
    composite: f64,
    thresholds: &DecisionThresholds,
) -> (Decision, AiRecommendation) {
    let geofence_failed = results
        .iter()
        .any(|r| r.layer == LayerName::Geofence && r.status == LayerStatus::Fail);
    if geofence_failed {
        return (Decision::AutoRejected, AiRecommendation::Reject);
    }

    if !has_scorable_signal(results) {
        return (Decision::ManualReview, AiRecommendation::Review);
    }

    if composite >= thresholds.auto_approve {
        (Decision::AutoApproved, AiRecommendation::Approve)
    } else if composite >= thresholds.manual_review {
        (Decision::ManualReview, AiRecommendation::Review)
    } else {
        (Decision::Rejected, AiRecommendation::Reject)
    }
}
