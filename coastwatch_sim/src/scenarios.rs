//! Verification scenarios for the deterministic harness.

use serde::Serialize;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScenarioId {
    /// VRF-001: Clean offshore report near Mumbai, all signals healthy
    OffshoreMumbai,

    /// VRF-002: Geographically implausible report (New Delhi) - veto path
    InlandDelhi,

    /// VRF-003: Every external layer hangs; only the geofence scores
    SignalBlackout,

    /// VRF-004: Mixed degradation - one model erroring, one hung
    FlakyModels,

    /// VRF-005: Healthy signals but a reporter with a bad track record
    SuspectReporter,

    /// VRF-006: All-zero weight table - the engine is scoring blind
    ZeroWeights,

    /// VRF-007: Inverted thresholds - orchestration fault fail-safe
    BrokenConfig,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::OffshoreMumbai,
            ScenarioId::InlandDelhi,
            ScenarioId::SignalBlackout,
            ScenarioId::FlakyModels,
            ScenarioId::SuspectReporter,
            ScenarioId::ZeroWeights,
            ScenarioId::BrokenConfig,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::OffshoreMumbai => "offshore_mumbai",
            ScenarioId::InlandDelhi => "inland_delhi",
            ScenarioId::SignalBlackout => "signal_blackout",
            ScenarioId::FlakyModels => "flaky_models",
            ScenarioId::SuspectReporter => "suspect_reporter",
            ScenarioId::ZeroWeights => "zero_weights",
            ScenarioId::BrokenConfig => "broken_config",
        }
    }

    /// One-line description for CLI listings.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::OffshoreMumbai => "clean auto-approval of a plausible offshore report",
            ScenarioId::InlandDelhi => "geofence veto overrides perfect external signals",
            ScenarioId::SignalBlackout => "graceful degradation to the geofence signal alone",
            ScenarioId::FlakyModels => "partial degradation renormalises remaining weights",
            ScenarioId::SuspectReporter => "low reporter credibility lands in manual review",
            ScenarioId::ZeroWeights => "blind weight table falls back to manual review",
            ScenarioId::BrokenConfig => "orchestration fault yields a fail-safe verdict",
        }
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::all()
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| format!("unknown scenario '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_parse_back() {
        for scenario in ScenarioId::all() {
            let parsed: ScenarioId = scenario.name().parse().unwrap();
            assert_eq!(parsed, scenario);
        }
        assert!("not_a_scenario".parse::<ScenarioId>().is_err());
    }
}
