//! Accept/discard decision for a scored rewrite

use std::fmt;

use serde::Serialize;

/// Default probability above which a rewrite is thrown away.
pub const DEFAULT_RISK_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateDecision {
    Accept,
    Discard,
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GateDecision::Accept => write!(f, "accept"),
            GateDecision::Discard => write!(f, "discard"),
        }
    }
}

/// Accepts or discards a rewrite from its predicted risk
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskGate {
    threshold: f64,
}

impl Default for RiskGate {
    fn default() -> Self {
        Self::new(DEFAULT_RISK_THRESHOLD)
    }
}

impl RiskGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Strictly above the threshold discards; equal is still accepted.
    pub fn decide(&self, probability: f64) -> GateDecision {
        if probability > self.threshold {
            GateDecision::Discard
        } else {
            GateDecision::Accept
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let gate = RiskGate::default();
        assert_eq!(gate.threshold(), 0.3);
        assert_eq!(gate.decide(0.1), GateDecision::Accept);
        assert_eq!(gate.decide(0.3), GateDecision::Accept);
        assert_eq!(gate.decide(0.31), GateDecision::Discard);
    }

    #[test]
    fn test_extreme_thresholds() {
        assert_eq!(RiskGate::new(1.0).decide(1.0), GateDecision::Accept);
        assert_eq!(RiskGate::new(0.0).decide(0.0), GateDecision::Accept);
        assert_eq!(RiskGate::new(0.0).decide(0.01), GateDecision::Discard);
    }
}
