//! Risk classification.

use crate::store::RuleSet;
use std::sync::Arc;
use warden_core::{EventKind, RiskTier};

/// Output of risk classification.
///
/// Recomputed from scratch on every call; carries no state between events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskScore {
    /// Highest severity among fired rules.
    pub tier: RiskTier,
    /// Ids of the rules that fired, in declaration order.
    pub triggered: Vec<String>,
}

impl RiskScore {
    /// A score with no fired rules.
    pub fn low() -> Self {
        Self {
            tier: RiskTier::Low,
            triggered: Vec::new(),
        }
    }
}

/// Scores a payload against the keyword/pattern rules for its event kind.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Arc<RuleSet>,
}

impl Classifier {
    /// Create a classifier over a shared rule set.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Classify `text` for the given event kind.
    ///
    /// Tool-use proposals are matched against the dangerous-action rules;
    /// everything else (prompts, tool output) against the free-text prompt
    /// rules. Severity drives the tier: one high-severity hit outranks any
    /// number of medium ones.
    pub fn classify(&self, text: &str, kind: EventKind) -> RiskScore {
        let rules = match kind {
            EventKind::ToolUseProposed => self.rules.tool_rules(),
            _ => self.rules.prompt_rules(),
        };

        let mut tier = RiskTier::Low;
        let mut triggered = Vec::new();
        for rule in rules {
            if rule.is_match(text) {
                tier = tier.max(rule.severity);
                triggered.push(rule.id.clone());
            }
        }

        if !triggered.is_empty() {
            tracing::debug!(kind = %kind, tier = %tier, rules = ?triggered, "risk rules fired");
        }

        RiskScore { tier, triggered }
    }
}
