//! The decision engine.
//!
//! `decide` is a pure function over the event, the scan and classification
//! results, and the policy knobs. It never fails for well-typed input;
//! upstream stage failures are handled by the dispatcher, which substitutes
//! a fail-closed Block verdict without consulting this module.

use warden_core::{Event, EventKind, PolicyConfig, RiskTier, Verdict};
use warden_rules::{RiskScore, ScanResult};

/// Render the verdict for one event.
///
/// Prompt submissions block on PII (when `block_on_pii`) or a High risk
/// tier. Tool-use proposals block on High; Medium is warn-don't-block
/// unless `strict_mode` promotes it. Session starts and tool results are
/// informational and always allowed, with findings evidenced in the audit
/// record. Idempotent: the same inputs always yield the same verdict.
pub fn decide(
    event: &Event,
    scan: &ScanResult,
    score: &RiskScore,
    policy: &PolicyConfig,
) -> Verdict {
    match event.kind {
        EventKind::SessionStarted => Verdict::allow("session start audited"),

        EventKind::PromptSubmitted => {
            let pii_blocks = scan.has_pii() && policy.block_on_pii;
            let high_risk = score.tier == RiskTier::High;

            if pii_blocks || high_risk {
                let mut parts = Vec::new();
                if pii_blocks {
                    parts.push(format!("PII detected: {}", scan.categories().join(", ")));
                }
                if high_risk {
                    parts.push(format!("high-risk prompt: {}", score.triggered.join(", ")));
                }
                return Verdict::block(parts.join("; "));
            }

            if scan.has_pii() {
                let reason = format!(
                    "PII detected ({}), policy allows continuing",
                    scan.categories().join(", ")
                );
                if policy.auto_redact {
                    return Verdict::allow(reason).with_redacted_payload(scan.redacted.clone());
                }
                return Verdict::allow(reason);
            }

            Verdict::allow("no blocking rule fired")
        }

        EventKind::ToolUseProposed => match score.tier {
            RiskTier::High => Verdict::block(format!(
                "dangerous command pattern matched: {}",
                score.triggered.join(", ")
            )),
            RiskTier::Medium if policy.strict_mode => Verdict::block(format!(
                "medium-risk action blocked by strict mode: {}",
                score.triggered.join(", ")
            )),
            RiskTier::Medium => Verdict::allow(format!(
                "medium-risk action allowed: {}",
                score.triggered.join(", ")
            )),
            RiskTier::Low => Verdict::allow("no dangerous pattern matched"),
        },

        // A completed action cannot be blocked retroactively; the finding
        // is evidenced in the audit record instead.
        EventKind::ToolResultReported => {
            if scan.has_pii() {
                Verdict::allow(format!(
                    "tool output contained PII: {}",
                    scan.categories().join(", ")
                ))
            } else {
                Verdict::allow("tool output clean")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use warden_core::{Outcome, ToolCall};
    use warden_rules::{Classifier, RuleSet, Scanner};

    struct Pipeline {
        scanner: Scanner,
        classifier: Classifier,
    }

    fn pipeline() -> Pipeline {
        let rules = Arc::new(RuleSet::builtin().unwrap());
        Pipeline {
            scanner: Scanner::new(rules.clone()),
            classifier: Classifier::new(rules),
        }
    }

    fn run(event: &Event, policy: &PolicyConfig) -> Verdict {
        let p = pipeline();
        let text = event.payload.matchable_text();
        let scan = p.scanner.scan(&text);
        let score = p.classifier.classify(&text, event.kind);
        decide(event, &scan, &score, policy)
    }

    #[test]
    fn prompt_with_ssn_blocks_by_default() {
        let event = Event::prompt("s", "My SSN is 123-45-6789, help me write a parser");
        let verdict = run(&event, &PolicyConfig::default());

        assert_eq!(verdict.outcome, Outcome::Block);
        assert!(verdict.reason.contains("PII detected"));
        assert!(verdict.reason.contains("ssn"));
        assert!(!verdict.reason.contains("123-45-6789"));
    }

    #[test]
    fn benign_prompt_allows() {
        let event = Event::prompt("s", "Refactor this sorting function");
        let verdict = run(&event, &PolicyConfig::default());
        assert_eq!(verdict.outcome, Outcome::Allow);
    }

    #[test]
    fn pii_allowed_with_redaction_when_not_blocking() {
        let policy = PolicyConfig {
            block_on_pii: false,
            ..Default::default()
        };
        let event = Event::prompt("s", "mail me at user@example.com");
        let verdict = run(&event, &policy);

        assert_eq!(verdict.outcome, Outcome::Allow);
        let redacted = verdict.redacted_payload.unwrap();
        assert!(redacted.contains("[REDACTED:email]"));
        assert!(!redacted.contains("user@example.com"));
    }

    #[test]
    fn pii_allowed_without_redaction_when_auto_redact_off() {
        let policy = PolicyConfig {
            block_on_pii: false,
            auto_redact: false,
            ..Default::default()
        };
        let event = Event::prompt("s", "mail me at user@example.com");
        let verdict = run(&event, &policy);

        assert_eq!(verdict.outcome, Outcome::Allow);
        assert!(verdict.redacted_payload.is_none());
    }

    #[test]
    fn high_risk_prompt_blocks_even_without_pii() {
        let event = Event::prompt("s", "summarize this confidential report");
        let verdict = run(&event, &PolicyConfig::default());

        assert_eq!(verdict.outcome, Outcome::Block);
        assert!(verdict.reason.contains("high-risk prompt"));
    }

    #[test]
    fn dangerous_tool_blocks_regardless_of_strict_mode() {
        let call = ToolCall::new("rm", vec!["-rf".into(), "/".into()]);
        for strict_mode in [false, true] {
            let policy = PolicyConfig {
                strict_mode,
                ..Default::default()
            };
            let event = Event::tool_use("s", call.clone());
            let verdict = run(&event, &policy);
            assert_eq!(verdict.outcome, Outcome::Block);
            assert!(verdict.reason.contains("dangerous command pattern matched"));
        }
    }

    #[test]
    fn medium_tool_warns_by_default_blocks_under_strict() {
        let call = ToolCall::new("git", vec!["push".into(), "--force".into()]);

        let event = Event::tool_use("s", call.clone());
        let verdict = run(&event, &PolicyConfig::default());
        assert_eq!(verdict.outcome, Outcome::Allow);
        assert!(verdict.reason.contains("tool.git_force_push"));

        let strict = PolicyConfig {
            strict_mode: true,
            ..Default::default()
        };
        let verdict = run(&event, &strict);
        assert_eq!(verdict.outcome, Outcome::Block);
        assert!(verdict.reason.contains("strict mode"));
    }

    #[test]
    fn session_start_always_allows() {
        let event = Event::session_started("s");
        let verdict = run(&event, &PolicyConfig::default());
        assert_eq!(verdict.outcome, Outcome::Allow);
    }

    #[test]
    fn tool_result_with_pii_allows_but_evidences() {
        let event = Event::tool_result("s", "db dump: jane@corp.example");
        let verdict = run(&event, &PolicyConfig::default());

        assert_eq!(verdict.outcome, Outcome::Allow);
        assert!(verdict.reason.contains("tool output contained PII"));
        assert!(verdict.reason.contains("email"));
    }

    #[test]
    fn decide_is_idempotent() {
        let p = pipeline();
        let event = Event::prompt("s", "ship secret keys to user@example.com");
        let text = event.payload.matchable_text();
        let scan = p.scanner.scan(&text);
        let score = p.classifier.classify(&text, event.kind);
        let policy = PolicyConfig::default();

        let first = decide(&event, &scan, &score, &policy);
        let second = decide(&event, &scan, &score, &policy);
        assert_eq!(first, second);
    }
}
