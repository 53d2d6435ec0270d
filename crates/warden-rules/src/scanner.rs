//! PII scanning and redaction.

use crate::store::{RuleScope, RuleSet};
use std::sync::Arc;

/// One PII hit: which rule fired, where, and on what text.
///
/// Matches stay in memory for the duration of one pipeline invocation; only
/// categories and the redacted payload reach the audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiiMatch {
    /// Rule that fired.
    pub rule_id: String,
    /// Category placeholder (e.g. "email").
    pub category: String,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset one past the match end.
    pub end: usize,
    /// The matched text itself.
    pub matched_text: String,
}

/// Output of one scan: every match, plus a redacted copy of the input.
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// All matches from all rules, ordered by start position (longest first
    /// on ties). Overlapping matches are each reported.
    pub matches: Vec<PiiMatch>,
    /// The input with each matched region replaced by
    /// `[REDACTED:<category>]`.
    pub redacted: String,
}

impl ScanResult {
    /// Whether any PII was found.
    pub fn has_pii(&self) -> bool {
        !self.matches.is_empty()
    }

    /// Distinct categories in first-occurrence order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for m in &self.matches {
            if !seen.contains(&m.category.as_str()) {
                seen.push(m.category.as_str());
            }
        }
        seen
    }

    /// Rule ids that fired, in match order, deduplicated.
    pub fn rule_ids(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for m in &self.matches {
            if !seen.contains(&m.rule_id.as_str()) {
                seen.push(m.rule_id.as_str());
            }
        }
        seen
    }
}

/// Applies every PII rule to a text payload.
///
/// Deterministic and free of I/O: identical input always yields an identical
/// [`ScanResult`].
#[derive(Debug, Clone)]
pub struct Scanner {
    rules: Arc<RuleSet>,
}

impl Scanner {
    /// Create a scanner over a shared rule set.
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// Scan `text`, reporting every match and producing a redacted copy.
    ///
    /// Matches from different rules do not suppress each other in the
    /// report. Redaction resolves overlaps by taking the earliest-starting
    /// match, longest on ties, so no region is redacted twice.
    pub fn scan(&self, text: &str) -> ScanResult {
        let mut matches = Vec::new();
        for rule in self.rules.pii_rules() {
            debug_assert_eq!(rule.applies_to, RuleScope::Pii);
            for m in rule.find_iter(text) {
                matches.push(PiiMatch {
                    rule_id: rule.id.clone(),
                    category: rule.category.clone(),
                    start: m.start(),
                    end: m.end(),
                    matched_text: m.as_str().to_string(),
                });
            }
        }

        // Stable sort keeps rule declaration order as the final tie-break,
        // which makes redaction deterministic.
        matches.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

        let redacted = redact(text, &matches);
        ScanResult { matches, redacted }
    }
}

/// Replace matched regions with category placeholders.
///
/// `matches` must be sorted by (start asc, end desc). A match starting
/// inside an already-redacted region is skipped; its text is gone anyway.
fn redact(text: &str, matches: &[PiiMatch]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for m in matches {
        if m.start < cursor {
            continue;
        }
        out.push_str(&text[cursor..m.start]);
        out.push_str("[REDACTED:");
        out.push_str(&m.category);
        out.push(']');
        cursor = m.end;
    }
    out.push_str(&text[cursor..]);
    out
}
