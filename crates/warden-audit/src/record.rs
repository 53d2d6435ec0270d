//! Audit record type.
//!
//! One immutable JSON-lines entry per governed event. The schema is
//! forward-compatible: consumers must tolerate fields they do not know, and
//! optional fields are omitted rather than written as null.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;
use warden_core::{EventKind, Outcome, RiskTier};

/// Current audit record schema version.
pub const SCHEMA_VERSION: &str = "1.0";

/// SHA-256 digest of a payload, hex-encoded.
///
/// The audit trail stores this instead of raw payloads so the log itself
/// never re-leaks the data that triggered a block.
pub fn payload_digest(payload: &str) -> String {
    format!("{:x}", Sha256::digest(payload.as_bytes()))
}

/// One governance decision, evidenced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Unique record id.
    pub record_id: Uuid,

    /// Record schema version, for forward compatibility.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    /// When the event was processed.
    pub timestamp: DateTime<Utc>,

    /// Host session the event belonged to.
    pub session_id: String,

    /// Kind of lifecycle event.
    pub event_kind: EventKind,

    /// The verdict rendered.
    pub outcome: Outcome,

    /// Risk tier assigned by the classifier.
    pub risk_tier: RiskTier,

    /// Rule ids that fired (scanner and classifier combined).
    #[serde(default)]
    pub triggered_rules: Vec<String>,

    /// SHA-256 hex digest of the original payload. Never the payload itself.
    pub payload_digest: String,

    /// Redacted payload snippet (bounded length, PII replaced).
    #[serde(default)]
    pub redacted_payload: String,

    /// Human-readable reason for the verdict. References rule categories,
    /// never matched content.
    #[serde(default)]
    pub reason: String,

    /// Agent/model version reported by the host environment, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_version: Option<String>,
}

impl AuditRecord {
    /// Start building a record for one event.
    pub fn builder(
        session_id: impl Into<String>,
        event_kind: EventKind,
        outcome: Outcome,
    ) -> AuditRecordBuilder {
        AuditRecordBuilder::new(session_id, event_kind, outcome)
    }
}

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Builder for [`AuditRecord`].
#[derive(Debug)]
pub struct AuditRecordBuilder {
    record: AuditRecord,
}

impl AuditRecordBuilder {
    /// Create a builder with the required fields; everything else defaults.
    pub fn new(session_id: impl Into<String>, event_kind: EventKind, outcome: Outcome) -> Self {
        Self {
            record: AuditRecord {
                record_id: Uuid::new_v4(),
                schema_version: default_schema_version(),
                timestamp: Utc::now(),
                session_id: session_id.into(),
                event_kind,
                outcome,
                risk_tier: RiskTier::Low,
                triggered_rules: Vec::new(),
                payload_digest: String::new(),
                redacted_payload: String::new(),
                reason: String::new(),
                agent_version: None,
            },
        }
    }

    /// Set the risk tier.
    pub fn risk_tier(mut self, tier: RiskTier) -> Self {
        self.record.risk_tier = tier;
        self
    }

    /// Set the fired rule ids.
    pub fn triggered_rules(mut self, rules: Vec<String>) -> Self {
        self.record.triggered_rules = rules;
        self
    }

    /// Digest the original payload into the record.
    pub fn payload(mut self, payload: &str) -> Self {
        self.record.payload_digest = payload_digest(payload);
        self
    }

    /// Set the redacted payload snippet, truncated to `max_len` bytes on a
    /// character boundary.
    pub fn redacted_payload(mut self, redacted: &str, max_len: usize) -> Self {
        self.record.redacted_payload = truncate_at_boundary(redacted, max_len);
        self
    }

    /// Set the verdict reason.
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.record.reason = reason.into();
        self
    }

    /// Set the agent version, when the host reported one.
    pub fn agent_version(mut self, version: Option<String>) -> Self {
        self.record.agent_version = version;
        self
    }

    /// Build the record.
    pub fn build(self) -> AuditRecord {
        self.record
    }
}

fn truncate_at_boundary(text: &str, max_len: usize) -> String {
    if text.len() <= max_len {
        return text.to_string();
    }
    let mut end = max_len;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_and_hex() {
        let a = payload_digest("My SSN is 123-45-6789");
        let b = payload_digest("My SSN is 123-45-6789");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(!a.contains("123-45-6789"));
    }

    #[test]
    fn record_serializes_one_json_object() {
        let record = AuditRecord::builder("sess-1", EventKind::PromptSubmitted, Outcome::Block)
            .risk_tier(RiskTier::High)
            .triggered_rules(vec!["pii.ssn".into()])
            .payload("My SSN is 123-45-6789")
            .redacted_payload("My SSN is [REDACTED:ssn]", 200)
            .reason("PII detected: ssn")
            .build();

        let line = serde_json::to_string(&record).unwrap();
        assert!(!line.contains('\n'));
        assert!(line.contains("\"event_kind\":\"prompt_submitted\""));
        assert!(line.contains("\"outcome\":\"block\""));
        assert!(!line.contains("123-45-6789"));
    }

    #[test]
    fn reader_tolerates_unknown_fields() {
        let line = r#"{
            "record_id": "6ff90b42-6a5c-4c07-9d6c-2f3a2f9d2f11",
            "timestamp": "2026-01-01T00:00:00Z",
            "session_id": "s",
            "event_kind": "tool_use_proposed",
            "outcome": "allow",
            "risk_tier": "low",
            "payload_digest": "00",
            "some_future_field": {"nested": true}
        }"#;
        let record: AuditRecord = serde_json::from_str(line).unwrap();
        assert_eq!(record.outcome, Outcome::Allow);
        assert_eq!(record.schema_version, SCHEMA_VERSION);
        assert!(record.triggered_rules.is_empty());
    }

    #[test]
    fn snippet_truncates_on_char_boundary() {
        let record = AuditRecord::builder("s", EventKind::ToolResultReported, Outcome::Allow)
            .redacted_payload("héllo wörld", 7)
            .build();
        assert!(record.redacted_payload.len() <= 7);
        assert!(record.redacted_payload.starts_with("héllo"));
    }
}
