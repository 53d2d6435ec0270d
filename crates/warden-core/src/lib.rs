//! Core types shared across all Warden crates.
//!
//! Warden sits between an end user and an autonomous coding agent. Every
//! prompt the user submits and every tool call the agent proposes becomes an
//! [`Event`]; the pipeline turns each event into an allow/block verdict and
//! exactly one audit record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod config;

pub use config::{
    AuditConfig, ConfigError, LimitsConfig, PolicyConfig, RulesConfig, WardenConfig,
};

/// Lifecycle events received from the host agent runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A new agent session began.
    SessionStarted,
    /// The user submitted a prompt.
    PromptSubmitted,
    /// The agent proposed a tool invocation (pre-execution).
    ToolUseProposed,
    /// The host reported the output of an executed tool (post-execution).
    ToolResultReported,
}

impl EventKind {
    /// Whether a Block verdict for this kind can actually stop anything.
    ///
    /// Session starts and already-executed tool results are informational;
    /// they are audited but never blocked.
    pub fn is_governed(self) -> bool {
        matches!(self, Self::PromptSubmitted | Self::ToolUseProposed)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SessionStarted => write!(f, "SESSION_STARTED"),
            Self::PromptSubmitted => write!(f, "PROMPT_SUBMITTED"),
            Self::ToolUseProposed => write!(f, "TOOL_USE_PROPOSED"),
            Self::ToolResultReported => write!(f, "TOOL_RESULT_REPORTED"),
        }
    }
}

/// A proposed tool invocation: command name plus arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool or command name (e.g. "Bash", "curl").
    pub command: String,

    /// Positional arguments as the host reported them.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCall {
    /// Create a tool call from a command and its arguments.
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }

    /// Render the call as a single command line for rule matching.
    pub fn render(&self) -> String {
        if self.args.is_empty() {
            return self.command.clone();
        }
        let mut line = self.command.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// The payload of an event: free text or a structured tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", untagged)]
pub enum Payload {
    /// Free text (prompt, tool output, or empty for session starts).
    Text(String),
    /// A structured tool invocation.
    Tool(ToolCall),
}

impl Payload {
    /// The text the scanner and classifier run their patterns over.
    pub fn matchable_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Text(text) => std::borrow::Cow::Borrowed(text),
            Self::Tool(call) => std::borrow::Cow::Owned(call.render()),
        }
    }

    /// Whether there is anything to match at all.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Tool(call) => call.command.is_empty(),
        }
    }
}

/// One occurrence requiring a governance decision.
///
/// Immutable once constructed; discarded after processing. Only the audit
/// record it produces survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// What kind of lifecycle event this is.
    pub kind: EventKind,

    /// Host session this event belongs to.
    pub session_id: String,

    /// When the dispatcher received the event.
    pub occurred_at: DateTime<Utc>,

    /// Raw payload as received from the host.
    pub payload: Payload,
}

impl Event {
    /// Build an event stamped with the current time.
    pub fn new(kind: EventKind, session_id: impl Into<String>, payload: Payload) -> Self {
        Self {
            kind,
            session_id: session_id.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    /// A session-start marker event.
    pub fn session_started(session_id: impl Into<String>) -> Self {
        Self::new(
            EventKind::SessionStarted,
            session_id,
            Payload::Text(String::new()),
        )
    }

    /// A user prompt submission.
    pub fn prompt(session_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(
            EventKind::PromptSubmitted,
            session_id,
            Payload::Text(text.into()),
        )
    }

    /// A proposed tool invocation.
    pub fn tool_use(session_id: impl Into<String>, call: ToolCall) -> Self {
        Self::new(EventKind::ToolUseProposed, session_id, Payload::Tool(call))
    }

    /// The reported output of an executed tool.
    pub fn tool_result(session_id: impl Into<String>, output: impl Into<String>) -> Self {
        Self::new(
            EventKind::ToolResultReported,
            session_id,
            Payload::Text(output.into()),
        )
    }
}

/// Ordinal risk classification of an event.
///
/// Also used as the severity weight on individual rules: the tier of an
/// event is the highest severity among the rules that fired.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// No risk rules fired.
    #[default]
    Low,
    /// At least one medium-severity rule fired.
    Medium,
    /// At least one high-severity rule fired.
    High,
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// The binary decision rendered for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// The event may proceed.
    Allow,
    /// The event must not proceed.
    Block,
}

impl Outcome {
    /// Whether this outcome blocks the event.
    pub fn is_block(self) -> bool {
        matches!(self, Self::Block)
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Allow => write!(f, "allow"),
            Self::Block => write!(f, "block"),
        }
    }
}

/// The allow/block decision rendered for one event.
///
/// The reason references rule categories and ids, never the matched text
/// itself, so surfacing a verdict cannot re-leak the data that triggered it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the event may proceed.
    pub outcome: Outcome,

    /// Human-readable explanation referencing the triggered rules.
    pub reason: String,

    /// Redacted payload to carry forward in place of the original, when
    /// auto-redaction applies to an allowed event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redacted_payload: Option<String>,
}

impl Verdict {
    /// An allowing verdict.
    pub fn allow(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: reason.into(),
            redacted_payload: None,
        }
    }

    /// A blocking verdict.
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Block,
            reason: reason.into(),
            redacted_payload: None,
        }
    }

    /// Attach the redacted payload that replaces the original downstream.
    pub fn with_redacted_payload(mut self, redacted: impl Into<String>) -> Self {
        self.redacted_payload = Some(redacted.into());
        self
    }

    /// Whether the event was blocked.
    pub fn is_block(&self) -> bool {
        self.outcome.is_block()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_render_joins_command_and_args() {
        let call = ToolCall::new("curl", vec!["-d".into(), "@secrets.txt".into()]);
        assert_eq!(call.render(), "curl -d @secrets.txt");

        let bare = ToolCall::new("ls", vec![]);
        assert_eq!(bare.render(), "ls");
    }

    #[test]
    fn tier_ordering_follows_severity() {
        assert!(RiskTier::High > RiskTier::Medium);
        assert!(RiskTier::Medium > RiskTier::Low);
        assert_eq!(RiskTier::default(), RiskTier::Low);
    }

    #[test]
    fn governed_kinds() {
        assert!(EventKind::PromptSubmitted.is_governed());
        assert!(EventKind::ToolUseProposed.is_governed());
        assert!(!EventKind::SessionStarted.is_governed());
        assert!(!EventKind::ToolResultReported.is_governed());
    }

    #[test]
    fn event_kind_serializes_snake_case() {
        let json = serde_json::to_string(&EventKind::ToolUseProposed).unwrap();
        assert_eq!(json, "\"tool_use_proposed\"");
    }

    #[test]
    fn verdict_omits_absent_redaction() {
        let verdict = Verdict::block("PII detected: ssn");
        let json = serde_json::to_string(&verdict).unwrap();
        assert!(!json.contains("redacted_payload"));

        let carried = Verdict::allow("ok").with_redacted_payload("x [REDACTED:email]");
        assert_eq!(
            carried.redacted_payload.as_deref(),
            Some("x [REDACTED:email]")
        );
    }

    #[test]
    fn payload_matchable_text() {
        let text = Payload::Text("hello".into());
        assert_eq!(text.matchable_text(), "hello");

        let tool = Payload::Tool(ToolCall::new("rm", vec!["-rf".into(), "/".into()]));
        assert_eq!(tool.matchable_text(), "rm -rf /");
    }
}
