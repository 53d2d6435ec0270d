//! Declarative rule store.
//!
//! A rule file looks like:
//!
//! ```yaml
//! rules:
//!   - id: pii.email
//!     applies_to: pii
//!     category: email
//!     severity: medium
//!     pattern: '[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}'
//!   - id: tool.rm_recursive_root
//!     applies_to: tool
//!     category: destructive_fs
//!     severity: high
//!     pattern: '\brm\s+-\S*(?:rf|fr)\S*\s+/'
//! ```
//!
//! Loading compiles every pattern and rejects the whole file on the first
//! defect, so a process never serves events with a partially valid rule set.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use warden_core::{ConfigError, RiskTier, RulesConfig};

/// Which part of the pipeline a rule belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleScope {
    /// PII detection and redaction (scanner).
    Pii,
    /// Free-text risk keywords, matched on prompts and tool output.
    Prompt,
    /// Dangerous-action patterns, matched on rendered tool calls.
    Tool,
}

/// The serialized form of a rule, as written in the rule file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    /// Unique rule identifier (referenced in verdicts and audit records).
    pub id: String,

    /// Which matcher this rule feeds.
    pub applies_to: RuleScope,

    /// Category placeholder used in redaction and reasons (e.g. "email").
    pub category: String,

    /// Severity weight; the highest severity among fired rules becomes the
    /// event's risk tier.
    #[serde(default)]
    pub severity: RiskTier,

    /// Regex source.
    pub pattern: String,
}

/// A compiled, validated rule.
#[derive(Debug, Clone)]
pub struct Rule {
    pub id: String,
    pub applies_to: RuleScope,
    pub category: String,
    pub severity: RiskTier,
    pattern: Regex,
}

impl Rule {
    /// Whether the rule fires anywhere in `text`.
    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// Iterate over all match spans in `text`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> regex::Matches<'r, 't> {
        self.pattern.find_iter(text)
    }
}

/// On-disk shape of a rule file.
#[derive(Debug, Deserialize)]
struct RuleFile {
    rules: Vec<RuleSpec>,
}

/// An immutable, validated set of rules, partitioned by scope.
///
/// Read-only after construction; concurrent readers never block each other.
#[derive(Debug)]
pub struct RuleSet {
    pii: Vec<Rule>,
    prompt: Vec<Rule>,
    tool: Vec<Rule>,
}

impl RuleSet {
    /// Load and validate a rule file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse and validate rules from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: RuleFile = serde_yaml::from_str(content)?;
        Self::from_specs(file.rules)
    }

    /// The built-in rule set used when no rule file is configured.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_specs(builtin_rules())
    }

    /// Resolve the configured rule source: a file path, or the built-ins.
    pub fn resolve(config: &RulesConfig) -> Result<Self, ConfigError> {
        match &config.path {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading rule file");
                Self::load(path)
            }
            None => Self::builtin(),
        }
    }

    /// Compile and validate a list of rule specs.
    ///
    /// Fails on the first empty or duplicate id, empty category, or pattern
    /// that does not compile.
    pub fn from_specs(specs: Vec<RuleSpec>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut pii = Vec::new();
        let mut prompt = Vec::new();
        let mut tool = Vec::new();

        if specs.is_empty() {
            return Err(ConfigError::Config(
                "rule set is empty; refusing to govern with no rules".to_string(),
            ));
        }

        for spec in specs {
            if spec.id.trim().is_empty() {
                return Err(ConfigError::invalid_rule("<unnamed>", "empty id"));
            }
            if !seen.insert(spec.id.clone()) {
                return Err(ConfigError::invalid_rule(&spec.id, "duplicate id"));
            }
            if spec.category.trim().is_empty() {
                return Err(ConfigError::invalid_rule(&spec.id, "empty category"));
            }

            let pattern = Regex::new(&spec.pattern).map_err(|e| {
                ConfigError::invalid_rule(&spec.id, format!("pattern does not compile: {e}"))
            })?;

            let rule = Rule {
                id: spec.id,
                applies_to: spec.applies_to,
                category: spec.category,
                severity: spec.severity,
                pattern,
            };

            match rule.applies_to {
                RuleScope::Pii => pii.push(rule),
                RuleScope::Prompt => prompt.push(rule),
                RuleScope::Tool => tool.push(rule),
            }
        }

        Ok(Self { pii, prompt, tool })
    }

    /// PII rules, in declaration order.
    pub fn pii_rules(&self) -> &[Rule] {
        &self.pii
    }

    /// Prompt-risk rules, in declaration order.
    pub fn prompt_rules(&self) -> &[Rule] {
        &self.prompt
    }

    /// Dangerous-action rules, in declaration order.
    pub fn tool_rules(&self) -> &[Rule] {
        &self.tool
    }

    /// Total number of rules across all scopes.
    pub fn len(&self) -> usize {
        self.pii.len() + self.prompt.len() + self.tool.len()
    }

    /// Whether the set holds no rules at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The default rule set.
///
/// PII categories mirror the classifier this layer replaces (email, SSN,
/// phone, credit card, API keys); prompt-risk keywords cover regulated
/// use cases; tool rules cover destructive filesystem operations, privilege
/// escalation, remote-shell piping, and network exfiltration.
pub fn builtin_rules() -> Vec<RuleSpec> {
    fn spec(
        id: &str,
        applies_to: RuleScope,
        category: &str,
        severity: RiskTier,
        pattern: &str,
    ) -> RuleSpec {
        RuleSpec {
            id: id.to_string(),
            applies_to,
            category: category.to_string(),
            severity,
            pattern: pattern.to_string(),
        }
    }

    vec![
        // ===== PII =====
        spec(
            "pii.email",
            RuleScope::Pii,
            "email",
            RiskTier::Medium,
            r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}",
        ),
        spec(
            "pii.ssn",
            RuleScope::Pii,
            "ssn",
            RiskTier::High,
            r"\b\d{3}-\d{2}-\d{4}\b",
        ),
        spec(
            "pii.phone",
            RuleScope::Pii,
            "phone",
            RiskTier::Medium,
            r"\b\(?\d{3}\)?[-. ]\d{3}[-. ]\d{4}\b",
        ),
        spec(
            "pii.credit_card",
            RuleScope::Pii,
            "credit_card",
            RiskTier::High,
            r"\b\d{4}[- ]?\d{4}[- ]?\d{4}[- ]?\d{4}\b",
        ),
        spec(
            "pii.api_key",
            RuleScope::Pii,
            "api_key",
            RiskTier::High,
            r"(?i)(?:\bsk-[A-Za-z0-9]{16,}\b|api[_-]?key\s*[:=]\s*\S{8,})",
        ),
        // ===== Prompt risk =====
        spec(
            "risk.confidential",
            RuleScope::Prompt,
            "confidential_material",
            RiskTier::High,
            r"(?i)\bconfidential\b",
        ),
        spec(
            "risk.secret_material",
            RuleScope::Prompt,
            "confidential_material",
            RiskTier::High,
            r"(?i)\bsecret\b",
        ),
        spec(
            "risk.hr_decision",
            RuleScope::Prompt,
            "regulated_use",
            RiskTier::High,
            r"(?i)\bhr decision\b",
        ),
        spec(
            "risk.medical_diagnosis",
            RuleScope::Prompt,
            "regulated_use",
            RiskTier::High,
            r"(?i)\bmedical diagnosis\b",
        ),
        spec(
            "risk.financial_advice",
            RuleScope::Prompt,
            "regulated_use",
            RiskTier::High,
            r"(?i)\bfinancial advice\b",
        ),
        spec(
            "risk.credentials",
            RuleScope::Prompt,
            "credential_handling",
            RiskTier::Medium,
            r"(?i)\b(?:password|credential)s?\b",
        ),
        spec(
            "risk.production_data",
            RuleScope::Prompt,
            "production_access",
            RiskTier::Medium,
            r"(?i)\bproduction (?:data|database)\b",
        ),
        // ===== Dangerous tool actions =====
        spec(
            "tool.rm_recursive_root",
            RuleScope::Tool,
            "destructive_fs",
            RiskTier::High,
            r"\brm\s+-\S*(?:rf|fr)\S*\s+/",
        ),
        spec(
            "tool.device_overwrite",
            RuleScope::Tool,
            "destructive_fs",
            RiskTier::High,
            r"\bdd\s+.*\bof=/dev/",
        ),
        spec(
            "tool.mkfs",
            RuleScope::Tool,
            "destructive_fs",
            RiskTier::High,
            r"\bmkfs(?:\.\w+)?\s",
        ),
        spec(
            "tool.priv_escalation",
            RuleScope::Tool,
            "privilege_escalation",
            RiskTier::High,
            r"(?i)\bsudo\s+(?:su\b|-i\b|-s\b)",
        ),
        spec(
            "tool.remote_shell_pipe",
            RuleScope::Tool,
            "remote_execution",
            RiskTier::High,
            r"(?i)\b(?:curl|wget)\b[^|]*\|\s*(?:ba|z)?sh\b",
        ),
        spec(
            "tool.exfiltration",
            RuleScope::Tool,
            "network_exfiltration",
            RiskTier::High,
            r"(?i)\b(?:curl|wget)\b.*\s(?:-d|--data(?:-\w+)?|--upload-file|-T|-F)\b",
        ),
        spec(
            "tool.git_force_push",
            RuleScope::Tool,
            "history_rewrite",
            RiskTier::Medium,
            r"(?i)\bgit\s+push\b.*\s--force\b",
        ),
        spec(
            "tool.world_writable",
            RuleScope::Tool,
            "permission_loosening",
            RiskTier::Medium,
            r"\bchmod\s+(?:-R\s+)?0?777\b",
        ),
    ]
}
