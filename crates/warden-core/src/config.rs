//! Configuration surface for the Warden governance layer.
//!
//! Configuration is loaded from a single YAML file (`warden.yaml`). Every
//! section and every field has a documented default, so an absent file yields
//! a usable, safe configuration (block on PII, warn-don't-block on medium
//! risk, audit to `.warden/audit.log`).

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Error type for configuration and rule loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid rule '{id}': {reason}")]
    InvalidRule { id: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl ConfigError {
    /// Create an invalid-rule error.
    pub fn invalid_rule(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRule {
            id: id.into(),
            reason: reason.into(),
        }
    }
}

/// Complete Warden configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// Allow/block policy knobs.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Rule set source.
    #[serde(default)]
    pub rules: RulesConfig,

    /// Audit logging.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Per-event processing limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl WardenConfig {
    /// Load configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load from an optional path, falling back to defaults.
    ///
    /// A named path that does not exist is an error (a misconfigured hook
    /// must not silently run with defaults); `None` means "no file, use
    /// defaults", which is the normal un-configured install.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::default()),
        }
    }
}

/// Allow/block policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Block prompt submissions that contain PII.
    #[serde(default = "default_true")]
    pub block_on_pii: bool,

    /// When PII is present but policy allows continuing, carry the redacted
    /// payload forward instead of the original.
    #[serde(default = "default_true")]
    pub auto_redact: bool,

    /// Promote medium-risk tool use from warn to block.
    #[serde(default)]
    pub strict_mode: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            block_on_pii: true,
            auto_redact: true,
            strict_mode: false,
        }
    }
}

/// Rule set source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    /// Path to a YAML rule file. Unset means the built-in rule set.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Audit logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether audit logging is enabled. Disabling drops records on the
    /// floor; it is an explicit operator opt-out, distinct from a write
    /// failure (which fails the event closed).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Directory holding the append-only audit log.
    #[serde(default = "default_audit_directory")]
    pub directory: PathBuf,

    /// Mirror records to stdout in addition to the file.
    #[serde(default)]
    pub stdout: bool,

    /// Maximum length of the redacted payload snippet stored per record.
    #[serde(default = "default_snippet_len")]
    pub max_snippet_len: usize,
}

impl AuditConfig {
    /// Resolve the audit log file path.
    pub fn log_path(&self) -> PathBuf {
        self.directory.join("audit.log")
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_audit_directory(),
            stdout: false,
            max_snippet_len: default_snippet_len(),
        }
    }
}

/// Per-event processing limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Payloads longer than this are truncated for pattern matching (the
    /// digest still covers the whole payload).
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// Wall-clock budget for one event, in milliseconds. Exceeding it fails
    /// closed.
    #[serde(default = "default_event_budget_ms")]
    pub event_budget_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: default_max_payload_bytes(),
            event_budget_ms: default_event_budget_ms(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_audit_directory() -> PathBuf {
    PathBuf::from(".warden")
}

fn default_snippet_len() -> usize {
    200
}

fn default_max_payload_bytes() -> usize {
    1024 * 1024
}

fn default_event_budget_ms() -> u64 {
    2000
}
