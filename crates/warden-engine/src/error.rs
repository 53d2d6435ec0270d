//! Error types for the pipeline.

use thiserror::Error;
use warden_audit::AuditError;

/// Pipeline stages, in processing order.
///
/// Every event walks Received → Scanned → Classified → Decided → Logged →
/// Responded; no stage may be skipped. Failures carry the stage they
/// occurred in so the diagnostic channel can say where an event died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Scanned,
    Classified,
    Decided,
    Logged,
    Responded,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Received => write!(f, "received"),
            Self::Scanned => write!(f, "scanned"),
            Self::Classified => write!(f, "classified"),
            Self::Decided => write!(f, "decided"),
            Self::Logged => write!(f, "logged"),
            Self::Responded => write!(f, "responded"),
        }
    }
}

/// A stage failure inside the pipeline.
///
/// None of these variants ever resolve to a silent allow: the dispatcher
/// turns every one of them into a Block verdict that is still logged and
/// responded.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The host sent an event the dispatcher could not translate.
    #[error("malformed host event: {0}")]
    MalformedEvent(String),

    /// The per-event wall-clock budget was exceeded.
    #[error("event exceeded {budget_ms} ms processing budget at stage {stage}")]
    Timeout { stage: Stage, budget_ms: u64 },

    /// The audit trail could not be written.
    #[error("audit append failed: {0}")]
    Audit(#[from] AuditError),
}
