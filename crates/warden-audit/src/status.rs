//! Liveness surface for external health-check scripts.
//!
//! The wrapper scripts that babysit the agent need two facts: did the rule
//! store load, and when was the last audit record written. Both are answered
//! here without re-implementing any governance logic.

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Status report printed by `warden status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether the configured rule source loaded and validated.
    pub rules_ok: bool,

    /// Number of rules in the loaded set (0 when `rules_ok` is false).
    pub rule_count: usize,

    /// Load error message, when `rules_ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules_error: Option<String>,

    /// Path of the audit log.
    pub audit_log: PathBuf,

    /// Timestamp of the last record in the audit log, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_record_at: Option<DateTime<Utc>>,
}

/// The minimal slice of a record the status surface needs. Parsing through
/// this struct keeps the reader forward-compatible: every unknown field is
/// ignored.
#[derive(Debug, Deserialize)]
struct RecordHead {
    timestamp: DateTime<Utc>,
}

/// Timestamp of the last record in the audit log.
///
/// A missing log file is not an error (no event has been processed yet);
/// an unreadable or unparseable final line is.
pub fn read_last_record_time(path: impl AsRef<Path>) -> Result<Option<DateTime<Utc>>, AuditError> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(None);
    }

    let reader = BufReader::new(File::open(path)?);
    let mut last = None;
    for line in reader.lines() {
        let line = line?;
        if !line.trim().is_empty() {
            last = Some(line);
        }
    }

    match last {
        None => Ok(None),
        Some(line) => {
            let head: RecordHead = serde_json::from_str(&line)?;
            Ok(Some(head.timestamp))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::AuditRecord;
    use crate::storage::{AuditStorage, FileStorage};
    use warden_core::{EventKind, Outcome};

    #[tokio::test]
    async fn last_record_time_tracks_the_final_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let storage = FileStorage::new(&path).unwrap();

        let first = AuditRecord::builder("a", EventKind::SessionStarted, Outcome::Allow).build();
        let second = AuditRecord::builder("a", EventKind::PromptSubmitted, Outcome::Allow).build();
        storage.store(&first).await.unwrap();
        storage.store(&second).await.unwrap();

        let last = read_last_record_time(&path).unwrap().unwrap();
        assert_eq!(last, second.timestamp);
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let last = read_last_record_time(dir.path().join("absent.log")).unwrap();
        assert!(last.is_none());
    }

    #[test]
    fn unknown_fields_in_records_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        std::fs::write(
            &path,
            "{\"timestamp\":\"2026-02-03T04:05:06Z\",\"new_field\":[1,2,3]}\n",
        )
        .unwrap();
        let last = read_last_record_time(&path).unwrap().unwrap();
        assert_eq!(last.to_rfc3339(), "2026-02-03T04:05:06+00:00");
    }
}
