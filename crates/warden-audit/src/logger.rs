//! Audit logger.
//!
//! Thin policy layer over a storage backend: picks the backend from
//! configuration, retries transient write failures a bounded number of
//! times, and tracks the last successful append for the status surface.

use crate::error::AuditError;
use crate::record::AuditRecord;
use crate::storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, NullStorage};
use chrono::{DateTime, Utc};
use std::sync::{Arc, RwLock};
use warden_core::AuditConfig;

/// Write attempts per record before giving up and letting the caller fail
/// closed.
const MAX_ATTEMPTS: u32 = 3;

/// The main audit logger.
pub struct AuditLogger {
    storage: Arc<dyn AuditStorage>,
    last_append: RwLock<Option<DateTime<Utc>>>,
}

impl AuditLogger {
    /// Create a logger from configuration.
    pub fn new(config: &AuditConfig) -> Result<Self, AuditError> {
        let storage: Arc<dyn AuditStorage> = if !config.enabled {
            Arc::new(NullStorage::new())
        } else if config.stdout {
            Arc::new(DualStorage::new(config.log_path())?)
        } else {
            Arc::new(FileStorage::new(config.log_path())?)
        };
        Ok(Self::with_storage(storage))
    }

    /// Create a logger over an explicit storage backend.
    pub fn with_storage(storage: Arc<dyn AuditStorage>) -> Self {
        Self {
            storage,
            last_append: RwLock::new(None),
        }
    }

    /// Create a console-only logger (development).
    pub fn console_only() -> Self {
        Self::with_storage(Arc::new(ConsoleStorage::new()))
    }

    /// Append one record, durably, before returning.
    ///
    /// Transient failures are retried up to a small bound; a persistent
    /// failure is returned to the caller, which must fail closed.
    pub async fn append(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut attempt = 1;
        loop {
            match self.storage.store(record).await {
                Ok(()) => {
                    if let Ok(mut last) = self.last_append.write() {
                        *last = Some(Utc::now());
                    }
                    return Ok(());
                }
                Err(err) if attempt < MAX_ATTEMPTS => {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        record_id = %record.record_id,
                        "audit append failed, retrying"
                    );
                    attempt += 1;
                }
                Err(err) => {
                    tracing::error!(
                        record_id = %record.record_id,
                        error = %err,
                        "audit append failed after {MAX_ATTEMPTS} attempts"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// When the last record was successfully appended, if any.
    pub fn last_append_at(&self) -> Option<DateTime<Utc>> {
        self.last_append.read().ok().and_then(|last| *last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use warden_core::{EventKind, Outcome};

    fn record() -> AuditRecord {
        AuditRecord::builder("sess", EventKind::ToolUseProposed, Outcome::Block)
            .payload("rm -rf /")
            .reason("dangerous command pattern matched")
            .build()
    }

    /// Fails the first `failures` stores, then succeeds.
    struct FlakyStorage {
        failures: u32,
        attempts: AtomicU32,
        inner: MemoryStorage,
    }

    #[async_trait]
    impl AuditStorage for FlakyStorage {
        async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            if attempt < self.failures {
                return Err(AuditError::Storage("simulated write failure".into()));
            }
            self.inner.store(record).await
        }
    }

    #[tokio::test]
    async fn append_updates_last_append() {
        let logger = AuditLogger::with_storage(Arc::new(MemoryStorage::new()));
        assert!(logger.last_append_at().is_none());
        logger.append(&record()).await.unwrap();
        assert!(logger.last_append_at().is_some());
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let storage = Arc::new(FlakyStorage {
            failures: 2,
            attempts: AtomicU32::new(0),
            inner: MemoryStorage::new(),
        });
        let logger = AuditLogger::with_storage(storage.clone());
        logger.append(&record()).await.unwrap();
        assert_eq!(storage.inner.len(), 1);
        assert_eq!(storage.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn persistent_failure_surfaces() {
        let storage = Arc::new(FlakyStorage {
            failures: u32::MAX,
            attempts: AtomicU32::new(0),
            inner: MemoryStorage::new(),
        });
        let logger = AuditLogger::with_storage(storage.clone());
        let err = logger.append(&record()).await.unwrap_err();
        assert!(matches!(err, AuditError::Storage(_)));
        assert!(logger.last_append_at().is_none());
    }

    #[tokio::test]
    async fn disabled_config_uses_null_storage() {
        let config = AuditConfig {
            enabled: false,
            ..Default::default()
        };
        let logger = AuditLogger::new(&config).unwrap();
        // No file I/O happens; append still succeeds.
        logger.append(&record()).await.unwrap();
    }
}
