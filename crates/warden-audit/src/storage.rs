//! Audit storage backends.

use crate::error::AuditError;
use crate::record::AuditRecord;
use async_trait::async_trait;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;

/// Trait for audit storage backends.
///
/// `store` must be durable before it returns `Ok`: the decision engine's
/// contract requires the record to exist before the verdict is delivered.
#[async_trait]
pub trait AuditStorage: Send + Sync {
    /// Persist one record.
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Append-only JSON-lines file storage.
///
/// The file handle lives behind a mutex so concurrent pipeline invocations
/// never interleave partial lines; each append is flushed and synced before
/// success is reported.
pub struct FileStorage {
    path: PathBuf,
    file: Mutex<File>,
}

impl FileStorage {
    /// Open (creating if needed) the log file in append mode.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Path of the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditStorage for FileStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let line = serde_json::to_string(record)?;

        let mut file = self.file.lock().await;
        writeln!(file, "{line}")?;
        file.flush()?;
        file.sync_data()?;
        Ok(())
    }
}

/// Console storage: one JSON line per record on stdout.
#[derive(Debug, Default)]
pub struct ConsoleStorage;

impl ConsoleStorage {
    /// Create a console storage.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for ConsoleStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let line = serde_json::to_string(record)?;
        println!("{line}");
        Ok(())
    }
}

/// File storage with a console mirror.
pub struct DualStorage {
    file: FileStorage,
    console: ConsoleStorage,
}

impl DualStorage {
    /// Create a dual storage writing to `path` and stdout.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        Ok(Self {
            file: FileStorage::new(path)?,
            console: ConsoleStorage::new(),
        })
    }
}

#[async_trait]
impl AuditStorage for DualStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        // The file copy is the durable one; it must succeed first.
        self.file.store(record).await?;
        self.console.store(record).await
    }
}

/// In-memory storage for tests and embedded introspection.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    records: RwLock<Vec<AuditRecord>>,
}

impl MemoryStorage {
    /// Create an empty in-memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored records.
    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().map(|records| records.len()).unwrap_or(0)
    }

    /// Whether nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AuditStorage for MemoryStorage {
    async fn store(&self, record: &AuditRecord) -> Result<(), AuditError> {
        let mut records = self
            .records
            .write()
            .map_err(|e| AuditError::Storage(format!("lock poisoned: {e}")))?;
        records.push(record.clone());
        Ok(())
    }
}

/// Storage that drops every record. For explicitly disabled audit only.
#[derive(Debug, Default)]
pub struct NullStorage;

impl NullStorage {
    /// Create a null storage.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditStorage for NullStorage {
    async fn store(&self, _record: &AuditRecord) -> Result<(), AuditError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{EventKind, Outcome};

    fn record(session: &str) -> AuditRecord {
        AuditRecord::builder(session, EventKind::PromptSubmitted, Outcome::Allow)
            .payload("hello")
            .build()
    }

    #[tokio::test]
    async fn file_storage_appends_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let storage = FileStorage::new(&path).unwrap();

        storage.store(&record("s1")).await.unwrap();
        storage.store(&record("s2")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let parsed: AuditRecord = serde_json::from_str(line).unwrap();
            assert_eq!(parsed.event_kind, EventKind::PromptSubmitted);
        }
    }

    #[tokio::test]
    async fn file_storage_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/audit.log");
        let storage = FileStorage::new(&path).unwrap();
        storage.store(&record("s")).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.log");
        let storage = std::sync::Arc::new(FileStorage::new(&path).unwrap());

        let mut handles = Vec::new();
        for i in 0..16 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                storage.store(&record(&format!("s{i}"))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let mut sessions = Vec::new();
        for line in content.lines() {
            let parsed: AuditRecord = serde_json::from_str(line).unwrap();
            sessions.push(parsed.session_id);
        }
        sessions.sort();
        let expected: Vec<_> = (0..16).map(|i| format!("s{i}")).collect();
        let mut expected = expected;
        expected.sort();
        assert_eq!(sessions, expected);
    }

    #[tokio::test]
    async fn memory_storage_accumulates() {
        let storage = MemoryStorage::new();
        assert!(storage.is_empty());
        storage.store(&record("a")).await.unwrap();
        storage.store(&record("b")).await.unwrap();
        assert_eq!(storage.len(), 2);
        assert_eq!(storage.records()[0].session_id, "a");
    }
}
