//! # warden-audit
//!
//! Append-only audit logging for Warden governance decisions.
//!
//! Every event the decision engine sees produces exactly one
//! [`AuditRecord`], written as one JSON object per line before the verdict
//! is returned to the host (write-before-respond). Records never contain
//! raw sensitive payloads: the original payload is stored as a SHA-256
//! digest, and the human-readable copy is the redacted one.
//!
//! The file backend serializes appends so concurrent writers never
//! interleave partial lines, and flushes before reporting success. Callers
//! that cannot get a success out of [`AuditLogger::append`] must fail
//! closed: an unaudited action is never allowed through.

pub mod error;
pub mod logger;
pub mod record;
pub mod status;
pub mod storage;

pub use error::AuditError;
pub use logger::AuditLogger;
pub use record::{payload_digest, AuditRecord, AuditRecordBuilder};
pub use status::{read_last_record_time, StatusReport};
pub use storage::{AuditStorage, ConsoleStorage, DualStorage, FileStorage, MemoryStorage, NullStorage};
