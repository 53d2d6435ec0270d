//! # warden-engine
//!
//! The decision engine and event dispatcher of the Warden governance
//! layer.
//!
//! [`decide`] turns a scanned, classified event plus policy configuration
//! into a deterministic allow/block [`warden_core::Verdict`]. The
//! [`Dispatcher`] wraps the whole pipeline: it translates host hook
//! payloads into events, runs scanner, classifier, and decision engine,
//! appends exactly one audit record per event, and converts the verdict
//! into the host's exit-code protocol. Every internal failure fails
//! closed to Block.

pub mod decision;
pub mod dispatcher;
pub mod error;

pub use decision::decide;
pub use dispatcher::{parse_host_event, Dispatcher, HookResponse};
pub use error::{PipelineError, Stage};
