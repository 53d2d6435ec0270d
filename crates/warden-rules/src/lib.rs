//! Rule store, PII scanning, and risk classification.
//!
//! Rules are data, not code: a rule set is a tagged list of declarative
//! (pattern, category, severity) triples loaded from YAML and validated at
//! startup. A malformed rule set fails fast at load time rather than
//! silently matching nothing. Once loaded, a [`RuleSet`] is immutable and
//! safe to share across concurrent pipeline invocations without locking.
//!
//! Patterns are compiled with the `regex` crate, whose matching is linear in
//! the input, so scanning completes in bounded time regardless of what the
//! rule file contains.

mod classifier;
mod scanner;
mod store;

pub use classifier::{Classifier, RiskScore};
pub use scanner::{PiiMatch, ScanResult, Scanner};
pub use store::{builtin_rules, Rule, RuleScope, RuleSet, RuleSpec};
