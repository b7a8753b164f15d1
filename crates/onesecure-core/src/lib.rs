//! OneSecure Core - Email security assessment engine
//!
//! This crate runs the DMARC, SPF, DKIM and mail-server probes against a
//! domain, folds their results into a findings map, and scores them into a
//! security evaluation with recommendations.

pub mod assessment;
pub mod evaluation;
pub mod findings;
pub mod orchestrator;
pub mod probe;
pub mod store;
pub mod unified;
pub mod verification;

#[cfg(test)]
pub(crate) mod testing;

pub use assessment::{AssessmentReport, Assessor, FindingsSource};
pub use evaluation::{evaluate, SecurityEvaluation};
pub use findings::{ErrorFinding, Finding, FindingsMap};
pub use orchestrator::{ProbeRun, ProbeSet};
pub use probe::{Probe, ProbeError, ProbeErrorKind, ProbeExecutor, ProbeOutcome, ProcessProbe};
pub use store::{InMemoryResultStore, ResultStore};
pub use unified::{UnifiedOutcome, UnifiedRunner};
pub use verification::{DomainVerdict, DomainVerifier, VerificationSummary};
