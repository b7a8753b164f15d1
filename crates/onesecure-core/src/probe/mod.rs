//! Probe System
//!
//! Runs external DNS/SMTP check programs as isolated child processes and
//! classifies their outcomes.

mod executor;
mod types;

pub use executor::{ProbeExecutor, ProcessProbe};
pub use types::{Probe, ProbeError, ProbeErrorKind, ProbeOutcome, ProbeResult};
