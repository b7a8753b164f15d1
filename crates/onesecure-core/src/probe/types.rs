//! Probe Types
//!
//! Core types for the probe system.

use async_trait::async_trait;
use onesecure_common::types::{CheckName, Domain};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Probe error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("Probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("Probe failed: {detail}")]
    ProbeFailed {
        exit_code: Option<i32>,
        detail: String,
    },
    #[error("Probe produced malformed output: {reason}")]
    MalformedOutput { reason: String, snippet: String },
    #[error("Unified runner unavailable: {0}")]
    AdapterUnavailable(String),
}

impl ProbeError {
    /// Get the error classification
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            ProbeError::Timeout(_) => ProbeErrorKind::Timeout,
            ProbeError::ProbeFailed { .. } => ProbeErrorKind::ProbeFailed,
            ProbeError::MalformedOutput { .. } => ProbeErrorKind::MalformedOutput,
            ProbeError::AdapterUnavailable(_) => ProbeErrorKind::AdapterUnavailable,
        }
    }
}

/// Probe result type
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Error classification carried into findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeErrorKind {
    Timeout,
    ProbeFailed,
    MalformedOutput,
    AdapterUnavailable,
}

/// Result of one probe invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub check: CheckName,
    pub result: ProbeResult<Map<String, Value>>,
    pub duration_ms: u64,
}

impl ProbeOutcome {
    /// Outcome for a probe that never produced a result
    pub fn failed(check: CheckName, error: ProbeError) -> Self {
        Self {
            check,
            result: Err(error),
            duration_ms: 0,
        }
    }
}

/// A single security check run against a domain
#[async_trait]
pub trait Probe: Send + Sync {
    /// The check this probe produces findings for
    fn check(&self) -> CheckName;

    /// Run the probe; failures are reported in the outcome, never raised
    async fn run(&self, domain: &Domain, timeout: Duration) -> ProbeOutcome;
}
