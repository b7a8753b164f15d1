//! Findings Map
//!
//! Per-assessment collection of one result per security check.

use crate::probe::{ProbeErrorKind, ProbeOutcome};
use onesecure_common::types::{CheckName, CheckStatus};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Error marker recorded in place of a check's payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFinding {
    pub error: String,
    #[serde(default = "fail_status")]
    pub status: CheckStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ProbeErrorKind>,
}

fn fail_status() -> CheckStatus {
    CheckStatus::Fail
}

impl ErrorFinding {
    pub fn new(error: impl Into<String>, kind: Option<ProbeErrorKind>) -> Self {
        Self {
            error: error.into(),
            status: CheckStatus::Fail,
            kind,
        }
    }
}

/// Result of one check: its probe payload or an error marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Finding {
    Error(ErrorFinding),
    Payload(Map<String, Value>),
}

impl Finding {
    /// Classify a probe document; one carrying an `error` message is an error marker
    pub fn from_document(document: Map<String, Value>) -> Self {
        match document.get("error") {
            Some(Value::String(message)) => Finding::Error(ErrorFinding::new(message.clone(), None)),
            _ => Finding::Payload(document),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Finding::Error(_))
    }

    pub fn payload(&self) -> Option<&Map<String, Value>> {
        match self {
            Finding::Payload(payload) => Some(payload),
            Finding::Error(_) => None,
        }
    }
}

impl From<ProbeOutcome> for Finding {
    fn from(outcome: ProbeOutcome) -> Self {
        match outcome.result {
            Ok(document) => Finding::from_document(document),
            Err(e) => Finding::Error(ErrorFinding::new(e.to_string(), Some(e.kind()))),
        }
    }
}

/// Mapping from check name to its finding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingsMap(BTreeMap<CheckName, Finding>);

impl FindingsMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a finding, replacing any previous one for the check
    pub fn insert(&mut self, check: CheckName, finding: Finding) {
        self.0.insert(check, finding);
    }

    /// Fold a probe outcome into the map under its check name
    pub fn record(&mut self, outcome: ProbeOutcome) {
        let check = outcome.check;
        self.insert(check, Finding::from(outcome));
    }

    pub fn get(&self, check: CheckName) -> Option<&Finding> {
        self.0.get(&check)
    }

    pub fn contains(&self, check: CheckName) -> bool {
        self.0.contains_key(&check)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every known check has an entry
    pub fn is_complete(&self) -> bool {
        CheckName::ALL.iter().all(|check| self.contains(*check))
    }

    pub fn error_count(&self) -> usize {
        self.0.values().filter(|f| f.is_error()).count()
    }

    /// Iterate in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = (CheckName, &Finding)> {
        self.0.iter().map(|(check, finding)| (*check, finding))
    }
}

impl FromIterator<(CheckName, Finding)> for FindingsMap {
    fn from_iter<I: IntoIterator<Item = (CheckName, Finding)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
