//! Evaluation Engine
//!
//! Scores a findings map into a security evaluation. Evaluation is a pure
//! function of the findings: no I/O, no hidden state.

pub mod rules;

pub use rules::{classify, CheckVerdict};

use crate::findings::FindingsMap;
use onesecure_common::types::{CheckName, CheckStatus, OverallStatus, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Score penalty per warning
pub const WARNING_PENALTY: f64 = 5.0;

/// Score penalty per failed check
pub const CRITICAL_PENALTY: f64 = 20.0;

const URGENT_NOTE: &str =
    "URGENT: Email security is at high risk - address the issues below immediately";

const IMPROVEMENT_NOTE: &str =
    "Email security is reasonable but can be improved - review the recommendations below";

/// Normalized security evaluation of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvaluation {
    pub overall_status: OverallStatus,
    pub overall_score: u8,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub test_statuses: BTreeMap<CheckName, CheckStatus>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    /// Passed/total summary, e.g. "3/4"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<String>,
}

/// Evaluate a findings map
pub fn evaluate(findings: &FindingsMap) -> SecurityEvaluation {
    let mut test_statuses = BTreeMap::new();
    let mut recommendations = Vec::new();
    let mut total = 0u32;
    let mut passed = 0u32;
    let mut warnings = 0u32;
    let mut criticals = 0u32;

    for check in CheckName::ALL {
        let Some(finding) = findings.get(check) else {
            continue;
        };

        total += 1;
        let verdict = classify(check, finding);

        match verdict.status {
            CheckStatus::Pass => passed += 1,
            CheckStatus::Warning => warnings += 1,
            CheckStatus::Fail => criticals += 1,
        }

        recommendations.extend(verdict.recommendation);
        warnings += verdict.additional_warnings.len() as u32;
        recommendations.extend(verdict.additional_warnings);
        test_statuses.insert(check, verdict.status);
    }

    let overall_score = score(passed, total, warnings, criticals);

    let overall_status = if criticals > 0 {
        CheckStatus::Fail
    } else if warnings > 0 {
        CheckStatus::Warning
    } else {
        CheckStatus::Pass
    };

    let risk_level = RiskLevel::from_score(overall_score);

    match risk_level {
        RiskLevel::High => recommendations.insert(0, URGENT_NOTE.to_string()),
        RiskLevel::Medium => recommendations.insert(0, IMPROVEMENT_NOTE.to_string()),
        RiskLevel::Low => {}
    }

    debug!(
        "Evaluated {} checks: passed={} warnings={} criticals={} score={}",
        total, passed, warnings, criticals, overall_score
    );

    SecurityEvaluation {
        overall_status,
        overall_score,
        risk_level,
        test_statuses,
        recommendations,
        tests_passed: Some(format!("{}/{}", passed, total)),
    }
}

/// `max(0, round(base - 5 * warnings - 20 * criticals))`
fn score(passed: u32, total: u32, warnings: u32, criticals: u32) -> u8 {
    let base = if total == 0 {
        0.0
    } else {
        f64::from(passed) / f64::from(total) * 100.0
    };

    let raw = base - WARNING_PENALTY * f64::from(warnings) - CRITICAL_PENALTY * f64::from(criticals);
    raw.round().clamp(0.0, 100.0) as u8
}
