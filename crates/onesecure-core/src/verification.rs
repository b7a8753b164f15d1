//! Batch verification
//!
//! Assesses a list of domains one after another and reports which of them
//! pass every check.

use crate::assessment::Assessor;
use onesecure_common::types::{CheckName, CheckStatus, Domain, RiskLevel};
use serde::Serialize;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Minimum passed checks for a domain to count as a near miss
const NEAR_MISS_PASSED: usize = 3;

/// Per-domain result of a verification run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainVerdict {
    pub domain: Domain,
    pub assessment_id: Uuid,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub passed: usize,
    pub total: usize,
}

impl DomainVerdict {
    /// Every one of the four checks was present and passed
    pub fn all_passed(&self) -> bool {
        self.total == CheckName::ALL.len() && self.passed == self.total
    }
}

/// Outcome of verifying a batch of domains
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VerificationSummary {
    pub verdicts: Vec<DomainVerdict>,
}

impl VerificationSummary {
    /// Domains passing every check, in input order
    pub fn passing(&self) -> Vec<&DomainVerdict> {
        self.verdicts.iter().filter(|v| v.all_passed()).collect()
    }

    /// Domains missing only one check, best first
    pub fn near_misses(&self) -> Vec<&DomainVerdict> {
        let mut near: Vec<&DomainVerdict> = self
            .verdicts
            .iter()
            .filter(|v| !v.all_passed() && v.passed >= NEAR_MISS_PASSED)
            .collect();
        near.sort_by(|a, b| b.passed.cmp(&a.passed).then(b.score.cmp(&a.score)));
        near
    }

    /// First passing domain, else the best near miss
    pub fn recommended(&self) -> Option<&Domain> {
        self.passing()
            .first()
            .copied()
            .or_else(|| self.near_misses().first().copied())
            .map(|v| &v.domain)
    }
}

/// Runs an assessor over many domains
pub struct DomainVerifier<'a> {
    assessor: &'a Assessor,
    pause: Duration,
}

impl<'a> DomainVerifier<'a> {
    pub fn new(assessor: &'a Assessor) -> Self {
        Self {
            assessor,
            pause: Duration::ZERO,
        }
    }

    /// Wait between domains to spread load on remote servers
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Assess each domain in order
    pub async fn verify(&self, domains: &[Domain]) -> VerificationSummary {
        let mut summary = VerificationSummary::default();

        for (index, domain) in domains.iter().enumerate() {
            if index > 0 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }

            let report = self.assessor.assess_domain(domain).await;
            let statuses = &report.evaluation.test_statuses;

            summary.verdicts.push(DomainVerdict {
                domain: domain.clone(),
                assessment_id: report.id,
                score: report.evaluation.overall_score,
                risk_level: report.evaluation.risk_level,
                passed: statuses.values().filter(|s| **s == CheckStatus::Pass).count(),
                total: statuses.len(),
            });
        }

        info!(
            "Verified {} domains, {} passing every check",
            summary.verdicts.len(),
            summary.passing().len()
        );

        summary
    }
}
