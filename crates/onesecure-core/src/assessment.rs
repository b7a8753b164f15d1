//! Assessment entry point
//!
//! Produces a findings map through the unified runner when one is configured,
//! falling back to the per-probe path, then evaluates it.

use crate::evaluation::{evaluate, SecurityEvaluation};
use crate::findings::FindingsMap;
use crate::orchestrator::ProbeSet;
use crate::store::ResultStore;
use crate::unified::{UnifiedOutcome, UnifiedRunner};
use chrono::{DateTime, Utc};
use onesecure_common::config::AssessmentConfig;
use onesecure_common::types::{CheckName, Domain};
use onesecure_common::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Which path produced the findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingsSource {
    Unified,
    PerProbe,
}

/// Complete result of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub id: Uuid,
    pub domain: Domain,
    pub source: FindingsSource,
    pub findings: FindingsMap,
    pub evaluation: SecurityEvaluation,
    #[serde(default)]
    pub probe_durations_ms: BTreeMap<CheckName, u64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Runs assessments
pub struct Assessor {
    probes: ProbeSet,
    unified: Option<UnifiedRunner>,
    store: Option<Arc<dyn ResultStore>>,
}

impl Assessor {
    /// Create an assessor using only the per-probe path
    pub fn new(probes: ProbeSet) -> Self {
        Self {
            probes,
            unified: None,
            store: None,
        }
    }

    /// Build the probe set and optional unified runner from configuration
    pub fn from_config(config: &AssessmentConfig) -> Self {
        let mut assessor = Self::new(ProbeSet::from_config(config));
        assessor.unified = config.unified.as_ref().and_then(UnifiedRunner::from_config);
        assessor
    }

    /// Prefer the given unified runner
    pub fn with_unified(mut self, runner: UnifiedRunner) -> Self {
        self.unified = Some(runner);
        self
    }

    /// Always use the per-probe path
    pub fn without_unified(mut self) -> Self {
        self.unified = None;
        self
    }

    /// Keep reports in the given store
    pub fn with_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn has_unified(&self) -> bool {
        self.unified.is_some()
    }

    /// Assess a domain name.
    ///
    /// Only an invalid domain is an error; probe failures are reported
    /// inside the findings and evaluation.
    pub async fn assess(&self, domain: &str) -> Result<AssessmentReport> {
        let domain = Domain::parse(domain)?;
        Ok(self.assess_domain(&domain).await)
    }

    /// Assess an already validated domain
    pub async fn assess_domain(&self, domain: &Domain) -> AssessmentReport {
        let started_at = Utc::now();
        info!("Starting assessment of {}", domain);

        let (source, findings, precomputed, probe_durations_ms) = match self.try_unified(domain).await {
            Some((findings, evaluation)) => {
                (FindingsSource::Unified, findings, evaluation, BTreeMap::new())
            }
            None => {
                let run = self.probes.run_all(domain).await;
                (FindingsSource::PerProbe, run.findings, None, run.durations_ms)
            }
        };

        // The consolidated runner's own scoring takes precedence when present
        let evaluation = precomputed.unwrap_or_else(|| evaluate(&findings));

        let report = AssessmentReport {
            id: Uuid::new_v4(),
            domain: domain.clone(),
            source,
            findings,
            evaluation,
            probe_durations_ms,
            started_at,
            completed_at: Utc::now(),
        };

        info!(
            "Assessment {} of {} finished: score={} risk={} status={} source={:?}",
            report.id,
            domain,
            report.evaluation.overall_score,
            report.evaluation.risk_level,
            report.evaluation.overall_status,
            report.source
        );

        if let Some(store) = &self.store {
            if let Err(e) = store.put(report.clone()).await {
                warn!("Failed to store assessment {}: {}", report.id, e);
            }
        }

        report
    }

    async fn try_unified(
        &self,
        domain: &Domain,
    ) -> Option<(FindingsMap, Option<SecurityEvaluation>)> {
        let runner = self.unified.as_ref()?;

        match runner.run(domain).await {
            UnifiedOutcome::Success {
                findings,
                evaluation,
            } => Some((findings, evaluation)),
            UnifiedOutcome::Unavailable(e) => {
                warn!("{}; falling back to per-probe checks for {}", e, domain);
                None
            }
        }
    }
}
