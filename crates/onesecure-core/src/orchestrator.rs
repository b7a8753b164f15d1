//! Probe Set Orchestrator
//!
//! Runs one probe per check against a domain and collects every outcome,
//! isolating failures so one probe never blocks or aborts the others.

use crate::findings::FindingsMap;
use crate::probe::{Probe, ProbeError, ProbeOutcome, ProcessProbe};
use onesecure_common::config::AssessmentConfig;
use onesecure_common::types::{CheckName, Domain};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Default per-probe timeout
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(60);

/// Settled results of one run over the probe set
#[derive(Debug, Clone, Default)]
pub struct ProbeRun {
    pub findings: FindingsMap,
    pub durations_ms: BTreeMap<CheckName, u64>,
}

impl ProbeRun {
    /// Record under the registered check, whatever the probe reported
    fn record(&mut self, check: CheckName, mut outcome: ProbeOutcome) {
        outcome.check = check;
        self.durations_ms.insert(check, outcome.duration_ms);
        self.findings.record(outcome);
    }
}

/// Registry of probes, at most one per check
pub struct ProbeSet {
    probes: BTreeMap<CheckName, Arc<dyn Probe>>,
    timeout: Duration,
    parallel: bool,
}

impl ProbeSet {
    /// Create an empty probe set
    pub fn new(timeout: Duration) -> Self {
        Self {
            probes: BTreeMap::new(),
            timeout,
            parallel: true,
        }
    }

    /// Register the process probes for all four checks
    pub fn from_config(config: &AssessmentConfig) -> Self {
        let mut set = Self::new(Duration::from_secs(config.probe_timeout_secs))
            .with_parallel(config.parallel);

        for check in CheckName::ALL {
            let command = config.probes.command_for(check).clone();
            set = set.with_probe(Arc::new(ProcessProbe::new(check, command)));
        }

        set
    }

    /// Register a probe, replacing any existing probe for its check
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probes.insert(probe.check(), probe);
        self
    }

    /// Run probes concurrently (default) or one after another
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Checks with a registered probe, in evaluation order
    pub fn checks(&self) -> Vec<CheckName> {
        self.probes.keys().copied().collect()
    }

    /// Run every registered probe and wait for all outcomes to settle
    pub async fn run_all(&self, domain: &Domain) -> ProbeRun {
        info!(
            "Running {} probes for {} ({})",
            self.probes.len(),
            domain,
            if self.parallel { "parallel" } else { "sequential" }
        );

        let run = if self.parallel {
            self.run_parallel(domain).await
        } else {
            self.run_sequential(domain).await
        };

        debug!(
            "Probe run for {} settled with {} errors",
            domain,
            run.findings.error_count()
        );

        run
    }

    async fn run_parallel(&self, domain: &Domain) -> ProbeRun {
        let handles: Vec<(CheckName, JoinHandle<ProbeOutcome>)> = self
            .probes
            .iter()
            .map(|(check, probe)| {
                let probe = Arc::clone(probe);
                let domain = domain.clone();
                let timeout = self.timeout;
                let handle = tokio::spawn(async move { run_bounded(probe, &domain, timeout).await });
                (*check, handle)
            })
            .collect();

        let mut run = ProbeRun::default();
        for (check, handle) in handles {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!("{} probe task for {} aborted: {}", check, domain, e);
                    ProbeOutcome::failed(
                        check,
                        ProbeError::ProbeFailed {
                            exit_code: None,
                            detail: format!("probe task aborted: {}", e),
                        },
                    )
                }
            };
            run.record(check, outcome);
        }

        run
    }

    async fn run_sequential(&self, domain: &Domain) -> ProbeRun {
        let mut run = ProbeRun::default();
        for (check, probe) in &self.probes {
            let outcome = run_bounded(Arc::clone(probe), domain, self.timeout).await;
            run.record(*check, outcome);
        }
        run
    }
}

/// Run one probe, cutting it off when it overruns the budget
async fn run_bounded(probe: Arc<dyn Probe>, domain: &Domain, timeout: Duration) -> ProbeOutcome {
    let check = probe.check();
    match tokio::time::timeout(timeout, probe.run(domain, timeout)).await {
        Ok(outcome) => outcome,
        Err(_) => {
            warn!("{} probe for {} exceeded its {:?} budget", check, domain, timeout);
            ProbeOutcome {
                check,
                result: Err(ProbeError::Timeout(timeout)),
                duration_ms: timeout.as_millis() as u64,
            }
        }
    }
}

impl Default for ProbeSet {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_TIMEOUT)
    }
}
