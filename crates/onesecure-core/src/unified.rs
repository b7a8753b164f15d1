//! Unified Runner Adapter
//!
//! Delegates to a single consolidated probe that produces all four findings
//! and an embedded evaluation in one pass. Any failure makes the whole
//! response unavailable so the caller can rerun the per-probe path.

use crate::evaluation::SecurityEvaluation;
use crate::findings::{Finding, FindingsMap};
use crate::probe::{ProbeError, ProbeExecutor};
use onesecure_common::config::{ProbeCommandConfig, UnifiedConfig};
use onesecure_common::types::{CheckName, Domain};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Key of the embedded evaluation in the runner's document
const EVALUATION_KEY: &str = "security_evaluation";

const MAX_SCORE: u8 = 100;

/// Result of attempting the unified path
#[derive(Debug, Clone, PartialEq)]
pub enum UnifiedOutcome {
    Success {
        findings: FindingsMap,
        evaluation: Option<SecurityEvaluation>,
    },
    Unavailable(ProbeError),
}

/// Consolidated runner invocation
pub struct UnifiedRunner {
    command: ProbeCommandConfig,
    json_flag: String,
    timeout: Duration,
}

impl UnifiedRunner {
    /// Create a new unified runner
    pub fn new(command: ProbeCommandConfig, json_flag: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command,
            json_flag: json_flag.into(),
            timeout,
        }
    }

    /// Build from configuration; `None` when the runner is disabled
    pub fn from_config(config: &UnifiedConfig) -> Option<Self> {
        if !config.enabled {
            return None;
        }

        Some(Self::new(
            config.command(),
            config.json_flag.clone(),
            Duration::from_secs(config.timeout_secs),
        ))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run the consolidated probe for a domain
    pub async fn run(&self, domain: &Domain) -> UnifiedOutcome {
        let extra_args: Vec<String> = if self.json_flag.is_empty() {
            Vec::new()
        } else {
            vec![self.json_flag.clone()]
        };

        let start = Instant::now();
        let document =
            match ProbeExecutor::execute(&self.command, &extra_args, domain, self.timeout).await {
                Ok(document) => document,
                Err(e) => {
                    warn!("Unified runner failed for {}: {}", domain, e);
                    return UnifiedOutcome::Unavailable(ProbeError::AdapterUnavailable(
                        e.to_string(),
                    ));
                }
            };

        match split_document(document) {
            Ok((findings, evaluation)) => {
                debug!(
                    "Unified runner for {} completed in {}ms (embedded evaluation: {})",
                    domain,
                    start.elapsed().as_millis(),
                    evaluation.is_some()
                );
                UnifiedOutcome::Success {
                    findings,
                    evaluation,
                }
            }
            Err(reason) => {
                warn!("Unified runner returned an invalid document for {}: {}", domain, reason);
                UnifiedOutcome::Unavailable(ProbeError::AdapterUnavailable(reason))
            }
        }
    }
}

/// Separate the embedded evaluation from the per-check findings.
///
/// Every check must be present as an object; anything else invalidates the
/// whole document.
fn split_document(
    mut document: Map<String, Value>,
) -> Result<(FindingsMap, Option<SecurityEvaluation>), String> {
    let evaluation = match document.remove(EVALUATION_KEY) {
        Some(value) => match serde_json::from_value::<SecurityEvaluation>(value) {
            Ok(evaluation) if evaluation.overall_score > MAX_SCORE => {
                warn!(
                    "Ignoring embedded evaluation with out of range score {}",
                    evaluation.overall_score
                );
                None
            }
            Ok(evaluation) => Some(evaluation),
            Err(e) => {
                warn!("Ignoring unreadable embedded evaluation: {}", e);
                None
            }
        },
        None => None,
    };

    let mut findings = FindingsMap::new();
    for check in CheckName::ALL {
        match document.remove(check.as_str()) {
            Some(Value::Object(entry)) => findings.insert(check, Finding::from_document(entry)),
            Some(_) => return Err(format!("entry for {} is not an object", check)),
            None => return Err(format!("missing entry for {}", check)),
        }
    }

    if !document.is_empty() {
        debug!(
            "Ignoring unknown unified runner keys: {:?}",
            document.keys().collect::<Vec<_>>()
        );
    }

    Ok((findings, evaluation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{dkim_pass, dmarc_pass, mail_server_pass, spf_pass, ScriptDir};
    use onesecure_common::types::{CheckStatus, RiskLevel};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn domain() -> Domain {
        Domain::parse("example.com").unwrap()
    }

    fn unified_document() -> Value {
        json!({
            "dmarc": dmarc_pass(),
            "spf": spf_pass(),
            "dkim": {"error": "Test timed out after 30 seconds"},
            "mail_server": mail_server_pass(),
            "security_evaluation": {
                "overall_status": "FAIL",
                "overall_score": 55,
                "risk_level": "HIGH",
                "test_statuses": {"dmarc": "PASS", "spf": "PASS", "dkim": "FAIL", "mail_server": "PASS"},
                "recommendations": ["DKIM not properly configured - implement DKIM signing for your domain"],
                "tests_passed": "3/4"
            }
        })
    }

    #[tokio::test]
    async fn test_success_strips_embedded_evaluation() {
        let scripts = ScriptDir::new();
        let command = scripts.command(
            "runner.sh",
            &format!(
                "[ \"$1\" = \"--json\" ] || exit 9\ncat <<'EOF'\n{}\nEOF",
                unified_document()
            ),
        );
        let runner = UnifiedRunner::new(command, "--json", Duration::from_secs(10));

        match runner.run(&domain()).await {
            UnifiedOutcome::Success {
                findings,
                evaluation,
            } => {
                assert!(findings.is_complete());
                assert!(findings.get(CheckName::Dkim).unwrap().is_error());
                assert_eq!(findings.len(), 4);

                let evaluation = evaluation.unwrap();
                assert_eq!(evaluation.overall_status, CheckStatus::Fail);
                assert_eq!(evaluation.overall_score, 55);
                assert_eq!(evaluation.risk_level, RiskLevel::High);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_unavailable() {
        let scripts = ScriptDir::new();
        let command = scripts.command("runner.sh", "echo 'Traceback' >&2; exit 1");
        let runner = UnifiedRunner::new(command, "--json", Duration::from_secs(10));

        match runner.run(&domain()).await {
            UnifiedOutcome::Unavailable(ProbeError::AdapterUnavailable(reason)) => {
                assert!(reason.contains("Traceback"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_banner_output_is_unavailable() {
        let scripts = ScriptDir::new();
        let command = scripts.command(
            "runner.sh",
            "echo 'Running security tests for domain: example.com'\necho '=================='",
        );
        let runner = UnifiedRunner::new(command, "", Duration::from_secs(10));

        assert!(matches!(
            runner.run(&domain()).await,
            UnifiedOutcome::Unavailable(ProbeError::AdapterUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_timeout_is_unavailable() {
        let scripts = ScriptDir::new();
        let command = scripts.command("runner.sh", "exec sleep 10");
        let runner = UnifiedRunner::new(command, "--json", Duration::from_millis(200));

        match runner.run(&domain()).await {
            UnifiedOutcome::Unavailable(e) => assert!(e.to_string().contains("timed out")),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_missing_check_invalidates_document() {
        let mut document = unified_document();
        document.as_object_mut().unwrap().remove("spf");

        let err = split_document(document.as_object().unwrap().clone()).unwrap_err();
        assert_eq!(err, "missing entry for spf");
    }

    #[test]
    fn test_non_object_entry_invalidates_document() {
        let mut document = unified_document();
        document["dkim"] = json!("skipped");

        let err = split_document(document.as_object().unwrap().clone()).unwrap_err();
        assert_eq!(err, "entry for dkim is not an object");
    }

    #[test]
    fn test_unreadable_evaluation_is_dropped() {
        let mut document = unified_document();
        document["security_evaluation"] = json!({"overall_score": "high"});
        document["dkim"] = dkim_pass();

        let (findings, evaluation) = split_document(document.as_object().unwrap().clone()).unwrap();
        assert!(findings.is_complete());
        assert_eq!(evaluation, None);
    }

    #[test]
    fn test_out_of_range_score_is_dropped() {
        let mut document = unified_document();
        document["security_evaluation"]["overall_score"] = json!(250);

        let (findings, evaluation) = split_document(document.as_object().unwrap().clone()).unwrap();
        assert!(findings.is_complete());
        assert_eq!(evaluation, None);

        document["security_evaluation"]["overall_score"] = json!(100);
        let (_, evaluation) = split_document(document.as_object().unwrap().clone()).unwrap();
        assert_eq!(evaluation.unwrap().overall_score, 100);
    }

    #[test]
    fn test_from_config_disabled() {
        let config = UnifiedConfig {
            enabled: false,
            ..UnifiedConfig::default()
        };
        assert!(UnifiedRunner::from_config(&config).is_none());

        let runner = UnifiedRunner::from_config(&UnifiedConfig::default()).unwrap();
        assert_eq!(runner.timeout(), Duration::from_secs(120));
    }
}
