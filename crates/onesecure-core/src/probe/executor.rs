//! Probe Executor
//!
//! Spawns one external probe per call, enforces its timeout, and turns the
//! process result into a JSON document or a classified error.

use super::types::{Probe, ProbeError, ProbeOutcome, ProbeResult};
use async_trait::async_trait;
use onesecure_common::config::ProbeCommandConfig;
use onesecure_common::types::{CheckName, Domain};
use serde_json::{Map, Value};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Maximum characters of raw output kept in diagnostics
const SNIPPET_LIMIT: usize = 200;

/// Maximum characters of diagnostic output carried in failure messages
const DIAGNOSTIC_LIMIT: usize = 500;

/// Runs probe processes
pub struct ProbeExecutor;

impl ProbeExecutor {
    /// Execute `program args.. extra_args.. domain` and parse its stdout.
    ///
    /// The child is killed if `timeout` expires before it exits.
    pub async fn execute(
        command: &ProbeCommandConfig,
        extra_args: &[String],
        domain: &Domain,
        timeout: Duration,
    ) -> ProbeResult<Map<String, Value>> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .args(extra_args)
            .arg(domain.as_str())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ProbeError::ProbeFailed {
                exit_code: None,
                detail: format!("failed to start {}: {}", command.program, e),
            })?;

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(ProbeError::ProbeFailed {
                    exit_code: None,
                    detail: format!("failed to collect output: {}", e),
                });
            }
            Err(_) => {
                warn!(
                    "Probe {} for {} exceeded its {:?} budget, killed",
                    command.program, domain, timeout
                );
                return Err(ProbeError::Timeout(timeout));
            }
        };

        if !output.status.success() {
            let status = match output.status.code() {
                Some(code) => format!("exited with status {}", code),
                None => "terminated by signal".to_string(),
            };
            // stdout of a failed probe is shown as text, never parsed
            let mut diagnostic =
                snippet(String::from_utf8_lossy(&output.stderr).trim(), DIAGNOSTIC_LIMIT);
            if diagnostic.is_empty() {
                diagnostic =
                    snippet(String::from_utf8_lossy(&output.stdout).trim(), DIAGNOSTIC_LIMIT);
            }
            let detail = if diagnostic.is_empty() {
                status
            } else {
                format!("{}: {}", status, diagnostic)
            };

            return Err(ProbeError::ProbeFailed {
                exit_code: output.status.code(),
                detail,
            });
        }

        if !output.stderr.is_empty() {
            debug!(
                "Probe {} stderr: {}",
                command.program,
                snippet(String::from_utf8_lossy(&output.stderr).trim(), SNIPPET_LIMIT)
            );
        }

        parse_document(&output.stdout).map_err(|err| {
            if let ProbeError::MalformedOutput { reason, snippet } = &err {
                warn!(
                    "Probe {} for {} exited cleanly but produced malformed output ({}): {:?}",
                    command.program, domain, reason, snippet
                );
            }
            err
        })
    }
}

/// Parse a probe's stdout as exactly one JSON object
pub(crate) fn parse_document(stdout: &[u8]) -> ProbeResult<Map<String, Value>> {
    let malformed = |reason: String| ProbeError::MalformedOutput {
        reason,
        snippet: snippet(&String::from_utf8_lossy(stdout), SNIPPET_LIMIT),
    };

    match serde_json::from_slice::<Value>(stdout) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(malformed(format!(
            "expected a JSON object, got {}",
            json_type(&other)
        ))),
        Err(e) => Err(malformed(e.to_string())),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Truncate to `limit` characters on a char boundary
fn snippet(text: &str, limit: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(limit).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// A probe backed by an external program
pub struct ProcessProbe {
    check: CheckName,
    command: ProbeCommandConfig,
}

impl ProcessProbe {
    /// Create a new process probe
    pub fn new(check: CheckName, command: ProbeCommandConfig) -> Self {
        Self { check, command }
    }
}

#[async_trait]
impl Probe for ProcessProbe {
    fn check(&self) -> CheckName {
        self.check
    }

    async fn run(&self, domain: &Domain, timeout: Duration) -> ProbeOutcome {
        let start = Instant::now();
        let result = ProbeExecutor::execute(&self.command, &[], domain, timeout).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => debug!("{} probe for {} completed in {}ms", self.check, domain, duration_ms),
            Err(e) => warn!(
                "{} probe for {} failed after {}ms: {}",
                self.check, domain, duration_ms, e
            ),
        }

        ProbeOutcome {
            check: self.check,
            result,
            duration_ms,
        }
    }
}
