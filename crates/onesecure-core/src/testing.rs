//! Shared fixtures for unit tests

use crate::findings::{ErrorFinding, Finding, FindingsMap};
use crate::probe::{Probe, ProbeError, ProbeErrorKind, ProbeOutcome};
use async_trait::async_trait;
use onesecure_common::config::ProbeCommandConfig;
use onesecure_common::types::{CheckName, Domain};
use serde_json::{json, Map, Value};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tracing_subscriber::fmt::MakeWriter;

/// Temporary directory of `sh` probe scripts
pub(crate) struct ScriptDir {
    dir: TempDir,
}

impl ScriptDir {
    pub(crate) fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    /// Write a script and return a command running it with `sh`
    pub(crate) fn command(&self, name: &str, body: &str) -> ProbeCommandConfig {
        let path: PathBuf = self.dir.path().join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write probe script");
        ProbeCommandConfig {
            program: "sh".to_string(),
            args: vec![path.display().to_string()],
        }
    }

    /// Script that prints `payload` and exits 0
    pub(crate) fn json_command(&self, name: &str, payload: &Value) -> ProbeCommandConfig {
        self.command(name, &format!("cat <<'EOF'\n{}\nEOF", payload))
    }
}

pub(crate) fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {}", other),
    }
}

pub(crate) fn dmarc_pass() -> Value {
    json!({
        "has_dmarc": true,
        "policy": "reject",
        "rua": "mailto:dmarc@example.com",
        "ruf": null
    })
}

pub(crate) fn spf_pass() -> Value {
    json!({"has_spf": true, "all_mechanism": "-all", "warnings": []})
}

pub(crate) fn dkim_pass() -> Value {
    json!({"has_dkim": true, "signature_valid": true, "key_length": "2048"})
}

pub(crate) fn mail_server_pass() -> Value {
    json!({
        "smtp_accessible": true,
        "supports_tls": true,
        "supports_auth": true,
        "response_time_ms": 120
    })
}

pub(crate) fn passing_payload(check: CheckName) -> Value {
    match check {
        CheckName::Dmarc => dmarc_pass(),
        CheckName::Spf => spf_pass(),
        CheckName::Dkim => dkim_pass(),
        CheckName::MailServer => mail_server_pass(),
    }
}

/// Findings map with all four checks passing
pub(crate) fn passing_findings() -> FindingsMap {
    let mut findings = FindingsMap::new();
    for check in CheckName::ALL {
        findings.insert(check, Finding::Payload(as_object(passing_payload(check))));
    }
    findings
}

pub(crate) fn error_finding(message: &str, kind: ProbeErrorKind) -> Finding {
    Finding::Error(ErrorFinding::new(message, Some(kind)))
}

/// In-process probe returning a canned result
pub(crate) struct StaticProbe {
    check: CheckName,
    result: Result<Value, ProbeError>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StaticProbe {
    pub(crate) fn ok(check: CheckName, payload: Value) -> Self {
        Self {
            check,
            result: Ok(payload),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn err(check: CheckName, error: ProbeError) -> Self {
        Self {
            check,
            result: Err(error),
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl Probe for StaticProbe {
    fn check(&self) -> CheckName {
        self.check
    }

    /// Sleeps for the configured delay regardless of the budget it is given
    async fn run(&self, _domain: &Domain, _timeout: Duration) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        ProbeOutcome {
            check: self.check,
            result: self.result.clone().map(as_object),
            duration_ms: self.delay.as_millis() as u64,
        }
    }
}

/// In-memory log sink for asserting on emitted events
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Route this thread's events here until the guard drops
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub(crate) fn contents(&self) -> String {
        let buffer = self.buffer.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = LogCapture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
