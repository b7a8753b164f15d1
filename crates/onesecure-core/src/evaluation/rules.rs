//! Per-check classification rules
//!
//! Each rule reads a lenient typed view of a probe payload and resolves the
//! check's status, its recommendation, and any additional warnings.

use crate::findings::Finding;
use onesecure_common::types::{CheckName, CheckStatus};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Mail server response time above which a warning is raised
pub const SLOW_RESPONSE_MS: u64 = 5000;

/// DKIM key length considered weak
pub const WEAK_DKIM_KEY_BITS: u32 = 1024;

/// Classification of a single check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckVerdict {
    pub status: CheckStatus,
    /// Present exactly when the status is not PASS
    pub recommendation: Option<String>,
    /// Independent warnings that leave the status unchanged
    pub additional_warnings: Vec<String>,
}

impl CheckVerdict {
    fn pass() -> Self {
        Self {
            status: CheckStatus::Pass,
            recommendation: None,
            additional_warnings: Vec::new(),
        }
    }

    fn warning(recommendation: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Warning,
            recommendation: Some(recommendation.into()),
            additional_warnings: Vec::new(),
        }
    }

    fn fail(recommendation: impl Into<String>) -> Self {
        Self {
            status: CheckStatus::Fail,
            recommendation: Some(recommendation.into()),
            additional_warnings: Vec::new(),
        }
    }

    fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.additional_warnings.push(warning.into());
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DmarcFindings {
    has_dmarc: Option<bool>,
    policy: Option<String>,
    rua: Option<String>,
    ruf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SpfFindings {
    has_spf: Option<bool>,
    all_mechanism: Option<String>,
    warnings: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DkimFindings {
    has_dkim: Option<bool>,
    signature_valid: Option<bool>,
    /// String such as "2048+" or a plain number
    key_length: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct MailServerFindings {
    smtp_accessible: Option<bool>,
    supports_tls: Option<bool>,
    supports_auth: Option<bool>,
    response_time_ms: Option<u64>,
}

/// Classify one finding
pub fn classify(check: CheckName, finding: &Finding) -> CheckVerdict {
    let payload = match finding {
        Finding::Payload(payload) => payload,
        Finding::Error(e) => {
            return CheckVerdict::fail(format!(
                "{} check could not be completed: {}",
                check.display_name(),
                e.error
            ));
        }
    };

    let verdict = match check {
        CheckName::Dmarc => view(payload).map(dmarc),
        CheckName::Spf => view(payload).map(spf),
        CheckName::Dkim => view(payload).map(dkim),
        CheckName::MailServer => view(payload).map(mail_server),
    };

    verdict.unwrap_or_else(|e| {
        CheckVerdict::fail(format!(
            "{} check returned an unreadable result: {}",
            check.display_name(),
            e
        ))
    })
}

fn view<T: DeserializeOwned>(payload: &Map<String, Value>) -> serde_json::Result<T> {
    serde_json::from_value(Value::Object(payload.clone()))
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).is_some_and(|v| !v.is_empty())
}

fn dmarc(findings: DmarcFindings) -> CheckVerdict {
    if !findings.has_dmarc.unwrap_or(false) {
        return CheckVerdict::fail(
            "CRITICAL: No DMARC record found - implement DMARC to prevent email spoofing",
        );
    }

    let policy = findings
        .policy
        .as_deref()
        .map(|p| p.trim().to_ascii_lowercase());

    let verdict = match policy.as_deref() {
        Some("reject") => CheckVerdict::pass(),
        Some("quarantine") => CheckVerdict::warning(
            "Strengthen DMARC policy from 'quarantine' to 'reject' for full spoofing protection",
        ),
        Some("none") => CheckVerdict::fail(
            "DMARC policy is 'none' (monitoring only) - enforce 'quarantine' or 'reject'",
        ),
        Some(other) => CheckVerdict::fail(format!(
            "DMARC record has an invalid policy '{}' - set p=reject",
            other
        )),
        None => CheckVerdict::fail("DMARC record has no policy - set p=reject"),
    };

    if !is_set(&findings.rua) && !is_set(&findings.ruf) {
        verdict.with_warning(
            "Configure DMARC reporting addresses (rua/ruf) to receive aggregate and forensic reports",
        )
    } else {
        verdict
    }
}

fn spf(findings: SpfFindings) -> CheckVerdict {
    if !findings.has_spf.unwrap_or(false) {
        return CheckVerdict::fail(
            "CRITICAL: No SPF record found - implement SPF to specify authorized mail servers",
        );
    }

    let mechanism = findings.all_mechanism.as_deref().map(str::trim);

    let mut verdict = match mechanism {
        Some("-all") => CheckVerdict::pass(),
        Some("~all") => CheckVerdict::warning(
            "Use strict SPF policy with '-all' qualifier (current: '~all' soft fail)",
        ),
        Some("+all") => CheckVerdict::fail(
            "SPF record uses '+all', which authorizes any server to send mail - replace it with '-all'",
        ),
        Some(other) if !other.is_empty() => CheckVerdict::warning(format!(
            "SPF record ends with an unrecognized mechanism '{}' - end the record with '-all'",
            other
        )),
        _ => CheckVerdict::warning(
            "SPF record has no 'all' mechanism - end the record with '-all'",
        ),
    };

    for warning in findings.warnings.unwrap_or_default() {
        verdict = verdict.with_warning(format!("SPF Warning: {}", warning));
    }

    verdict
}

fn key_bits(key_length: &Value) -> Option<u32> {
    static DIGITS: OnceLock<Regex> = OnceLock::new();
    let digits = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("digit pattern is valid"));

    let text = match key_length {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    digits.find(&text)?.as_str().parse().ok()
}

fn dkim(findings: DkimFindings) -> CheckVerdict {
    let verdict = if !findings.has_dkim.unwrap_or(false) {
        CheckVerdict::warning(
            "DKIM not found under common selectors - implement DKIM signing or verify custom selectors",
        )
    } else if findings.signature_valid.unwrap_or(false) {
        CheckVerdict::pass()
    } else {
        CheckVerdict::fail(
            "DKIM record found but the signature is invalid - publish a valid public key for the selector",
        )
    };

    match findings.key_length.as_ref().and_then(key_bits) {
        Some(WEAK_DKIM_KEY_BITS) => {
            verdict.with_warning("DKIM key length is 1024 bits - rotate to a 2048-bit key")
        }
        _ => verdict,
    }
}

fn mail_server(findings: MailServerFindings) -> CheckVerdict {
    let tls = findings.supports_tls.unwrap_or(false);
    let auth = findings.supports_auth.unwrap_or(false);

    let verdict = if !findings.smtp_accessible.unwrap_or(false) {
        CheckVerdict::fail(
            "CRITICAL: Mail server is not reachable - verify MX records and SMTP availability",
        )
    } else {
        match (tls, auth) {
            (true, true) => CheckVerdict::pass(),
            (false, true) => CheckVerdict::warning(
                "Mail server does not support TLS - enable STARTTLS for secure email delivery",
            ),
            (true, false) => CheckVerdict::warning(
                "Mail server does not advertise SMTP AUTH - enable authenticated submission",
            ),
            (false, false) => CheckVerdict::fail(
                "Mail server supports neither TLS nor SMTP AUTH - enable STARTTLS and authenticated submission",
            ),
        }
    };

    match findings.response_time_ms {
        Some(ms) if ms > SLOW_RESPONSE_MS => verdict.with_warning(format!(
            "Mail server response time is {}ms - investigate slow SMTP responses",
            ms
        )),
        _ => verdict,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::ErrorFinding;
    use crate::testing::as_object;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn run(check: CheckName, payload: Value) -> CheckVerdict {
        classify(check, &Finding::Payload(as_object(payload)))
    }

    #[test]
    fn test_dmarc_statuses() {
        let reject = run(CheckName::Dmarc, json!({"has_dmarc": true, "policy": "reject", "rua": "mailto:a@b.c"}));
        assert_eq!(reject, CheckVerdict::pass());

        let quarantine = run(CheckName::Dmarc, json!({"has_dmarc": true, "policy": "quarantine", "ruf": "mailto:a@b.c"}));
        assert_eq!(quarantine.status, CheckStatus::Warning);
        assert!(quarantine.additional_warnings.is_empty());

        let none = run(CheckName::Dmarc, json!({"has_dmarc": true, "policy": "none", "rua": "mailto:a@b.c"}));
        assert_eq!(none.status, CheckStatus::Fail);
        assert!(!none.recommendation.unwrap().starts_with("CRITICAL"));

        let absent = run(CheckName::Dmarc, json!({"has_dmarc": false}));
        assert_eq!(absent.status, CheckStatus::Fail);
        assert!(absent.recommendation.unwrap().starts_with("CRITICAL: No DMARC record found"));
        assert!(absent.additional_warnings.is_empty());
    }

    #[test]
    fn test_dmarc_missing_reporting_addresses() {
        let verdict = run(CheckName::Dmarc, json!({"has_dmarc": true, "policy": "reject", "rua": "", "ruf": null}));
        assert_eq!(verdict.status, CheckStatus::Pass);
        assert_eq!(verdict.additional_warnings.len(), 1);
    }

    #[test]
    fn test_spf_statuses() {
        assert_eq!(run(CheckName::Spf, json!({"has_spf": true, "all_mechanism": "-all"})).status, CheckStatus::Pass);
        assert_eq!(run(CheckName::Spf, json!({"has_spf": true, "all_mechanism": "~all"})).status, CheckStatus::Warning);
        assert_eq!(run(CheckName::Spf, json!({"has_spf": true, "all_mechanism": "?all"})).status, CheckStatus::Warning);
        assert_eq!(run(CheckName::Spf, json!({"has_spf": true, "all_mechanism": null})).status, CheckStatus::Warning);
        assert_eq!(run(CheckName::Spf, json!({"has_spf": true, "all_mechanism": "+all"})).status, CheckStatus::Fail);

        let absent = run(CheckName::Spf, json!({"has_spf": false, "warnings": []}));
        assert_eq!(absent.status, CheckStatus::Fail);
        assert!(absent.recommendation.unwrap().starts_with("CRITICAL: No SPF record found"));
    }

    #[test]
    fn test_spf_warnings_propagated_verbatim() {
        let verdict = run(
            CheckName::Spf,
            json!({
                "has_spf": true,
                "all_mechanism": "-all",
                "warnings": ["Unknown or complex mechanism: redirect=_spf.example.com", "Too many includes may cause DNS lookup limit issues"]
            }),
        );
        assert_eq!(verdict.status, CheckStatus::Pass);
        assert_eq!(
            verdict.additional_warnings,
            vec![
                "SPF Warning: Unknown or complex mechanism: redirect=_spf.example.com".to_string(),
                "SPF Warning: Too many includes may cause DNS lookup limit issues".to_string(),
            ]
        );
    }

    #[test]
    fn test_dkim_statuses() {
        assert_eq!(run(CheckName::Dkim, json!({"has_dkim": true, "signature_valid": true, "key_length": "2048+"})), CheckVerdict::pass());
        assert_eq!(run(CheckName::Dkim, json!({"has_dkim": false, "signature_valid": null, "key_length": null})).status, CheckStatus::Warning);
        assert_eq!(run(CheckName::Dkim, json!({"has_dkim": true, "signature_valid": false})).status, CheckStatus::Fail);
    }

    #[test]
    fn test_dkim_weak_key() {
        let verdict = run(CheckName::Dkim, json!({"has_dkim": true, "signature_valid": true, "key_length": "1024+"}));
        assert_eq!(verdict.status, CheckStatus::Pass);
        assert_eq!(verdict.additional_warnings.len(), 1);

        let verdict = run(CheckName::Dkim, json!({"has_dkim": true, "signature_valid": true, "key_length": "10240"}));
        assert!(verdict.additional_warnings.is_empty());
    }

    #[test]
    fn test_key_bits() {
        assert_eq!(key_bits(&json!("1024")), Some(1024));
        assert_eq!(key_bits(&json!("rsa-2048+")), Some(2048));
        assert_eq!(key_bits(&json!(1024)), Some(1024));
        assert_eq!(key_bits(&json!("Unknown")), None);
        assert_eq!(key_bits(&json!(true)), None);
    }

    #[test]
    fn test_mail_server_statuses() {
        let base = |tls: bool, auth: bool| json!({"smtp_accessible": true, "supports_tls": tls, "supports_auth": auth, "response_time_ms": 80});
        assert_eq!(run(CheckName::MailServer, base(true, true)).status, CheckStatus::Pass);
        assert_eq!(run(CheckName::MailServer, base(true, false)).status, CheckStatus::Warning);
        assert_eq!(run(CheckName::MailServer, base(false, true)).status, CheckStatus::Warning);
        assert_eq!(run(CheckName::MailServer, base(false, false)).status, CheckStatus::Fail);

        let unreachable = run(CheckName::MailServer, json!({"smtp_accessible": false, "supports_tls": true, "supports_auth": true}));
        assert_eq!(unreachable.status, CheckStatus::Fail);
        assert!(unreachable.recommendation.unwrap().starts_with("CRITICAL"));
    }

    #[test]
    fn test_mail_server_slow_response() {
        let verdict = run(CheckName::MailServer, json!({"smtp_accessible": true, "supports_tls": true, "supports_auth": true, "response_time_ms": 5001}));
        assert_eq!(verdict.status, CheckStatus::Pass);
        assert_eq!(verdict.additional_warnings.len(), 1);

        let verdict = run(CheckName::MailServer, json!({"smtp_accessible": true, "supports_tls": true, "supports_auth": true, "response_time_ms": 5000}));
        assert!(verdict.additional_warnings.is_empty());
    }

    #[test]
    fn test_error_and_unreadable_findings_fail() {
        let error = Finding::Error(ErrorFinding::new("Probe timed out after 60s", None));
        let verdict = classify(CheckName::Dkim, &error);
        assert_eq!(verdict.status, CheckStatus::Fail);
        assert_eq!(
            verdict.recommendation.as_deref(),
            Some("DKIM check could not be completed: Probe timed out after 60s")
        );

        let verdict = run(CheckName::Spf, json!({"has_spf": "yes"}));
        assert_eq!(verdict.status, CheckStatus::Fail);
        assert!(verdict.recommendation.unwrap().contains("unreadable result"));
    }
}
