//! Common types for OneSecure

use crate::error::{Error, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Maximum length of a fully qualified domain name
const MAX_DOMAIN_LENGTH: usize = 253;

fn label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").expect("label pattern is valid")
    })
}

fn tld_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z]{2,63}$").expect("tld pattern is valid"))
}

/// A validated domain name, the sole input to an assessment
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Parse and validate a domain name.
    ///
    /// Surrounding whitespace and a single trailing dot are stripped and the
    /// name is lowercased before validation.
    pub fn parse(input: &str) -> Result<Self> {
        let normalized = input.trim().trim_end_matches('.').to_ascii_lowercase();

        if normalized.is_empty() || normalized.len() > MAX_DOMAIN_LENGTH {
            return Err(Error::Validation(format!(
                "Invalid domain format: {:?}",
                input
            )));
        }

        let labels: Vec<&str> = normalized.split('.').collect();
        if labels.len() < 2 {
            return Err(Error::Validation(format!(
                "Domain must contain at least two labels: {:?}",
                input
            )));
        }

        if !labels.iter().all(|label| label_pattern().is_match(label)) {
            return Err(Error::Validation(format!(
                "Invalid domain format: {:?}",
                input
            )));
        }

        let tld = labels[labels.len() - 1];
        if !tld_pattern().is_match(tld) {
            return Err(Error::Validation(format!(
                "Invalid top-level domain {:?} in {:?}",
                tld, input
            )));
        }

        Ok(Self(normalized))
    }

    /// Get the domain as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Domain {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

/// Email security check identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckName {
    Dmarc,
    Spf,
    Dkim,
    MailServer,
}

impl CheckName {
    /// All checks, in evaluation order
    pub const ALL: [CheckName; 4] = [
        CheckName::Dmarc,
        CheckName::Spf,
        CheckName::Dkim,
        CheckName::MailServer,
    ];

    /// Machine-readable name, as used for Findings Map keys
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckName::Dmarc => "dmarc",
            CheckName::Spf => "spf",
            CheckName::Dkim => "dkim",
            CheckName::MailServer => "mail_server",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            CheckName::Dmarc => "DMARC",
            CheckName::Spf => "SPF",
            CheckName::Dkim => "DKIM",
            CheckName::MailServer => "Mail server",
        }
    }
}

impl fmt::Display for CheckName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dmarc" => Ok(CheckName::Dmarc),
            "spf" => Ok(CheckName::Spf),
            "dkim" => Ok(CheckName::Dkim),
            "mail_server" => Ok(CheckName::MailServer),
            other => Err(Error::Validation(format!("Unknown check: {}", other))),
        }
    }
}

/// Status of a single check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    #[serde(alias = "PASS", alias = "Pass")]
    Pass,
    #[serde(alias = "WARNING", alias = "Warning")]
    Warning,
    #[serde(alias = "FAIL", alias = "Fail")]
    Fail,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Pass => "pass",
            CheckStatus::Warning => "warning",
            CheckStatus::Fail => "fail",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall assessment status; shares the check status vocabulary
pub type OverallStatus = CheckStatus;

/// Risk classification derived from the overall score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    #[serde(alias = "low", alias = "Low")]
    Low,
    #[serde(alias = "medium", alias = "Medium")]
    Medium,
    #[serde(alias = "high", alias = "High")]
    High,
}

impl RiskLevel {
    /// Classify a score: HIGH below 70, MEDIUM below 90, LOW otherwise
    pub fn from_score(score: u8) -> Self {
        if score < 70 {
            RiskLevel::High
        } else if score < 90 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
