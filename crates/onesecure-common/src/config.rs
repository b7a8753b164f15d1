//! Configuration for OneSecure

use crate::types::CheckName;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable pointing at a configuration file
pub const CONFIG_ENV_VAR: &str = "ONESECURE_CONFIG";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Assessment engine configuration
    #[serde(default)]
    pub assessment: AssessmentConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: "json" or "text"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

/// Assessment engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentConfig {
    /// Per-probe timeout in seconds
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_secs: u64,

    /// Run the per-check probes concurrently
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Per-check probe commands
    #[serde(default)]
    pub probes: ProbesConfig,

    /// Consolidated runner producing all findings in one pass
    #[serde(default = "default_unified")]
    pub unified: Option<UnifiedConfig>,
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            probe_timeout_secs: default_probe_timeout(),
            parallel: default_parallel(),
            probes: ProbesConfig::default(),
            unified: default_unified(),
        }
    }
}

fn default_probe_timeout() -> u64 {
    60
}

fn default_parallel() -> bool {
    true
}

fn default_unified() -> Option<UnifiedConfig> {
    Some(UnifiedConfig::default())
}

/// Directory holding the bundled probe scripts
fn default_probe_dir() -> PathBuf {
    PathBuf::from("/usr/lib/onesecure/probes")
}

fn default_interpreter() -> String {
    "python3".to_string()
}

fn script_command(script: &str) -> ProbeCommandConfig {
    ProbeCommandConfig {
        program: default_interpreter(),
        args: vec![default_probe_dir().join(script).display().to_string()],
    }
}

/// External command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCommandConfig {
    /// Program to execute
    pub program: String,

    /// Arguments placed before the domain
    #[serde(default)]
    pub args: Vec<String>,
}

/// Commands for each of the four checks
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbesConfig {
    #[serde(default = "default_dmarc_probe")]
    pub dmarc: ProbeCommandConfig,

    #[serde(default = "default_spf_probe")]
    pub spf: ProbeCommandConfig,

    #[serde(default = "default_dkim_probe")]
    pub dkim: ProbeCommandConfig,

    #[serde(default = "default_mail_server_probe")]
    pub mail_server: ProbeCommandConfig,
}

impl ProbesConfig {
    /// Get the command configured for a check
    pub fn command_for(&self, check: CheckName) -> &ProbeCommandConfig {
        match check {
            CheckName::Dmarc => &self.dmarc,
            CheckName::Spf => &self.spf,
            CheckName::Dkim => &self.dkim,
            CheckName::MailServer => &self.mail_server,
        }
    }
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            dmarc: default_dmarc_probe(),
            spf: default_spf_probe(),
            dkim: default_dkim_probe(),
            mail_server: default_mail_server_probe(),
        }
    }
}

fn default_dmarc_probe() -> ProbeCommandConfig {
    script_command("test_dmarc.py")
}

fn default_spf_probe() -> ProbeCommandConfig {
    script_command("test_spf.py")
}

fn default_dkim_probe() -> ProbeCommandConfig {
    script_command("test_dkim.py")
}

fn default_mail_server_probe() -> ProbeCommandConfig {
    script_command("test_mail_server.py")
}

/// Unified runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedConfig {
    /// Enable the unified runner
    #[serde(default = "default_unified_enabled")]
    pub enabled: bool,

    /// Program to execute
    #[serde(default = "default_interpreter")]
    pub program: String,

    /// Arguments placed before the JSON flag and the domain
    #[serde(default = "default_unified_args")]
    pub args: Vec<String>,

    /// Flag requesting machine-readable output only
    #[serde(default = "default_json_flag")]
    pub json_flag: String,

    /// Timeout in seconds for the whole run
    #[serde(default = "default_unified_timeout")]
    pub timeout_secs: u64,
}

impl UnifiedConfig {
    pub fn command(&self) -> ProbeCommandConfig {
        ProbeCommandConfig {
            program: self.program.clone(),
            args: self.args.clone(),
        }
    }
}

impl Default for UnifiedConfig {
    fn default() -> Self {
        Self {
            enabled: default_unified_enabled(),
            program: default_interpreter(),
            args: default_unified_args(),
            json_flag: default_json_flag(),
            timeout_secs: default_unified_timeout(),
        }
    }
}

fn default_unified_enabled() -> bool {
    true
}

fn default_unified_args() -> Vec<String> {
    vec![default_probe_dir()
        .join("test_runner.py")
        .display()
        .to_string()]
}

fn default_json_flag() -> String {
    "--json".to_string()
}

fn default_unified_timeout() -> u64 {
    120
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the environment or default locations,
    /// falling back to built-in defaults
    pub fn load() -> crate::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            debug!("Loading configuration from ${}: {}", CONFIG_ENV_VAR, path);
            return Self::from_file(Path::new(&path));
        }

        let paths = [
            PathBuf::from("./onesecure.toml"),
            PathBuf::from("/etc/onesecure/config.toml"),
        ];

        for path in paths {
            if path.exists() {
                debug!("Loading configuration from {}", path.display());
                return Self::from_file(&path);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.assessment.probe_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "assessment.probe_timeout_secs must be greater than zero".to_string(),
            ));
        }

        for check in CheckName::ALL {
            if self.assessment.probes.command_for(check).program.trim().is_empty() {
                return Err(crate::Error::Config(format!(
                    "assessment.probes.{}.program must not be empty",
                    check
                )));
            }
        }

        if let Some(unified) = &self.assessment.unified {
            if unified.enabled && unified.timeout_secs == 0 {
                return Err(crate::Error::Config(
                    "assessment.unified.timeout_secs must be greater than zero".to_string(),
                ));
            }
        }

        Ok(())
    }
}
