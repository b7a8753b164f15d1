//! OneSecure - Email security assessment entry point

mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use onesecure_common::config::{Config, LoggingConfig};
use onesecure_common::types::{CheckName, Domain};
use onesecure_core::{evaluate, Assessor, DomainVerifier, Finding, FindingsMap};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "onesecure", version)]
#[command(about = "Assess the email security posture of a domain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check against a domain and print the report
    Assess {
        /// Domain to assess
        domain: String,
        /// Configuration file (defaults to the standard search path)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Skip the unified runner and run each probe separately
        #[arg(long)]
        per_probe: bool,
        /// Per-probe timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Assess several domains and report which pass every check
    Verify {
        /// Domains to assess, in order
        #[arg(required = true)]
        domains: Vec<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        per_probe: bool,
        #[arg(long)]
        timeout: Option<u64>,
        /// Pause between domains in milliseconds
        #[arg(long, default_value_t = 0)]
        pause_ms: u64,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Score a saved findings file
    Evaluate {
        /// JSON file mapping check names to findings
        findings: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Assess {
            domain,
            config,
            per_probe,
            timeout,
            format,
        } => {
            let assessor = build_assessor(config.as_deref(), per_probe, timeout)?;
            let report = assessor.assess(&domain).await?;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
                OutputFormat::Text => print!("{}", output::render_report(&report)),
            }
        }
        Commands::Verify {
            domains,
            config,
            per_probe,
            timeout,
            pause_ms,
            format,
        } => {
            let assessor = build_assessor(config.as_deref(), per_probe, timeout)?;
            // Reject the whole batch before any probe runs
            let domains = domains
                .iter()
                .map(|d| Domain::parse(d))
                .collect::<onesecure_common::Result<Vec<_>>>()?;

            let summary = DomainVerifier::new(&assessor)
                .with_pause(Duration::from_millis(pause_ms))
                .verify(&domains)
                .await;

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
                OutputFormat::Text => print!("{}", output::render_verification(&summary)),
            }
        }
        Commands::Evaluate {
            findings,
            config,
            format,
        } => {
            let config = load_config(config.as_deref())?;
            init_logging(&config.logging);

            let findings = read_findings(&findings)?;
            let evaluation = evaluate(&findings);

            match format {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
                OutputFormat::Text => print!("{}", output::render_evaluation(&findings, &evaluation)),
            }
        }
    }

    Ok(())
}

/// Load config, start logging, apply command line overrides
fn build_assessor(path: Option<&Path>, per_probe: bool, timeout: Option<u64>) -> Result<Assessor> {
    let mut config = load_config(path)?;
    init_logging(&config.logging);

    if let Some(secs) = timeout {
        config.assessment.probe_timeout_secs = secs;
    }
    config.validate()?;

    let mut assessor = Assessor::from_config(&config.assessment);
    if per_probe {
        info!("Unified runner disabled from the command line");
        assessor = assessor.without_unified();
    }
    Ok(assessor)
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Logs go to stderr so stdout carries only the report
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    if config.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Read a findings file; an embedded evaluation or unknown keys are ignored
fn read_findings(path: &Path) -> Result<FindingsMap> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read findings file {}", path.display()))?;
    let document: Map<String, Value> = serde_json::from_str(&content)
        .with_context(|| format!("Findings file {} is not a JSON object", path.display()))?;

    Ok(findings_from_document(document))
}

fn findings_from_document(mut document: Map<String, Value>) -> FindingsMap {
    let mut findings = FindingsMap::new();

    for check in CheckName::ALL {
        match document.remove(check.as_str()) {
            Some(Value::Object(entry)) => findings.insert(check, Finding::from_document(entry)),
            Some(_) => debug!("Skipping non-object entry for {}", check),
            None => {}
        }
    }

    findings
}
