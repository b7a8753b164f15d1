//! Plain text rendering of reports and evaluations

use onesecure_common::types::CheckStatus;
use onesecure_core::{
    AssessmentReport, Finding, FindingsMap, FindingsSource, SecurityEvaluation, VerificationSummary,
};

const RULE_WIDTH: usize = 50;

/// Render a full assessment report
pub fn render_report(report: &AssessmentReport) -> String {
    let source = match report.source {
        FindingsSource::Unified => "unified runner",
        FindingsSource::PerProbe => "per-probe checks",
    };
    let elapsed_ms = (report.completed_at - report.started_at).num_milliseconds();

    let mut out = String::new();
    out.push_str(&format!("Security assessment for {}\n", report.domain));
    out.push_str(&format!("Assessment ID: {}\n", report.id));
    out.push_str(&format!("Source: {} ({}ms)\n", source, elapsed_ms));
    out.push_str(&render_evaluation(&report.findings, &report.evaluation));
    out
}

/// Render an evaluation summary: per-check lines, score block, recommendations
pub fn render_evaluation(findings: &FindingsMap, evaluation: &SecurityEvaluation) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    out.push_str(&format!("{}\nEVALUATION SUMMARY:\n{}\n", rule, rule));

    for (check, status) in &evaluation.test_statuses {
        let mut line = format!("{}: {}", check.as_str().to_uppercase(), status_label(*status));
        if let Some(Finding::Error(e)) = findings.get(*check) {
            line.push_str(&format!(" ({})", e.error));
        }
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str("\nSecurity Score:\n");
    out.push_str(&format!("  Overall Score: {}/100\n", evaluation.overall_score));
    out.push_str(&format!("  Risk Level: {}\n", evaluation.risk_level));
    out.push_str(&format!("  Status: {}\n", status_label(evaluation.overall_status)));
    if let Some(passed) = &evaluation.tests_passed {
        out.push_str(&format!("  Tests Passed: {}\n", passed));
    }

    if !evaluation.recommendations.is_empty() {
        out.push_str("\nRecommendations:\n");
        for rec in &evaluation.recommendations {
            out.push_str(&format!("  - {}\n", rec));
        }
    }

    out
}

/// Render a batch verification: one line per domain, then the summary
pub fn render_verification(summary: &VerificationSummary) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    for verdict in &summary.verdicts {
        out.push_str(&format!(
            "{}: {}/100 {} (passed {}/{})\n",
            verdict.domain, verdict.score, verdict.risk_level, verdict.passed, verdict.total
        ));
    }

    out.push_str(&format!("\n{}\nSUMMARY:\n{}\n", rule, rule));

    let passing = summary.passing();
    if passing.is_empty() {
        let near = summary.near_misses();
        if near.is_empty() {
            out.push_str("No domains passed all checks\n");
        } else {
            out.push_str("No domains passed all checks. Closest:\n");
            for verdict in near {
                out.push_str(&format!(
                    "  - {} (passed {}/{})\n",
                    verdict.domain, verdict.passed, verdict.total
                ));
            }
        }
    } else {
        out.push_str("Domains passing all checks:\n");
        for verdict in passing {
            out.push_str(&format!("  - {}\n", verdict.domain));
        }
    }

    if let Some(domain) = summary.recommended() {
        out.push_str(&format!("\nRecommended domain for full testing: {}\n", domain));
    }

    out
}

fn status_label(status: CheckStatus) -> String {
    status.as_str().to_uppercase()
}
