//! One-shot integrity audit

use colored::*;
use psyche_engine::{AssessmentEngine, EngineConfig};
use psyche_integrity::{AuditStatus, CheckStatus};

use crate::error::{CliError, CliResult};
use crate::output::{colorize_audit_status, print_json};

/// Run the self-audit once against the configured storage.
pub fn execute(config: &EngineConfig, strict: bool) -> CliResult<()> {
    let engine = AssessmentEngine::from_config(config)?;
    let report = engine.run_audit();
    print_json(&report)?;

    eprintln!("Integrity: {}", colorize_audit_status(report.status));
    for category in &report.categories {
        let mark = match category.status {
            CheckStatus::Pass => "✓".green(),
            CheckStatus::Warning => "⚠".yellow(),
            CheckStatus::Error | CheckStatus::Critical => "✗".red(),
        };
        eprintln!("  {} {:?} {}", mark, category.category, category.score);
        for finding in &category.findings {
            eprintln!("      {}", finding.dimmed());
        }
    }

    match report.status {
        AuditStatus::Healthy => Ok(()),
        AuditStatus::Warning if !strict => Ok(()),
        status => Err(CliError::AuditFailed(status.to_string())),
    }
}
