//! Output formatting utilities
//!
//! Command results go to stdout as JSON; status lines go to stderr so the
//! JSON stays pipeable.

use colored::*;
use psyche_integrity::{AuditStatus, LicenseStatus};
use serde::Serialize;

use crate::error::CliResult;

/// Print a value as pretty JSON on stdout
pub fn print_json<T: Serialize>(data: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message);
}

pub fn colorize_audit_status(status: AuditStatus) -> ColoredString {
    match status {
        AuditStatus::Healthy => status.as_str().green(),
        AuditStatus::Warning => status.as_str().yellow(),
        AuditStatus::Error => status.as_str().red(),
        AuditStatus::Lockdown => status.as_str().red().bold(),
    }
}

pub fn colorize_license(status: &LicenseStatus) -> ColoredString {
    match status {
        LicenseStatus::Valid { .. } => status.label().green(),
        LicenseStatus::Expired { .. } => status.label().yellow(),
        LicenseStatus::Invalid { .. } => status.label().red(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_is_preserved() {
        colored::control::set_override(false);
        assert_eq!(colorize_audit_status(AuditStatus::Lockdown).to_string(), "lockdown");
        let invalid = LicenseStatus::Invalid {
            reason: "hash mismatch".into(),
        };
        assert_eq!(colorize_license(&invalid).to_string(), "INVALID");
    }
}
