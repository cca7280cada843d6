//! Formatted output helpers for CLI commands.

use std::process::ExitCode;

use picopypi_runtime::inspect::ContractReport;

pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";
pub const GREEN: &str = "\x1b[32m";
pub const RED: &str = "\x1b[31m";
pub const RESET: &str = "\x1b[0m";

/// Renders a contract report, one check per line.
#[must_use]
pub fn format_report(report: &ContractReport) -> String {
    let mut out = String::new();
    for check in &report.checks {
        let color = if check.passed() { GREEN } else { RED };
        out.push_str(&format!("  {color}{check}{RESET}\n"));
    }
    let failed = report.failures().count();
    if failed == 0 {
        out.push_str(&format!(
            "\n  {GREEN}{BOLD}{} check(s) passed{RESET}\n",
            report.checks.len()
        ));
    } else {
        out.push_str(&format!(
            "\n  {RED}{BOLD}{failed} of {} check(s) failed{RESET}\n",
            report.checks.len()
        ));
    }
    out
}

/// Maps a container exit status onto the process exit code.
///
/// Statuses outside `0..=255` (signals, engine errors) become `1`.
#[must_use]
pub fn exit_code(status: i32) -> ExitCode {
    ExitCode::from(status_byte(status))
}

fn status_byte(status: i32) -> u8 {
    u8::try_from(status).unwrap_or(1)
}
