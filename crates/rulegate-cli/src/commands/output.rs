//! Shared output formatting for scan reports.

use anyhow::Result;
use miette::{NamedSource, Report};
use rulegate_core::{Finding, FindingDiagnostic, ScanReport, Severity};
use std::path::Path;

use crate::OutputFormat;

/// Print a scan report in the specified format.
///
/// `root` is the directory finding paths are relative to.
pub fn print(report: &ScanReport, root: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            print_text(report, root);
            Ok(())
        }
        OutputFormat::Json => print_json(report),
        OutputFormat::Compact => {
            print_compact(report);
            Ok(())
        }
    }
}

fn print_text(report: &ScanReport, root: &Path) {
    let (errors, warnings, infos) = report.count_by_severity();

    for severity in [Severity::Error, Severity::Warn, Severity::Info] {
        let group = report.by_severity(severity);
        if group.is_empty() {
            continue;
        }

        let color = severity_color(severity);
        println!("{color}== {severity} ({}) ==\x1b[0m", group.len());
        for finding in group {
            println!("{}", render(finding, root));
        }
    }

    if report.capped {
        println!("\x1b[33mScan stopped at the file cap; some files were not checked\x1b[0m");
    }

    let summary_color = if errors > 0 {
        "\x1b[31m"
    } else if warnings > 0 {
        "\x1b[33m"
    } else {
        "\x1b[32m"
    };

    println!(
        "{}Found {} error(s), {} warning(s), {} info(s) in {} file(s)\x1b[0m",
        summary_color, errors, warnings, infos, report.files_scanned
    );
}

/// Renders a finding with its source snippet, or as plain text when the file
/// can no longer be read.
fn render(finding: &Finding, root: &Path) -> String {
    let Ok(text) = std::fs::read_to_string(root.join(&finding.source)) else {
        return finding.format();
    };
    let name = finding.source.display().to_string();
    let report = Report::new(FindingDiagnostic::from(finding)).with_source_code(NamedSource::new(name, text));
    format!("{report:?}")
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "\x1b[31m",
        Severity::Warn => "\x1b[33m",
        Severity::Info => "\x1b[34m",
    }
}

fn print_json(report: &ScanReport) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    println!("{json}");
    Ok(())
}

fn print_compact(report: &ScanReport) {
    for finding in &report.findings {
        println!("{finding}");
    }
}
