// lpad/src/output.rs
//! Terminal rendering of install results.
use std::path::PathBuf;

use colored::Colorize;
use lpad_common::pipeline::{InstallReport, PackageOutcome};

pub fn banner(message: &str) {
    println!("{}{}", "==> ".bold().blue(), message.bold());
}

/// Per-package lines in verbose mode, then the summary. Stub paths go to
/// stdout either way so scripts can pick them up.
pub fn print_report(report: &InstallReport, verbose: bool) {
    if verbose {
        for outcome in &report.outcomes {
            match outcome {
                PackageOutcome::Installed { id, path, stubs } => {
                    println!("{} {} -> {}", "installed".green(), id, path.display());
                    for stub in stubs {
                        println!("  {} {}", "stub".cyan(), stub.display());
                    }
                }
                PackageOutcome::Skipped { id, path } => {
                    println!("{} {} ({})", "skipped".yellow(), id, path.display());
                }
                PackageOutcome::Failed { id, error } => {
                    println!("{} {}: {}", "failed".red(), id, error);
                }
            }
        }
    } else {
        print_paths(&report.stubs());
    }

    let summary = report.summary();
    let line = format!(
        "{} installed, {} skipped, {} failed, {} stub(s) written",
        summary.installed, summary.skipped, summary.failed, summary.stubs
    );
    if summary.failed > 0 {
        println!("{}", line.red().bold());
    } else {
        println!("{}", line.bold());
    }
    if report.degraded {
        println!(
            "{} resolver ran in degraded mode; package paths were guessed",
            "Warning:".yellow()
        );
    }
}

pub fn print_paths(paths: &[PathBuf]) {
    for path in paths {
        println!("{}", path.display());
    }
}
