//! Analyze command: report issues without rewriting

use anyhow::Result;
use console::style;
use rayon::prelude::*;
use std::path::Path;
use std::process::ExitCode;

use pyrefine::detectors::IssueReport;
use pyrefine::pipeline::analyze_source;

pub(super) fn run(path: &Path, verbose: bool) -> Result<ExitCode> {
    let Some(files) = super::input_files(path) else {
        return Ok(ExitCode::FAILURE);
    };

    let reports: Vec<_> = files
        .par_iter()
        .map(|file| {
            let report = std::fs::read_to_string(file)
                .map_err(anyhow::Error::from)
                .and_then(|source| analyze_source(&source).map_err(anyhow::Error::from));
            (file, report)
        })
        .collect();

    for (file, report) in reports {
        match report {
            Ok(report) => print_report(file, &report, verbose),
            Err(e) => eprintln!("{} {}: {}", style("error:").red().bold(), file.display(), e),
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Print `Line N: message` for every issue, grouped under the file name.
pub(super) fn print_report(file: &Path, report: &IssueReport, verbose: bool) {
    if report.is_empty() {
        if verbose {
            println!("No issues found in {}.", file.display());
        }
        return;
    }
    println!("Issues in {}:", style(file.display()).bold());
    for issue in report.iter() {
        println!("{}", issue);
    }
}
