//! Fix command: rewrite files into an output directory
//!
//! Every input file lands in the output directory under its base name:
//! accepted rewrites as rewritten text, everything else unchanged.

use anyhow::{Context, Result};
use console::style;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::warn;

use pyrefine::classifier::GateDecision;
use pyrefine::config::RunConfig;
use pyrefine::pipeline::{FileOutcome, Refactorer};

#[derive(Default)]
struct Summary {
    rewritten: usize,
    discarded: usize,
    unchanged: usize,
    failed: usize,
}

pub(super) fn run(path: &Path, output: &Path, verbose: bool, config: RunConfig) -> Result<ExitCode> {
    let Some(files) = super::input_files(path) else {
        return Ok(ExitCode::FAILURE);
    };
    fs::create_dir_all(output)
        .with_context(|| format!("Failed to create output directory {}", output.display()))?;

    let refactorer = Refactorer::new(config).context("Failed to set up the risk filter")?;
    if refactorer.gate_enabled() && verbose {
        println!(
            "Risk filter enabled (threshold {})",
            refactorer.config().risk_threshold
        );
    }

    let outcomes: Vec<_> = files
        .par_iter()
        .map(|file| (file, refactorer.process_file(file)))
        .collect();

    let mut summary = Summary::default();
    for (file, outcome) in outcomes {
        let dest = destination(file, output)?;
        match outcome {
            Ok(outcome) => {
                if verbose {
                    super::analyze::print_report(file, &outcome.issues, true);
                    print_decision(&outcome);
                }
                match (outcome.is_rewritten(), outcome.decision) {
                    (true, _) => summary.rewritten += 1,
                    (false, Some(GateDecision::Discard)) => summary.discarded += 1,
                    (false, _) => summary.unchanged += 1,
                }
                fs::write(&dest, &outcome.output)
                    .with_context(|| format!("Failed to write {}", dest.display()))?;
            }
            Err(e) if e.is_classification_error() => {
                return Err(e).with_context(|| format!("Failed to score {}", file.display()));
            }
            Err(e) => {
                warn!("Could not process {}: {}", file.display(), e);
                summary.failed += 1;
                fs::copy(file, &dest)
                    .with_context(|| format!("Failed to copy {} to {}", file.display(), dest.display()))?;
            }
        }
    }

    if verbose {
        println!(
            "{} {} rewritten, {} discarded, {} unchanged, {} failed",
            style("Done:").green().bold(),
            summary.rewritten,
            summary.discarded,
            summary.unchanged,
            summary.failed
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn destination(file: &Path, output: &Path) -> Result<PathBuf> {
    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    Ok(output.join(name))
}

fn print_decision(outcome: &FileOutcome) {
    if let (Some(risk), Some(decision)) = (outcome.risk, outcome.decision) {
        let label = match decision {
            GateDecision::Accept => style(decision.to_string()).green(),
            GateDecision::Discard => style(decision.to_string()).red(),
        };
        println!("Risk {:.3}: {}", risk, label);
    }
    if outcome.log.is_lossy() && outcome.is_rewritten() {
        println!(
            "{} a chain branch was replaced with None",
            style("warning:").yellow().bold()
        );
    }
    for record in outcome.log.iter() {
        tracing::debug!("{} at {}: {:?}", record.rule, record.position, record.status);
    }
}
