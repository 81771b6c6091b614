//! Predict command: score one before/after pair

use anyhow::{Context, Result};
use console::style;
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use pyrefine::classifier::{extract_features, RiskClassifier};
use pyrefine::config::RunConfig;

pub(super) fn run(before: &Path, after: &Path, config: &RunConfig) -> Result<ExitCode> {
    let before_src =
        fs::read_to_string(before).with_context(|| format!("Failed to read {}", before.display()))?;
    let after_src =
        fs::read_to_string(after).with_context(|| format!("Failed to read {}", after.display()))?;

    let features = extract_features(&before_src, &after_src);
    let classifier = RiskClassifier::new(&config.model_path);
    let probability = classifier.predict_features(&features)?;
    let decision = config.gate().decide(probability);

    for (key, value) in features.to_named() {
        println!("{:<20} {}", key, value);
    }
    println!("{} {:.4}", style("Error probability:").bold(), probability);
    println!("{} {}", style("Decision:").bold(), decision);
    Ok(ExitCode::SUCCESS)
}
