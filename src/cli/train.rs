//! Train command

use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use std::process::ExitCode;

use pyrefine::classifier::train_from_path;

pub(super) fn run(data: &Path, model_path: &Path) -> Result<ExitCode> {
    let report = train_from_path(data, model_path)
        .with_context(|| format!("Training on {} failed", data.display()))?;
    println!("{}", report);
    println!(
        "{} model written to {}",
        style("✓").green(),
        model_path.display()
    );
    Ok(ExitCode::SUCCESS)
}
