//! CLI command definitions and handlers

mod analyze;
mod fix;
mod predict;
mod train;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pyrefine::config::RunConfig;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Parse a probability threshold within [0, 1]
fn parse_threshold(s: &str) -> Result<f64, String> {
    let p: f64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err("threshold must be within [0, 1]".to_string())
    }
}

/// pyrefine - pattern-driven Python refactoring
#[derive(Parser, Debug)]
#[command(name = "pyrefine")]
#[command(
    version,
    about = "Detect and rewrite non-idiomatic Python: append loops, nested ifs and if/elif dispatch chains",
    after_help = "\
Examples:
  pyrefine analyze src/                        Report issues for every .py file
  pyrefine fix app.py -o out/                  Write the rewritten file to out/app.py
  pyrefine fix src/ --use-risk-filter          Keep only rewrites the model deems safe
  pyrefine train --data rewrites.csv           Fit the risk model
  pyrefine predict --before a.py --after b.py  Score one rewrite"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel workers (1-64, default: all cores)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Configuration file (default: ./pyrefine.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print issues for every file, including clean ones
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Filter directive used when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.log_level
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report anti-patterns without rewriting anything
    Analyze {
        /// Python file or directory
        path: PathBuf,
    },

    /// Rewrite anti-patterns and write the results to an output directory
    Fix {
        /// Python file or directory
        path: PathBuf,

        /// Output directory
        #[arg(long, short = 'o', default_value = "refactored_code")]
        output: PathBuf,

        /// Discard rewrites the risk model scores above the threshold
        #[arg(long)]
        use_risk_filter: bool,

        /// Risk threshold (0-1)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,

        /// Risk model path
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Train the risk model from labelled rewrites (CSV or JSON)
    Train {
        /// Dataset with code_before, code_after and error_introduced columns
        #[arg(long)]
        data: PathBuf,

        /// Where to write the model
        #[arg(long)]
        model: Option<PathBuf>,
    },

    /// Score a single before/after pair with the risk model
    Predict {
        #[arg(long)]
        before: PathBuf,

        #[arg(long)]
        after: PathBuf,

        /// Risk model path
        #[arg(long)]
        model: Option<PathBuf>,

        /// Risk threshold (0-1)
        #[arg(long, value_parser = parse_threshold)]
        threshold: Option<f64>,
    },
}

/// Run the parsed command on a worker pool sized by `--workers`.
pub fn run(cli: Cli) -> Result<ExitCode> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(workers) = cli.workers {
        builder = builder.num_threads(workers);
    }
    let pool = builder.build().context("Failed to start worker pool")?;

    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let mut config = RunConfig::load(cli.config.as_deref(), &cwd)?;
    let verbose = cli.verbose;

    pool.install(move || match cli.command {
        Commands::Analyze { path } => analyze::run(&path, verbose),

        Commands::Fix {
            path,
            output,
            use_risk_filter,
            threshold,
            model,
        } => {
            config.use_risk_filter |= use_risk_filter;
            if let Some(threshold) = threshold {
                config.risk_threshold = threshold;
            }
            if let Some(model) = model {
                config.model_path = model;
            }
            fix::run(&path, &output, verbose, config)
        }

        Commands::Train { data, model } => {
            let model_path = model.unwrap_or(config.model_path);
            train::run(&data, &model_path)
        }

        Commands::Predict {
            before,
            after,
            model,
            threshold,
        } => {
            if let Some(threshold) = threshold {
                config.risk_threshold = threshold;
            }
            if let Some(model) = model {
                config.model_path = model;
            }
            predict::run(&before, &after, &config)
        }
    })
}

/// Files to process for `path`: the file itself, or every `.py` file below
/// a directory in path order. `None` when the path does not exist.
fn input_files(path: &Path) -> Option<Vec<PathBuf>> {
    if path.is_file() {
        return Some(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        println!("The path {} is not a valid file or directory.", path.display());
        return None;
    }

    let walker = WalkBuilder::new(path).standard_filters(false).build();
    let mut files: Vec<PathBuf> = walker
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "py"))
        .collect();
    files.sort();
    Some(files)
}
