//! Command-line argument definitions using clap

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::pipeline::RunOptions;

/// DCHB cluster - population-stratified k-means profiles of village census data
#[derive(Parser, Debug)]
#[command(name = "dchb-cluster")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Input file path (CSV or Parquet)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output directory. One sub-directory per domain is created inside it.
    /// Defaults to '<input stem>_clusters' next to the input file.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Domains to run (comma-separated). Defaults to every configured domain.
    #[arg(short, long, value_delimiter = ',')]
    pub domains: Vec<String>,

    /// JSON file with domain specs, replacing the built-in presets.
    /// Write a starting point with `dchb-cluster init-config <path>`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Number of clusters for every domain and tier, overriding the presets
    #[arg(short, long, value_parser = validate_cluster_count)]
    pub k: Option<usize>,

    /// Number of k-means restarts, overriding every domain and tier
    #[arg(long, value_parser = validate_restarts)]
    pub restarts: Option<usize>,

    /// Random seed for k-means++ seeding, overriding the presets
    #[arg(long)]
    pub seed: Option<u64>,

    /// Compute elbow curves (inertia for k = 1..max) for every clustered tier
    #[arg(long, default_value = "false")]
    pub elbow: bool,

    /// Largest k in the elbow sweep, overriding the presets
    #[arg(long, value_parser = validate_cluster_count)]
    pub elbow_max: Option<usize>,

    /// Package the output directory into '<output>.zip' after export
    #[arg(long, default_value = "false")]
    pub bundle: bool,

    /// Skip interactive confirmation prompts
    #[arg(long, default_value = "false")]
    pub no_confirm: bool,

    /// Log pipeline details (imputations, per-tier fits) at info level.
    /// RUST_LOG takes precedence when set.
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,

    /// Number of rows to use for schema inference (CSV only).
    /// Use 0 for full table scan.
    #[arg(long, default_value = "10000")]
    pub infer_schema_length: usize,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the configured domains and their clustering parameters
    Domains {
        /// JSON file with domain specs (defaults to the built-in presets)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write the built-in domain presets as JSON for editing
    InitConfig {
        /// Destination path for the JSON file
        path: PathBuf,

        /// Overwrite the file if it already exists
        #[arg(long, default_value = "false")]
        force: bool,
    },
}

impl Cli {
    /// Get the input path, if provided
    pub fn input(&self) -> Option<&PathBuf> {
        self.input.as_ref()
    }

    /// Get the output directory, deriving it from the input if not given.
    /// The derived directory sits next to the input with a '_clusters' suffix.
    pub fn output_dir(&self) -> Option<PathBuf> {
        if let Some(output) = &self.output {
            return Some(output.clone());
        }
        let input = self.input.as_ref()?;
        let parent = input.parent().unwrap_or_else(|| Path::new("."));
        let stem = input
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("output");
        Some(parent.join(format!("{}_clusters", stem)))
    }

    /// Run-wide overrides collected from the flags
    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            k: self.k,
            restarts: self.restarts,
            seed: self.seed,
            elbow: self.elbow,
            elbow_max: self.elbow_max,
        }
    }
}

/// Validator for cluster counts (k and elbow max)
fn validate_cluster_count(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("cluster count must be at least 1".to_string())
    } else {
        Ok(value)
    }
}

/// Validator for restart counts
fn validate_restarts(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid count", s))?;

    if value == 0 {
        Err("restarts must be at least 1".to_string())
    } else {
        Ok(value)
    }
}
