//! dchb-cluster: Village Clustering CLI Tool
//!
//! Splits a village census table into population tiers per domain,
//! clusters each tier with k-means and exports labeled tables and
//! cluster profiles.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;

use dchb_cluster::cli::{confirm_overwrite, Cli, Commands};
use dchb_cluster::pipeline::{
    builtin_domains, filter_domains, load_dataset_with_progress, load_domain_specs,
    run_domains_with_progress, write_domain_specs, DomainRun, DomainSpec,
};
use dchb_cluster::report::{
    bundle_path, domains_table, export_runs, package_output_dir, RunReport, RunSummary,
};
use dchb_cluster::utils::{
    create_progress_bar, create_spinner, finish_with_success, finish_with_warning, print_banner,
    print_completion, print_config, print_count, print_info, print_step_header, print_step_time,
    print_success, print_warning, ConfigCard,
};

const RUN_REPORT_FILE: &str = "run_report.json";

fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();
}

fn domain_specs(config: Option<&Path>) -> Result<Vec<DomainSpec>> {
    match config {
        Some(path) => load_domain_specs(path),
        None => Ok(builtin_domains()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Handle subcommands
    if let Some(command) = &cli.command {
        return match command {
            Commands::Domains { config } => {
                let specs = domain_specs(config.as_deref())?;
                for line in domains_table(&specs).to_string().lines() {
                    println!("    {}", line);
                }
                Ok(())
            }
            Commands::InitConfig { path, force } => {
                if path.exists() && !force {
                    anyhow::bail!(
                        "{} already exists. Use --force to overwrite it.",
                        path.display()
                    );
                }
                write_domain_specs(&builtin_domains(), path)?;
                print_success(&format!("Wrote built-in domain presets to {}", path.display()));
                Ok(())
            }
        };
    }

    // Main clustering pipeline - require input
    let input = cli.input().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let output_dir = cli
        .output_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not derive an output directory"))?;

    let specs = filter_domains(domain_specs(cli.config.as_deref())?, &cli.domains)?;
    let domain_names: Vec<String> = specs.iter().map(|s| s.name.clone()).collect();
    let options = cli.run_options();

    if !cli.no_confirm && !confirm_overwrite(&output_dir)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&ConfigCard {
        input,
        output: &output_dir,
        domains: &domain_names,
        k: options.k,
        restarts: options.restarts,
        seed: options.seed,
        elbow: options.elbow,
    });

    // Step 1: Load dataset
    print_step_header(1, "Load Dataset");
    let step_start = Instant::now();
    let (df, rows, cols, memory_mb) = load_dataset_with_progress(input, cli.infer_schema_length)?;

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    print_step_time(step_start.elapsed());

    // Step 2: Cluster every domain
    print_step_header(2, "Cluster Domains");
    let step_start = Instant::now();
    let progress = create_progress_bar(specs.len() as u64, "Clustering");
    let runs = run_domains_with_progress(&df, &specs, &options, |_| progress.inc(1));

    let failed: Vec<&DomainRun> = runs.iter().filter(|r| !r.is_ok()).collect();
    if failed.is_empty() {
        finish_with_success(&progress, &format!("{} domain(s) clustered", runs.len()));
    } else {
        finish_with_warning(
            &progress,
            &format!("{} of {} domain(s) failed", failed.len(), runs.len()),
        );
        for run in &failed {
            if let Err(err) = &run.outcome {
                print_warning(&format!("{}: {}", run.domain, err));
            }
        }
    }

    let coercions: usize = runs
        .iter()
        .filter_map(|r| r.output())
        .map(|o| o.warnings.iter().map(|w| w.count).sum::<usize>())
        .sum();
    if coercions > 0 {
        print_count("value(s) coerced to missing", coercions, Some("(see run report)"));
    }
    print_step_time(step_start.elapsed());

    // Step 3: Export
    print_step_header(3, "Save Results");
    let step_start = Instant::now();
    let spinner = create_spinner("Writing tier tables and profiles...");
    let written = export_runs(&runs, &output_dir)?;
    let report_path = output_dir.join(RUN_REPORT_FILE);
    let report = RunReport::new(&runs, input, &output_dir);
    report.write_json(&report_path)?;
    finish_with_success(
        &spinner,
        &format!("Saved {} file(s) to {}", written.len() + 1, output_dir.display()),
    );

    if cli.bundle {
        let zip_path = bundle_path(&output_dir);
        let count = package_output_dir(&output_dir, &zip_path)
            .with_context(|| format!("Failed to bundle {}", output_dir.display()))?;
        print_info(&format!("Bundled {} file(s) into {}", count, zip_path.display()));
    }
    print_step_time(step_start.elapsed());

    RunSummary::from_runs(&runs).display();

    if report.failed_domains() > 0 {
        anyhow::bail!(
            "{} domain(s) failed; see {} for details",
            report.failed_domains(),
            report_path.display()
        );
    }

    print_completion();
    Ok(())
}
