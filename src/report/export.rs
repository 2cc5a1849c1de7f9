//! CSV export of labeled tier tables, cluster profiles and elbow curves,
//! plus zip packaging of a finished output directory

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::pipeline::{DomainRun, ElbowPoint, Tier};

/// File name stem for one (domain, tier) pair
pub fn tier_stem(domain: &str, tier: Tier) -> String {
    format!("{}_{}", domain, tier)
}

/// Write a DataFrame as CSV with a header row
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)
        .with_context(|| format!("Failed to write CSV: {}", path.display()))?;
    Ok(())
}

/// Elbow curve as a two-column table (`k`, `inertia`)
pub fn elbow_frame(points: &[ElbowPoint]) -> PolarsResult<DataFrame> {
    let ks: Vec<u32> = points.iter().map(|p| p.k as u32).collect();
    let inertia: Vec<f64> = points.iter().map(|p| p.inertia).collect();
    DataFrame::new(vec![
        Column::new("k".into(), ks),
        Column::new("inertia".into(), inertia),
    ])
}

/// Remove results left in `<output_dir>/<domain>/` by an earlier run.
fn clear_domain_dir(domain_dir: &Path) -> Result<()> {
    if domain_dir.is_dir() {
        std::fs::remove_dir_all(domain_dir).with_context(|| {
            format!("Failed to clear previous results: {}", domain_dir.display())
        })?;
    }
    Ok(())
}

/// Write every clustered tier of a domain into `<output_dir>/<domain>/`.
///
/// Previous results for the domain are removed first, so failed domains and
/// skipped tiers leave no files behind. Returns the paths written.
pub fn export_domain(run: &DomainRun, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let domain_dir = output_dir.join(&run.domain);
    clear_domain_dir(&domain_dir)?;

    let Some(output) = run.output() else {
        return Ok(Vec::new());
    };

    let mut written = Vec::new();

    for tier_run in &output.tiers {
        let Some(tier_out) = tier_run.output() else {
            continue;
        };
        if written.is_empty() {
            std::fs::create_dir_all(&domain_dir).with_context(|| {
                format!("Failed to create output directory: {}", domain_dir.display())
            })?;
        }

        let stem = tier_stem(&run.domain, tier_run.tier);

        let labeled_path = domain_dir.join(format!("{}.csv", stem));
        write_csv(&tier_out.labeled, &labeled_path)?;
        written.push(labeled_path);

        let profile_path = domain_dir.join(format!("{}_profile.csv", stem));
        write_csv(&tier_out.profile, &profile_path)?;
        written.push(profile_path);

        if let Some(points) = &tier_out.elbow {
            let elbow_path = domain_dir.join(format!("{}_elbow.csv", stem));
            write_csv(&elbow_frame(points)?, &elbow_path)?;
            written.push(elbow_path);
        }
    }

    Ok(written)
}

/// Export all domains. Returns every path written, in domain order.
pub fn export_runs(runs: &[DomainRun], output_dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let mut written = Vec::new();
    for run in runs {
        written.extend(export_domain(run, output_dir)?);
    }
    Ok(written)
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<_>>()?;
    entries.sort();

    for path in entries {
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

/// Package an output directory into a zip archive, keeping paths relative
/// to the directory.
pub fn package_output_dir(output_dir: &Path, zip_path: &Path) -> Result<usize> {
    use ::zip::write::SimpleFileOptions;
    use ::zip::{CompressionMethod, ZipWriter};

    let mut files = Vec::new();
    collect_files(output_dir, &mut files)?;

    let zip_file = File::create(zip_path)
        .with_context(|| format!("Failed to create zip file: {}", zip_path.display()))?;
    let mut archive = ZipWriter::new(zip_file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for path in &files {
        let relative = path.strip_prefix(output_dir).unwrap_or(path);
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        archive
            .start_file(name.as_str(), options)
            .with_context(|| format!("Failed to add {} to zip", name))?;
        let mut content = Vec::new();
        File::open(path)
            .with_context(|| format!("Failed to open file: {}", path.display()))?
            .read_to_end(&mut content)?;
        archive.write_all(&content)?;
    }

    archive.finish().context("Failed to finalize zip file")?;
    Ok(files.len())
}

/// Default archive path for an output directory: a sibling `<dir>.zip`.
pub fn bundle_path(output_dir: &Path) -> PathBuf {
    let name = output_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("output");
    let parent = output_dir.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.zip", name))
}
