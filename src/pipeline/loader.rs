//! Dataset loader for CSV and Parquet files with column-name normalization

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use polars::prelude::*;

use crate::utils::{create_spinner, finish_with_success};

/// Suffix polars appends to repeated CSV headers.
const POLARS_DUPLICATE_MARKER: &str = "_duplicated_";

/// Load a dataset from a file (CSV or Parquet based on extension) and
/// normalize its column names.
///
/// # Arguments
/// * `path` - CSV or Parquet file
/// * `infer_schema_length` - Rows used for CSV schema inference, 0 for a full scan
pub fn load_dataset(path: &Path, infer_schema_length: usize) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => anyhow::bail!(
            "Unsupported file format: {}. Supported formats: csv, parquet",
            extension
        ),
    };

    let mut df = lf
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;
    normalize_column_names(&mut df)?;
    Ok(df)
}

/// Load a dataset behind a spinner and return it with its shape and
/// estimated memory footprint in MB.
pub fn load_dataset_with_progress(
    path: &Path,
    infer_schema_length: usize,
) -> Result<(DataFrame, usize, usize, f64)> {
    let spinner = create_spinner(&format!("Reading {}...", path.display()));
    let df = load_dataset(path, infer_schema_length)?;
    let (rows, cols) = df.shape();
    let memory_mb = df.estimated_size() as f64 / (1024.0 * 1024.0);
    finish_with_success(&spinner, &format!("Loaded {} rows x {} columns", rows, cols));
    Ok((df, rows, cols, memory_mb))
}

/// Trim a header and collapse every whitespace run into a single `.`.
pub fn normalize_column_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(".")
}

/// Strip polars' `_duplicated_N` suffix so repeated headers can be renamed
/// consistently.
fn strip_duplicate_marker(name: &str) -> &str {
    match name.rfind(POLARS_DUPLICATE_MARKER) {
        Some(pos)
            if name[pos + POLARS_DUPLICATE_MARKER.len()..]
                .chars()
                .all(|c| c.is_ascii_digit())
                && pos + POLARS_DUPLICATE_MARKER.len() < name.len() =>
        {
            &name[..pos]
        }
        _ => name,
    }
}

/// Normalize a list of headers, suffixing repeats with `.1`, `.2`, ... in
/// order of appearance.
pub fn normalize_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());

    for raw in names {
        let base = normalize_column_name(strip_duplicate_marker(raw.as_ref()));
        let mut candidate = base.clone();
        let mut n = 1;
        while taken.contains(&candidate) {
            candidate = format!("{}.{}", base, n);
            n += 1;
        }
        taken.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

/// Rename every column of `df` to its normalized, de-duplicated form.
pub fn normalize_column_names(df: &mut DataFrame) -> PolarsResult<()> {
    let names = normalize_names(&get_column_names(df));
    df.set_column_names(names)
}

/// Column names of a table as owned strings, in order.
pub fn get_column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_column_name() {
        assert_eq!(
            normalize_column_name("  Total Population of Village "),
            "Total.Population.of.Village"
        );
        assert_eq!(normalize_column_name("Canal\t\tArea"), "Canal.Area");
    }

    #[test]
    fn test_strip_duplicate_marker() {
        assert_eq!(strip_duplicate_marker("Distance_duplicated_0"), "Distance");
        assert_eq!(strip_duplicate_marker("Distance_duplicated_x"), "Distance_duplicated_x");
        assert_eq!(strip_duplicate_marker("Distance_duplicated_"), "Distance_duplicated_");
    }

    #[test]
    fn test_repeated_headers_get_numeric_suffixes() {
        let names = normalize_names(&["Distance", "Distance_duplicated_0", "Distance_duplicated_1"]);
        assert_eq!(names, vec!["Distance", "Distance.1", "Distance.2"]);
    }
}
