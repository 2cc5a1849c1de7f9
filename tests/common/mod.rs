//! Shared test utilities and fixture generators

#![allow(dead_code)]

use dchb_cluster::pipeline::{
    ClusterSpec, ColumnSelection, DistanceSpec, DomainSpec, ElbowSpec, MissingPolicy, NamePattern,
    ScalingSpec, TierSpec, TierSpecs, POPULATION_COLUMN,
};
use polars::prelude::*;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

/// Populations of the 12-village fixture: 3 small, 4 medium, 5 high.
pub const POPULATIONS: [i64; 12] = [
    200, 500, 900, 1100, 1500, 2000, 2400, 2600, 3000, 5000, 8000, 10000,
];

/// Create the 12-village test table
///
/// Columns:
/// - `District.Name`, `Village.Name`: identifiers (strings)
/// - `Total.Population.of.Village`: population (see [`POPULATIONS`])
/// - `Schools`: count indicator, varying within every tier
/// - `Distance`: distance to facility in [0, 15], varying within every tier
pub fn create_village_dataframe() -> DataFrame {
    df! {
        "District.Name" => ["North", "North", "North", "North", "South", "South",
                            "South", "South", "East", "East", "East", "East"],
        "Village.Name" => ["v01", "v02", "v03", "v04", "v05", "v06",
                           "v07", "v08", "v09", "v10", "v11", "v12"],
        POPULATION_COLUMN => POPULATIONS,
        "Schools" => [1.0f64, 2.0, 8.0, 1.0, 2.0, 7.0, 9.0, 2.0, 3.0, 10.0, 12.0, 15.0],
        "Distance" => [2.0f64, 10.0, 3.0, 1.0, 12.0, 4.0, 11.0, 0.5, 13.0, 2.5, 14.0, 6.0],
    }
    .unwrap()
}

/// Column names of the village fixture
pub fn village_columns() -> Vec<String> {
    create_village_dataframe()
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Domain spec over the village fixture: both indicators scaled, `Distance`
/// inverted, identifiers excluded from the profile.
pub fn village_domain(k: usize) -> DomainSpec {
    DomainSpec {
        name: "village".to_string(),
        selection: ColumnSelection::Names(village_columns()),
        population_column: POPULATION_COLUMN.to_string(),
        distance: DistanceSpec {
            patterns: vec![NamePattern::Exact("Distance".to_string())],
            ..DistanceSpec::default()
        },
        imputations: Vec::new(),
        scaling: ScalingSpec {
            columns: ColumnSelection::Names(vec!["Schools".to_string(), "Distance".to_string()]),
            missing: MissingPolicy::ZeroFill,
            overrides: BTreeMap::new(),
        },
        clustering: ClusterSpec {
            k,
            restarts: 4,
            seed: 42,
            max_iterations: 300,
        },
        elbow: ElbowSpec {
            max_clusters: 3,
            ..ElbowSpec::default()
        },
        tiers: TierSpecs::uniform(TierSpec {
            aggregate_excludes: vec![0, 1],
            ..TierSpec::default()
        }),
        profile_zero_variance: true,
    }
}

/// Build a feature matrix from row slices
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> faer::Mat<f64> {
    let ncols = rows.first().map_or(0, |r| r.len());
    let mut m = faer::Mat::<f64>::zeros(rows.len(), ncols);
    for (i, row) in rows.iter().enumerate() {
        for (j, &x) in row.iter().enumerate() {
            m[(i, j)] = x;
        }
    }
    m
}

/// Two tight, well separated blobs of `per_blob` points each in 2-D
pub fn two_blobs(per_blob: usize) -> faer::Mat<f64> {
    let mut rows = Vec::with_capacity(per_blob * 2);
    for i in 0..per_blob {
        let jitter = i as f64 * 0.01;
        rows.push(vec![-10.0 + jitter, -10.0 - jitter]);
    }
    for i in 0..per_blob {
        let jitter = i as f64 * 0.01;
        rows.push(vec![10.0 - jitter, 10.0 + jitter]);
    }
    matrix_from_rows(&rows)
}

/// Values of a column as `Option<f64>`
pub fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
    df.column(name)
        .unwrap()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .iter()
        .collect()
}

/// Cluster labels of a labeled tier table
pub fn cluster_labels(df: &DataFrame) -> Vec<u32> {
    df.column("Clusters")
        .unwrap()
        .u32()
        .unwrap()
        .into_no_null_iter()
        .collect()
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("villages.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();

    (temp_dir, csv_path)
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("villages.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}
