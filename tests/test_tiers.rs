//! Tests for population tier segmentation

use dchb_cluster::pipeline::*;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

#[test]
fn test_segment_fixture_sizes() {
    let df = create_village_dataframe();
    let split = segment(&df, POPULATION_COLUMN).unwrap();

    assert_eq!(split.small.height(), 3);
    assert_eq!(split.medium.height(), 4);
    assert_eq!(split.high.height(), 5);
    assert_eq!(split.excluded, 0);
}

#[test]
fn test_every_row_lands_in_exactly_one_tier() {
    let df = create_village_dataframe();
    let split = segment(&df, POPULATION_COLUMN).unwrap();

    let mut seen: Vec<String> = Vec::new();
    for tier in Tier::ALL {
        let names = split.get(tier).column("Village.Name").unwrap().str().unwrap().clone();
        for name in names.into_no_null_iter() {
            assert!(!seen.contains(&name.to_string()), "{} appears in two tiers", name);
            seen.push(name.to_string());
        }
    }
    assert_eq!(seen.len(), df.height());
}

#[test]
fn test_tier_boundaries_are_half_open_then_closed() {
    let df = df! {
        "pop" => [0.0f64, 999.0, 999.999, 1000.0, 2500.0, 2500.001, 100000.0],
    }
    .unwrap();
    let split = segment(&df, "pop").unwrap();

    assert_eq!(f64_values(&split.small, "pop"), vec![Some(0.0), Some(999.0), Some(999.999)]);
    assert_eq!(f64_values(&split.medium, "pop"), vec![Some(1000.0), Some(2500.0)]);
    assert_eq!(f64_values(&split.high, "pop"), vec![Some(2500.001), Some(100000.0)]);
}

#[test]
fn test_missing_and_negative_population_excluded() {
    let df = df! {
        "pop" => [Some(100i64), None, Some(-5), Some(3000)],
        "x" => [1.0f64, 2.0, 3.0, 4.0],
    }
    .unwrap();
    let split = segment(&df, "pop").unwrap();

    assert_eq!(split.excluded, 2, "missing and negative rows are excluded");
    assert_eq!(split.small.height() + split.medium.height() + split.high.height(), 2);
}

#[test]
fn test_unparseable_population_excluded() {
    let df = df! {
        "pop" => ["100", "n/a", "2000"],
    }
    .unwrap();
    let split = segment(&df, "pop").unwrap();

    assert_eq!(split.excluded, 1);
    assert_eq!(split.small.height(), 1);
    assert_eq!(split.medium.height(), 1);
}

#[test]
fn test_missing_population_column_is_schema_error() {
    let df = df! { "x" => [1.0f64] }.unwrap();
    let err = segment(&df, POPULATION_COLUMN).unwrap_err();

    assert!(err.is_fatal());
    assert!(matches!(
        err,
        PipelineError::Schema(SchemaError::MissingColumn { .. })
    ));
}

#[test]
fn test_segment_leaves_source_untouched() {
    let df = create_village_dataframe();
    let before = df.clone();
    let _ = segment(&df, POPULATION_COLUMN).unwrap();
    assert!(df.equals(&before));
}
