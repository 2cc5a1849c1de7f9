//! Tests for distance inversion and constant imputation

use dchb_cluster::pipeline::schema::resolve;
use dchb_cluster::pipeline::*;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn impute_rule(column: &str, value: f64, tiers: Vec<Tier>) -> ResolvedImpute {
    ResolvedImpute {
        column: column.to_string(),
        value,
        reason: "test default".to_string(),
        tiers,
    }
}

#[test]
fn test_invert_distances_maps_to_accessibility() {
    let df = df! {
        "Distance" => [0.0f64, 2.5, 15.0],
        "Other" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();
    let (out, warnings) = invert_distances(df, &["Distance".to_string()], 15.0).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(f64_values(&out, "Distance"), vec![Some(15.0), Some(12.5), Some(0.0)]);
    assert_eq!(f64_values(&out, "Other"), vec![Some(1.0), Some(2.0), Some(3.0)]);
}

#[test]
fn test_non_numeric_distances_become_missing_with_warning() {
    let df = df! {
        "Distance" => [Some("3"), Some("far"), None, Some("20")],
    }
    .unwrap();
    let (out, warnings) = invert_distances(df, &["Distance".to_string()], 15.0).unwrap();

    assert_eq!(f64_values(&out, "Distance"), vec![Some(12.0), None, None, None]);
    assert_eq!(
        warnings,
        vec![
            ValueCoercionWarning {
                column: "Distance".to_string(),
                count: 1,
                reason: CoercionReason::NotNumeric,
            },
            ValueCoercionWarning {
                column: "Distance".to_string(),
                count: 1,
                reason: CoercionReason::OutOfRange,
            },
        ]
    );
}

#[test]
fn test_missing_distance_stays_missing_without_warning() {
    let df = df! { "Distance" => [Some(1.0f64), None] }.unwrap();
    let (out, warnings) = invert_distances(df, &["Distance".to_string()], 15.0).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(f64_values(&out, "Distance"), vec![Some(14.0), None]);
}

#[test]
fn test_inverting_twice_restores_values() {
    let df = df! { "Distance" => [0.0f64, 1.5, 7.0, 15.0] }.unwrap();
    let cols = ["Distance".to_string()];
    let (once, _) = invert_distances(df.clone(), &cols, 15.0).unwrap();
    let (twice, _) = invert_distances(once, &cols, 15.0).unwrap();

    assert_eq!(f64_values(&twice, "Distance"), f64_values(&df, "Distance"));
}

#[test]
fn test_impute_fills_only_missing_values() {
    let df = df! { "Canal.Area" => [Some(10.0f64), None, Some(0.0)] }.unwrap();
    let rules = vec![impute_rule("Canal.Area", 39.9, vec![Tier::Small])];

    let small = impute(df.clone(), &rules, Some(Tier::Small)).unwrap();
    assert_eq!(
        f64_values(&small, "Canal.Area"),
        vec![Some(10.0), Some(39.9), Some(0.0)]
    );

    let high = impute(df.clone(), &rules, Some(Tier::High)).unwrap();
    assert_eq!(f64_values(&high, "Canal.Area"), vec![Some(10.0), None, Some(0.0)]);

    let unscoped = impute(df, &rules, None).unwrap();
    assert_eq!(
        f64_values(&unscoped, "Canal.Area"),
        vec![Some(10.0), None, Some(0.0)],
        "tier-scoped rules do not run before segmentation"
    );
}

#[test]
fn test_transform_runs_inversion_before_unscoped_imputation() {
    let df = df! {
        "District.Name" => ["a", "b"],
        "Village.Name" => ["x", "y"],
        POPULATION_COLUMN => [100i64, 200],
        "Schools" => [1.0f64, 2.0],
        "Distance" => [Some(5.0f64), None],
    }
    .unwrap();
    let mut spec = village_domain(2);
    spec.imputations = vec![ImputeRule {
        column: NamePattern::Exact("Distance".to_string()),
        value: 12.78,
        reason: "regional mean".to_string(),
        tiers: Vec::new(),
    }];

    let schema = resolve(&village_columns(), &spec).unwrap();
    let out = transform(df, &schema, spec.distance.ceiling).unwrap();

    // The imputed constant is already on the accessibility scale
    assert_eq!(f64_values(&out.table, "Distance"), vec![Some(10.0), Some(12.78)]);
    assert!(out.warnings.is_empty());
}

#[test]
fn test_transform_leaves_population_alone() {
    let df = create_village_dataframe();
    let schema = resolve(&village_columns(), &village_domain(2)).unwrap();
    let out = transform(df.clone(), &schema, 15.0).unwrap();

    assert_eq!(
        f64_values(&out.table, POPULATION_COLUMN),
        f64_values(&df, POPULATION_COLUMN)
    );
    assert_eq!(
        f64_values(&out.table, "Distance")[0],
        Some(13.0),
        "first village is 2 units away"
    );
}

#[test]
fn test_coerce_numeric_reports_unparseable_text() {
    let df = df! {
        "Schools" => [Some("1"), Some("2.5"), Some("NA"), None],
        "Wells" => [1i64, 2, 3, 4],
    }
    .unwrap();
    let columns = ["Schools".to_string(), "Wells".to_string()];
    let (out, warnings) = coerce_numeric(df, &columns).unwrap();

    assert_eq!(
        f64_values(&out, "Schools"),
        vec![Some(1.0), Some(2.5), None, None]
    );
    assert_eq!(out.column("Wells").unwrap().dtype(), &DataType::Float64);
    assert_eq!(
        warnings,
        vec![ValueCoercionWarning {
            column: "Schools".to_string(),
            count: 1,
            reason: CoercionReason::NotNumeric,
        }]
    );
}
