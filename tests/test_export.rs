//! Tests for CSV export, the JSON run report and zip bundling

use dchb_cluster::pipeline::*;
use dchb_cluster::report::*;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

use common::*;

fn sample_runs(elbow: bool) -> Vec<DomainRun> {
    let df = create_village_dataframe();
    let mut broken = village_domain(2);
    broken.name = "broken".to_string();
    broken.population_column = "Missing.Population".to_string();

    let options = RunOptions {
        elbow,
        ..RunOptions::default()
    };
    run_domains(&df, &[village_domain(2), broken], &options)
}

#[test]
fn test_export_writes_tier_and_profile_files() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("clusters");

    let written = export_runs(&sample_runs(false), &out).unwrap();

    assert_eq!(written.len(), 6, "labeled + profile for three tiers");
    for tier in ["small", "medium", "high"] {
        assert!(out.join("village").join(format!("village_{}.csv", tier)).exists());
        assert!(out
            .join("village")
            .join(format!("village_{}_profile.csv", tier))
            .exists());
    }
    assert!(!out.join("broken").exists(), "failed domains write nothing");
}

#[test]
fn test_exported_tables_read_back() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("clusters");
    export_runs(&sample_runs(false), &out).unwrap();

    let labeled = load_dataset(&out.join("village").join("village_high.csv"), 100).unwrap();
    assert_shape(&labeled, 5, 6);
    assert_has_columns(&labeled, &["Clusters"]);

    let profile = load_dataset(&out.join("village").join("village_high_profile.csv"), 100).unwrap();
    assert_eq!(profile.height(), 2);
    assert_eq!(get_column_names(&profile)[0], "Clusters");
}

#[test]
fn test_elbow_csv_written_when_enabled() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("clusters");
    let written = export_runs(&sample_runs(true), &out).unwrap();

    assert_eq!(written.len(), 9);
    let elbow = load_dataset(&out.join("village").join("village_small_elbow.csv"), 100).unwrap();
    assert_eq!(get_column_names(&elbow), vec!["k", "inertia"]);
    assert_eq!(elbow.height(), 3);
}

#[test]
fn test_skipped_tiers_write_no_files() {
    let df = create_village_dataframe();
    let runs = run_domains(&df, &[village_domain(4)], &RunOptions::default());
    let temp_dir = TempDir::new().unwrap();

    let written = export_runs(&runs, temp_dir.path()).unwrap();
    assert_eq!(written.len(), 4);
    assert!(!temp_dir.path().join("village").join("village_small.csv").exists());
}

#[test]
fn test_run_report_records_outcomes() {
    let temp_dir = TempDir::new().unwrap();
    let runs = sample_runs(true);
    let report = RunReport::new(&runs, std::path::Path::new("villages.csv"), temp_dir.path());
    assert_eq!(report.failed_domains(), 1);

    let path = temp_dir.path().join("run_report.json");
    report.write_json(&path).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(json["metadata"]["input_file"], "villages.csv");
    let domains = json["domains"].as_array().unwrap();
    assert_eq!(domains[0]["domain"], "village");
    assert_eq!(domains[0]["status"], "ok");
    assert_eq!(domains[0]["tiers"][0]["tier"], "small");
    assert_eq!(domains[0]["tiers"][0]["status"], "clustered");
    assert_eq!(domains[0]["tiers"][0]["rows"], 3);
    assert_eq!(domains[0]["tiers"][2]["elbow"].as_array().unwrap().len(), 3);

    assert_eq!(domains[1]["status"], "failed");
    assert!(domains[1]["error"]
        .as_str()
        .unwrap()
        .contains("Missing.Population"));
}

#[test]
fn test_run_report_records_skip_reason() {
    let df = create_village_dataframe();
    let runs = run_domains(&df, &[village_domain(4)], &RunOptions::default());
    let report = RunReport::new(&runs, std::path::Path::new("in.csv"), std::path::Path::new("out"));
    let json = serde_json::to_value(&report).unwrap();

    let small = &json["domains"][0]["tiers"][0];
    assert_eq!(small["status"], "skipped");
    assert_eq!(small["detail"]["kind"], "too_few_rows");
    assert_eq!(small["detail"]["k"], 4);
}

#[test]
fn test_bundle_contains_every_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("clusters");
    let written = export_runs(&sample_runs(false), &out).unwrap();

    let zip_path = bundle_path(&out);
    assert_eq!(zip_path, temp_dir.path().join("clusters.zip"));

    let count = package_output_dir(&out, &zip_path).unwrap();
    assert_eq!(count, written.len());

    let archive = zip::ZipArchive::new(std::fs::File::open(&zip_path).unwrap()).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert!(names.contains(&"village/village_small.csv"));
    assert!(names.contains(&"village/village_high_profile.csv"));
}

#[test]
fn test_summary_rows_cover_tiers_and_failures() {
    let summary = RunSummary::from_runs(&sample_runs(false));

    assert_eq!(summary.rows.len(), 4, "three tiers plus one failed domain");
    assert_eq!(summary.clustered_tiers(), 3);
    assert!(summary.rows[3].status.starts_with("failed"));
    assert!(summary.to_table().to_string().contains("village"));
}

#[test]
fn test_reexport_clears_results_of_skipped_tiers() {
    let df = create_village_dataframe();
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("clusters");
    let small_csv = out.join("village").join("village_small.csv");

    let first = run_domains(&df, &[village_domain(2)], &RunOptions::default());
    export_runs(&first, &out).unwrap();
    assert!(small_csv.exists());

    let second = run_domains(&df, &[village_domain(4)], &RunOptions::default());
    assert!(second[0].output().unwrap().tiers[0].output().is_none());
    let written = export_runs(&second, &out).unwrap();

    assert!(!small_csv.exists(), "skipped tier keeps no stale table");
    assert!(!out.join("village").join("village_small_profile.csv").exists());
    let profile = load_dataset(&out.join("village").join("village_high_profile.csv"), 100).unwrap();
    assert_eq!(profile.height(), 4);

    let count = package_output_dir(&out, &bundle_path(&out)).unwrap();
    assert_eq!(count, written.len());
}

#[test]
fn test_reexport_clears_failed_domain() {
    let temp_dir = TempDir::new().unwrap();
    let out = temp_dir.path().join("clusters");
    let stale = out.join("broken").join("broken_small.csv");
    std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
    std::fs::write(&stale, "Clusters\n0\n").unwrap();

    export_runs(&sample_runs(false), &out).unwrap();
    assert!(!out.join("broken").exists());
}
