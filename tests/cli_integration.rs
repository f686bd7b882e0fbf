//! End-to-end tests for the tablepack CLI

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

use tablepack::parser::ParserFactory;

fn cmd() -> Command {
    Command::cargo_bin("tablepack").expect("binary builds")
}

fn write_sales_csv(path: &Path, rows: usize) {
    let mut content = String::from("date,store_nbr,unit_sales,family\n");
    for i in 0..rows {
        content.push_str(&format!(
            "2017-08-{:02},{},{}.5,family_{}\n",
            (i % 28) + 1,
            (i / 28) % 4 + 1,
            i,
            i % 13
        ));
    }
    fs::write(path, content).expect("write csv");
}

#[test]
fn convert_csv_to_parquet_and_back() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("sales.csv");
    let parquet_path = dir.path().join("sales.parquet");
    write_sales_csv(&csv_path, 100);

    cmd()
        .args([
            "convert",
            csv_path.to_str().unwrap(),
            parquet_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 100 rows"));

    let table = ParserFactory::new().parse(&parquet_path).unwrap();
    assert_eq!(table.row_count(), 100);
    assert_eq!(table.column_count(), 4);
}

#[test]
fn convert_with_calendar_columns() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("sales.csv");
    let out_path = dir.path().join("fact.parquet");
    write_sales_csv(&csv_path, 10);

    cmd()
        .args([
            "convert",
            csv_path.to_str().unwrap(),
            out_path.to_str().unwrap(),
            "--calendar",
            "date",
        ])
        .assert()
        .success();

    let table = ParserFactory::new().parse(&out_path).unwrap();
    let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["date", "store_nbr", "unit_sales", "family", "year", "month", "week", "dow"]
    );
}

#[test]
fn pack_splits_into_parts_and_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("train.csv");
    let out_dir = dir.path().join("processed");
    write_sales_csv(&csv_path, 5_000);

    cmd()
        .args([
            "pack",
            csv_path.to_str().unwrap(),
            "--out",
            out_dir.to_str().unwrap(),
            "--target-mb",
            "0.02",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("train part 0:"))
        .stdout(predicate::str::contains("Packages written to:"));

    let package_dir = out_dir.join("train");
    let parts = fs::read_dir(&package_dir).unwrap().count();
    assert!(parts > 1, "expected multiple parts, got {}", parts);

    let table = ParserFactory::new().parse(&package_dir).unwrap();
    assert_eq!(table.row_count(), 5_000);
}

#[test]
fn prepare_pipeline_partitions_train_only() {
    let dir = tempfile::tempdir().unwrap();
    let raw_dir = dir.path().join("raw");
    let out_dir = dir.path().join("processed");
    fs::create_dir_all(&raw_dir).unwrap();
    write_sales_csv(&raw_dir.join("train.csv"), 2_000);
    fs::write(
        raw_dir.join("oil.csv"),
        "date,dcoilwtico\n2017-08-01,49.2\n2017-08-02,\n",
    )
    .unwrap();

    cmd()
        .args([
            "prepare",
            "--raw-dir",
            raw_dir.to_str().unwrap(),
            "--out-dir",
            out_dir.to_str().unwrap(),
            "--only",
            "oil,train",
            "--target-mb",
            "0.02",
        ])
        .assert()
        .success();

    assert!(out_dir.join("oil.parquet").is_file());
    assert!(out_dir.join("train").join("part_0.parquet").is_file());
}

#[test]
fn aggregate_writes_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("sales.csv");
    let out_path = dir.path().join("store_daily.csv");
    write_sales_csv(&csv_path, 200);

    cmd()
        .args([
            "aggregate",
            csv_path.to_str().unwrap(),
            "--group",
            "store_nbr",
            "--date-col",
            "date",
            "--grain",
            "daily",
            "--sum",
            "unit_sales",
            "--out",
            out_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let table = ParserFactory::new().parse(&out_path).unwrap();
    let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["store_nbr", "date", "unit_sales_sum"]);
    // 4 stores over 28 distinct days
    assert_eq!(table.row_count(), 112);
}

#[test]
fn aggregate_without_metrics_fails() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("sales.csv");
    write_sales_csv(&csv_path, 10);

    cmd()
        .args([
            "aggregate",
            csv_path.to_str().unwrap(),
            "--group",
            "store_nbr",
        ])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("No metrics requested"));
}

#[test]
fn quality_reports_issues_with_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("dirty.csv");
    fs::write(
        &csv_path,
        "id,family\n1,grocery\n2,\n1,grocery\n",
    )
    .unwrap();

    let output = cmd()
        .args(["quality", csv_path.to_str().unwrap(), "--format", "json"])
        .assert()
        .code(1)
        .get_output()
        .stdout
        .clone();

    let report: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(report["rows"], 3);
    assert_eq!(report["duplicate_count"], 1);
    assert_eq!(report["missing_by_column"][0]["column"], "family");
}

#[test]
fn quality_clean_table_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("clean.csv");
    fs::write(&csv_path, "id,family\n1,grocery\n2,beverages\n").unwrap();

    cmd()
        .args(["quality", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No quality issues found."));
}

#[test]
fn quality_html_report_file() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("dirty.csv");
    let report_path = dir.path().join("report.html");
    fs::write(&csv_path, "id,city\n1, Quito\n2,Guayaquil\n").unwrap();

    cmd()
        .args([
            "quality",
            csv_path.to_str().unwrap(),
            "--format",
            "html",
            "--out",
            report_path.to_str().unwrap(),
        ])
        .assert()
        .code(1);

    let html = fs::read_to_string(&report_path).unwrap();
    assert!(html.contains("<title>Data Quality Report"));
    assert!(html.contains("Suspicious strings"));
}
