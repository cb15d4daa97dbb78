use std::sync::Arc;

use lb_budget::analysis::{compare_totals, district_totals, funding_counts, unused_funds, FundingCounts};
use lb_budget::ingestion::{
    process_files, process_paths, InMemoryCache, IngestionFormat, IngestionOptions, Pipeline, ProcessCache, RawFile,
};
use lb_budget::types::{columns, DataSet, Schema, Value};
use lb_budget::IngestionError;

const HEADER: &str = "Code,LBType,Tot,TotExp,Sector,District\n";

fn csv_file(name: &str, body: &str) -> RawFile {
    RawFile::new(name, format!("{HEADER}{body}"))
}

fn codes(ds: &DataSet) -> Vec<String> {
    ds.column(columns::CODE).unwrap().map(|v| v.to_string()).collect()
}

fn differences(ds: &DataSet) -> Vec<f64> {
    ds.column(columns::DIFFERENCE)
        .unwrap()
        .map(|v| v.as_f64().unwrap())
        .collect()
}

#[test]
fn two_file_example_drops_blank_code_and_keeps_order() {
    let a = csv_file("a.csv", "1,X,100,80,S1,D1\n");
    let b = csv_file("b.csv", ",Y,0,0,S2,D2\n2,Y,50,50,S2,D2\n");

    let ds = process_files(&[a, b], &IngestionOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(codes(&ds), vec!["1", "2"]);
    assert_eq!(differences(&ds), vec![20.0, 0.0]);
}

#[test]
fn empty_file_set_yields_canonical_empty_table() {
    let ds = process_files(&[], &IngestionOptions::default()).unwrap();
    assert_eq!(ds.row_count(), 0);
    assert_eq!(ds.schema, Schema::canonical());
}

#[test]
fn every_row_satisfies_the_output_contract() {
    let ds = process_paths(
        &["tests/fixtures/district_a.csv", "tests/fixtures/district_b.csv"],
        &IngestionOptions::default(),
    )
    .unwrap();

    for i in 0..ds.row_count() {
        let code = ds.value(i, columns::CODE).unwrap();
        assert!(matches!(code, Value::Utf8(s) if !s.is_empty()));

        let tot = ds.value(i, columns::TOT).unwrap().as_f64().unwrap();
        let exp = ds.value(i, columns::TOT_EXP).unwrap().as_f64().unwrap();
        let diff = ds.value(i, columns::DIFFERENCE).unwrap().as_f64().unwrap();
        assert_eq!(diff, tot - exp);
    }
}

#[test]
fn concatenation_follows_arrival_order() {
    let paths = ["tests/fixtures/district_a.csv", "tests/fixtures/district_b.csv"];
    let ab = process_paths(&paths, &IngestionOptions::default()).unwrap();
    assert_eq!(codes(&ab), vec!["KL-001", "KL-002", "KL-003", "KL-101", "KL-102"]);

    let ba = process_paths(&[paths[1], paths[0]], &IngestionOptions::default()).unwrap();
    assert_eq!(codes(&ba), vec!["KL-101", "KL-102", "KL-001", "KL-002", "KL-003"]);
}

#[test]
fn extra_columns_are_passed_through_and_null_filled() {
    let ds = process_paths(
        &["tests/fixtures/district_a.csv", "tests/fixtures/district_b.csv"],
        &IngestionOptions::default(),
    )
    .unwrap();
    let names: Vec<&str> = ds.schema.field_names().collect();
    assert_eq!(
        names,
        vec!["Code", "LBType", "Tot", "TotExp", "Sector", "District", "Ward", "Difference"]
    );
    assert_eq!(ds.value(0, "Ward"), Some(&Value::Int64(3)));
    assert_eq!(ds.value(3, "Ward"), Some(&Value::Null));
}

#[test]
fn schema_failure_in_any_file_fails_the_whole_call() {
    let good = RawFile::from_path("tests/fixtures/district_a.csv").unwrap();
    let bad = RawFile::from_path("tests/fixtures/missing_sector.csv").unwrap();

    let err = process_files(&[good, bad], &IngestionOptions::default()).unwrap_err();
    match err {
        IngestionError::SchemaMismatch { file, missing } => {
            assert_eq!(file, "missing_sector.csv");
            assert_eq!(missing, vec!["Sector"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn first_failing_file_wins() {
    let missing = RawFile::new("first.csv", "Code,Tot\n1,1\n");
    let unknown = RawFile::new("second.txt", "whatever");
    let err = process_files(&[missing, unknown], &IngestionOptions::default()).unwrap_err();
    assert_eq!(err.file(), Some("first.csv"));
}

#[test]
fn unsupported_extension_is_a_format_error() {
    let err = process_files(&[RawFile::new("budget.pdf", "%PDF")], &IngestionOptions::default())
        .unwrap_err();
    assert!(matches!(err, IngestionError::Format { ref file, .. } if file == "budget.pdf"));
}

#[test]
fn forced_csv_format_reads_any_name() {
    let opts = IngestionOptions {
        format: Some(IngestionFormat::Csv),
        ..Default::default()
    };
    let ds = process_files(&[csv_file("upload", "9,X,5,2,S,D\n")], &opts).unwrap();
    assert_eq!(differences(&ds), vec![3.0]);
}

#[test]
fn repeated_processing_is_idempotent() {
    let files = vec![
        RawFile::from_path("tests/fixtures/district_a.csv").unwrap(),
        RawFile::from_path("tests/fixtures/district_b.csv").unwrap(),
    ];
    let first = process_files(&files, &IngestionOptions::default()).unwrap();
    let second = process_files(&files, &IngestionOptions::default()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn pipeline_serves_identical_content_from_cache() {
    let cache = Arc::new(InMemoryCache::new());
    let pipeline = Pipeline::new(IngestionOptions::default()).with_cache(cache.clone());

    let files = vec![csv_file("a.csv", "1,X,100,80,S1,D1\n")];
    let first = pipeline.process(&files).unwrap();
    assert_eq!(cache.len(), 1);

    // Fresh RawFile values with the same bytes hit the same entry.
    let same = vec![csv_file("a.csv", "1,X,100,80,S1,D1\n")];
    let second = pipeline.process(&same).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);

    let edited = vec![csv_file("a.csv", "1,X,100,90,S1,D1\n")];
    let third = pipeline.process(&edited).unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
    assert_eq!(differences(&third), vec![10.0]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn pipeline_does_not_cache_failures() {
    let cache = Arc::new(InMemoryCache::new());
    let pipeline = Pipeline::default().with_cache(cache.clone());

    let bad = vec![RawFile::new("bad.csv", "Code\n1\n")];
    assert!(pipeline.process(&bad).is_err());
    assert!(cache.is_empty());
}

#[test]
fn cache_invalidation_forces_reprocessing() {
    let cache = Arc::new(InMemoryCache::new());
    let pipeline = Pipeline::default().with_cache(cache.clone());
    let files = vec![csv_file("a.csv", "1,X,1,1,S,D\n")];

    let first = pipeline.process(&files).unwrap();
    assert!(cache.invalidate(&pipeline.fingerprint(&files)));
    let second = pipeline.process(&files).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(*first, *second);
}

#[test]
fn uncached_pipeline_still_processes() {
    let out = Pipeline::default()
        .process(&[csv_file("a.csv", "1,X,3,1,S,D\n")])
        .unwrap();
    assert_eq!(differences(&out), vec![2.0]);
}

#[test]
fn analyses_run_on_unified_output() {
    let ds = process_paths(
        &["tests/fixtures/district_a.csv", "tests/fixtures/district_b.csv"],
        &IngestionOptions::default(),
    )
    .unwrap();

    let totals = compare_totals(&ds).unwrap();
    assert_eq!(totals.total_income, 120000.0 + 50000.0 + 25000.0 + 10000.0);
    assert_eq!(totals.total_expense, 95000.5 + 30000.0 + 10000.0);

    assert_eq!(
        funding_counts(&ds).unwrap(),
        FundingCounts {
            funded: 4,
            not_funded: 1
        }
    );

    let districts = district_totals(&ds).unwrap();
    assert_eq!(districts.len(), 2);
    assert_eq!(districts[0].district, "Idukki");
    assert_eq!(districts[1].total_income, 170000.0);

    assert_eq!(codes(&unused_funds(&ds).unwrap()), vec!["KL-002"]);
}
