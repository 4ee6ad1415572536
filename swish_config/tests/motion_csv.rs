use std::fs::File;
use std::io::Write;

use rstest::rstest;
use swish_config::{
    BaselineFile, PersistedProfile, baseline_to_toml, load_baseline_toml, load_motion_csv,
    parse_motion_csv,
};
use tempfile::tempdir;

#[rstest]
fn parses_rows_into_readings() {
    let csv = "timestamp_ms,ax,ay,az,gx,gy,gz\n0,0.0,0.0,9.81,0.0,0.0,0.0\n10, 1.5 ,0.0,9.7,12.0,0.0,-3.0\n";
    let rows = parse_motion_csv(csv.as_bytes()).expect("valid trace");
    assert_eq!(rows.len(), 2);
    let r = rows[1].to_reading();
    assert_eq!(r.timestamp_ms, 10);
    assert_eq!(r.accel, [1.5, 0.0, 9.7]);
    assert_eq!(r.gyro, [12.0, 0.0, -3.0]);
}

#[rstest]
#[case("ts,ax,ay,az,gx,gy,gz\n0,0,0,0,0,0,0\n")]
#[case("timestamp_ms,ax,ay,az\n0,0,0,0\n")]
#[case("timestamp_ms,ay,ax,az,gx,gy,gz\n0,0,0,0,0,0,0\n")]
fn rejects_wrong_headers(#[case] csv: &str) {
    let err = parse_motion_csv(csv.as_bytes()).expect_err("bad headers");
    assert!(format!("{err}").contains("must have headers"));
}

#[rstest]
fn rejects_non_numeric_row_with_line_number() {
    let csv = "timestamp_ms,ax,ay,az,gx,gy,gz\n0,0,0,9.8,0,0,0\n10,abc,0,9.8,0,0,0\n";
    let err = parse_motion_csv(csv.as_bytes()).expect_err("bad row");
    assert!(format!("{err}").contains("row 3"));
}

#[rstest]
fn rejects_non_finite_values() {
    let csv = "timestamp_ms,ax,ay,az,gx,gy,gz\n0,NaN,0,9.8,0,0,0\n";
    let err = parse_motion_csv(csv.as_bytes()).expect_err("NaN row");
    assert!(format!("{err}").contains("non-finite"));
}

#[rstest]
fn rejects_empty_trace() {
    let csv = "timestamp_ms,ax,ay,az,gx,gy,gz\n";
    assert!(parse_motion_csv(csv.as_bytes()).is_err());
}

#[rstest]
fn loads_trace_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let mut f = File::create(&path).unwrap();
    writeln!(f, "timestamp_ms,ax,ay,az,gx,gy,gz").unwrap();
    for i in 0..5u64 {
        writeln!(f, "{},0.0,0.0,9.81,0.0,0.0,0.0", i * 10).unwrap();
    }
    drop(f);

    let rows = load_motion_csv(&path).expect("load trace");
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4].timestamp_ms, 40);
}

#[rstest]
fn missing_file_reports_path() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nope.csv");
    let err = load_motion_csv(&path).expect_err("missing file");
    assert!(format!("{err:?}").contains("nope.csv"));
}

#[rstest]
fn baseline_snapshot_survives_toml() {
    let file = BaselineFile {
        baseline: PersistedProfile {
            avg_peak_accel: 21.5,
            avg_duration_ms: 1480.0,
            avg_peak_gyro: 310.0,
            std_dev_accel: 1.25,
            std_dev_duration_ms: 60.0,
            std_dev_gyro: 20.0,
            sample_count: 10,
            optimal_trajectory: vec![[0.0, 0.0, 0.0], [0.05, 0.0, 0.1], [0.1, 0.0, 0.3]],
        },
    };
    let text = baseline_to_toml(&file).expect("serialize");
    let back = load_baseline_toml(&text).expect("parse");
    assert_eq!(back, file);
    back.baseline.validate().expect("valid baseline");
}
