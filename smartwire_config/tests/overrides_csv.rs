use smartwire_config::{DeviceOverride, load_overrides_csv};
use std::fs;
use tempfile::tempdir;

fn write_csv(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("overrides.csv");
    fs::write(&path, contents).unwrap();
    (dir, path)
}

#[test]
fn loads_hex_and_decimal_addresses() {
    let (_dir, path) = write_csv("address,clock_hz,rise_ns\n0x48,400000,100\n80, 1000000, 60\n");
    let rows = load_overrides_csv(&path).expect("valid csv");
    assert_eq!(
        rows,
        vec![
            DeviceOverride {
                address: 0x48,
                clock_hz: 400_000,
                rise_ns: 100
            },
            DeviceOverride {
                address: 80,
                clock_hz: 1_000_000,
                rise_ns: 60
            },
        ]
    );
}

#[test]
fn rejects_wrong_headers() {
    let (_dir, path) = write_csv("addr,hz,ns\n0x48,400000,100\n");
    let err = load_overrides_csv(&path).expect_err("bad headers");
    assert!(format!("{err}").contains("must have headers"));
}

#[test]
fn rejects_duplicate_addresses() {
    let (_dir, path) = write_csv("address,clock_hz,rise_ns\n0x48,400000,100\n72,100000,200\n");
    let err = load_overrides_csv(&path).expect_err("duplicate");
    assert!(format!("{err}").contains("duplicate override for address 0x48"));
}

#[test]
fn reports_row_number_of_malformed_rows() {
    let (_dir, path) = write_csv("address,clock_hz,rise_ns\n0x48,400000,100\n0x49,fast,100\n");
    let err = load_overrides_csv(&path).expect_err("malformed");
    assert!(format!("{err}").contains("invalid CSV row 3"));
}

#[test]
fn missing_file_is_an_error() {
    let err = load_overrides_csv(std::path::Path::new("/nonexistent/overrides.csv"))
        .expect_err("missing");
    assert!(format!("{err}").contains("open overrides CSV"));
}
