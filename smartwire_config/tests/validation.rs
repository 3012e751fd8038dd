use rstest::rstest;
use smartwire_config::load_toml;

#[rstest]
#[case("[ranges]\nclock_min_hz = 0", "clock_min_hz must be > 0")]
#[case("[ranges]\nclock_min_hz = 400000\nclock_max_hz = 100000", "clock_min_hz must be <")]
#[case("[ranges]\nclock_default_hz = 50000", "clock_default_hz must lie within")]
#[case("[ranges]\nrise_min_ns = 300", "rise_min_ns must be <")]
#[case("[ranges]\nrise_min_ns = 100\nrise_max_ns = 110\nrise_default_ns = 105", "rise span must be at least 19")]
#[case("[learning]\nadaptation_rate = 11", "adaptation_rate must be in [1, 10]")]
#[case("[learning]\nadaptation_rate = 0", "adaptation_rate must be in [1, 10]")]
#[case("[learning]\nerror_threshold = 0", "error_threshold must be >= 1")]
#[case("[learning]\nsample_interval = 0", "sample_interval must be >= 1")]
#[case("[learning]\ncooldown_ms = 20000", "emergency_cooldown_ms must be >=")]
#[case("[bus]\nscan_first = 0", "scan_first must be >= 0x01")]
#[case("[bus]\nscan_first = \"0x40\"\nscan_last = \"0x20\"", "scan_first must be <=")]
#[case("[logging]\nrotation = \"weekly\"", "rotation must be one of")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "expected {needle:?} in {err}"
    );
}

#[test]
fn rejects_duplicate_device_overrides() {
    let toml = r#"
[[devices]]
address = "0x48"
clock_hz = 400000
rise_ns = 100

[[devices]]
address = 72
clock_hz = 100000
rise_ns = 200
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("duplicate address");
    assert!(format!("{err}").contains("duplicated"));
}

#[test]
fn rejects_non_7bit_address_at_parse_time() {
    let toml = r#"
[[devices]]
address = 200
clock_hz = 400000
rise_ns = 100
"#;
    let err = load_toml(toml).expect_err("8-bit address");
    assert!(format!("{err}").contains("7-bit"));
}

#[test]
fn accepts_full_document() {
    let toml = r#"
[bus]
i2c_bus = 1
scan_first = "0x08"
scan_last = "0x77"

[ranges]
clock_min_hz = 75000
clock_max_hz = 3500000
clock_default_hz = 100000
rise_min_ns = 40
rise_max_ns = 250
rise_default_ns = 125

[learning]
enabled = true
adaptive = true
emergency_recovery = false
adaptation_rate = 8
cooldown_ms = 1000
emergency_cooldown_ms = 15000
error_threshold = 3
sample_interval = 5

[[devices]]
address = "0x48"
clock_hz = 400000
rise_ns = 100

[[simulation.devices]]
address = "0x48"
max_clock_hz = 1000000

[[simulation.devices]]
address = 80

[logging]
level = "debug"
rotation = "daily"
"#;
    let cfg = load_toml(toml).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.bus.scan_first, 0x08);
    assert_eq!(cfg.devices[0].address, 0x48);
    assert_eq!(cfg.simulation.devices.len(), 2);
    assert_eq!(cfg.simulation.devices[1].max_clock_hz, 400_000);
    assert!(!cfg.learning.emergency_recovery);
}
