#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // TOML parsing and validation must reject garbage gracefully, never panic.
    // Hex-string addresses go through a custom deserializer, so they get hit too.
    if let Ok(cfg) = smartwire_config::load_toml(data) {
        let _ = cfg.validate();
    }
});
