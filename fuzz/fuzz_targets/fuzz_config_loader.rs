#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Config and baseline parsing must reject bad input without panicking;
    // validate() must hold the same line on whatever does parse.
    if let Ok(cfg) = swish_config::load_toml(data) {
        let _ = cfg.validate();
    }
    if let Ok(file) = swish_config::load_baseline_toml(data) {
        let _ = file.baseline.validate();
        let _ = swish_config::baseline_to_toml(&file);
    }
});
