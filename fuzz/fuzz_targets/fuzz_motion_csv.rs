#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Any accepted trace must be entirely finite.
    if let Ok(rows) = swish_config::parse_motion_csv(data) {
        for r in rows {
            let reading = r.to_reading();
            assert!(reading.accel.iter().chain(reading.gyro.iter()).all(|v| v.is_finite()));
        }
    }
});
