//! Human-readable error descriptions, exit codes and structured JSON errors.

use swish_core::error::{BuildError, SwishError};

/// Exit codes for the failures a wrapper script may want to branch on.
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_NOT_CALIBRATED: i32 = 3;
pub const EXIT_CALIBRATION_INCOMPLETE: i32 = 4;
pub const EXIT_HAPTICS_SAFETY: i32 = 5;

fn explain(what: &str, causes: &str, fix: &str) -> String {
    format!("What happened: {what}.\nLikely causes: {causes}.\nHow to fix: {fix}.")
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSource => explain(
                "No motion sensor was provided to the trainer",
                "The IMU or trace replay failed to initialize",
                "Check --trace or the sensor wiring, then rerun",
            ),
            BuildError::MissingActuator => explain(
                "No motor driver was provided to the trainer",
                "The haptic outputs failed to initialize",
                "Check [haptics].motors pins and GPIO permissions",
            ),
            BuildError::InvalidConfig(msg) => explain(
                &format!("Invalid configuration ({msg})"),
                "Missing or out-of-range values in the TOML",
                "Edit the config file, then rerun. See etc/swish.toml for a sample",
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<SwishError>() {
        return match se {
            SwishError::NotCalibrated => explain(
                "Training needs a calibration baseline and none was loaded",
                "No --baseline file and no [baseline] table in the config",
                "Run `swish calibrate --out baseline.toml`, then `swish train --baseline baseline.toml`",
            ),
            SwishError::CalibrationIncomplete { have, need } => explain(
                &format!("Calibration stopped after {have} of {need} shots"),
                "The session was interrupted, the trace ran out, or shots were too short to count",
                "Shoot a full set of ten, or lower [detector].min_shot_ms if real shots are being ignored",
            ),
            SwishError::MotorOverheat => explain(
                "The motor overheat guard tripped",
                "Long or strong cues played back to back",
                "Let the motors cool; shorten cue durations in [feedback] if it recurs",
            ),
            SwishError::EmergencyStop => explain(
                "Emergency stop is latched",
                "A stop was requested and has not been cleared",
                "Restart the session once it is safe to drive the motors",
            ),
            SwishError::Sensor(msg) => explain(
                &format!("The motion sensor failed ({msg})"),
                "Loose IMU wiring or a disconnected board",
                "Check the sensor connection and rerun with --log-level=debug",
            ),
            SwishError::Actuator(msg) => explain(
                &format!("A motor command failed ({msg})"),
                "Wrong pin numbers or insufficient GPIO permissions",
                "Fix [haptics].motors in the config; ensure the process may access GPIO",
            ),
            other => explain(
                &other.to_string(),
                "See logs",
                "Re-run with --log-level=debug or set RUST_LOG for more detail",
            ),
        };
    }

    // String-based heuristics over the whole context chain
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("motion trace csv must have headers") {
        return "Invalid headers in motion trace CSV. Expected 'timestamp_ms,ax,ay,az,gx,gy,gz'."
            .to_string();
    }

    if lower.contains("open motor pins") {
        return explain(
            "Failed to initialize the motor outputs",
            "Incorrect pin numbers or insufficient GPIO permissions",
            "Fix [haptics].motors in the config; ensure the process has permission to access GPIO",
        );
    }

    if lower.contains("read config") || lower.contains("parse config") {
        let cause = err.root_cause();
        return explain(
            &format!("Could not load the configuration ({cause})"),
            "Wrong --config path or a TOML syntax error",
            "Point --config at a valid file (see etc/swish.toml)",
        );
    }

    if lower.contains("invalid configuration") {
        let cause = err.root_cause();
        return explain(
            &format!("Configuration is invalid ({cause})"),
            "Out-of-range or inconsistent values",
            "Edit the TOML config and try again",
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

fn find_swish(err: &eyre::Report) -> Option<&SwishError> {
    err.chain().find_map(|e| e.downcast_ref::<SwishError>())
}

/// Stable exit codes; clap usage errors exit with 2 on their own.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match find_swish(err) {
        Some(SwishError::NotCalibrated) => EXIT_NOT_CALIBRATED,
        Some(SwishError::CalibrationIncomplete { .. }) => EXIT_CALIBRATION_INCOMPLETE,
        Some(SwishError::MotorOverheat | SwishError::EmergencyStop) => EXIT_HAPTICS_SAFETY,
        _ => EXIT_FAILURE,
    }
}

fn reason_name(e: &SwishError) -> &'static str {
    match e {
        SwishError::NotCalibrated => "NotCalibrated",
        SwishError::CalibrationIncomplete { .. } => "CalibrationIncomplete",
        SwishError::MotorOverheat => "MotorOverheat",
        SwishError::EmergencyStop => "EmergencyStop",
        SwishError::Sensor(_) => "Sensor",
        SwishError::Actuator(_) => "Actuator",
        _ => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    match find_swish(err) {
        Some(SwishError::CalibrationIncomplete { have, need }) => json!({
            "reason": "CalibrationIncomplete",
            "details": { "have": have, "need": need },
            "message": humanize(err),
        }),
        Some(e) => json!({ "reason": reason_name(e), "message": humanize(err) }),
        None => json!({ "reason": "Error", "message": humanize(err) }),
    }
    .to_string()
}
