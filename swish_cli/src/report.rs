//! Per-event console output: one JSON object per line in `--json` mode,
//! a short human line otherwise.

use serde_json::{Value, json};
use swish_core::{PerformanceSummary, RunSummary, TrainingEvent};

use crate::shot_log::{calibration_json, shot_json, summary_json};

pub fn event_json(e: &TrainingEvent) -> Option<Value> {
    let v = match e {
        TrainingEvent::ShotDetected(s) => json!({ "event": "shot_detected", "shot": shot_json(s) }),
        TrainingEvent::ShotIgnored(s) => json!({ "event": "shot_ignored", "shot": shot_json(s) }),
        TrainingEvent::CalibrationShot {
            shot,
            count,
            required,
        } => json!({
            "event": "calibration_shot",
            "count": count,
            "required": required,
            "shot": shot_json(shot),
        }),
        TrainingEvent::CalibrationComplete(p) => {
            json!({ "event": "calibration_complete", "profile": calibration_json(p) })
        }
        TrainingEvent::CalibrationFailed(p) => {
            json!({ "event": "calibration_failed", "profile": calibration_json(p) })
        }
        TrainingEvent::Scored {
            shot,
            assessment,
            cue,
            delivered,
            summary,
        } => json!({
            "event": "scored",
            "form_score": assessment.form_score,
            "dimension": assessment.deviation.dimension.as_str(),
            "magnitude": assessment.deviation.magnitude,
            "components": {
                "elbow": assessment.components.elbow,
                "wrist": assessment.components.wrist,
                "timing": assessment.components.timing,
                "trajectory": assessment.components.trajectory,
            },
            "timing_delta_ms": assessment.timing_delta_ms,
            "cue": {
                "zone": cue.zone.as_str(),
                "pattern": cue.pattern.as_str(),
                "intensity": cue.intensity.level(),
                "duration_ms": cue.duration_ms,
                "delivered": delivered,
            },
            "shot": shot_json(shot),
            "summary": summary_json(summary),
        }),
        TrainingEvent::ScoreRejected { shot, reason } => json!({
            "event": "score_rejected",
            "reason": reason,
            "shot": shot_json(shot),
        }),
        TrainingEvent::HapticsTripped => json!({ "event": "haptics_tripped" }),
        // logged by the caller; the stream stays free of hardware noise
        TrainingEvent::SensorFault(_) => return None,
    };
    Some(v)
}

pub fn event_text(e: &TrainingEvent) -> Option<String> {
    let line = match e {
        TrainingEvent::ShotDetected(s) => format!(
            "shot detected: {} ms, peak {:.1} m/s²",
            s.duration_ms, s.peak_accel
        ),
        TrainingEvent::ShotIgnored(s) => format!("shot ignored: too short ({} ms)", s.duration_ms),
        TrainingEvent::CalibrationShot {
            shot,
            count,
            required,
        } => format!(
            "calibration shot {count}/{required}: peak {:.1} m/s², {} ms",
            shot.peak_accel, shot.duration_ms
        ),
        TrainingEvent::CalibrationComplete(p) => format!(
            "calibration complete: peak {:.1} ± {:.2} m/s², duration {:.0} ± {:.0} ms",
            p.avg_peak_accel(),
            p.std_dev_accel(),
            p.avg_duration_ms(),
            p.std_dev_duration_ms()
        ),
        TrainingEvent::CalibrationFailed(_) => {
            "calibration failed: the recorded shots gave an unusable baseline".to_string()
        }
        TrainingEvent::Scored {
            assessment,
            cue,
            delivered,
            summary,
            ..
        } => {
            let cue_text = if *delivered {
                format!(
                    "{} {} on {}",
                    cue.pattern.as_str(),
                    cue.intensity.level(),
                    cue.zone
                )
            } else {
                "suppressed".to_string()
            };
            format!(
                "shot {}: form {:.2}, focus {} (cue {cue_text})",
                summary.total_shots,
                assessment.form_score,
                assessment.deviation.dimension.as_str()
            )
        }
        TrainingEvent::ScoreRejected { reason, .. } => format!("shot not scored: {reason}"),
        TrainingEvent::HapticsTripped => "haptics tripped: all motors stopped".to_string(),
        TrainingEvent::SensorFault(_) => return None,
    };
    Some(line)
}

/// Print one event to stdout in the selected format.
pub fn emit(e: &TrainingEvent, json: bool) {
    if let TrainingEvent::SensorFault(msg) = e {
        tracing::warn!(error = %msg, "sensor fault");
        return;
    }
    if json {
        if let Some(v) = event_json(e) {
            println!("{v}");
        }
    } else if let Some(line) = event_text(e) {
        println!("{line}");
    }
}

pub fn session_json(run: &RunSummary, perf: &PerformanceSummary) -> Value {
    json!({
        "event": "session",
        "stop": run.stop.as_str(),
        "ticks": run.ticks,
        "samples": run.samples,
        "discarded": run.discarded,
        "shots": run.shots,
        "summary": summary_json(perf),
    })
}

pub fn print_session(run: &RunSummary, perf: &PerformanceSummary, json: bool) {
    if json {
        println!("{}", session_json(run, perf));
        return;
    }
    println!(
        "session ended ({}): {} shots, average {:.2}, best {:.2}, consistency {:.2}",
        run.stop.as_str(),
        perf.total_shots,
        perf.average_score,
        perf.best_score,
        perf.consistency_score
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use swish_core::{ShotRecord, Vector3};

    #[test]
    fn sensor_faults_are_not_printed() {
        let e = TrainingEvent::SensorFault("i2c".into());
        assert!(event_json(&e).is_none());
        assert!(event_text(&e).is_none());
    }

    #[test]
    fn calibration_shot_reports_progress() {
        let shot = ShotRecord::synthetic(0, 1400, 31.0, 650.0, vec![Vector3::ZERO; 3]);
        let e = TrainingEvent::CalibrationShot {
            shot,
            count: 3,
            required: 10,
        };
        let v = event_json(&e).unwrap();
        assert_eq!(v["event"], "calibration_shot");
        assert_eq!(v["count"], 3);
        assert_eq!(v["shot"]["kind"], "shot");
        assert!(event_text(&e).unwrap().starts_with("calibration shot 3/10"));
    }
}
