//! JSON-lines training log.
//!
//! One object per line, tagged by `kind` (`shot`, `calibration`, `summary`).
//! Every record carries a wall-clock `timestamp` (unix seconds); the
//! `*_ms` fields are session-relative monotonic times.

use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use eyre::WrapErr;
use serde_json::{Value, json};
use swish_core::{CalibrationProfile, PerformanceSummary, ShotRecord, TrainingLog};

pub struct JsonlLog {
    out: Mutex<LineWriter<File>>,
}

impl JsonlLog {
    /// Open `path` for appending, creating it (and its directory) if needed.
    pub fn open(path: &Path) -> eyre::Result<Self> {
        if let Some(dir) = path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)
                .wrap_err_with(|| format!("create shot log directory {}", dir.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .wrap_err_with(|| format!("open shot log {}", path.display()))?;
        Ok(Self {
            out: Mutex::new(LineWriter::new(file)),
        })
    }

    fn write(&self, mut record: Value) {
        if let Some(obj) = record.as_object_mut() {
            obj.insert("timestamp".into(), json!(unix_now()));
        }
        let Ok(mut out) = self.out.lock() else {
            tracing::warn!("shot log lock poisoned; record dropped");
            return;
        };
        if let Err(e) = writeln!(out, "{record}") {
            tracing::warn!(error = %e, "shot log write failed");
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

pub fn shot_json(shot: &ShotRecord) -> Value {
    json!({
        "kind": "shot",
        "start_ms": shot.start_ms,
        "end_ms": shot.end_ms,
        "duration_ms": shot.duration_ms,
        "peak_accel": shot.peak_accel,
        "peak_gyro": shot.peak_gyro,
        "form_score": shot.form_score(),
        "low_confidence": shot.low_confidence,
        "end_reason": shot.end_reason.as_str(),
        "trajectory_points": shot.trajectory.len(),
        "dropped_points": shot.dropped_points,
    })
}

pub fn calibration_json(p: &CalibrationProfile) -> Value {
    json!({
        "kind": "calibration",
        "valid": p.is_valid(),
        "sample_count": p.sample_count(),
        "avg_peak_accel": p.avg_peak_accel(),
        "avg_duration_ms": p.avg_duration_ms(),
        "avg_peak_gyro": p.avg_peak_gyro(),
        "std_dev_accel": p.std_dev_accel(),
        "std_dev_duration_ms": p.std_dev_duration_ms(),
        "std_dev_gyro": p.std_dev_gyro(),
        "trajectory_points": p.optimal_trajectory().len(),
    })
}

pub fn summary_json(s: &PerformanceSummary) -> Value {
    json!({
        "kind": "summary",
        "total_shots": s.total_shots,
        "average_score": s.average_score,
        "best_score": s.best_score,
        "consistency": s.consistency_score,
        "good_form_rate": s.good_form_rate,
        "total_training_ms": s.total_training_ms,
        "trend": s.improvement_trend.as_i8(),
    })
}

impl TrainingLog for JsonlLog {
    fn shot(&self, shot: &ShotRecord) {
        self.write(shot_json(shot));
    }

    fn calibration(&self, profile: &CalibrationProfile) {
        self.write(calibration_json(profile));
    }

    fn summary(&self, summary: &PerformanceSummary) {
        self.write(summary_json(summary));
    }
}
