//! Logging collaborator seam.
//!
//! The trainer hands over read-only, already-validated records; storage
//! format is entirely the implementor's concern.

use std::sync::{Arc, Mutex};

use crate::calibration::CalibrationProfile;
use crate::performance::PerformanceSummary;
use crate::sample::ShotRecord;

pub trait TrainingLog {
    fn shot(&self, shot: &ShotRecord);
    fn calibration(&self, profile: &CalibrationProfile);
    fn summary(&self, summary: &PerformanceSummary);
}

/// Emits every record as a structured tracing event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl TrainingLog for TracingLog {
    fn shot(&self, shot: &ShotRecord) {
        tracing::info!(
            target: "swish::log",
            start_ms = shot.start_ms,
            duration_ms = shot.duration_ms,
            peak_accel = shot.peak_accel,
            peak_gyro = shot.peak_gyro,
            form_score = shot.form_score(),
            low_confidence = shot.low_confidence,
            "shot"
        );
    }

    fn calibration(&self, profile: &CalibrationProfile) {
        tracing::info!(
            target: "swish::log",
            valid = profile.is_valid(),
            avg_peak_accel = profile.avg_peak_accel(),
            avg_duration_ms = profile.avg_duration_ms(),
            std_dev_accel = profile.std_dev_accel(),
            std_dev_duration_ms = profile.std_dev_duration_ms(),
            "calibration"
        );
    }

    fn summary(&self, s: &PerformanceSummary) {
        tracing::info!(
            target: "swish::log",
            total_shots = s.total_shots,
            average_score = s.average_score,
            best_score = s.best_score,
            consistency = s.consistency_score,
            trend = s.improvement_trend.as_i8(),
            "performance"
        );
    }
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub shots: Vec<ShotRecord>,
    pub calibrations: Vec<CalibrationProfile>,
    pub summaries: Vec<PerformanceSummary>,
}

/// In-memory log; clones share the same storage.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    inner: Arc<Mutex<Recorded>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` over the recorded data.
    pub fn with<R>(&self, f: impl FnOnce(&Recorded) -> R) -> Option<R> {
        self.inner.lock().ok().map(|g| f(&g))
    }

    pub fn shot_count(&self) -> usize {
        self.with(|r| r.shots.len()).unwrap_or(0)
    }
}

impl TrainingLog for MemoryLog {
    fn shot(&self, shot: &ShotRecord) {
        if let Ok(mut g) = self.inner.lock() {
            g.shots.push(shot.clone());
        }
    }

    fn calibration(&self, profile: &CalibrationProfile) {
        if let Ok(mut g) = self.inner.lock() {
            g.calibrations.push(profile.clone());
        }
    }

    fn summary(&self, summary: &PerformanceSummary) {
        if let Ok(mut g) = self.inner.lock() {
            g.summaries.push(*summary);
        }
    }
}
