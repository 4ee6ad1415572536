//! Calibration engine: builds a statistical and trajectory baseline from a
//! user's known-good shots.
//!
//! Statistics are accumulated as f64 sums and sums of squares; trajectories
//! are resampled to a common length and summed point-wise. Nothing is exposed
//! as a usable baseline until `finish()` succeeds.

use crate::config::{CALIBRATION_SAMPLES, CalibrationCfg};
use crate::error::{Result, SwishError};
use crate::sample::ShotRecord;
use crate::vector::{Vector3, resample};

/// Baseline a live shot is scored against.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationProfile {
    avg_peak_accel: f32,
    avg_duration_ms: f32,
    avg_peak_gyro: f32,
    std_dev_accel: f32,
    std_dev_duration_ms: f32,
    std_dev_gyro: f32,
    optimal_trajectory: Vec<Vector3>,
    sample_count: usize,
    valid: bool,
}

/// Mean and population std-dev of the three scored attributes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileStats {
    pub avg_peak_accel: f32,
    pub avg_duration_ms: f32,
    pub avg_peak_gyro: f32,
    pub std_dev_accel: f32,
    pub std_dev_duration_ms: f32,
    pub std_dev_gyro: f32,
}

impl CalibrationProfile {
    /// Assemble a profile; validity is derived, never asserted by the caller.
    pub fn new(stats: ProfileStats, optimal_trajectory: Vec<Vector3>, sample_count: usize) -> Self {
        let mut p = Self {
            avg_peak_accel: stats.avg_peak_accel,
            avg_duration_ms: stats.avg_duration_ms,
            avg_peak_gyro: stats.avg_peak_gyro,
            std_dev_accel: stats.std_dev_accel,
            std_dev_duration_ms: stats.std_dev_duration_ms,
            std_dev_gyro: stats.std_dev_gyro,
            optimal_trajectory,
            sample_count,
            valid: false,
        };
        p.valid = p.check();
        p
    }

    fn check(&self) -> bool {
        let means = [self.avg_peak_accel, self.avg_duration_ms, self.avg_peak_gyro];
        let stds = [self.std_dev_accel, self.std_dev_duration_ms, self.std_dev_gyro];
        self.sample_count == CALIBRATION_SAMPLES
            && means.iter().all(|v| v.is_finite())
            && stds.iter().all(|v| v.is_finite() && *v >= 0.0)
            && !self.optimal_trajectory.is_empty()
            && self.optimal_trajectory.iter().all(|p| p.is_finite())
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn stats(&self) -> ProfileStats {
        ProfileStats {
            avg_peak_accel: self.avg_peak_accel,
            avg_duration_ms: self.avg_duration_ms,
            avg_peak_gyro: self.avg_peak_gyro,
            std_dev_accel: self.std_dev_accel,
            std_dev_duration_ms: self.std_dev_duration_ms,
            std_dev_gyro: self.std_dev_gyro,
        }
    }

    pub fn avg_peak_accel(&self) -> f32 {
        self.avg_peak_accel
    }
    pub fn avg_duration_ms(&self) -> f32 {
        self.avg_duration_ms
    }
    pub fn avg_peak_gyro(&self) -> f32 {
        self.avg_peak_gyro
    }
    pub fn std_dev_accel(&self) -> f32 {
        self.std_dev_accel
    }
    pub fn std_dev_duration_ms(&self) -> f32 {
        self.std_dev_duration_ms
    }
    pub fn std_dev_gyro(&self) -> f32 {
        self.std_dev_gyro
    }
    pub fn optimal_trajectory(&self) -> &[Vector3] {
        &self.optimal_trajectory
    }
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }
}

/// Validity predicate used by the scorer and the trainer.
pub fn is_valid(profile: &CalibrationProfile) -> bool {
    profile.is_valid()
}

#[derive(Debug, Clone, Copy, Default)]
struct Moments {
    sum: f64,
    sum_sq: f64,
}

impl Moments {
    fn add(&mut self, v: f64) {
        self.sum += v;
        self.sum_sq += v * v;
    }

    /// Mean and population std-dev; rounding can push the variance
    /// slightly below zero, so it is clamped.
    fn finish(self, n: f64) -> (f32, f32) {
        let mean = self.sum / n;
        let var = (self.sum_sq / n - mean * mean).max(0.0);
        (mean as f32, var.sqrt() as f32)
    }
}

#[derive(Debug, Clone)]
struct Accumulator {
    count: usize,
    accel: Moments,
    duration: Moments,
    gyro: Moments,
    trajectory_sum: Vec<[f64; 3]>,
}

#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    cfg: CalibrationCfg,
    acc: Option<Accumulator>,
}

impl CalibrationEngine {
    pub fn new(cfg: CalibrationCfg) -> Self {
        Self { cfg, acc: None }
    }

    /// Begin a fresh accumulation, discarding any partial one.
    pub fn start(&mut self) {
        if let Some(prev) = &self.acc {
            tracing::info!(discarded = prev.count, "calibration restarted");
        }
        self.acc = Some(Accumulator {
            count: 0,
            accel: Moments::default(),
            duration: Moments::default(),
            gyro: Moments::default(),
            trajectory_sum: vec![[0.0; 3]; self.cfg.resample_points.max(1)],
        });
    }

    /// Drop the accumulation without producing a profile.
    pub fn cancel(&mut self) {
        self.acc = None;
    }

    pub fn is_active(&self) -> bool {
        self.acc.is_some()
    }

    /// Shots accumulated since `start()`, if running.
    pub fn progress(&self) -> Option<usize> {
        self.acc.as_ref().map(|a| a.count)
    }

    pub const fn required(&self) -> usize {
        CALIBRATION_SAMPLES
    }

    pub fn accepts_low_confidence(&self) -> bool {
        self.cfg.accept_low_confidence
    }

    /// Fold one shot into the running sums. Returns the new count.
    pub fn add_sample(&mut self, shot: &ShotRecord) -> Result<usize> {
        let n = self.cfg.resample_points.max(1);
        let acc = self
            .acc
            .as_mut()
            .ok_or_else(|| eyre::Report::new(SwishError::CalibrationNotStarted))?;

        acc.accel.add(f64::from(shot.peak_accel));
        acc.duration.add(shot.duration_ms as f64);
        acc.gyro.add(f64::from(shot.peak_gyro));
        for (sum, p) in acc
            .trajectory_sum
            .iter_mut()
            .zip(resample(&shot.trajectory, n))
        {
            sum[0] += f64::from(p.x);
            sum[1] += f64::from(p.y);
            sum[2] += f64::from(p.z);
        }
        acc.count += 1;
        if acc.count > CALIBRATION_SAMPLES {
            tracing::warn!(
                count = acc.count,
                required = CALIBRATION_SAMPLES,
                "more calibration shots than required; profile will be invalid"
            );
        }
        Ok(acc.count)
    }

    /// Produce the profile. With too few shots the accumulation is left
    /// untouched and `CalibrationIncomplete` is returned.
    pub fn finish(&mut self) -> Result<CalibrationProfile> {
        let Some(acc) = self.acc.as_ref() else {
            return Err(eyre::Report::new(SwishError::CalibrationNotStarted));
        };
        if acc.count < CALIBRATION_SAMPLES {
            return Err(eyre::Report::new(SwishError::CalibrationIncomplete {
                have: acc.count,
                need: CALIBRATION_SAMPLES,
            }));
        }

        let n = acc.count as f64;
        let (avg_peak_accel, std_dev_accel) = acc.accel.finish(n);
        let (avg_duration_ms, std_dev_duration_ms) = acc.duration.finish(n);
        let (avg_peak_gyro, std_dev_gyro) = acc.gyro.finish(n);
        let mean_path: Vec<Vector3> = acc
            .trajectory_sum
            .iter()
            .map(|s| Vector3::new((s[0] / n) as f32, (s[1] / n) as f32, (s[2] / n) as f32))
            .collect();
        let optimal = resample(&mean_path, self.cfg.optimal_points.max(1));

        let profile = CalibrationProfile::new(
            ProfileStats {
                avg_peak_accel,
                avg_duration_ms,
                avg_peak_gyro,
                std_dev_accel,
                std_dev_duration_ms,
                std_dev_gyro,
            },
            optimal,
            acc.count,
        );
        self.acc = None;
        tracing::info!(
            valid = profile.is_valid(),
            avg_peak_accel,
            avg_duration_ms,
            std_dev_accel,
            std_dev_duration_ms,
            "calibration finished"
        );
        Ok(profile)
    }
}
