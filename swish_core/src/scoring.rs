//! Form scoring against a calibration baseline.
//!
//! Attribute mapping: Elbow ← peak linear acceleration, Wrist ← peak angular
//! rate, Timing ← duration, Trajectory ← mean path distance.
//!
//! Each statistical attribute gets a normalized deviation
//! `z = |value - mean| / max(std, epsilon)` and a component score
//! `1 / (1 + z)`. The trajectory component is `exp(-d / scale)` where `d` is
//! the mean point-wise distance after resampling to the baseline length; its
//! deviation is `d / scale`. The form score is the equal-weighted mean of
//! the four components, clamped to [0, 1].

use crate::calibration::CalibrationProfile;
use crate::config::ScoringCfg;
use crate::error::{Result, SwishError};
use crate::sample::ShotRecord;
use crate::vector::{mean_distance, resample};

/// Attribute a shot deviates on the most.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Elbow,
    Wrist,
    Timing,
    Trajectory,
    None,
}

impl Dimension {
    /// Tie-break order, highest priority first.
    pub const PRIORITY: [Self; 4] = [Self::Elbow, Self::Wrist, Self::Timing, Self::Trajectory];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Elbow => "elbow",
            Self::Wrist => "wrist",
            Self::Timing => "timing",
            Self::Trajectory => "trajectory",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormDeviation {
    pub dimension: Dimension,
    pub magnitude: f32,
}

/// Per-attribute values, indexed by dimension.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerAttribute {
    pub elbow: f32,
    pub wrist: f32,
    pub timing: f32,
    pub trajectory: f32,
}

impl PerAttribute {
    pub fn get(&self, d: Dimension) -> f32 {
        match d {
            Dimension::Elbow => self.elbow,
            Dimension::Wrist => self.wrist,
            Dimension::Timing => self.timing,
            Dimension::Trajectory => self.trajectory,
            Dimension::None => 0.0,
        }
    }

    fn mean(&self) -> f32 {
        (self.elbow + self.wrist + self.timing + self.trajectory) / 4.0
    }
}

/// Result of scoring one shot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormAssessment {
    pub form_score: f32,
    pub deviation: FormDeviation,
    /// Normalized deviations.
    pub deviations: PerAttribute,
    /// Component scores in [0, 1].
    pub components: PerAttribute,
    /// Signed duration error (shot − baseline mean); positive means slow.
    pub timing_delta_ms: f32,
}

#[derive(Debug, Clone, Default)]
pub struct FormScorer {
    cfg: ScoringCfg,
}

impl FormScorer {
    pub fn new(cfg: ScoringCfg) -> Self {
        Self { cfg }
    }

    pub fn config(&self) -> &ScoringCfg {
        &self.cfg
    }

    pub fn score(&self, shot: &ShotRecord, profile: &CalibrationProfile) -> Result<FormAssessment> {
        if !profile.is_valid() {
            return Err(eyre::Report::new(SwishError::NotCalibrated));
        }
        let eps = self.cfg.epsilon.max(f32::MIN_POSITIVE);
        let z = |value: f32, mean: f32, std: f32| (value - mean).abs() / std.max(eps);

        let timing_delta_ms = shot.duration_ms as f32 - profile.avg_duration_ms();
        let optimal = profile.optimal_trajectory();
        let candidate = resample(&shot.trajectory, optimal.len());
        let d = mean_distance(&candidate, optimal);
        let scale = self.cfg.trajectory_scale_m.max(f32::MIN_POSITIVE);

        let deviations = PerAttribute {
            elbow: z(shot.peak_accel, profile.avg_peak_accel(), profile.std_dev_accel()),
            wrist: z(shot.peak_gyro, profile.avg_peak_gyro(), profile.std_dev_gyro()),
            timing: z(
                shot.duration_ms as f32,
                profile.avg_duration_ms(),
                profile.std_dev_duration_ms(),
            ),
            trajectory: d / scale,
        };
        let components = PerAttribute {
            elbow: 1.0 / (1.0 + deviations.elbow),
            wrist: 1.0 / (1.0 + deviations.wrist),
            timing: 1.0 / (1.0 + deviations.timing),
            trajectory: (-deviations.trajectory).exp(),
        };
        let form_score = sanitize(components.mean());
        let deviation = self.dominant(&deviations);

        Ok(FormAssessment {
            form_score,
            deviation,
            deviations,
            components,
            timing_delta_ms,
        })
    }

    /// Largest deviation above tolerance; earlier dimensions win ties.
    fn dominant(&self, dev: &PerAttribute) -> FormDeviation {
        let mut best = FormDeviation {
            dimension: Dimension::None,
            magnitude: 0.0,
        };
        for d in Dimension::PRIORITY {
            let m = dev.get(d);
            // NaN deviations never win
            if m > self.cfg.deviation_tolerance && m > best.magnitude {
                best = FormDeviation {
                    dimension: d,
                    magnitude: m,
                };
            }
        }
        best
    }
}

fn sanitize(score: f32) -> f32 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
