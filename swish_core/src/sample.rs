//! Motion samples and completed shot records.

use swish_traits::ImuReading;

use crate::vector::Vector3;

/// One conditioned sensor reading.
///
/// `magnitude` is the magnitude of `accel`; after gravity removal that is
/// the linear acceleration the detector thresholds against.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    pub accel: Vector3,
    pub gyro: Vector3,
    pub magnitude: f32,
    pub timestamp_ms: u64,
}

impl MotionSample {
    pub fn new(accel: Vector3, gyro: Vector3, timestamp_ms: u64) -> Self {
        Self {
            accel,
            gyro,
            magnitude: accel.magnitude(),
            timestamp_ms,
        }
    }

    pub fn from_reading(r: &ImuReading) -> Self {
        Self::new(
            Vector3::from_array(r.accel),
            Vector3::from_array(r.gyro),
            r.timestamp_ms,
        )
    }

    /// Same vectors with the magnitude recomputed.
    #[inline]
    pub fn with_accel(self, accel: Vector3) -> Self {
        Self::new(accel, self.gyro, self.timestamp_ms)
    }

    pub fn is_finite(&self) -> bool {
        self.accel.is_finite() && self.gyro.is_finite() && self.magnitude.is_finite()
    }
}

/// Why the detector closed a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Magnitude stayed below the motion threshold for the full timeout.
    Settled,
    /// The shot ran into the absolute ceiling.
    Ceiling,
}

impl EndReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Settled => "settled",
            Self::Ceiling => "ceiling",
        }
    }
}

/// A completed shot. Immutable once emitted, apart from the form score the
/// scorer attaches exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotRecord {
    pub start_ms: u64,
    pub end_ms: u64,
    pub duration_ms: u64,
    /// Largest linear-acceleration magnitude seen (m/s²).
    pub peak_accel: f32,
    /// Largest angular-rate magnitude seen (deg/s).
    pub peak_gyro: f32,
    /// Displacement from the start position, oldest point first.
    pub trajectory: Vec<Vector3>,
    pub start_position: Vector3,
    pub end_position: Vector3,
    pub end_reason: EndReason,
    pub low_confidence: bool,
    /// Points discarded from the front of the trajectory buffer.
    pub dropped_points: u32,
    pub sample_count: u32,
    form_score: Option<f32>,
}

impl ShotRecord {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        start_ms: u64,
        end_ms: u64,
        peak_accel: f32,
        peak_gyro: f32,
        trajectory: Vec<Vector3>,
        end_position: Vector3,
        end_reason: EndReason,
        low_confidence: bool,
        dropped_points: u32,
        sample_count: u32,
    ) -> Self {
        Self {
            start_ms,
            end_ms,
            duration_ms: end_ms.saturating_sub(start_ms),
            peak_accel,
            peak_gyro,
            trajectory,
            start_position: Vector3::ZERO,
            end_position,
            end_reason,
            low_confidence,
            dropped_points,
            sample_count,
            form_score: None,
        }
    }

    pub fn form_score(&self) -> Option<f32> {
        self.form_score
    }

    /// Attach the form score. Later calls leave the first score in place.
    pub fn set_form_score(&mut self, score: f32) -> bool {
        if self.form_score.is_some() {
            return false;
        }
        self.form_score = Some(score);
        true
    }

    /// Build a record directly (replayed logs, tests, benches).
    pub fn synthetic(
        start_ms: u64,
        duration_ms: u64,
        peak_accel: f32,
        peak_gyro: f32,
        trajectory: Vec<Vector3>,
    ) -> Self {
        let end_position = trajectory.last().copied().unwrap_or_default();
        let n = u32::try_from(trajectory.len()).unwrap_or(u32::MAX);
        Self::new(
            start_ms,
            start_ms.saturating_add(duration_ms),
            peak_accel,
            peak_gyro,
            trajectory,
            end_position,
            EndReason::Settled,
            false,
            0,
            n,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_tracks_accel() {
        let r = ImuReading::new(7, [3.0, 4.0, 0.0], [0.0; 3]);
        let s = MotionSample::from_reading(&r);
        assert!((s.magnitude - 5.0).abs() < 1e-6);
        assert_eq!(s.timestamp_ms, 7);
        let s2 = s.with_accel(Vector3::ZERO);
        assert_eq!(s2.magnitude, 0.0);
    }

    #[test]
    fn form_score_is_set_once() {
        let mut shot = ShotRecord::synthetic(0, 1500, 20.0, 300.0, vec![Vector3::ZERO]);
        assert!(shot.set_form_score(0.8));
        assert!(!shot.set_form_score(0.1));
        assert_eq!(shot.form_score(), Some(0.8));
    }
}
