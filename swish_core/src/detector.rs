//! Shot boundary detection over the filtered sample stream.
//!
//! Idle → InShot when the magnitude exceeds `shot_threshold`. While in a shot
//! acceleration is integrated twice to a displacement path. The shot closes
//! once the magnitude stays below `motion_threshold` for `motion_timeout_ms`
//! (`EndReason::Settled`) or when it reaches `max_shot_ms`
//! (`EndReason::Ceiling`). Idle is both the initial state and the state
//! between shots.

use std::collections::VecDeque;

use crate::config::DetectorCfg;
use crate::sample::{EndReason, MotionSample, ShotRecord};
use crate::vector::Vector3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Idle,
    InShot,
}

#[derive(Debug, Clone)]
struct ActiveShot {
    start_ms: u64,
    last_ms: u64,
    quiet_since: Option<u64>,
    peak_accel: f32,
    peak_gyro: f32,
    velocity: Vector3,
    position: Vector3,
    trajectory: VecDeque<Vector3>,
    dropped: u32,
    samples: u32,
}

#[derive(Debug, Clone)]
pub struct ShotDetector {
    cfg: DetectorCfg,
    shot: Option<ActiveShot>,
    total_dropped: u64,
}

impl ShotDetector {
    pub fn new(cfg: DetectorCfg) -> Self {
        Self {
            cfg,
            shot: None,
            total_dropped: 0,
        }
    }

    pub fn state(&self) -> DetectorState {
        if self.shot.is_some() {
            DetectorState::InShot
        } else {
            DetectorState::Idle
        }
    }

    pub fn config(&self) -> &DetectorCfg {
        &self.cfg
    }

    /// Trajectory points dropped to the buffer cap, across all shots.
    pub fn total_dropped(&self) -> u64 {
        self.total_dropped
    }

    /// Abandon any shot in progress.
    pub fn reset(&mut self) {
        if let Some(shot) = self.shot.take() {
            tracing::debug!(start_ms = shot.start_ms, "shot abandoned");
        }
    }

    /// Feed one filtered sample. Returns the completed shot when this sample
    /// closes one.
    pub fn push(&mut self, sample: &MotionSample) -> Option<ShotRecord> {
        let Some(shot) = self.shot.as_mut() else {
            if sample.magnitude > self.cfg.shot_threshold {
                self.shot = Some(self.open(sample));
                tracing::debug!(
                    ts = sample.timestamp_ms,
                    magnitude = sample.magnitude,
                    "shot start"
                );
            }
            return None;
        };

        let ts = sample.timestamp_ms.max(shot.last_ms);
        let dt_ms = (ts - shot.last_ms).min(self.cfg.max_integration_dt_ms);
        let dt = dt_ms as f32 / 1000.0;
        shot.last_ms = ts;
        shot.samples = shot.samples.saturating_add(1);
        shot.peak_accel = shot.peak_accel.max(sample.magnitude);
        shot.peak_gyro = shot.peak_gyro.max(sample.gyro.magnitude());

        shot.velocity += sample.accel * dt;
        shot.position += shot.velocity * dt;
        if shot.trajectory.len() >= self.cfg.max_trajectory_points {
            shot.trajectory.pop_front();
            shot.dropped = shot.dropped.saturating_add(1);
        }
        shot.trajectory.push_back(shot.position);

        if sample.magnitude < self.cfg.motion_threshold {
            let since = *shot.quiet_since.get_or_insert(ts);
            if ts - since >= self.cfg.motion_timeout_ms {
                return self.close(ts, EndReason::Settled);
            }
        } else {
            shot.quiet_since = None;
        }

        if ts.saturating_sub(shot.start_ms) >= self.cfg.max_shot_ms {
            tracing::warn!(
                start_ms = shot.start_ms,
                max_shot_ms = self.cfg.max_shot_ms,
                "shot hit the duration ceiling"
            );
            return self.close(ts, EndReason::Ceiling);
        }
        None
    }

    fn open(&self, sample: &MotionSample) -> ActiveShot {
        let mut trajectory = VecDeque::with_capacity(self.cfg.max_trajectory_points.max(1));
        trajectory.push_back(Vector3::ZERO);
        ActiveShot {
            start_ms: sample.timestamp_ms,
            last_ms: sample.timestamp_ms,
            quiet_since: None,
            peak_accel: sample.magnitude,
            peak_gyro: sample.gyro.magnitude(),
            velocity: Vector3::ZERO,
            position: Vector3::ZERO,
            trajectory,
            dropped: 0,
            samples: 1,
        }
    }

    fn close(&mut self, end_ms: u64, reason: EndReason) -> Option<ShotRecord> {
        let shot = self.shot.take()?;
        let duration = end_ms.saturating_sub(shot.start_ms);
        let low_confidence = duration < self.cfg.min_shot_ms;
        if shot.dropped > 0 {
            self.total_dropped += u64::from(shot.dropped);
            tracing::debug!(dropped = shot.dropped, "trajectory buffer overflowed");
        }
        let record = ShotRecord::new(
            shot.start_ms,
            end_ms,
            shot.peak_accel,
            shot.peak_gyro,
            shot.trajectory.into_iter().collect(),
            shot.position,
            reason,
            low_confidence,
            shot.dropped,
            shot.samples,
        );
        tracing::info!(
            start_ms = record.start_ms,
            duration_ms = record.duration_ms,
            peak_accel = record.peak_accel,
            reason = reason.as_str(),
            low_confidence,
            "shot closed"
        );
        Some(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(ts: u64, mag: f32) -> MotionSample {
        MotionSample::new(Vector3::new(mag, 0.0, 0.0), Vector3::ZERO, ts)
    }

    #[test]
    fn stays_idle_below_shot_threshold() {
        let mut d = ShotDetector::new(DetectorCfg::default());
        for i in 0..500 {
            assert!(d.push(&s(i * 10, 14.9)).is_none());
        }
        assert_eq!(d.state(), DetectorState::Idle);
    }

    #[test]
    fn single_spike_then_quiet_closes_after_timeout() {
        let mut d = ShotDetector::new(DetectorCfg::default());
        assert!(d.push(&s(0, 20.0)).is_none());
        assert_eq!(d.state(), DetectorState::InShot);
        let mut closed = None;
        for i in 1..=200 {
            if let Some(r) = d.push(&s(i * 10, 1.0)) {
                closed = Some(r);
                break;
            }
        }
        let r = closed.expect("shot should close");
        assert_eq!(r.end_reason, EndReason::Settled);
        // quiet from t=10, so closes at t=1010
        assert_eq!(r.duration_ms, 1010);
        assert_eq!(r.peak_accel, 20.0);
        assert!(r.low_confidence);
        assert_eq!(d.state(), DetectorState::Idle);
    }

    #[test]
    fn motion_between_thresholds_keeps_shot_open_until_ceiling() {
        let mut d = ShotDetector::new(DetectorCfg::default());
        d.push(&s(0, 20.0));
        let mut closed = None;
        for i in 1..=1000 {
            if let Some(r) = d.push(&s(i * 10, 8.0)) {
                closed = Some(r);
                break;
            }
        }
        let r = closed.expect("ceiling closes the shot");
        assert_eq!(r.end_reason, EndReason::Ceiling);
        assert_eq!(r.duration_ms, 5000);
        assert!(!r.low_confidence);
    }

    #[test]
    fn trajectory_drops_oldest_points_past_cap() {
        let cfg = DetectorCfg {
            max_trajectory_points: 10,
            ..DetectorCfg::default()
        };
        let mut d = ShotDetector::new(cfg);
        d.push(&s(0, 20.0));
        let mut rec = None;
        for i in 1..=300 {
            let mag = if i < 30 { 20.0 } else { 0.0 };
            if let Some(r) = d.push(&s(i * 10, mag)) {
                rec = Some(r);
                break;
            }
        }
        let r = rec.expect("closed");
        assert_eq!(r.trajectory.len(), 10);
        assert!(r.dropped_points > 0);
        // newest point is the final position
        assert_eq!(r.trajectory.last().copied(), Some(r.end_position));
        assert_eq!(d.total_dropped(), u64::from(r.dropped_points));
    }

    #[test]
    fn gaps_and_repeated_timestamps_are_tolerated() {
        let mut d = ShotDetector::new(DetectorCfg::default());
        d.push(&s(100, 20.0));
        assert!(d.push(&s(100, 20.0)).is_none());
        assert!(d.push(&s(90, 20.0)).is_none());
        // quiet time counts from the first quiet sample, not across the gap
        assert!(d.push(&s(2100, 1.0)).is_none());
        let r = d.push(&s(3100, 1.0)).expect("closed after timeout");
        assert_eq!(r.start_ms, 100);
        assert_eq!(r.end_ms, 3100);
        assert!(r.trajectory.iter().all(|p| p.is_finite()));
    }

    #[test]
    fn reset_abandons_shot() {
        let mut d = ShotDetector::new(DetectorCfg::default());
        d.push(&s(0, 20.0));
        d.reset();
        assert_eq!(d.state(), DetectorState::Idle);
    }
}
