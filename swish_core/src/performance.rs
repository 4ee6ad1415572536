//! Session performance metrics.

use std::collections::VecDeque;

use crate::scoring::Dimension;

/// Scores compared per window when computing the improvement trend.
pub const TREND_WINDOW: usize = 5;
/// Mean difference below which the trend counts as flat.
const TREND_DEADBAND: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Declining,
    Flat,
    Improving,
}

impl Trend {
    pub const fn as_i8(self) -> i8 {
        match self {
            Self::Declining => -1,
            Self::Flat => 0,
            Self::Improving => 1,
        }
    }
}

/// Snapshot handed to the logging collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceSummary {
    pub total_shots: u32,
    pub average_score: f32,
    pub best_score: f32,
    /// `1 - population std-dev of scores`, clamped to [0, 1].
    pub consistency_score: f32,
    pub total_training_ms: u64,
    pub improvement_trend: Trend,
    /// Fraction of shots with no dominant deviation.
    pub good_form_rate: f32,
}

/// Per-session accumulator. Memory stays bounded: only the last two trend
/// windows of scores are kept, everything else is running sums.
#[derive(Debug, Clone, Default)]
pub struct PerformanceTracker {
    count: u32,
    sum: f64,
    sum_sq: f64,
    best: f32,
    good_form: u32,
    recent: VecDeque<f32>,
    session_start_ms: Option<u64>,
    last_ms: u64,
}

impl PerformanceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session; metrics from the previous one are dropped.
    pub fn start_session(&mut self, now_ms: u64) {
        *self = Self {
            session_start_ms: Some(now_ms),
            last_ms: now_ms,
            ..Self::default()
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn record(&mut self, score: f32, dimension: Dimension, now_ms: u64) {
        if !score.is_finite() {
            tracing::warn!("ignoring non-finite score");
            return;
        }
        let score = score.clamp(0.0, 1.0);
        self.count = self.count.saturating_add(1);
        self.sum += f64::from(score);
        self.sum_sq += f64::from(score) * f64::from(score);
        self.best = self.best.max(score);
        if dimension == Dimension::None {
            self.good_form += 1;
        }
        if self.recent.len() == 2 * TREND_WINDOW {
            self.recent.pop_front();
        }
        self.recent.push_back(score);
        self.last_ms = self.last_ms.max(now_ms);
    }

    pub fn total_shots(&self) -> usize {
        self.count as usize
    }

    pub fn summary(&self) -> PerformanceSummary {
        let total_training_ms = self
            .session_start_ms
            .map_or(0, |s| self.last_ms.saturating_sub(s));
        if self.count == 0 {
            return PerformanceSummary {
                total_shots: 0,
                average_score: 0.0,
                best_score: 0.0,
                consistency_score: 0.0,
                total_training_ms,
                improvement_trend: Trend::Flat,
                good_form_rate: 0.0,
            };
        }
        let n = f64::from(self.count);
        let mean = self.sum / n;
        let var = (self.sum_sq / n - mean * mean).max(0.0);
        PerformanceSummary {
            total_shots: self.count,
            average_score: mean as f32,
            best_score: self.best,
            consistency_score: (1.0 - var.sqrt() as f32).clamp(0.0, 1.0),
            total_training_ms,
            improvement_trend: self.trend(),
            good_form_rate: self.good_form as f32 / self.count as f32,
        }
    }

    /// Mean of the last window against the window before it.
    fn trend(&self) -> Trend {
        if self.recent.len() < 2 * TREND_WINDOW {
            return Trend::Flat;
        }
        let w = TREND_WINDOW as f32;
        let earlier = self.recent.iter().take(TREND_WINDOW).sum::<f32>() / w;
        let recent = self.recent.iter().skip(TREND_WINDOW).sum::<f32>() / w;
        let diff = recent - earlier;
        if diff > TREND_DEADBAND {
            Trend::Improving
        } else if diff < -TREND_DEADBAND {
            Trend::Declining
        } else {
            Trend::Flat
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_is_zeroed() {
        let s = PerformanceTracker::new().summary();
        assert_eq!(s.total_shots, 0);
        assert_eq!(s.improvement_trend, Trend::Flat);
    }

    #[test]
    fn tracks_average_best_and_rate() {
        let mut t = PerformanceTracker::new();
        t.start_session(1000);
        t.record(0.5, Dimension::Elbow, 2000);
        t.record(0.9, Dimension::None, 4000);
        let s = t.summary();
        assert_eq!(s.total_shots, 2);
        assert!((s.average_score - 0.7).abs() < 1e-6);
        assert!((s.best_score - 0.9).abs() < 1e-6);
        assert!((s.consistency_score - 0.8).abs() < 1e-5);
        assert!((s.good_form_rate - 0.5).abs() < 1e-6);
        assert_eq!(s.total_training_ms, 3000);
    }

    #[test]
    fn trend_compares_last_two_windows() {
        let mut t = PerformanceTracker::new();
        for i in 0..10 {
            let score = if i < 5 { 0.4 } else { 0.8 };
            t.record(score, Dimension::None, i);
        }
        assert_eq!(t.summary().improvement_trend, Trend::Improving);
        for i in 10..15 {
            t.record(0.2, Dimension::Wrist, i);
        }
        assert_eq!(t.summary().improvement_trend, Trend::Declining);
    }

    #[test]
    fn new_session_starts_from_zero() {
        let mut t = PerformanceTracker::new();
        t.start_session(0);
        t.record(0.2, Dimension::Elbow, 500);
        t.start_session(100_000);
        t.record(0.9, Dimension::None, 101_000);
        let s = t.summary();
        assert_eq!(s.total_shots, 1);
        assert!((s.average_score - 0.9).abs() < 1e-6);
        assert!((s.best_score - 0.9).abs() < 1e-6);
        assert!((s.good_form_rate - 1.0).abs() < 1e-6);
        assert_eq!(s.total_training_ms, 1000);
    }

    #[test]
    fn long_sessions_keep_exact_totals() {
        let mut t = PerformanceTracker::new();
        t.start_session(0);
        for i in 0..500u64 {
            t.record(0.6, Dimension::Timing, i * 10);
        }
        let s = t.summary();
        assert_eq!(s.total_shots, 500);
        assert!((s.average_score - 0.6).abs() < 1e-5);
        assert!(s.consistency_score > 0.999);
        assert_eq!(t.recent.len(), 2 * TREND_WINDOW);
    }
}
