//! Motion filter: gravity removal, low-pass smoothing and a scalar-uncertainty
//! recursive estimator.
//!
//! Pipeline per reading: validate → `remove_gravity_bias` → `low_pass` →
//! `estimate`. Invalid readings never reach the stages; the last valid output
//! is substituted (with the new timestamp) and the sample is flagged.

use swish_traits::ImuReading;

use crate::config::{FilterCfg, STANDARD_GRAVITY};
use crate::sample::MotionSample;
use crate::vector::Vector3;

/// Upper bound on estimator uncertainty after repeated disagreement.
const MAX_UNCERTAINTY: f32 = 1.0e3;

/// Output of `MotionFilter::process`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    pub sample: MotionSample,
    /// The raw reading was rejected and `sample` is a substitute.
    pub discarded: bool,
}

#[derive(Debug, Clone)]
pub struct MotionFilter {
    cfg: FilterCfg,
    gravity: Vector3,
    lp_accel: Option<Vector3>,
    lp_gyro: Option<Vector3>,
    est: Option<Vector3>,
    uncertainty: f32,
    last_valid: Option<MotionSample>,
    discarded: u64,
}

impl MotionFilter {
    pub fn new(cfg: FilterCfg) -> Self {
        let gravity = rest_gravity(&cfg);
        let uncertainty = cfg.initial_uncertainty;
        Self {
            cfg,
            gravity,
            lp_accel: None,
            lp_gyro: None,
            est: None,
            uncertainty,
            last_valid: None,
            discarded: 0,
        }
    }

    /// Forget all state (gravity estimate included).
    pub fn reset(&mut self) {
        self.gravity = rest_gravity(&self.cfg);
        self.lp_accel = None;
        self.lp_gyro = None;
        self.est = None;
        self.uncertainty = self.cfg.initial_uncertainty;
        self.last_valid = None;
    }

    pub fn gravity(&self) -> Vector3 {
        self.gravity
    }

    pub fn uncertainty(&self) -> f32 {
        self.uncertainty
    }

    /// Total readings rejected since construction.
    pub fn discarded_count(&self) -> u64 {
        self.discarded
    }

    /// Subtract the current gravity estimate. Readings close to 1 g nudge the
    /// estimate toward themselves at `gravity_alpha`.
    pub fn remove_gravity_bias(&mut self, sample: MotionSample) -> MotionSample {
        let near_rest =
            (sample.magnitude - STANDARD_GRAVITY).abs() <= self.cfg.gravity_adapt_window_mps2;
        if near_rest && self.cfg.gravity_alpha > 0.0 {
            self.gravity = self
                .gravity
                .lerp(sample.accel, self.cfg.gravity_alpha);
        }
        sample.with_accel(sample.accel - self.gravity)
    }

    /// `filtered = alpha * new + (1 - alpha) * previous`, per axis, on both
    /// accel and gyro. The first call seeds the state with the input.
    pub fn low_pass(&mut self, sample: MotionSample, alpha: f32) -> MotionSample {
        let alpha = alpha.clamp(f32::EPSILON, 1.0);
        let accel = smooth(&mut self.lp_accel, sample.accel, alpha);
        let gyro = smooth(&mut self.lp_gyro, sample.gyro, alpha);
        MotionSample::new(accel, gyro, sample.timestamp_ms)
    }

    /// One predict/update step of the acceleration estimator.
    ///
    /// The estimate always moves toward the measurement by the gain
    /// `K = P' / (P' + r)` with `P' = P + q`. When the per-axis innovation
    /// energy is inside the gate, `P` shrinks to `(1 - K) P'`; outside it
    /// grows by `K (d² - S)`, capped at `MAX_UNCERTAINTY`.
    pub fn estimate(&mut self, sample: MotionSample) -> MotionSample {
        let Some(x) = self.est else {
            self.est = Some(sample.accel);
            self.uncertainty = self.cfg.initial_uncertainty;
            return sample;
        };

        let p_pred = self.uncertainty + self.cfg.process_noise;
        let s = p_pred + self.cfg.measurement_noise;
        let k = p_pred / s;
        let innovation = sample.accel - x;
        let d2 = innovation.magnitude_squared() / 3.0;

        let next = x + innovation * k;
        let gate = self.cfg.innovation_gate;
        self.uncertainty = if d2 <= gate * gate * s {
            ((1.0 - k) * p_pred).min(self.uncertainty)
        } else {
            (p_pred + k * (d2 - s)).min(MAX_UNCERTAINTY)
        };
        self.est = Some(next);
        sample.with_accel(next)
    }

    /// Run one raw reading through the whole chain.
    pub fn process(&mut self, reading: &ImuReading) -> FilteredSample {
        let raw = MotionSample::from_reading(reading);
        if let Err(why) = self.check(&raw) {
            self.discarded += 1;
            tracing::debug!(ts = reading.timestamp_ms, reason = why, "discarded sample");
            let substitute = self
                .last_valid
                .map(|s| MotionSample {
                    timestamp_ms: reading.timestamp_ms,
                    ..s
                })
                .unwrap_or_else(|| {
                    MotionSample::new(Vector3::ZERO, Vector3::ZERO, reading.timestamp_ms)
                });
            return FilteredSample {
                sample: substitute,
                discarded: true,
            };
        }

        let s = self.remove_gravity_bias(raw);
        let s = self.low_pass(s, self.cfg.low_pass_alpha);
        let s = self.estimate(s);
        self.last_valid = Some(s);
        FilteredSample {
            sample: s,
            discarded: false,
        }
    }

    fn check(&self, raw: &MotionSample) -> Result<(), &'static str> {
        if !raw.is_finite() {
            return Err("non-finite");
        }
        if raw.magnitude > self.cfg.max_accel_mps2 {
            return Err("acceleration out of range");
        }
        if raw.gyro.magnitude() > self.cfg.max_gyro_dps {
            return Err("angular rate out of range");
        }
        Ok(())
    }
}

fn rest_gravity(cfg: &FilterCfg) -> Vector3 {
    Vector3::from_array(cfg.rest_axis).normalized() * STANDARD_GRAVITY
}

fn smooth(state: &mut Option<Vector3>, input: Vector3, alpha: f32) -> Vector3 {
    let out = match *state {
        Some(prev) => input * alpha + prev * (1.0 - alpha),
        None => input,
    };
    *state = Some(out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(ts: u64, accel: [f32; 3]) -> ImuReading {
        ImuReading::new(ts, accel, [0.0; 3])
    }

    fn no_smoothing() -> FilterCfg {
        FilterCfg {
            low_pass_alpha: 1.0,
            gravity_alpha: 0.0,
            ..FilterCfg::default()
        }
    }

    #[test]
    fn resting_reading_has_near_zero_magnitude() {
        let mut f = MotionFilter::new(FilterCfg::default());
        let out = f.process(&reading(0, [0.0, 0.0, STANDARD_GRAVITY]));
        assert!(!out.discarded);
        assert!(out.sample.magnitude < 1e-4);
    }

    #[test]
    fn low_pass_first_sample_seeds_state() {
        let mut f = MotionFilter::new(FilterCfg::default());
        let s = MotionSample::new(Vector3::new(10.0, 0.0, 0.0), Vector3::ZERO, 0);
        let a = f.low_pass(s, 0.3);
        assert_eq!(a.accel.x, 10.0);
        let b = f.low_pass(MotionSample::new(Vector3::ZERO, Vector3::ZERO, 10), 0.3);
        assert!((b.accel.x - 7.0).abs() < 1e-5);
    }

    #[test]
    fn spike_is_suppressed() {
        let mut f = MotionFilter::new(FilterCfg {
            gravity_alpha: 0.0,
            ..FilterCfg::default()
        });
        for i in 0..10 {
            f.process(&reading(i * 10, [0.0, 0.0, STANDARD_GRAVITY]));
        }
        let out = f.process(&reading(100, [40.0, 0.0, STANDARD_GRAVITY]));
        assert!(out.sample.magnitude < 20.0, "got {}", out.sample.magnitude);
    }

    #[test]
    fn nan_substitutes_last_valid_value() {
        let mut f = MotionFilter::new(no_smoothing());
        let good = f.process(&reading(0, [3.0, 0.0, STANDARD_GRAVITY]));
        let bad = f.process(&reading(10, [f32::NAN, 0.0, 0.0]));
        assert!(bad.discarded);
        assert_eq!(bad.sample.accel, good.sample.accel);
        assert_eq!(bad.sample.timestamp_ms, 10);
        assert_eq!(f.discarded_count(), 1);
    }

    #[test]
    fn out_of_range_before_any_valid_sample_yields_zero() {
        let mut f = MotionFilter::new(FilterCfg::default());
        let out = f.process(&reading(5, [500.0, 0.0, 0.0]));
        assert!(out.discarded);
        assert_eq!(out.sample.magnitude, 0.0);
        let gyro = ImuReading::new(6, [0.0, 0.0, 9.8], [5000.0, 0.0, 0.0]);
        assert!(f.process(&gyro).discarded);
    }

    #[test]
    fn uncertainty_shrinks_on_agreement_and_grows_on_disagreement() {
        let mut f = MotionFilter::new(no_smoothing());
        let base = MotionSample::new(Vector3::new(1.0, 0.0, 0.0), Vector3::ZERO, 0);
        f.estimate(base);
        let p0 = f.uncertainty();
        f.estimate(base);
        let p1 = f.uncertainty();
        assert!(p1 < p0);

        let jump = MotionSample::new(Vector3::new(80.0, 0.0, 0.0), Vector3::ZERO, 10);
        let out = f.estimate(jump);
        assert!(f.uncertainty() > p1);
        assert!(out.accel.x > 1.0 && out.accel.x < 80.0);
    }

    #[test]
    fn gravity_adapts_toward_tilted_rest() {
        let mut f = MotionFilter::new(FilterCfg {
            gravity_alpha: 0.5,
            ..FilterCfg::default()
        });
        let tilted = [0.0, STANDARD_GRAVITY * 0.6, STANDARD_GRAVITY * 0.8];
        for i in 0..50 {
            f.process(&reading(i * 10, tilted));
        }
        let g = f.gravity();
        assert!((g.y - tilted[1]).abs() < 1e-2);
        assert!((g.z - tilted[2]).abs() < 1e-2);
    }

    #[test]
    fn hard_motion_does_not_adapt_gravity() {
        let mut f = MotionFilter::new(FilterCfg {
            gravity_alpha: 0.5,
            ..FilterCfg::default()
        });
        f.process(&reading(0, [30.0, 0.0, 9.8]));
        assert_eq!(f.gravity(), Vector3::new(0.0, 0.0, STANDARD_GRAVITY));
    }
}
