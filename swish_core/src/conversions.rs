//! `From` implementations bridging `swish_config` types to `swish_core` types.

use crate::calibration::{CalibrationProfile, ProfileStats};
use crate::config::*;
use crate::haptics::Zone;
use crate::vector::Vector3;

// ── Filter ───────────────────────────────────────────────────────────────────

impl From<&swish_config::Config> for FilterCfg {
    fn from(c: &swish_config::Config) -> Self {
        let f = &c.filter;
        Self {
            low_pass_alpha: f.low_pass_alpha,
            gravity_alpha: f.gravity_alpha,
            gravity_adapt_window_mps2: f.gravity_adapt_window_mps2,
            rest_axis: f.rest_axis,
            process_noise: f.process_noise,
            measurement_noise: f.measurement_noise,
            initial_uncertainty: f.initial_uncertainty,
            innovation_gate: f.innovation_gate,
            max_accel_mps2: c.sensor.max_accel_mps2,
            max_gyro_dps: c.sensor.max_gyro_dps,
        }
    }
}

// ── Detector ─────────────────────────────────────────────────────────────────

impl From<&swish_config::DetectorCfg> for DetectorCfg {
    fn from(c: &swish_config::DetectorCfg) -> Self {
        Self {
            motion_threshold: c.motion_threshold,
            shot_threshold: c.shot_threshold,
            motion_timeout_ms: c.motion_timeout_ms,
            max_shot_ms: c.max_shot_ms,
            min_shot_ms: c.min_shot_ms,
            max_trajectory_points: c.max_trajectory_points,
            max_integration_dt_ms: c.max_integration_dt_ms,
        }
    }
}

// ── Calibration / scoring / feedback ─────────────────────────────────────────

impl From<&swish_config::CalibrationCfg> for CalibrationCfg {
    fn from(c: &swish_config::CalibrationCfg) -> Self {
        Self {
            resample_points: c.resample_points,
            optimal_points: c.optimal_points,
            accept_low_confidence: c.accept_low_confidence,
        }
    }
}

impl From<&swish_config::ScoringCfg> for ScoringCfg {
    fn from(c: &swish_config::ScoringCfg) -> Self {
        Self {
            epsilon: c.epsilon,
            trajectory_scale_m: c.trajectory_scale_m,
            deviation_tolerance: c.deviation_tolerance,
        }
    }
}

impl From<&swish_config::FeedbackCfg> for FeedbackCfg {
    fn from(c: &swish_config::FeedbackCfg) -> Self {
        Self {
            elbow_tolerance: c.elbow_tolerance,
            wrist_tolerance: c.wrist_tolerance,
            timing_tolerance: c.timing_tolerance,
            trajectory_tolerance: c.trajectory_tolerance,
            elbow_ms: c.elbow_ms,
            wrist_ms: c.wrist_ms,
            timing_ms: c.timing_ms,
            trajectory_ms: c.trajectory_ms,
            good_form_ms: c.good_form_ms,
            ack_ms: c.ack_ms,
        }
    }
}

// ── Haptics ──────────────────────────────────────────────────────────────────

impl From<swish_config::ZoneName> for Zone {
    fn from(z: swish_config::ZoneName) -> Self {
        match z {
            swish_config::ZoneName::UpperArm => Self::UpperArm,
            swish_config::ZoneName::LowerArm => Self::LowerArm,
            swish_config::ZoneName::Wrist => Self::Wrist,
        }
    }
}

impl From<&swish_config::ThermalCfg> for ThermalCfg {
    fn from(c: &swish_config::ThermalCfg) -> Self {
        Self {
            ambient_c: c.ambient_c,
            heat_c_per_s: c.heat_c_per_s,
            cool_per_s: c.cool_per_s,
            trip_c: c.trip_c,
            clear_c: c.clear_c,
        }
    }
}

impl From<&swish_config::HapticsCfg> for HapticsCfg {
    fn from(c: &swish_config::HapticsCfg) -> Self {
        Self {
            enabled: c.enabled,
            motors: c
                .motors
                .iter()
                .map(|m| MotorSpec {
                    zone: m.zone.into(),
                    pin: m.pin,
                })
                .collect(),
            alternating_rounds: c.alternating_rounds,
            wave_cycles: c.wave_cycles,
            thermal: (&c.thermal).into(),
        }
    }
}

impl From<&swish_config::SessionCfg> for SessionCfg {
    fn from(c: &swish_config::SessionCfg) -> Self {
        Self {
            tick_hz: c.tick_hz,
            max_samples_per_tick: c.max_samples_per_tick,
        }
    }
}

// ── Whole config ─────────────────────────────────────────────────────────────

impl From<&swish_config::Config> for TrainerSettings {
    fn from(c: &swish_config::Config) -> Self {
        Self {
            filter: c.into(),
            detector: (&c.detector).into(),
            calibration: (&c.calibration).into(),
            scoring: (&c.scoring).into(),
            feedback: (&c.feedback).into(),
            haptics: (&c.haptics).into(),
            session: (&c.session).into(),
        }
    }
}

// ── Baseline snapshot ────────────────────────────────────────────────────────

impl From<&swish_config::PersistedProfile> for CalibrationProfile {
    fn from(p: &swish_config::PersistedProfile) -> Self {
        Self::new(
            ProfileStats {
                avg_peak_accel: p.avg_peak_accel,
                avg_duration_ms: p.avg_duration_ms,
                avg_peak_gyro: p.avg_peak_gyro,
                std_dev_accel: p.std_dev_accel,
                std_dev_duration_ms: p.std_dev_duration_ms,
                std_dev_gyro: p.std_dev_gyro,
            },
            p.optimal_trajectory.iter().copied().map(Vector3::from).collect(),
            usize::try_from(p.sample_count).unwrap_or(0),
        )
    }
}

impl From<&CalibrationProfile> for swish_config::PersistedProfile {
    fn from(p: &CalibrationProfile) -> Self {
        Self {
            avg_peak_accel: p.avg_peak_accel(),
            avg_duration_ms: p.avg_duration_ms(),
            avg_peak_gyro: p.avg_peak_gyro(),
            std_dev_accel: p.std_dev_accel(),
            std_dev_duration_ms: p.std_dev_duration_ms(),
            std_dev_gyro: p.std_dev_gyro(),
            sample_count: u32::try_from(p.sample_count()).unwrap_or(u32::MAX),
            optimal_trajectory: p.optimal_trajectory().iter().map(|v| v.to_array()).collect(),
        }
    }
}
