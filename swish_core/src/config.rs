//! Runtime configuration for the trainer pipeline.
//!
//! These are separate from the TOML-deserialized config in `swish_config`;
//! `conversions` maps one onto the other.

use crate::haptics::Zone;

/// Number of calibration shots that make up one baseline.
pub const CALIBRATION_SAMPLES: usize = 10;
/// Upper bound on points kept for one shot's trajectory.
pub const MAX_TRAJECTORY_POINTS: usize = 100;
/// Upper bound on points in a baseline's optimal trajectory.
pub const OPTIMAL_TRAJECTORY_POINTS: usize = 50;
/// Standard gravity in m/s².
pub const STANDARD_GRAVITY: f32 = 9.806_65;

/// Signal conditioning for raw IMU readings.
#[derive(Debug, Clone)]
pub struct FilterCfg {
    /// Low-pass smoothing factor in (0.0, 1.0]. 1.0 disables smoothing.
    pub low_pass_alpha: f32,
    /// Gravity estimate adaptation rate. 0.0 keeps the rest-axis vector fixed.
    pub gravity_alpha: f32,
    /// Only readings whose magnitude is within this band of 1 g adapt gravity.
    pub gravity_adapt_window_mps2: f32,
    /// Sensor axis pointing up when the arm is at rest.
    pub rest_axis: [f32; 3],
    /// Estimator process noise (uncertainty added per step).
    pub process_noise: f32,
    /// Estimator measurement noise.
    pub measurement_noise: f32,
    /// Estimator uncertainty after the first measurement.
    pub initial_uncertainty: f32,
    /// Innovation gate in standard deviations.
    pub innovation_gate: f32,
    /// Raw acceleration magnitude above which a reading is implausible (m/s²).
    pub max_accel_mps2: f32,
    /// Raw angular-rate magnitude above which a reading is implausible (deg/s).
    pub max_gyro_dps: f32,
}

impl Default for FilterCfg {
    fn default() -> Self {
        Self {
            low_pass_alpha: 0.3,
            gravity_alpha: 0.02,
            gravity_adapt_window_mps2: 0.5,
            rest_axis: [0.0, 0.0, 1.0],
            process_noise: 0.05,
            measurement_noise: 0.5,
            initial_uncertainty: 1.0,
            innovation_gate: 3.0,
            max_accel_mps2: 156.9,
            max_gyro_dps: 2000.0,
        }
    }
}

/// Shot boundary detection.
#[derive(Debug, Clone)]
pub struct DetectorCfg {
    /// Below this magnitude (m/s²) the arm counts as quiet.
    pub motion_threshold: f32,
    /// Above this magnitude (m/s²) a shot starts.
    pub shot_threshold: f32,
    /// Quiet time that closes a shot.
    pub motion_timeout_ms: u64,
    /// Hard ceiling on one shot; a stuck sensor cannot produce an unbounded shot.
    pub max_shot_ms: u64,
    /// Shots shorter than this are emitted with `low_confidence` set.
    pub min_shot_ms: u64,
    /// Trajectory buffer capacity; the oldest points are dropped past it.
    pub max_trajectory_points: usize,
    /// Largest integration step; longer sample gaps are clamped to this.
    pub max_integration_dt_ms: u64,
}

impl Default for DetectorCfg {
    fn default() -> Self {
        Self {
            motion_threshold: 5.0,
            shot_threshold: 15.0,
            motion_timeout_ms: 1000,
            max_shot_ms: 5000,
            min_shot_ms: 1200,
            max_trajectory_points: MAX_TRAJECTORY_POINTS,
            max_integration_dt_ms: 50,
        }
    }
}

/// Calibration accumulator shaping.
#[derive(Debug, Clone)]
pub struct CalibrationCfg {
    /// Common length every trajectory is resampled to before averaging.
    pub resample_points: usize,
    /// Length of the stored optimal trajectory.
    pub optimal_points: usize,
    /// Count low-confidence shots toward calibration and scoring.
    pub accept_low_confidence: bool,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            resample_points: 100,
            optimal_points: OPTIMAL_TRAJECTORY_POINTS,
            accept_low_confidence: false,
        }
    }
}

/// Form scoring constants.
#[derive(Debug, Clone)]
pub struct ScoringCfg {
    /// Std-dev floor in normalized deviations.
    pub epsilon: f32,
    /// Mean trajectory distance (m) at which similarity falls to 1/e.
    pub trajectory_scale_m: f32,
    /// Largest normalized deviation still reported as `Dimension::None`.
    pub deviation_tolerance: f32,
}

impl Default for ScoringCfg {
    fn default() -> Self {
        Self {
            epsilon: 1e-3,
            trajectory_scale_m: 0.25,
            deviation_tolerance: 1.0,
        }
    }
}

/// Corrective cue selection.
#[derive(Debug, Clone)]
pub struct FeedbackCfg {
    pub elbow_tolerance: f32,
    pub wrist_tolerance: f32,
    pub timing_tolerance: f32,
    pub trajectory_tolerance: f32,
    pub elbow_ms: u64,
    pub wrist_ms: u64,
    pub timing_ms: u64,
    pub trajectory_ms: u64,
    pub good_form_ms: u64,
    /// Acknowledgement pulse length (calibration shots, outcomes).
    pub ack_ms: u64,
}

impl Default for FeedbackCfg {
    fn default() -> Self {
        Self {
            elbow_tolerance: 1.0,
            wrist_tolerance: 1.0,
            timing_tolerance: 1.0,
            trajectory_tolerance: 1.0,
            elbow_ms: 300,
            wrist_ms: 150,
            timing_ms: 400,
            trajectory_ms: 600,
            good_form_ms: 200,
            ack_ms: 100,
        }
    }
}

/// One physical vibration motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorSpec {
    pub zone: Zone,
    pub pin: u8,
}

/// First-order motor temperature model.
#[derive(Debug, Clone)]
pub struct ThermalCfg {
    pub ambient_c: f32,
    /// Heating rate at full intensity (°C/s).
    pub heat_c_per_s: f32,
    /// Newtonian cooling coefficient (1/s).
    pub cool_per_s: f32,
    /// Trip the overheat guard at or above this temperature.
    pub trip_c: f32,
    /// Release the guard once every motor is at or below this temperature.
    pub clear_c: f32,
}

impl Default for ThermalCfg {
    fn default() -> Self {
        Self {
            ambient_c: 25.0,
            heat_c_per_s: 8.0,
            cool_per_s: 0.05,
            trip_c: 70.0,
            clear_c: 55.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HapticsCfg {
    pub enabled: bool,
    pub motors: Vec<MotorSpec>,
    /// Full turns every motor takes during an Alternating pattern.
    pub alternating_rounds: u32,
    /// Sweeps per Wave pattern.
    pub wave_cycles: u32,
    pub thermal: ThermalCfg,
}

impl Default for HapticsCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            motors: vec![
                MotorSpec {
                    zone: Zone::UpperArm,
                    pin: 25,
                },
                MotorSpec {
                    zone: Zone::LowerArm,
                    pin: 26,
                },
                MotorSpec {
                    zone: Zone::Wrist,
                    pin: 27,
                },
            ],
            alternating_rounds: 2,
            wave_cycles: 1,
            thermal: ThermalCfg::default(),
        }
    }
}

/// Control-loop pacing.
#[derive(Debug, Clone)]
pub struct SessionCfg {
    pub tick_hz: u32,
    /// Samples drained per tick; the remainder waits for the next tick.
    pub max_samples_per_tick: usize,
}

impl Default for SessionCfg {
    fn default() -> Self {
        Self {
            tick_hz: 100,
            max_samples_per_tick: 8,
        }
    }
}

/// Everything the trainer needs besides its collaborators.
#[derive(Debug, Clone, Default)]
pub struct TrainerSettings {
    pub filter: FilterCfg,
    pub detector: DetectorCfg,
    pub calibration: CalibrationCfg,
    pub scoring: ScoringCfg,
    pub feedback: FeedbackCfg,
    pub haptics: HapticsCfg,
    pub session: SessionCfg,
}
