#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schemas, baseline snapshots and motion-trace parsing for the trainer.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - `BaselineFile` is the persisted calibration snapshot (TOML, round-trips).
//! - The motion-trace CSV loader enforces exact headers and rejects
//!   non-finite readings before anything reaches the core.
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Motion trace CSV schema.
///
/// Expected headers:
/// timestamp_ms,ax,ay,az,gx,gy,gz
///
/// Example:
/// timestamp_ms,ax,ay,az,gx,gy,gz
/// 0,0.0,0.0,9.81,0.0,0.0,0.0
/// 10,0.1,0.0,9.79,1.5,0.0,0.0
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
pub struct TraceRow {
    pub timestamp_ms: u64,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
}

impl TraceRow {
    pub fn to_reading(self) -> swish_traits::ImuReading {
        swish_traits::ImuReading::new(
            self.timestamp_ms,
            [self.ax, self.ay, self.az],
            [self.gx, self.gy, self.gz],
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct SensorCfg {
    /// Nominal IMU output rate.
    pub sample_rate_hz: u32,
    /// Readings above this acceleration magnitude (m/s²) are implausible and discarded.
    #[serde(default = "default_max_accel")]
    pub max_accel_mps2: f32,
    /// Readings above this angular-rate magnitude (deg/s) are discarded.
    #[serde(default = "default_max_gyro")]
    pub max_gyro_dps: f32,
}

fn default_max_accel() -> f32 {
    // 16 g full scale
    156.9
}

fn default_max_gyro() -> f32 {
    2000.0
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct FilterCfg {
    /// Low-pass smoothing factor in (0.0, 1.0].
    pub low_pass_alpha: f32,
    /// Gravity estimate adaptation rate in [0.0, 1.0). 0 keeps gravity fixed.
    pub gravity_alpha: f32,
    /// Only samples within this distance of 1 g (m/s²) adapt the gravity estimate.
    pub gravity_adapt_window_mps2: f32,
    /// Sensor axis pointing up at rest.
    pub rest_axis: [f32; 3],
    pub process_noise: f32,
    pub measurement_noise: f32,
    pub initial_uncertainty: f32,
    /// Innovations beyond this many standard deviations count as disagreement.
    pub innovation_gate: f32,
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
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DetectorCfg {
    /// Quiet threshold (m/s²); the shot ends after `motion_timeout_ms` below it.
    pub motion_threshold: f32,
    /// Start threshold (m/s²).
    pub shot_threshold: f32,
    pub motion_timeout_ms: u64,
    /// Absolute ceiling on one shot's length.
    pub max_shot_ms: u64,
    /// Shots shorter than this are flagged low-confidence.
    pub min_shot_ms: u64,
    pub max_trajectory_points: usize,
    /// Integration step cap used across sample gaps.
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
            max_trajectory_points: 100,
            max_integration_dt_ms: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CalibrationCfg {
    /// Common length trajectories are resampled to before averaging.
    pub resample_points: usize,
    /// Length of the stored optimal trajectory.
    pub optimal_points: usize,
    /// Count low-confidence (too short) shots toward calibration.
    pub accept_low_confidence: bool,
}

impl Default for CalibrationCfg {
    fn default() -> Self {
        Self {
            resample_points: 100,
            optimal_points: 50,
            accept_low_confidence: false,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScoringCfg {
    /// Floor for std-dev in normalized deviations.
    pub epsilon: f32,
    /// Average trajectory distance (m) at which similarity falls to 1/e.
    pub trajectory_scale_m: f32,
    /// Largest normalized deviation still reported as dimension "none".
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

#[derive(Debug, Deserialize)]
#[serde(default)]
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

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ZoneName {
    UpperArm,
    LowerArm,
    Wrist,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct MotorEntry {
    pub zone: ZoneName,
    pub pin: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ThermalCfg {
    pub ambient_c: f32,
    /// Heating rate at full intensity (°C/s).
    pub heat_c_per_s: f32,
    /// Newtonian cooling coefficient (1/s).
    pub cool_per_s: f32,
    pub trip_c: f32,
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

#[derive(Debug, Deserialize)]
pub struct HapticsCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub motors: Vec<MotorEntry>,
    #[serde(default = "default_alternating_rounds")]
    pub alternating_rounds: u32,
    #[serde(default = "default_wave_cycles")]
    pub wave_cycles: u32,
    #[serde(default)]
    pub thermal: ThermalCfg,
}

fn default_true() -> bool {
    true
}

fn default_alternating_rounds() -> u32 {
    2
}

fn default_wave_cycles() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionCfg {
    /// Control-loop rate.
    pub tick_hz: u32,
    /// Upper bound on samples consumed per tick; the rest wait for the next tick.
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

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
    /// Shot log and performance summaries as JSON lines.
    pub shot_log: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// Read the sensor inside the control loop.
    #[default]
    Direct,
    /// Acquire on a background thread.
    Sampler,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct RunnerCfg {
    pub mode: RunMode,
}

/// Persisted calibration baseline.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PersistedProfile {
    pub avg_peak_accel: f32,
    pub avg_duration_ms: f32,
    pub avg_peak_gyro: f32,
    pub std_dev_accel: f32,
    pub std_dev_duration_ms: f32,
    pub std_dev_gyro: f32,
    pub sample_count: u32,
    pub optimal_trajectory: Vec<[f32; 3]>,
}

/// Standalone calibration snapshot file; same `[baseline]` table as `Config`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BaselineFile {
    pub baseline: PersistedProfile,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub sensor: SensorCfg,
    #[serde(default)]
    pub filter: FilterCfg,
    #[serde(default)]
    pub detector: DetectorCfg,
    #[serde(default)]
    pub calibration: CalibrationCfg,
    #[serde(default)]
    pub scoring: ScoringCfg,
    #[serde(default)]
    pub feedback: FeedbackCfg,
    pub haptics: HapticsCfg,
    #[serde(default)]
    pub session: SessionCfg,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub runner: RunnerCfg,
    /// Optional persisted baseline; lets training start without recalibrating.
    #[serde(default)]
    pub baseline: Option<PersistedProfile>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

pub fn load_baseline_toml(s: &str) -> Result<BaselineFile, toml::de::Error> {
    toml::from_str::<BaselineFile>(s)
}

pub fn baseline_to_toml(file: &BaselineFile) -> eyre::Result<String> {
    toml::to_string(file).map_err(|e| eyre::eyre!("serialize baseline: {e}"))
}

/// Parse a motion trace from any reader (strict headers, finite values only).
pub fn parse_motion_csv<R: Read>(reader: R) -> eyre::Result<Vec<TraceRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers: {e}"))?
        .clone();
    let expected = ["timestamp_ms", "ax", "ay", "az", "gx", "gy", "gz"];
    let actual: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
    if actual != expected {
        eyre::bail!(
            "motion trace CSV must have headers '{}', got: {}",
            expected.join(","),
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<TraceRow>().enumerate() {
        let row = rec.map_err(|e| eyre::eyre!("invalid CSV row {}: {}", idx + 2, e))?;
        let values = [row.ax, row.ay, row.az, row.gx, row.gy, row.gz];
        if values.iter().any(|v| !v.is_finite()) {
            eyre::bail!("invalid CSV row {}: non-finite reading", idx + 2);
        }
        rows.push(row);
    }
    if rows.is_empty() {
        eyre::bail!("motion trace CSV has no rows");
    }
    Ok(rows)
}

pub fn load_motion_csv(path: &Path) -> eyre::Result<Vec<TraceRow>> {
    let file = std::fs::File::open(path)
        .map_err(|e| eyre::eyre!("open motion trace {:?}: {}", path, e))?;
    parse_motion_csv(file).map_err(|e| e.wrap_err(format!("motion trace {path:?}")))
}

impl PersistedProfile {
    pub fn validate(&self) -> eyre::Result<()> {
        let stats = [
            ("avg_peak_accel", self.avg_peak_accel),
            ("avg_duration_ms", self.avg_duration_ms),
            ("avg_peak_gyro", self.avg_peak_gyro),
            ("std_dev_accel", self.std_dev_accel),
            ("std_dev_duration_ms", self.std_dev_duration_ms),
            ("std_dev_gyro", self.std_dev_gyro),
        ];
        for (name, v) in stats {
            if !v.is_finite() {
                eyre::bail!("baseline.{name} must be finite");
            }
        }
        if self.std_dev_accel < 0.0 || self.std_dev_duration_ms < 0.0 || self.std_dev_gyro < 0.0 {
            eyre::bail!("baseline std-devs must be >= 0.0");
        }
        if self.optimal_trajectory.is_empty() || self.optimal_trajectory.len() > 50 {
            eyre::bail!("baseline.optimal_trajectory must have 1 to 50 points");
        }
        if self
            .optimal_trajectory
            .iter()
            .flatten()
            .any(|c| !c.is_finite())
        {
            eyre::bail!("baseline.optimal_trajectory must be finite");
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sensor
        if self.sensor.sample_rate_hz == 0 {
            eyre::bail!("sensor.sample_rate_hz must be > 0");
        }
        if !(self.sensor.max_accel_mps2 > 0.0) {
            eyre::bail!("sensor.max_accel_mps2 must be > 0.0");
        }
        if !(self.sensor.max_gyro_dps > 0.0) {
            eyre::bail!("sensor.max_gyro_dps must be > 0.0");
        }

        // Filter
        let f = &self.filter;
        if !(f.low_pass_alpha > 0.0 && f.low_pass_alpha <= 1.0) {
            eyre::bail!("filter.low_pass_alpha must be in (0.0, 1.0]");
        }
        if !(0.0..1.0).contains(&f.gravity_alpha) {
            eyre::bail!("filter.gravity_alpha must be in [0.0, 1.0)");
        }
        if f.gravity_adapt_window_mps2.is_sign_negative() {
            eyre::bail!("filter.gravity_adapt_window_mps2 must be >= 0.0");
        }
        let axis_len = f.rest_axis.iter().map(|c| c * c).sum::<f32>().sqrt();
        if !(axis_len.is_finite() && axis_len > 0.0) {
            eyre::bail!("filter.rest_axis must be a non-zero vector");
        }
        if !(f.process_noise > 0.0) || !(f.measurement_noise > 0.0) {
            eyre::bail!("filter.process_noise and filter.measurement_noise must be > 0.0");
        }
        if !(f.initial_uncertainty > 0.0) {
            eyre::bail!("filter.initial_uncertainty must be > 0.0");
        }
        if !(f.innovation_gate >= 1.0) {
            eyre::bail!("filter.innovation_gate must be >= 1.0");
        }

        // Detector
        let d = &self.detector;
        if !(d.motion_threshold > 0.0) {
            eyre::bail!("detector.motion_threshold must be > 0.0");
        }
        if !(d.shot_threshold > d.motion_threshold) {
            eyre::bail!("detector.shot_threshold must be > detector.motion_threshold");
        }
        if d.motion_timeout_ms == 0 {
            eyre::bail!("detector.motion_timeout_ms must be >= 1");
        }
        if d.max_shot_ms <= d.motion_timeout_ms {
            eyre::bail!("detector.max_shot_ms must be > detector.motion_timeout_ms");
        }
        if d.min_shot_ms >= d.max_shot_ms {
            eyre::bail!("detector.min_shot_ms must be < detector.max_shot_ms");
        }
        if !(2..=100).contains(&d.max_trajectory_points) {
            eyre::bail!("detector.max_trajectory_points must be in [2, 100]");
        }
        if d.max_integration_dt_ms == 0 {
            eyre::bail!("detector.max_integration_dt_ms must be >= 1");
        }

        // Calibration
        let c = &self.calibration;
        if !(2..=1000).contains(&c.resample_points) {
            eyre::bail!("calibration.resample_points must be in [2, 1000]");
        }
        if !(2..=50).contains(&c.optimal_points) || c.optimal_points > c.resample_points {
            eyre::bail!(
                "calibration.optimal_points must be in [2, 50] and <= calibration.resample_points"
            );
        }

        // Scoring
        let s = &self.scoring;
        if !(s.epsilon > 0.0) {
            eyre::bail!("scoring.epsilon must be > 0.0");
        }
        if !(s.trajectory_scale_m > 0.0) {
            eyre::bail!("scoring.trajectory_scale_m must be > 0.0");
        }
        if !(s.deviation_tolerance >= 0.0) {
            eyre::bail!("scoring.deviation_tolerance must be >= 0.0");
        }

        // Feedback
        let fb = &self.feedback;
        for (name, tol) in [
            ("elbow_tolerance", fb.elbow_tolerance),
            ("wrist_tolerance", fb.wrist_tolerance),
            ("timing_tolerance", fb.timing_tolerance),
            ("trajectory_tolerance", fb.trajectory_tolerance),
        ] {
            if !(tol >= 0.0) {
                eyre::bail!("feedback.{name} must be >= 0.0");
            }
        }
        for (name, ms) in [
            ("elbow_ms", fb.elbow_ms),
            ("wrist_ms", fb.wrist_ms),
            ("timing_ms", fb.timing_ms),
            ("trajectory_ms", fb.trajectory_ms),
            ("good_form_ms", fb.good_form_ms),
            ("ack_ms", fb.ack_ms),
        ] {
            if ms == 0 {
                eyre::bail!("feedback.{name} must be >= 1");
            }
            if ms > 10_000 {
                eyre::bail!("feedback.{name} is unreasonably long (>10s)");
            }
        }

        // Haptics
        let h = &self.haptics;
        if h.motors.is_empty() || h.motors.len() > 4 {
            eyre::bail!("haptics.motors must list between 1 and 4 motors");
        }
        for (i, a) in h.motors.iter().enumerate() {
            if h.motors[..i].iter().any(|b| b.pin == a.pin) {
                eyre::bail!("haptics.motors has duplicate pin {}", a.pin);
            }
        }
        if h.alternating_rounds == 0 {
            eyre::bail!("haptics.alternating_rounds must be >= 1");
        }
        if h.wave_cycles == 0 {
            eyre::bail!("haptics.wave_cycles must be >= 1");
        }
        let t = &h.thermal;
        if !(t.heat_c_per_s >= 0.0) || !(t.cool_per_s >= 0.0) {
            eyre::bail!("haptics.thermal rates must be >= 0.0");
        }
        if !(t.clear_c < t.trip_c) {
            eyre::bail!("haptics.thermal.clear_c must be < haptics.thermal.trip_c");
        }
        if !(t.ambient_c < t.clear_c) {
            eyre::bail!("haptics.thermal.ambient_c must be < haptics.thermal.clear_c");
        }

        // Session
        if self.session.tick_hz == 0 {
            eyre::bail!("session.tick_hz must be > 0");
        }
        if self.session.max_samples_per_tick == 0 {
            eyre::bail!("session.max_samples_per_tick must be >= 1");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        if let Some(b) = &self.baseline {
            b.validate()?;
        }

        Ok(())
    }
}
