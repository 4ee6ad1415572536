#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core free-throw training logic (hardware-agnostic).
//!
//! This crate turns a stream of raw IMU readings into detected shots, scores
//! each shot against a personal baseline, and answers with haptic cues. All
//! hardware interactions go through `swish_traits::SampleSource` and
//! `swish_traits::Actuator`.
//!
//! ## Architecture
//!
//! - **Filtering**: gravity removal, low-pass smoothing, gated estimator (`filter`)
//! - **Detection**: Idle/InShot state machine with trajectory integration (`detector`)
//! - **Calibration**: 10-shot baseline statistics (`calibration`)
//! - **Scoring**: z-score components and trajectory similarity (`scoring`)
//! - **Feedback**: assessment to haptic cue policy (`feedback`)
//! - **Haptics**: per-motor pattern playback with a thermal guard (`haptics`)
//! - **Orchestration**: `Trainer` context with `tick()` (`core`), built by
//!   `TrainerBuilder` (`builder`) and paced by `runner`
//!
//! ## Units
//!
//! Acceleration in m/s², angular rate in deg/s, time in monotonic milliseconds.

pub mod atomic;
pub mod builder;
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod core;
pub mod detector;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod haptics;
pub mod hw_error;
pub mod logger;
pub mod mocks;
pub mod performance;
pub mod runner;
pub mod sample;
pub mod sampler;
pub mod scoring;
pub mod status;
pub mod util;
pub mod vector;

pub use crate::builder::{DynTrainer, Extras, Missing, Set, TrainerBuilder, build_trainer};
pub use crate::calibration::{CalibrationEngine, CalibrationProfile, ProfileStats};
pub use crate::config::{
    CALIBRATION_SAMPLES, CalibrationCfg, DetectorCfg, FeedbackCfg, FilterCfg, HapticsCfg,
    MotorSpec, STANDARD_GRAVITY, ScoringCfg, SessionCfg, ThermalCfg, TrainerSettings,
};
pub use crate::core::Trainer;
pub use crate::detector::{DetectorState, ShotDetector};
pub use crate::error::{BuildError, SwishError};
pub use crate::feedback::FeedbackCue;
pub use crate::filter::{FilteredSample, MotionFilter};
pub use crate::haptics::{HapticController, Intensity, MotorPhase, Pattern, Zone};
pub use crate::logger::{MemoryLog, TracingLog, TrainingLog};
pub use crate::performance::{PerformanceSummary, PerformanceTracker, Trend};
pub use crate::runner::{RunParams, RunSummary, StopReason};
pub use crate::sample::{EndReason, MotionSample, ShotRecord};
pub use crate::scoring::{Dimension, FormAssessment, FormDeviation, FormScorer};
pub use crate::status::{Mode, TickReport, TrainingEvent};
pub use crate::vector::Vector3;
