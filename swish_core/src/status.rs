//! Trainer modes and the events a control-loop tick reports.

use crate::calibration::CalibrationProfile;
use crate::feedback::FeedbackCue;
use crate::performance::PerformanceSummary;
use crate::sample::ShotRecord;
use crate::scoring::FormAssessment;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Standby,
    Calibrating,
    Training,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Calibrating => "calibrating",
            Self::Training => "training",
        }
    }
}

/// Something that happened during one tick.
#[derive(Debug, Clone)]
pub enum TrainingEvent {
    /// A shot closed while in standby; nothing consumed it.
    ShotDetected(ShotRecord),
    /// A shot closed but was too short to use.
    ShotIgnored(ShotRecord),
    /// Accepted into the calibration accumulator.
    CalibrationShot {
        shot: ShotRecord,
        count: usize,
        required: usize,
    },
    CalibrationComplete(CalibrationProfile),
    /// Enough shots arrived but the statistics were unusable.
    CalibrationFailed(CalibrationProfile),
    Scored {
        shot: ShotRecord,
        assessment: FormAssessment,
        cue: FeedbackCue,
        /// False when the safety guard rejected the cue.
        delivered: bool,
        summary: PerformanceSummary,
    },
    /// Scoring precondition failed.
    ScoreRejected { shot: ShotRecord, reason: String },
    /// The overheat guard tripped and stopped every motor.
    HapticsTripped,
    /// The sample source returned an error; the tick carried on.
    SensorFault(String),
}

/// Outcome of one `Trainer::tick`.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub now_ms: u64,
    pub samples: usize,
    pub discarded: usize,
    pub events: Vec<TrainingEvent>,
}

impl TickReport {
    pub fn is_quiet(&self) -> bool {
        self.events.is_empty()
    }

    /// Shots closed during this tick, whatever happened to them.
    pub fn shots_closed(&self) -> usize {
        self.events
            .iter()
            .filter(|e| {
                matches!(
                    e,
                    TrainingEvent::ShotDetected(_)
                        | TrainingEvent::ShotIgnored(_)
                        | TrainingEvent::CalibrationShot { .. }
                        | TrainingEvent::Scored { .. }
                        | TrainingEvent::ScoreRejected { .. }
                )
            })
            .count()
    }

    pub fn calibration_done(&self) -> bool {
        self.events.iter().any(|e| {
            matches!(
                e,
                TrainingEvent::CalibrationComplete(_) | TrainingEvent::CalibrationFailed(_)
            )
        })
    }
}
