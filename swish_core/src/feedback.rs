//! Maps a form assessment to exactly one haptic cue, first match wins:
//! elbow, wrist, timing, trajectory, then the good-form confirmation.

use crate::config::FeedbackCfg;
use crate::haptics::{Intensity, Pattern, Zone};
use crate::scoring::{Dimension, FormAssessment};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackCue {
    pub zone: Zone,
    pub pattern: Pattern,
    pub intensity: Intensity,
    pub duration_ms: u64,
    /// What the cue corrects; `None` confirms good form.
    pub reason: Dimension,
}

pub fn select_cue(a: &FormAssessment, cfg: &FeedbackCfg) -> FeedbackCue {
    let d = &a.deviations;
    if d.elbow > cfg.elbow_tolerance {
        return FeedbackCue {
            zone: Zone::UpperArm,
            pattern: Pattern::SinglePulse,
            intensity: Intensity::Strong,
            duration_ms: cfg.elbow_ms,
            reason: Dimension::Elbow,
        };
    }
    if d.wrist > cfg.wrist_tolerance {
        return FeedbackCue {
            zone: Zone::Wrist,
            pattern: Pattern::SinglePulse,
            intensity: Intensity::Medium,
            duration_ms: cfg.wrist_ms,
            reason: Dimension::Wrist,
        };
    }
    if d.timing > cfg.timing_tolerance {
        // rising ramp asks for more drive, falling ramp for less
        let pattern = if a.timing_delta_ms > 0.0 {
            Pattern::Increasing
        } else {
            Pattern::Decreasing
        };
        return FeedbackCue {
            zone: Zone::LowerArm,
            pattern,
            intensity: Intensity::Medium,
            duration_ms: cfg.timing_ms,
            reason: Dimension::Timing,
        };
    }
    if d.trajectory > cfg.trajectory_tolerance {
        return FeedbackCue {
            zone: Zone::All,
            pattern: Pattern::Wave,
            intensity: Intensity::Medium,
            duration_ms: cfg.trajectory_ms,
            reason: Dimension::Trajectory,
        };
    }
    FeedbackCue {
        zone: Zone::All,
        pattern: Pattern::DoublePulse,
        intensity: Intensity::Light,
        duration_ms: cfg.good_form_ms,
        reason: Dimension::None,
    }
}

/// Acknowledges an accepted calibration shot.
pub fn calibration_ack(cfg: &FeedbackCfg) -> FeedbackCue {
    FeedbackCue {
        zone: Zone::UpperArm,
        pattern: Pattern::SinglePulse,
        intensity: Intensity::Strong,
        duration_ms: cfg.ack_ms,
        reason: Dimension::None,
    }
}

/// Acknowledges a recorded shot outcome.
pub fn outcome_ack(cfg: &FeedbackCfg) -> FeedbackCue {
    FeedbackCue {
        zone: Zone::LowerArm,
        pattern: Pattern::SinglePulse,
        intensity: Intensity::Light,
        duration_ms: cfg.ack_ms,
        reason: Dimension::None,
    }
}
