//! The trainer context: owns every pipeline component and advances them
//! once per control-loop tick.
//!
//! Per tick: advance haptics to `now`, drain up to `max_samples_per_tick`
//! readings, filter, detect, then route completed shots by mode
//! (calibration accumulator, scorer + feedback, or nowhere in standby).

use std::sync::Arc;
use std::time::Instant;

use swish_traits::{Actuator, Clock, SampleSource};

use crate::calibration::{CalibrationEngine, CalibrationProfile};
use crate::config::{FeedbackCfg, SessionCfg};
use crate::detector::{DetectorState, ShotDetector};
use crate::error::{Result, SwishError};
use crate::feedback::{self, FeedbackCue};
use crate::filter::MotionFilter;
use crate::haptics::HapticController;
use crate::hw_error::map_sensor_error;
use crate::logger::TrainingLog;
use crate::performance::{PerformanceSummary, PerformanceTracker};
use crate::sample::ShotRecord;
use crate::scoring::FormScorer;
use crate::status::{Mode, TickReport, TrainingEvent};

pub struct Trainer<Src: SampleSource, Act: Actuator> {
    pub(crate) source: Src,
    pub(crate) filter: MotionFilter,
    pub(crate) detector: ShotDetector,
    pub(crate) calibration: CalibrationEngine,
    pub(crate) baseline: Option<CalibrationProfile>,
    pub(crate) scorer: FormScorer,
    pub(crate) feedback: FeedbackCfg,
    pub(crate) haptics: HapticController<Act>,
    pub(crate) performance: PerformanceTracker,
    pub(crate) session: SessionCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,
    pub(crate) mode: Mode,
    pub(crate) log: Option<Box<dyn TrainingLog>>,
    pub(crate) shots_closed: u64,
    pub(crate) ticks: u64,
}

impl<Src: SampleSource, Act: Actuator> core::fmt::Debug for Trainer<Src, Act> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Trainer")
            .field("mode", &self.mode)
            .field("calibrated", &self.baseline.is_some())
            .field("detector", &self.detector.state())
            .field("shots_closed", &self.shots_closed)
            .finish()
    }
}

impl<Src: SampleSource, Act: Actuator> Trainer<Src, Act> {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn baseline(&self) -> Option<&CalibrationProfile> {
        self.baseline.as_ref()
    }

    pub fn haptics(&self) -> &HapticController<Act> {
        &self.haptics
    }

    pub fn haptics_mut(&mut self) -> &mut HapticController<Act> {
        &mut self.haptics
    }

    pub fn detector_state(&self) -> DetectorState {
        self.detector.state()
    }

    pub fn filter(&self) -> &MotionFilter {
        &self.filter
    }

    pub fn source(&self) -> &Src {
        &self.source
    }

    pub fn performance(&self) -> PerformanceSummary {
        self.performance.summary()
    }

    pub fn shots_closed(&self) -> u64 {
        self.shots_closed
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Calibration shots accepted so far, while calibrating.
    pub fn calibration_progress(&self) -> Option<usize> {
        self.calibration.progress()
    }

    /// Milliseconds on the trainer clock since construction.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    /// Whether a finite source has nothing more to deliver.
    pub fn source_exhausted(&self) -> bool {
        self.source.is_exhausted()
    }

    /// Start collecting calibration shots. The current baseline (if any)
    /// stays in place until a new one completes.
    pub fn begin_calibration(&mut self) {
        self.calibration.start();
        self.switch(Mode::Calibrating);
    }

    /// Finish calibration early or explicitly. Fails with
    /// `CalibrationIncomplete` (progress kept) when too few shots arrived.
    pub fn finish_calibration(&mut self) -> Result<CalibrationProfile> {
        let profile = self.calibration.finish()?;
        self.adopt(profile.clone())?;
        self.switch(Mode::Standby);
        Ok(profile)
    }

    /// Enter training. Requires a valid baseline.
    pub fn begin_training(&mut self) -> Result<()> {
        if !self.baseline.as_ref().is_some_and(CalibrationProfile::is_valid) {
            return Err(eyre::Report::new(SwishError::NotCalibrated));
        }
        let now = self.now_ms();
        self.performance.start_session(now);
        self.switch(Mode::Training);
        Ok(())
    }

    /// Back to standby; an unfinished calibration is dropped.
    pub fn standby(&mut self) {
        if self.calibration.is_active() {
            self.calibration.cancel();
            tracing::info!("calibration abandoned");
        }
        self.switch(Mode::Standby);
    }

    /// Install a baseline (e.g. a persisted snapshot). Invalid profiles are rejected.
    pub fn set_baseline(&mut self, profile: CalibrationProfile) -> Result<()> {
        self.adopt(profile)
    }

    pub fn stop_all(&mut self) {
        self.haptics.stop_all();
    }

    pub fn emergency_stop(&mut self) {
        self.haptics.emergency_stop();
    }

    /// One control-loop iteration. Never blocks.
    pub fn tick(&mut self) -> Result<TickReport> {
        let now = self.now_ms();
        self.ticks += 1;
        let mut report = TickReport {
            now_ms: now,
            ..TickReport::default()
        };

        if self.haptics.update(now) {
            report.events.push(TrainingEvent::HapticsTripped);
        }

        for _ in 0..self.session.max_samples_per_tick {
            let reading = match self.source.next_sample() {
                Ok(Some(r)) => r,
                Ok(None) => break,
                Err(e) => {
                    let err = map_sensor_error(&*e);
                    tracing::warn!(error = %err, "sample source failed");
                    report.events.push(TrainingEvent::SensorFault(err.to_string()));
                    break;
                }
            };
            report.samples += 1;
            let filtered = self.filter.process(&reading);
            if filtered.discarded {
                report.discarded += 1;
                // a substitute may carry an open shot forward, never start one
                if self.detector.state() == DetectorState::Idle {
                    continue;
                }
            }
            if let Some(shot) = self.detector.push(&filtered.sample) {
                self.shots_closed += 1;
                self.route(shot, now, &mut report.events)?;
            }
        }
        Ok(report)
    }

    fn route(&mut self, shot: ShotRecord, now: u64, events: &mut Vec<TrainingEvent>) -> Result<()> {
        let usable = !shot.low_confidence || self.calibration.accepts_low_confidence();
        match self.mode {
            Mode::Standby => {
                self.log_shot(&shot);
                events.push(TrainingEvent::ShotDetected(shot));
            }
            Mode::Calibrating | Mode::Training if !usable => {
                tracing::info!(duration_ms = shot.duration_ms, "low-confidence shot ignored");
                self.log_shot(&shot);
                events.push(TrainingEvent::ShotIgnored(shot));
            }
            Mode::Calibrating => self.route_calibration(shot, now, events)?,
            Mode::Training => self.route_training(shot, now, events),
        }
        Ok(())
    }

    fn route_calibration(
        &mut self,
        shot: ShotRecord,
        now: u64,
        events: &mut Vec<TrainingEvent>,
    ) -> Result<()> {
        let count = self.calibration.add_sample(&shot)?;
        let required = self.calibration.required();
        tracing::info!(count, required, "calibration shot");
        self.log_shot(&shot);
        let ack = feedback::calibration_ack(&self.feedback);
        self.play(ack, now);
        events.push(TrainingEvent::CalibrationShot {
            shot,
            count,
            required,
        });

        if count >= required {
            let profile = self.calibration.finish()?;
            if let Some(log) = &self.log {
                log.calibration(&profile);
            }
            if self.adopt(profile.clone()).is_ok() {
                events.push(TrainingEvent::CalibrationComplete(profile));
            } else {
                events.push(TrainingEvent::CalibrationFailed(profile));
            }
            self.switch(Mode::Standby);
        }
        Ok(())
    }

    fn route_training(&mut self, mut shot: ShotRecord, now: u64, events: &mut Vec<TrainingEvent>) {
        let Some(baseline) = self.baseline.as_ref() else {
            events.push(TrainingEvent::ScoreRejected {
                shot,
                reason: SwishError::NotCalibrated.to_string(),
            });
            return;
        };
        let assessment = match self.scorer.score(&shot, baseline) {
            Ok(a) => a,
            Err(e) => {
                tracing::warn!(error = %e, "shot not scored");
                events.push(TrainingEvent::ScoreRejected {
                    shot,
                    reason: e.to_string(),
                });
                return;
            }
        };
        shot.set_form_score(assessment.form_score);
        let cue = feedback::select_cue(&assessment, &self.feedback);
        let delivered = self.play(cue, now);
        self.performance
            .record(assessment.form_score, assessment.deviation.dimension, now);
        let summary = self.performance.summary();
        tracing::info!(
            score = assessment.form_score,
            dimension = assessment.deviation.dimension.as_str(),
            magnitude = assessment.deviation.magnitude,
            cue = cue.pattern.as_str(),
            delivered,
            "shot scored"
        );
        self.log_shot(&shot);
        if let Some(log) = &self.log {
            log.summary(&summary);
        }
        events.push(TrainingEvent::Scored {
            shot,
            assessment,
            cue,
            delivered,
            summary,
        });
    }

    fn play(&mut self, cue: FeedbackCue, now: u64) -> bool {
        match self.haptics.trigger(
            cue.zone,
            cue.pattern,
            cue.intensity.level(),
            cue.duration_ms,
            now,
        ) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, zone = %cue.zone, "feedback cue rejected");
                false
            }
        }
    }

    fn adopt(&mut self, profile: CalibrationProfile) -> Result<()> {
        if !profile.is_valid() {
            tracing::warn!(
                samples = profile.sample_count(),
                "rejecting invalid calibration profile"
            );
            return Err(eyre::Report::new(SwishError::State(
                "calibration profile is not valid".into(),
            )));
        }
        self.baseline = Some(profile);
        Ok(())
    }

    fn switch(&mut self, mode: Mode) {
        if self.mode != mode {
            tracing::info!(from = self.mode.as_str(), to = mode.as_str(), "mode change");
        }
        self.detector.reset();
        self.mode = mode;
    }

    fn log_shot(&self, shot: &ShotRecord) {
        if let Some(log) = &self.log {
            log.shot(shot);
        }
    }
}
