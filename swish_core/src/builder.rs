//! Type-state builder for `Trainer` and generic `build_trainer` constructor.
//!
//! The builder enforces at compile time that a sample source and an actuator
//! are provided before `build()` is available. `try_build()` is always
//! available for dynamic checks.

use std::marker::PhantomData;
use std::sync::Arc;

use swish_traits::{Actuator, Clock, MonotonicClock, SampleSource};

use crate::calibration::{CalibrationEngine, CalibrationProfile};
use crate::config::*;
use crate::core::Trainer;
use crate::detector::ShotDetector;
use crate::error::{BuildError, Result};
use crate::filter::MotionFilter;
use crate::haptics::{HapticController, Zone};
use crate::logger::TrainingLog;
use crate::performance::PerformanceTracker;
use crate::scoring::FormScorer;
use crate::status::Mode;

/// Trainer over boxed collaborators, as produced by `TrainerBuilder`.
pub type DynTrainer = Trainer<Box<dyn SampleSource + Send>, Box<dyn Actuator + Send>>;

// ── Type-state markers ───────────────────────────────────────────────────────

pub struct Missing;
pub struct Set;

/// Optional collaborators shared by both construction paths.
#[derive(Default)]
pub struct Extras {
    pub clock: Option<Box<dyn Clock + Send + Sync>>,
    pub log: Option<Box<dyn TrainingLog>>,
    pub overheat_check: Option<Box<dyn Fn() -> bool>>,
    pub baseline: Option<CalibrationProfile>,
}

/// Builder for `Trainer`. All settings are validated on `build()`.
pub struct TrainerBuilder<S, A> {
    source: Option<Box<dyn SampleSource + Send>>,
    actuator: Option<Box<dyn Actuator + Send>>,
    settings: TrainerSettings,
    extras: Extras,
    _s: PhantomData<S>,
    _a: PhantomData<A>,
}

impl Default for TrainerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            source: None,
            actuator: None,
            settings: TrainerSettings::default(),
            extras: Extras::default(),
            _s: PhantomData,
            _a: PhantomData,
        }
    }
}

impl DynTrainer {
    /// Start building a Trainer.
    pub fn builder() -> TrainerBuilder<Missing, Missing> {
        TrainerBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

/// Validate settings and construct a `Trainer`.
///
/// Single source of truth for validation and construction, used by both
/// `TrainerBuilder::try_build()` and `build_trainer()`.
fn validate_and_build<Src: SampleSource, Act: Actuator>(
    source: Src,
    actuator: Act,
    settings: TrainerSettings,
    extras: Extras,
) -> Result<Trainer<Src, Act>> {
    let TrainerSettings {
        filter,
        detector,
        calibration,
        scoring,
        feedback,
        haptics,
        session,
    } = settings;

    // ── Validation ───────────────────────────────────────────────────────────
    if !(filter.low_pass_alpha > 0.0 && filter.low_pass_alpha <= 1.0) {
        return Err(invalid("low_pass_alpha must be in (0, 1]"));
    }
    if !(0.0..1.0).contains(&filter.gravity_alpha) {
        return Err(invalid("gravity_alpha must be in [0, 1)"));
    }
    if !(filter.process_noise > 0.0 && filter.measurement_noise > 0.0) {
        return Err(invalid("estimator noise terms must be > 0"));
    }
    if !(detector.shot_threshold > detector.motion_threshold && detector.motion_threshold > 0.0) {
        return Err(invalid("shot_threshold must exceed motion_threshold > 0"));
    }
    if detector.motion_timeout_ms == 0 {
        return Err(invalid("motion_timeout_ms must be >= 1"));
    }
    if detector.max_shot_ms <= detector.motion_timeout_ms {
        return Err(invalid("max_shot_ms must exceed motion_timeout_ms"));
    }
    if !(2..=MAX_TRAJECTORY_POINTS).contains(&detector.max_trajectory_points) {
        return Err(invalid("max_trajectory_points must be in [2, 100]"));
    }
    if calibration.resample_points < 2 {
        return Err(invalid("resample_points must be >= 2"));
    }
    if !(2..=OPTIMAL_TRAJECTORY_POINTS).contains(&calibration.optimal_points) {
        return Err(invalid("optimal_points must be in [2, 50]"));
    }
    if !(scoring.epsilon > 0.0 && scoring.trajectory_scale_m > 0.0) {
        return Err(invalid("scoring epsilon and trajectory scale must be > 0"));
    }
    if haptics.motors.is_empty() {
        return Err(invalid("at least one motor is required"));
    }
    if haptics.motors.iter().any(|m| m.zone == Zone::All) {
        return Err(invalid("a motor must sit in a single zone"));
    }
    if !(haptics.thermal.clear_c < haptics.thermal.trip_c) {
        return Err(invalid("thermal clear_c must be below trip_c"));
    }
    if session.tick_hz == 0 || session.max_samples_per_tick == 0 {
        return Err(invalid("session tick rate and samples per tick must be > 0"));
    }
    if let Some(b) = &extras.baseline
        && !b.is_valid()
    {
        return Err(invalid("baseline profile is not valid"));
    }

    // ── Construct ────────────────────────────────────────────────────────────
    let clock: Arc<dyn Clock + Send + Sync> = match extras.clock {
        Some(b) => Arc::from(b),
        None => Arc::new(MonotonicClock::new()),
    };
    let epoch = clock.now();

    let mut haptic = HapticController::new(actuator, &haptics);
    haptic.set_overheat_check(extras.overheat_check);

    Ok(Trainer {
        source,
        filter: MotionFilter::new(filter),
        detector: ShotDetector::new(detector),
        calibration: CalibrationEngine::new(calibration),
        baseline: extras.baseline,
        scorer: FormScorer::new(scoring),
        feedback,
        haptics: haptic,
        performance: PerformanceTracker::new(),
        session,
        clock,
        epoch,
        mode: Mode::Standby,
        log: extras.log,
        shots_closed: 0,
        ticks: 0,
    })
}

impl<S, A> TrainerBuilder<S, A> {
    /// Fallible build available in any type-state.
    pub fn try_build(self) -> Result<DynTrainer> {
        let source = self
            .source
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSource))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        validate_and_build(source, actuator, self.settings, self.extras)
    }
}

/// Chainable setters that do not affect type-state.
impl<S, A> TrainerBuilder<S, A> {
    pub fn with_settings(mut self, settings: TrainerSettings) -> Self {
        self.settings = settings;
        self
    }
    pub fn with_filter(mut self, filter: FilterCfg) -> Self {
        self.settings.filter = filter;
        self
    }
    pub fn with_detector(mut self, detector: DetectorCfg) -> Self {
        self.settings.detector = detector;
        self
    }
    pub fn with_calibration(mut self, calibration: CalibrationCfg) -> Self {
        self.settings.calibration = calibration;
        self
    }
    pub fn with_scoring(mut self, scoring: ScoringCfg) -> Self {
        self.settings.scoring = scoring;
        self
    }
    pub fn with_feedback(mut self, feedback: FeedbackCfg) -> Self {
        self.settings.feedback = feedback;
        self
    }
    pub fn with_haptics(mut self, haptics: HapticsCfg) -> Self {
        self.settings.haptics = haptics;
        self
    }
    pub fn with_session(mut self, session: SessionCfg) -> Self {
        self.settings.session = session;
        self
    }
    /// Start with a previously captured baseline.
    pub fn with_baseline(mut self, profile: CalibrationProfile) -> Self {
        self.extras.baseline = Some(profile);
        self
    }
    pub fn with_log(mut self, log: impl TrainingLog + 'static) -> Self {
        self.extras.log = Some(Box::new(log));
        self
    }
    pub fn with_overheat_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.extras.overheat_check = Some(Box::new(f));
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Box<dyn Clock + Send + Sync>) -> Self {
        self.extras.clock = Some(clock);
        self
    }
}

// Setters that advance type-state
impl<A> TrainerBuilder<Missing, A> {
    pub fn with_source(
        self,
        source: impl SampleSource + Send + 'static,
    ) -> TrainerBuilder<Set, A> {
        TrainerBuilder {
            source: Some(Box::new(source)),
            actuator: self.actuator,
            settings: self.settings,
            extras: self.extras,
            _s: PhantomData,
            _a: PhantomData,
        }
    }
}

impl<S> TrainerBuilder<S, Missing> {
    pub fn with_actuator(self, actuator: impl Actuator + Send + 'static) -> TrainerBuilder<S, Set> {
        TrainerBuilder {
            source: self.source,
            actuator: Some(Box::new(actuator)),
            settings: self.settings,
            extras: self.extras,
            _s: PhantomData,
            _a: PhantomData,
        }
    }
}

impl TrainerBuilder<Set, Set> {
    /// Validate and build. Only available once source and actuator are set.
    pub fn build(self) -> Result<DynTrainer> {
        self.try_build()
    }
}

/// Build a statically-dispatched trainer from concrete collaborators.
///
/// Delegates to the shared `validate_and_build`.
pub fn build_trainer<Src, Act>(
    source: Src,
    actuator: Act,
    settings: TrainerSettings,
    extras: Extras,
) -> Result<Trainer<Src, Act>>
where
    Src: SampleSource,
    Act: Actuator,
{
    validate_and_build(source, actuator, settings, extras)
}
