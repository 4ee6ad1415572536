//! End-to-end behaviour of the `Trainer` context driven by scripted readings
//! and a manual clock.

use std::sync::{Arc, Mutex};

use swish_core::error::SwishError;
use swish_core::mocks::VecSource;
use swish_core::runner::{self, RunParams, StopReason};
use swish_core::{
    CalibrationProfile, Extras, MemoryLog, Mode, STANDARD_GRAVITY, TrainerSettings,
    TrainingEvent, build_trainer,
};
use swish_traits::{Actuator, ImuReading, ManualClock, SampleSource};

type Commands = Arc<Mutex<Vec<(u8, u8)>>>;

#[derive(Clone, Default)]
struct Recorder {
    commands: Commands,
}

impl Actuator for Recorder {
    fn drive(
        &mut self,
        pin: u8,
        intensity: u8,
        _duration_ms: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.commands.lock().unwrap().push((pin, intensity));
        Ok(())
    }
}

/// Rest, a forward burst of `amp` m/s² for 400 ms, then 1.5 s of rest.
fn shot(t0: u64, amp: f32) -> Vec<ImuReading> {
    let rest = [0.0, 0.0, STANDARD_GRAVITY];
    let mut out = Vec::new();
    let mut t = t0;
    for _ in 0..20 {
        out.push(ImuReading::new(t, rest, [0.0; 3]));
        t += 10;
    }
    for _ in 0..40 {
        out.push(ImuReading::new(t, [amp, 0.0, STANDARD_GRAVITY], [0.0, 0.0, amp * 10.0]));
        t += 10;
    }
    for _ in 0..150 {
        out.push(ImuReading::new(t, rest, [0.0; 3]));
        t += 10;
    }
    out
}

fn session(amps: &[f32]) -> Vec<ImuReading> {
    let mut out = Vec::new();
    for &amp in amps {
        let t0 = out.last().map_or(0, |r: &ImuReading| r.timestamp_ms + 10);
        out.extend(shot(t0, amp));
    }
    out
}

const CALIBRATION_AMPS: [f32; 10] = [28.0, 29.0, 30.0, 31.0, 32.0, 33.0, 34.0, 35.0, 36.0, 37.0];

fn extras(clock: &ManualClock, log: Option<MemoryLog>) -> Extras {
    Extras {
        clock: Some(Box::new(clock.clone())),
        log: log.map(|l| Box::new(l) as Box<dyn swish_core::TrainingLog>),
        ..Extras::default()
    }
}

fn calibrated_profile() -> CalibrationProfile {
    let clock = ManualClock::new();
    let mut trainer = build_trainer(
        VecSource::new(session(&CALIBRATION_AMPS)),
        Recorder::default(),
        TrainerSettings::default(),
        extras(&clock, None),
    )
    .unwrap();
    trainer.begin_calibration();
    let params = RunParams {
        stop_on_calibration: true,
        ..RunParams::default()
    };
    runner::run(&mut trainer, &params, |_| {}).unwrap();
    trainer.baseline().cloned().unwrap()
}

#[test]
fn ten_shots_produce_a_valid_baseline() {
    let clock = ManualClock::new();
    let log = MemoryLog::new();
    let recorder = Recorder::default();
    let mut trainer = build_trainer(
        VecSource::new(session(&CALIBRATION_AMPS)),
        recorder.clone(),
        TrainerSettings::default(),
        extras(&clock, Some(log.clone())),
    )
    .unwrap();
    trainer.begin_calibration();
    assert_eq!(trainer.mode(), Mode::Calibrating);

    let mut counts = Vec::new();
    let mut completed = 0;
    let params = RunParams {
        stop_on_calibration: true,
        ..RunParams::default()
    };
    let summary = runner::run(&mut trainer, &params, |e| match e {
        TrainingEvent::CalibrationShot { count, .. } => counts.push(*count),
        TrainingEvent::CalibrationComplete(_) => completed += 1,
        _ => {}
    })
    .unwrap();

    assert_eq!(summary.stop, StopReason::CalibrationDone);
    assert_eq!(counts, (1..=10).collect::<Vec<_>>());
    assert_eq!(completed, 1);
    assert_eq!(trainer.mode(), Mode::Standby);

    let profile = trainer.baseline().unwrap();
    assert!(profile.is_valid());
    assert_eq!(profile.sample_count(), 10);
    assert!(profile.std_dev_accel() > 0.0);
    assert!(profile.avg_duration_ms() > 1200.0);
    assert_eq!(profile.optimal_trajectory().len(), 50);

    assert_eq!(log.shot_count(), 10);
    assert_eq!(log.with(|r| r.calibrations.len()), Some(1));
    // every accepted shot was acknowledged on the upper-arm motor
    assert!(recorder.commands.lock().unwrap().iter().any(|&(pin, _)| pin == 25));
}

#[test]
fn training_without_baseline_is_rejected() {
    let clock = ManualClock::new();
    let mut trainer = build_trainer(
        VecSource::new(Vec::new()),
        Recorder::default(),
        TrainerSettings::default(),
        extras(&clock, None),
    )
    .unwrap();
    let err = trainer.begin_training().unwrap_err();
    assert_eq!(err.downcast_ref::<SwishError>(), Some(&SwishError::NotCalibrated));
    assert_eq!(trainer.mode(), Mode::Standby);
}

#[test]
fn training_scores_shots_and_plays_a_cue() {
    let baseline = calibrated_profile();
    let clock = ManualClock::new();
    let log = MemoryLog::new();
    let recorder = Recorder::default();
    let mut trainer = build_trainer(
        VecSource::new(session(&[32.0, 33.0, 60.0])),
        recorder.clone(),
        TrainerSettings::default(),
        extras(&clock, Some(log.clone())),
    )
    .unwrap();
    trainer.set_baseline(baseline).unwrap();
    trainer.begin_training().unwrap();

    let mut scores = Vec::new();
    runner::run(&mut trainer, &RunParams::default(), |e| {
        if let TrainingEvent::Scored {
            shot,
            assessment,
            delivered,
            ..
        } = e
        {
            assert!(*delivered);
            assert_eq!(shot.form_score(), Some(assessment.form_score));
            scores.push(assessment.form_score);
        }
    })
    .unwrap();

    assert_eq!(scores.len(), 3);
    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    // the 60 m/s² shot is far outside the baseline
    assert!(scores[2] < scores[0]);

    let perf = trainer.performance();
    assert_eq!(perf.total_shots, 3);
    assert_eq!(log.with(|r| r.summaries.len()), Some(3));
    assert!(!recorder.commands.lock().unwrap().is_empty());
    // runner leaves motors idle
    assert!(!trainer.haptics().any_active());
}

#[test]
fn standby_abandons_calibration_but_keeps_old_baseline() {
    let baseline = calibrated_profile();
    let clock = ManualClock::new();
    let mut trainer = build_trainer(
        VecSource::new(session(&[30.0, 31.0])),
        Recorder::default(),
        TrainerSettings::default(),
        extras(&clock, None),
    )
    .unwrap();
    trainer.set_baseline(baseline.clone()).unwrap();
    trainer.begin_calibration();
    runner::run(&mut trainer, &RunParams::default(), |_| {}).unwrap();
    assert_eq!(trainer.calibration_progress(), Some(2));

    let err = trainer.finish_calibration().unwrap_err();
    assert_eq!(
        err.downcast_ref::<SwishError>(),
        Some(&SwishError::CalibrationIncomplete { have: 2, need: 10 })
    );
    // progress survives a premature finish
    assert_eq!(trainer.calibration_progress(), Some(2));

    trainer.standby();
    assert_eq!(trainer.mode(), Mode::Standby);
    assert_eq!(trainer.calibration_progress(), None);
    assert_eq!(trainer.baseline(), Some(&baseline));
}

#[test]
fn short_shots_are_ignored_during_calibration() {
    let clock = ManualClock::new();
    let rest = [0.0, 0.0, STANDARD_GRAVITY];
    // 60 ms spike; with the quiet timeout it still closes under the 2 s floor
    let mut readings = Vec::new();
    for i in 0..6 {
        readings.push(ImuReading::new(i * 10, [60.0, 0.0, STANDARD_GRAVITY], [0.0; 3]));
    }
    for i in 6..160 {
        readings.push(ImuReading::new(i * 10, rest, [0.0; 3]));
    }

    let mut settings = TrainerSettings::default();
    settings.detector.min_shot_ms = 2_000;
    let mut trainer = build_trainer(
        VecSource::new(readings),
        Recorder::default(),
        settings,
        extras(&clock, None),
    )
    .unwrap();
    trainer.begin_calibration();
    let mut ignored = 0;
    runner::run(&mut trainer, &RunParams::default(), |e| {
        if let TrainingEvent::ShotIgnored(s) = e {
            assert!(s.low_confidence);
            ignored += 1;
        }
    })
    .unwrap();
    assert_eq!(ignored, 1);
    assert_eq!(trainer.calibration_progress(), Some(0));
}

struct FlakySource {
    inner: VecSource,
    fail_at: usize,
    served: usize,
}

impl SampleSource for FlakySource {
    fn next_sample(
        &mut self,
    ) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        self.served += 1;
        if self.served == self.fail_at {
            return Err("i2c timeout".into());
        }
        self.inner.next_sample()
    }

    fn is_exhausted(&self) -> bool {
        self.inner.is_exhausted()
    }
}

#[test]
fn sensor_errors_surface_as_events_and_the_loop_continues() {
    let clock = ManualClock::new();
    let mut trainer = build_trainer(
        FlakySource {
            inner: VecSource::new(session(&[30.0])),
            fail_at: 3,
            served: 0,
        },
        Recorder::default(),
        TrainerSettings::default(),
        extras(&clock, None),
    )
    .unwrap();
    let mut faults = Vec::new();
    let mut detected = 0;
    runner::run(&mut trainer, &RunParams::default(), |e| match e {
        TrainingEvent::SensorFault(msg) => faults.push(msg.clone()),
        TrainingEvent::ShotDetected(_) => detected += 1,
        _ => {}
    })
    .unwrap();
    assert_eq!(faults.len(), 1);
    assert!(faults[0].contains("i2c timeout"));
    assert_eq!(detected, 1);
}

#[test]
fn emergency_stop_suppresses_training_cues() {
    let baseline = calibrated_profile();
    let clock = ManualClock::new();
    let recorder = Recorder::default();
    let mut trainer = build_trainer(
        VecSource::new(session(&[31.0])),
        recorder.clone(),
        TrainerSettings::default(),
        extras(&clock, None),
    )
    .unwrap();
    trainer.set_baseline(baseline).unwrap();
    trainer.begin_training().unwrap();
    trainer.emergency_stop();
    recorder.commands.lock().unwrap().clear();

    let mut delivered = Vec::new();
    runner::run(&mut trainer, &RunParams::default(), |e| {
        if let TrainingEvent::Scored { delivered: d, .. } = e {
            delivered.push(*d);
        }
    })
    .unwrap();
    assert_eq!(delivered, vec![false]);
    assert!(
        recorder
            .commands
            .lock()
            .unwrap()
            .iter()
            .all(|&(_, level)| level == 0)
    );
}

#[test]
fn rejected_reading_after_a_ceiling_close_does_not_open_a_shot() {
    let clock = ManualClock::new();
    let mut readings = Vec::new();
    let mut t = 0;
    // stuck sensor: 30 m/s² until the 5 s ceiling closes the shot
    while t <= 5_000 {
        readings.push(ImuReading::new(t, [30.0, 0.0, STANDARD_GRAVITY], [0.0; 3]));
        t += 10;
    }
    readings.push(ImuReading::new(t, [f32::NAN, 0.0, STANDARD_GRAVITY], [0.0; 3]));
    t += 10;
    for _ in 0..150 {
        readings.push(ImuReading::new(t, [0.0, 0.0, STANDARD_GRAVITY], [0.0; 3]));
        t += 10;
    }

    // no smoothing lag, so the quiet readings read as quiet straight away
    let mut settings = TrainerSettings::default();
    settings.filter.low_pass_alpha = 1.0;
    settings.filter.measurement_noise = 1.0e-4;
    let mut trainer = build_trainer(
        VecSource::new(readings),
        Recorder::default(),
        settings,
        extras(&clock, None),
    )
    .unwrap();

    let mut shots = Vec::new();
    let summary = runner::run(&mut trainer, &RunParams::default(), |e| {
        if let TrainingEvent::ShotDetected(s) = e {
            shots.push(s.end_reason);
        }
    })
    .unwrap();
    assert_eq!(summary.discarded, 1);
    assert_eq!(shots, vec![swish_core::EndReason::Ceiling]);
    assert_eq!(trainer.detector_state(), swish_core::DetectorState::Idle);
}
