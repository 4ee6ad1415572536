use proptest::prelude::*;
use swish_core::error::SwishError;
use swish_core::mocks::NullActuator;
use swish_core::{
    CalibrationCfg, CalibrationEngine, DetectorCfg, DetectorState, HapticController, HapticsCfg,
    MotionSample, Pattern, ShotDetector, ShotRecord, Vector3, Zone,
};

fn pattern_strategy() -> impl Strategy<Value = Pattern> {
    prop_oneof![
        Just(Pattern::SinglePulse),
        Just(Pattern::DoublePulse),
        Just(Pattern::TriplePulse),
        Just(Pattern::Continuous),
        Just(Pattern::Increasing),
        Just(Pattern::Decreasing),
        Just(Pattern::Alternating),
        Just(Pattern::Wave),
    ]
}

fn zone_strategy() -> impl Strategy<Value = Zone> {
    prop_oneof![
        Just(Zone::UpperArm),
        Just(Zone::LowerArm),
        Just(Zone::Wrist),
        Just(Zone::All),
    ]
}

prop_compose! {
    fn shot_strategy()(
        peak in 15.0f32..80.0,
        gyro in 0.0f32..1500.0,
        duration in 1200u64..1800,
        len in 2usize..100,
    ) -> ShotRecord {
        let path = (0..len)
            .map(|i| Vector3::new(i as f32 * 0.01, 0.0, (i as f32 * 0.1).sin() * 0.2))
            .collect();
        ShotRecord::synthetic(0, duration, peak, gyro, path)
    }
}

proptest! {
    #[test]
    fn quiet_stream_never_opens_a_shot(
        mags in prop::collection::vec(0.0f32..15.0, 1..400),
        dts in prop::collection::vec(0u64..40, 1..400),
    ) {
        let mut d = ShotDetector::new(DetectorCfg::default());
        let mut ts = 0u64;
        for (i, m) in mags.iter().enumerate() {
            ts += dts[i % dts.len()];
            let s = MotionSample::new(Vector3::new(*m, 0.0, 0.0), Vector3::ZERO, ts);
            prop_assert!(d.push(&s).is_none());
            prop_assert_eq!(d.state(), DetectorState::Idle);
        }
    }

    #[test]
    fn motor_levels_stay_within_the_commanded_intensity(
        zone in zone_strategy(),
        pattern in pattern_strategy(),
        intensity in 0u8..=255,
        duration in 1u64..3000,
        steps in prop::collection::vec(1u64..120, 1..80),
    ) {
        let mut h = HapticController::new(NullActuator, &HapticsCfg::default());
        h.trigger(zone, pattern, intensity, duration, 0).unwrap();
        let mut now = 0;
        for dt in steps {
            now += dt;
            h.update(now);
            for m in h.motors() {
                prop_assert!(m.current_intensity() <= intensity);
                if now >= duration {
                    prop_assert!(!m.is_active());
                    prop_assert_eq!(m.current_intensity(), 0);
                }
            }
        }
    }

    #[test]
    fn latched_stop_rejects_every_trigger(
        zone in zone_strategy(),
        pattern in pattern_strategy(),
        intensity in 1u8..=255,
        duration in 1u64..3000,
        at in 0u64..10_000,
    ) {
        let mut h = HapticController::new(NullActuator, &HapticsCfg::default());
        h.emergency_stop();
        let err = h.trigger(zone, pattern, intensity, duration, at).unwrap_err();
        prop_assert_eq!(err.downcast_ref::<SwishError>(), Some(&SwishError::EmergencyStop));
        h.update(at + 1);
        prop_assert!(!h.any_active());
    }

    #[test]
    fn calibration_is_valid_only_with_exactly_ten_shots(
        shots in prop::collection::vec(shot_strategy(), 0..20),
    ) {
        let mut engine = CalibrationEngine::new(CalibrationCfg::default());
        engine.start();
        for s in &shots {
            engine.add_sample(s).unwrap();
        }
        match engine.finish() {
            Ok(profile) => {
                prop_assert!(shots.len() >= 10);
                prop_assert_eq!(profile.is_valid(), shots.len() == 10);
            }
            Err(e) => {
                prop_assert!(shots.len() < 10);
                prop_assert_eq!(
                    e.downcast_ref::<SwishError>(),
                    Some(&SwishError::CalibrationIncomplete { have: shots.len(), need: 10 })
                );
            }
        }
    }
}
