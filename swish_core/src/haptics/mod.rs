//! Haptic controller: one non-blocking pattern state machine per motor plus
//! the overheat / emergency-stop interlock.
//!
//! Every operation takes `now_ms` explicitly; nothing here sleeps. Motors do
//! not share state with each other, so `update` order does not matter.
//! Actuator commands are sent only when a motor's output level changes, and
//! actuator failures are logged and otherwise ignored (there is no
//! acknowledgment channel to retry against).

pub mod pattern;
pub mod thermal;

pub use pattern::{GroupSlot, Intensity, MotorPhase, Pattern, Shaping, Zone};
pub use thermal::ThermalState;

use swish_traits::Actuator;

use crate::config::{HapticsCfg, MotorSpec, ThermalCfg};
use crate::error::{Result, SwishError};
use crate::hw_error::map_actuator_error;

/// Why the controller is latched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// Thermal model or external check; clears automatically once cool.
    Overheat,
    /// Requested by the caller; cleared only by `clear_emergency`.
    Manual,
}

impl StopCause {
    fn error(self) -> SwishError {
        match self {
            Self::Overheat => SwishError::MotorOverheat,
            Self::Manual => SwishError::EmergencyStop,
        }
    }
}

/// State of one physical motor.
#[derive(Debug, Clone)]
pub struct HapticMotor {
    zone: Zone,
    pin: u8,
    current_intensity: u8,
    target_intensity: u8,
    pattern: Pattern,
    phase: MotorPhase,
    start_ms: u64,
    duration_ms: u64,
    slot: GroupSlot,
    last_sent: u8,
    thermal: ThermalState,
}

impl HapticMotor {
    fn new(spec: MotorSpec, thermal: &ThermalCfg) -> Self {
        Self {
            zone: spec.zone,
            pin: spec.pin,
            current_intensity: 0,
            target_intensity: 0,
            pattern: Pattern::None,
            phase: MotorPhase::Idle,
            start_ms: 0,
            duration_ms: 0,
            slot: GroupSlot { index: 0, size: 1 },
            last_sent: 0,
            thermal: ThermalState::new(thermal),
        }
    }

    pub fn zone(&self) -> Zone {
        self.zone
    }
    pub fn pin(&self) -> u8 {
        self.pin
    }
    pub fn current_intensity(&self) -> u8 {
        self.current_intensity
    }
    pub fn target_intensity(&self) -> u8 {
        self.target_intensity
    }
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }
    pub fn phase(&self) -> MotorPhase {
        self.phase
    }
    pub fn start_ms(&self) -> u64 {
        self.start_ms
    }
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
    pub fn is_active(&self) -> bool {
        self.phase != MotorPhase::Idle
    }
    pub fn temperature_c(&self) -> f32 {
        self.thermal.temperature_c()
    }

    fn deactivate(&mut self) {
        self.current_intensity = 0;
        self.pattern = Pattern::None;
        self.phase = MotorPhase::Idle;
        self.duration_ms = 0;
    }

    fn remaining_ms(&self, now_ms: u64) -> u64 {
        self.start_ms
            .saturating_add(self.duration_ms)
            .saturating_sub(now_ms)
    }
}

pub struct HapticController<A: Actuator> {
    actuator: A,
    motors: Vec<HapticMotor>,
    thermal_cfg: ThermalCfg,
    shaping: Shaping,
    enabled: bool,
    latched: Option<StopCause>,
    overheat_check: Option<Box<dyn Fn() -> bool>>,
    last_update_ms: Option<u64>,
    actuator_errors: u64,
}

impl<A: Actuator> core::fmt::Debug for HapticController<A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HapticController")
            .field("motors", &self.motors)
            .field("enabled", &self.enabled)
            .field("latched", &self.latched)
            .finish()
    }
}

impl<A: Actuator> HapticController<A> {
    pub fn new(actuator: A, cfg: &HapticsCfg) -> Self {
        Self {
            actuator,
            motors: cfg
                .motors
                .iter()
                .map(|m| HapticMotor::new(*m, &cfg.thermal))
                .collect(),
            thermal_cfg: cfg.thermal.clone(),
            shaping: Shaping {
                alternating_rounds: cfg.alternating_rounds,
                wave_cycles: cfg.wave_cycles,
            },
            enabled: cfg.enabled,
            latched: None,
            overheat_check: None,
            last_update_ms: None,
            actuator_errors: 0,
        }
    }

    /// Install an external overheat signal (e.g. a board temperature sensor).
    pub fn with_overheat_check<F>(mut self, f: F) -> Self
    where
        F: Fn() -> bool + 'static,
    {
        self.overheat_check = Some(Box::new(f));
        self
    }

    pub(crate) fn set_overheat_check(&mut self, f: Option<Box<dyn Fn() -> bool>>) {
        self.overheat_check = f;
    }

    pub fn motors(&self) -> &[HapticMotor] {
        &self.motors
    }

    pub fn motor(&self, id: usize) -> Option<&HapticMotor> {
        self.motors.get(id)
    }

    pub fn is_motor_active(&self, id: usize) -> bool {
        self.motors.get(id).is_some_and(HapticMotor::is_active)
    }

    pub fn any_active(&self) -> bool {
        self.motors.iter().any(HapticMotor::is_active)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn latched(&self) -> Option<StopCause> {
        self.latched
    }

    pub fn actuator_errors(&self) -> u64 {
        self.actuator_errors
    }

    pub fn actuator(&self) -> &A {
        &self.actuator
    }

    /// Enable or disable all output. Disabling stops running patterns.
    pub fn enable(&mut self, on: bool) {
        if self.enabled && !on {
            self.stop_all();
        }
        self.enabled = on;
    }

    /// Start `pattern` on every motor in `zone`.
    ///
    /// The safety guard is evaluated first; while it is tripped the trigger is
    /// rejected and no motor changes. `Pattern::None` or a zero duration
    /// stops the zone instead.
    pub fn trigger(
        &mut self,
        zone: Zone,
        pattern: Pattern,
        intensity: u8,
        duration_ms: u64,
        now_ms: u64,
    ) -> Result<()> {
        self.guard(now_ms)?;

        let members: Vec<usize> = self
            .motors
            .iter()
            .enumerate()
            .filter(|(_, m)| zone.contains(m.zone))
            .map(|(i, _)| i)
            .collect();
        if members.is_empty() {
            return Err(eyre::Report::new(SwishError::NoMotorsForZone(
                zone.to_string(),
            )));
        }
        if !self.enabled {
            tracing::debug!(zone = %zone, pattern = pattern.as_str(), "haptics disabled; trigger suppressed");
            return Ok(());
        }

        let size = u32::try_from(members.len()).unwrap_or(u32::MAX);
        for (index, &id) in members.iter().enumerate() {
            let m = &mut self.motors[id];
            if pattern == Pattern::None || duration_ms == 0 {
                m.deactivate();
                continue;
            }
            m.pattern = pattern;
            m.target_intensity = intensity;
            m.start_ms = now_ms;
            m.duration_ms = duration_ms;
            m.slot = GroupSlot {
                index: u32::try_from(index).unwrap_or(0),
                size,
            };
            let (level, phase) = pattern::level_at(
                pattern,
                intensity,
                0,
                duration_ms,
                m.slot,
                self.shaping,
            );
            m.current_intensity = level;
            m.phase = phase;
        }
        tracing::debug!(
            zone = %zone,
            pattern = pattern.as_str(),
            intensity,
            duration_ms,
            "haptic trigger"
        );
        self.flush(now_ms);
        Ok(())
    }

    /// Advance every active motor to `now_ms` and re-evaluate the guard.
    ///
    /// Returns `true` when the overheat guard tripped during this call.
    pub fn update(&mut self, now_ms: u64) -> bool {
        self.advance_thermal(now_ms);
        let was_latched = self.latched;
        let hot = self.overheating();
        match (was_latched, hot) {
            (None, true) => {
                self.trip(StopCause::Overheat);
                return true;
            }
            (Some(StopCause::Overheat), false) => {
                tracing::info!("overheat guard cleared");
                self.latched = None;
            }
            _ => {}
        }

        for m in &mut self.motors {
            if !m.is_active() {
                continue;
            }
            let elapsed = now_ms.saturating_sub(m.start_ms);
            if elapsed >= m.duration_ms {
                m.deactivate();
                continue;
            }
            let (level, phase) = pattern::level_at(
                m.pattern,
                m.target_intensity,
                elapsed,
                m.duration_ms,
                m.slot,
                self.shaping,
            );
            m.current_intensity = level;
            m.phase = phase;
        }
        self.flush(now_ms);
        false
    }

    /// Force every motor idle. Safe from any state; repeated calls are no-ops.
    pub fn stop_all(&mut self) {
        for m in &mut self.motors {
            m.deactivate();
        }
        let now = self.last_update_ms.unwrap_or(0);
        self.flush(now);
    }

    /// Latch a manual emergency stop: all motors idle, triggers rejected
    /// until `clear_emergency`.
    pub fn emergency_stop(&mut self) {
        self.trip(StopCause::Manual);
    }

    /// Release a latched stop. An overheat latch only releases once the guard
    /// reads clear.
    pub fn clear_emergency(&mut self) -> Result<()> {
        match self.latched {
            None => Ok(()),
            Some(StopCause::Manual) => {
                if self.overheating() {
                    self.latched = Some(StopCause::Overheat);
                    return Err(eyre::Report::new(SwishError::MotorOverheat));
                }
                tracing::info!("emergency stop cleared");
                self.latched = None;
                Ok(())
            }
            Some(StopCause::Overheat) => {
                if self.overheating() {
                    Err(eyre::Report::new(SwishError::MotorOverheat))
                } else {
                    self.latched = None;
                    Ok(())
                }
            }
        }
    }

    /// Change one motor's target intensity. Takes effect on the next update
    /// for a running pattern; the guard is evaluated first.
    pub fn set_intensity(&mut self, motor_id: usize, value: u8, now_ms: u64) -> Result<()> {
        self.guard(now_ms)?;
        let m = self
            .motors
            .get_mut(motor_id)
            .ok_or_else(|| eyre::Report::new(SwishError::UnknownMotor(motor_id)))?;
        m.target_intensity = value;
        Ok(())
    }

    /// Thermal-model or external overheat reading right now.
    pub fn is_system_overheating(&self) -> bool {
        self.overheating()
    }

    fn overheating(&self) -> bool {
        let thermal = thermal::guard_tripped(
            &self.thermal_cfg,
            self.motors.iter().map(|m| &m.thermal),
            self.latched == Some(StopCause::Overheat),
        );
        let external = self.overheat_check.as_ref().is_some_and(|f| f());
        thermal || external
    }

    /// Evaluated before every state-changing command.
    fn guard(&mut self, now_ms: u64) -> Result<()> {
        self.advance_thermal(now_ms);
        if let Some(cause) = self.latched {
            if cause == StopCause::Overheat && !self.overheating() {
                tracing::info!("overheat guard cleared");
                self.latched = None;
            } else {
                return Err(eyre::Report::new(cause.error()));
            }
        }
        if self.overheating() {
            self.trip(StopCause::Overheat);
            return Err(eyre::Report::new(SwishError::MotorOverheat));
        }
        Ok(())
    }

    fn trip(&mut self, cause: StopCause) {
        if self.latched != Some(cause) {
            match cause {
                StopCause::Overheat => tracing::error!(
                    hottest_c = self
                        .motors
                        .iter()
                        .map(HapticMotor::temperature_c)
                        .fold(f32::NEG_INFINITY, f32::max),
                    "overheat guard tripped; all motors stopped"
                ),
                StopCause::Manual => tracing::warn!("emergency stop latched"),
            }
        }
        // a manual latch is not downgraded by a later overheat
        if self.latched != Some(StopCause::Manual) {
            self.latched = Some(cause);
        }
        self.stop_all();
    }

    fn advance_thermal(&mut self, now_ms: u64) {
        let last = self.last_update_ms.unwrap_or(now_ms);
        let dt = now_ms.saturating_sub(last);
        for m in &mut self.motors {
            m.thermal
                .advance(&self.thermal_cfg, m.current_intensity, dt);
        }
        self.last_update_ms = Some(now_ms.max(last));
    }

    fn flush(&mut self, now_ms: u64) {
        for m in &mut self.motors {
            if m.current_intensity == m.last_sent {
                continue;
            }
            let remaining = if m.current_intensity == 0 {
                0
            } else {
                m.remaining_ms(now_ms)
            };
            match self.actuator.drive(m.pin, m.current_intensity, remaining) {
                Ok(()) => m.last_sent = m.current_intensity,
                Err(e) => {
                    self.actuator_errors += 1;
                    let err = map_actuator_error(&*e);
                    tracing::warn!(pin = m.pin, error = %err, "actuator command failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(u8, u8, u64)>>>;

    struct Recorder(Log);

    impl Actuator for Recorder {
        fn drive(
            &mut self,
            pin: u8,
            intensity: u8,
            duration_ms: u64,
        ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
            self.0.borrow_mut().push((pin, intensity, duration_ms));
            Ok(())
        }
    }

    fn controller() -> (HapticController<Recorder>, Log) {
        let log: Log = Rc::default();
        (
            HapticController::new(Recorder(log.clone()), &HapticsCfg::default()),
            log,
        )
    }

    #[test]
    fn continuous_runs_for_duration_then_stops() {
        let (mut h, log) = controller();
        h.trigger(Zone::Wrist, Pattern::Continuous, 128, 100, 0).unwrap();
        assert!(h.is_motor_active(2));
        assert_eq!(log.borrow().as_slice(), &[(27, 128, 100)]);
        h.update(50);
        assert_eq!(log.borrow().len(), 1, "no resend without change");
        h.update(100);
        assert!(!h.is_motor_active(2));
        assert_eq!(log.borrow().last(), Some(&(27, 0, 0)));
    }

    #[test]
    fn unknown_zone_mapping_is_an_error() {
        let cfg = HapticsCfg {
            motors: vec![MotorSpec {
                zone: Zone::Wrist,
                pin: 27,
            }],
            ..HapticsCfg::default()
        };
        let mut h = HapticController::new(Recorder(Rc::default()), &cfg);
        let err = h
            .trigger(Zone::UpperArm, Pattern::SinglePulse, 255, 100, 0)
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<SwishError>(),
            Some(SwishError::NoMotorsForZone(_))
        ));
    }

    #[test]
    fn emergency_stop_rejects_triggers_until_cleared() {
        let (mut h, _) = controller();
        h.trigger(Zone::All, Pattern::Continuous, 255, 1000, 0).unwrap();
        h.emergency_stop();
        h.emergency_stop();
        assert!(!h.any_active());
        let err = h
            .trigger(Zone::All, Pattern::Continuous, 255, 1000, 10)
            .unwrap_err();
        assert_eq!(err.downcast_ref::<SwishError>(), Some(&SwishError::EmergencyStop));
        h.update(20);
        assert!(!h.any_active());
        h.clear_emergency().unwrap();
        h.trigger(Zone::All, Pattern::Continuous, 255, 1000, 30).unwrap();
        assert!(h.any_active());
    }

    #[test]
    fn external_overheat_trips_and_clears() {
        let hot = Rc::new(RefCell::new(false));
        let probe = hot.clone();
        let (h, _) = controller();
        let mut h = h.with_overheat_check(move || *probe.borrow());
        h.trigger(Zone::All, Pattern::Continuous, 255, 5000, 0).unwrap();
        *hot.borrow_mut() = true;
        assert!(h.update(10));
        assert!(!h.any_active());
        assert!(h.trigger(Zone::Wrist, Pattern::SinglePulse, 64, 100, 20).is_err());
        *hot.borrow_mut() = false;
        assert!(!h.update(30));
        assert_eq!(h.latched(), None);
        h.trigger(Zone::Wrist, Pattern::SinglePulse, 64, 100, 40).unwrap();
    }

    #[test]
    fn sustained_full_drive_trips_thermal_guard() {
        let (mut h, _) = controller();
        h.trigger(Zone::All, Pattern::Continuous, 255, 60_000, 0).unwrap();
        let mut tripped_at = None;
        for t in (10..60_000).step_by(10) {
            if h.update(t) {
                tripped_at = Some(t);
                break;
            }
        }
        assert!(tripped_at.is_some());
        assert_eq!(h.latched(), Some(StopCause::Overheat));
        assert!(h.motors().iter().all(|m| m.current_intensity() == 0));
    }

    #[test]
    fn set_intensity_checks_motor_id() {
        let (mut h, _) = controller();
        h.set_intensity(0, 10, 0).unwrap();
        assert_eq!(h.motor(0).map(HapticMotor::target_intensity), Some(10));
        let err = h.set_intensity(9, 10, 0).unwrap_err();
        assert_eq!(err.downcast_ref::<SwishError>(), Some(&SwishError::UnknownMotor(9)));
    }

    #[test]
    fn disabled_controller_suppresses_output() {
        let (mut h, log) = controller();
        h.enable(false);
        h.trigger(Zone::All, Pattern::DoublePulse, 64, 200, 0).unwrap();
        assert!(!h.any_active());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn stop_all_is_idempotent() {
        let (mut h, log) = controller();
        h.trigger(Zone::All, Pattern::Continuous, 100, 500, 0).unwrap();
        h.stop_all();
        let n = log.borrow().len();
        h.stop_all();
        assert_eq!(log.borrow().len(), n);
    }
}
