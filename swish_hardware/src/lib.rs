//! Acquisition and actuation back ends for the trainer.
//!
//! The simulated IMU and the trace replay source are both paced by an
//! injected `Clock`: a reading becomes available once the clock reaches its
//! timestamp, so a `ManualClock` replays as fast as the caller ticks.

pub mod error;
pub mod replay;

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod pwm;

pub use replay::ReplayImu;

use std::sync::{Arc, Mutex};
use std::time::Instant;

use swish_traits::{Actuator, Clock, ImuReading, SampleSource};

use crate::error::HwError;

const GRAVITY: f32 = 9.806_65;

/// Shape of the shots the simulated IMU repeats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotScript {
    /// One shot starts every `cycle_ms`.
    pub cycle_ms: u64,
    /// Rest before the burst within each cycle.
    pub lead_ms: u64,
    /// Half-sine acceleration burst length.
    pub burst_ms: u64,
    /// Nominal burst peak (m/s²).
    pub peak_mps2: f32,
    /// Per-shot peak variation as a fraction of `peak_mps2`.
    pub spread: f32,
    /// Stop after this many cycles; `None` runs forever.
    pub shots: Option<u32>,
}

impl Default for ShotScript {
    fn default() -> Self {
        Self {
            cycle_ms: 2500,
            lead_ms: 300,
            burst_ms: 500,
            peak_mps2: 32.0,
            spread: 0.1,
            shots: None,
        }
    }
}

#[inline]
fn xorshift(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// Unit interval value from a hash state.
#[inline]
fn unit(x: u32) -> f32 {
    (x as f32) / (u32::MAX as f32 + 1.0)
}

/// Deterministic IMU that performs scripted free-throw motions.
pub struct SimulatedImu<C: Clock> {
    clock: C,
    epoch: Instant,
    period_ms: u64,
    next_ms: u64,
    script: ShotScript,
    seed: u32,
    noise: u32,
    disconnect_at: Option<u64>,
}

impl<C: Clock> SimulatedImu<C> {
    /// Sample at `hz` with the default script.
    pub fn new(hz: u32, clock: C) -> Self {
        let epoch = clock.now();
        Self {
            clock,
            epoch,
            period_ms: (1000 / u64::from(hz.max(1))).max(1),
            next_ms: 0,
            script: ShotScript::default(),
            seed: 0x5157_1500,
            noise: 0x0BAD_5EED,
            disconnect_at: None,
        }
    }

    pub fn with_script(mut self, script: ShotScript) -> Self {
        self.script = script;
        self
    }

    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed.max(1);
        self.noise = xorshift(seed.max(1));
        self
    }

    /// From this clock time on, every read fails with `HwError::Disconnected`.
    pub fn with_disconnect_at(mut self, ms: u64) -> Self {
        self.disconnect_at = Some(ms);
        self
    }

    pub fn script(&self) -> &ShotScript {
        &self.script
    }

    /// Peak used for shot `k`; stable for a given seed.
    pub fn peak_for(&self, k: u64) -> f32 {
        let h = xorshift(self.seed ^ (k as u32).wrapping_mul(0x9E37_79B9));
        let jitter = unit(h).mul_add(2.0, -1.0) * self.script.spread;
        self.script.peak_mps2 * (1.0 + jitter)
    }

    fn reading_at(&mut self, t: u64) -> ImuReading {
        let cycle = self.script.cycle_ms.max(1);
        let k = t / cycle;
        let phase = t % cycle;
        let burst = self.script.burst_ms.max(1);

        let s = if phase >= self.script.lead_ms && phase < self.script.lead_ms + burst {
            let u = (phase - self.script.lead_ms) as f32 / burst as f32;
            (std::f32::consts::PI * u).sin()
        } else {
            0.0
        };
        let peak = self.peak_for(k);

        self.noise = xorshift(self.noise);
        let n = (unit(self.noise) - 0.5) * 0.1;
        ImuReading::new(
            t,
            [peak * s + n, n, GRAVITY + n],
            [n, peak * 3.0 * s, peak * 12.0 * s],
        )
    }
}

impl<C: Clock> SampleSource for SimulatedImu<C> {
    fn next_sample(
        &mut self,
    ) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.clock.ms_since(self.epoch);
        if self.disconnect_at.is_some_and(|t| now >= t) {
            return Err(Box::new(HwError::Disconnected));
        }
        if self.is_exhausted() || self.next_ms > now {
            return Ok(None);
        }
        let t = self.next_ms;
        self.next_ms += self.period_ms;
        Ok(Some(self.reading_at(t)))
    }

    fn is_exhausted(&self) -> bool {
        self.script
            .shots
            .is_some_and(|n| self.next_ms >= u64::from(n) * self.script.cycle_ms)
    }
}

/// One command as seen by an actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveCommand {
    pub pin: u8,
    pub intensity: u8,
    pub duration_ms: u64,
}

/// Actuator that records every command; clones share the record.
#[derive(Debug, Clone, Default)]
pub struct SimulatedActuator {
    log: Arc<Mutex<Vec<DriveCommand>>>,
    pins: Option<Vec<u8>>,
}

impl SimulatedActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject commands for any pin not listed, like a board with only these
    /// outputs wired.
    pub fn with_pins(mut self, pins: impl IntoIterator<Item = u8>) -> Self {
        self.pins = Some(pins.into_iter().collect());
        self
    }

    pub fn commands(&self) -> Vec<DriveCommand> {
        self.log.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Last intensity sent to `pin`, if any.
    pub fn last_level(&self, pin: u8) -> Option<u8> {
        self.log
            .lock()
            .ok()?
            .iter()
            .rev()
            .find(|c| c.pin == pin)
            .map(|c| c.intensity)
    }

    pub fn clear(&self) {
        if let Ok(mut g) = self.log.lock() {
            g.clear();
        }
    }
}

impl Actuator for SimulatedActuator {
    fn drive(
        &mut self,
        pin: u8,
        intensity: u8,
        duration_ms: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if let Some(pins) = &self.pins
            && !pins.contains(&pin)
        {
            return Err(Box::new(HwError::InvalidPin(pin)));
        }
        tracing::trace!(pin, intensity, duration_ms, "motor drive (simulated)");
        if let Ok(mut g) = self.log.lock() {
            g.push(DriveCommand {
                pin,
                intensity,
                duration_ms,
            });
        }
        Ok(())
    }
}
