//! Pattern shapes: intensity as a pure function of elapsed time.

use std::f32::consts::TAU;

/// Body location of a motor group. `All` only addresses; no motor lives there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Zone {
    UpperArm,
    LowerArm,
    Wrist,
    All,
}

impl Zone {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UpperArm => "upper_arm",
            Self::LowerArm => "lower_arm",
            Self::Wrist => "wrist",
            Self::All => "all",
        }
    }

    pub fn contains(self, other: Self) -> bool {
        self == Self::All || self == other
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named intensity levels used by the feedback policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
    Light,
    Medium,
    Strong,
}

impl Intensity {
    pub const fn level(self) -> u8 {
        match self {
            Self::Light => 64,
            Self::Medium => 128,
            Self::Strong => 255,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    None,
    SinglePulse,
    DoublePulse,
    TriplePulse,
    Continuous,
    Increasing,
    Decreasing,
    Alternating,
    Wave,
}

impl Pattern {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SinglePulse => "single_pulse",
            Self::DoublePulse => "double_pulse",
            Self::TriplePulse => "triple_pulse",
            Self::Continuous => "continuous",
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Alternating => "alternating",
            Self::Wave => "wave",
        }
    }

    const fn pulses(self) -> Option<u64> {
        match self {
            Self::SinglePulse => Some(1),
            Self::DoublePulse => Some(2),
            Self::TriplePulse => Some(3),
            _ => None,
        }
    }
}

/// Per-motor phase of the pattern state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorPhase {
    Idle,
    Pulsing,
    Ramping,
    Sustaining,
}

/// Where a motor sits inside the group a pattern was triggered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupSlot {
    pub index: u32,
    pub size: u32,
}

/// Pattern shaping knobs shared by all motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shaping {
    pub alternating_rounds: u32,
    pub wave_cycles: u32,
}

/// Intensity and phase for `pattern` at `elapsed_ms` into `duration_ms`.
///
/// - n-pulse: n equal cycles, on for the first half of each.
/// - Increasing/Decreasing: linear ramp 0→I / I→0.
/// - Alternating: slots of `D / (k * rounds)`; motor j is on in slot s iff `s mod k == j`.
/// - Wave: `I * (1 - cos(2π (t / period - j / 2k))) / 2`, so the peak sweeps
///   across the group once per period.
pub fn level_at(
    pattern: Pattern,
    target: u8,
    elapsed_ms: u64,
    duration_ms: u64,
    slot: GroupSlot,
    shaping: Shaping,
) -> (u8, MotorPhase) {
    if duration_ms == 0 || elapsed_ms >= duration_ms || pattern == Pattern::None {
        return (0, MotorPhase::Idle);
    }
    let full = f32::from(target);
    let t = elapsed_ms as f32 / duration_ms as f32;
    let k = slot.size.max(1);

    match pattern {
        Pattern::SinglePulse | Pattern::DoublePulse | Pattern::TriplePulse => {
            let n = pattern.pulses().unwrap_or(1);
            // position within the current cycle, in units of D / n
            let cycle_pos = (elapsed_ms * n) % duration_ms;
            let on = cycle_pos * 2 < duration_ms;
            (if on { target } else { 0 }, MotorPhase::Pulsing)
        }
        Pattern::Continuous => (target, MotorPhase::Sustaining),
        Pattern::Increasing => (to_level(full * t), MotorPhase::Ramping),
        Pattern::Decreasing => (to_level(full * (1.0 - t)), MotorPhase::Ramping),
        Pattern::Alternating => {
            let slots = u64::from(k) * u64::from(shaping.alternating_rounds.max(1));
            let current = (elapsed_ms * slots) / duration_ms;
            let on = current % u64::from(k) == u64::from(slot.index % k);
            (if on { target } else { 0 }, MotorPhase::Pulsing)
        }
        Pattern::Wave => {
            let cycles = shaping.wave_cycles.max(1) as f32;
            let offset = slot.index as f32 / (2 * k) as f32;
            let phase = t * cycles - offset;
            let shape = (1.0 - (TAU * phase).cos()) / 2.0;
            (to_level(full * shape), MotorPhase::Ramping)
        }
        Pattern::None => (0, MotorPhase::Idle),
    }
}

/// Round and clamp a computed level into the motor range.
#[inline]
pub fn to_level(v: f32) -> u8 {
    if !v.is_finite() {
        return 0;
    }
    v.round().clamp(0.0, 255.0) as u8
}
