//! Time and rate helpers shared by the trainer, runner and sampler.

/// Number of microseconds in one second.
pub const MICROS_PER_SEC: u64 = 1_000_000;
/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Compute the period in microseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 microsecond.
#[inline]
pub fn period_us(hz: u32) -> u64 {
    (MICROS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Compute the period in milliseconds for a given rate in Hz.
/// - Clamps `hz` to at least 1 to avoid division by zero.
/// - Ensures result is at least 1 millisecond.
#[inline]
pub fn period_ms(hz: u32) -> u64 {
    (MILLIS_PER_SEC / u64::from(hz.max(1))).max(1)
}

/// Readings that arrive per control tick on average, rounded up.
///
/// A `max_samples_per_tick` below this lets the backlog grow without bound.
#[inline]
pub fn samples_per_tick(sample_hz: u32, tick_hz: u32) -> usize {
    let s = u64::from(sample_hz);
    let t = u64::from(tick_hz.max(1));
    usize::try_from(s.div_ceil(t)).unwrap_or(usize::MAX).max(1)
}
