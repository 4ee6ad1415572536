use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for the control loop and its scheduler.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - ms_since(): helper to compute elapsed milliseconds from an epoch Instant
///
/// Components never call `sleep`; only the scheduler paces ticks with it.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis().min(u128::from(u64::MAX)) as u64
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Deterministic clock whose time only moves when told to.
///
/// now() = origin + offset
/// sleep(d) advances internal time by d without actually sleeping.
///
/// Clones share the same offset, so a test (or a trace replay) can hold one
/// handle while the trainer holds another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Advance the clock by `ms` milliseconds.
    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }

    /// Set the absolute offset relative to origin.
    pub fn set_offset(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = d;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        self.origin + off
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_moves_only_when_advanced() {
        let clock = ManualClock::new();
        let epoch = clock.now();
        assert_eq!(clock.ms_since(epoch), 0);
        clock.advance_ms(25);
        assert_eq!(clock.ms_since(epoch), 25);
        clock.sleep(Duration::from_millis(5));
        assert_eq!(clock.ms_since(epoch), 30);
    }

    #[test]
    fn clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        let epoch = a.now();
        b.advance_ms(40);
        assert_eq!(a.ms_since(epoch), 40);
        a.set_offset(Duration::from_millis(10));
        assert_eq!(b.ms_since(epoch), 10);
    }

    #[test]
    fn ms_since_saturates_for_future_epoch() {
        let clock = ManualClock::new();
        clock.advance_ms(100);
        let later = clock.now();
        clock.set_offset(Duration::ZERO);
        assert_eq!(clock.ms_since(later), 0);
    }
}
