//! Recorded motion trace playback.

use std::collections::VecDeque;
use std::time::Instant;

use swish_traits::{Clock, ImuReading, SampleSource};

/// Replays recorded readings, releasing each one once the clock has advanced
/// past its offset from the first reading.
pub struct ReplayImu<C: Clock> {
    clock: C,
    epoch: Instant,
    origin_ms: u64,
    pending: VecDeque<ImuReading>,
    total: usize,
}

impl<C: Clock> ReplayImu<C> {
    pub fn new(readings: impl IntoIterator<Item = ImuReading>, clock: C) -> Self {
        let pending: VecDeque<ImuReading> = readings.into_iter().collect();
        let origin_ms = pending.front().map_or(0, |r| r.timestamp_ms);
        let epoch = clock.now();
        let total = pending.len();
        tracing::debug!(readings = total, origin_ms, "trace replay ready");
        Self {
            clock,
            epoch,
            origin_ms,
            pending,
            total,
        }
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }
}

impl<C: Clock> SampleSource for ReplayImu<C> {
    fn next_sample(
        &mut self,
    ) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        let now = self.clock.ms_since(self.epoch);
        let due = self
            .pending
            .front()
            .is_some_and(|r| r.timestamp_ms.saturating_sub(self.origin_ms) <= now);
        Ok(if due { self.pending.pop_front() } else { None })
    }

    fn is_exhausted(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use swish_traits::ManualClock;

    #[test]
    fn releases_readings_relative_to_first_timestamp() {
        let clock = ManualClock::new();
        let rows = [1000, 1010, 1020, 1500].map(|t| ImuReading::new(t, [0.0; 3], [0.0; 3]));
        let mut replay = ReplayImu::new(rows, clock.clone());
        assert_eq!(replay.next_sample().unwrap().map(|r| r.timestamp_ms), Some(1000));
        assert!(replay.next_sample().unwrap().is_none());
        clock.advance_ms(20);
        assert_eq!(replay.next_sample().unwrap().map(|r| r.timestamp_ms), Some(1010));
        assert_eq!(replay.next_sample().unwrap().map(|r| r.timestamp_ms), Some(1020));
        assert!(replay.next_sample().unwrap().is_none());
        assert!(!replay.is_exhausted());
        clock.advance_ms(1000);
        assert_eq!(replay.next_sample().unwrap().map(|r| r.timestamp_ms), Some(1500));
        assert!(replay.is_exhausted());
        assert_eq!(replay.total(), 4);
    }
}
