//! Test and helper doubles for swish_core.

use swish_traits::{Actuator, ImuReading, SampleSource};

/// A source that never has a reading; useful for driving haptics alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSource;

impl SampleSource for NoopSource {
    fn next_sample(
        &mut self,
    ) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(None)
    }
}

/// An actuator that accepts and discards every command.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullActuator;

impl Actuator for NullActuator {
    fn drive(
        &mut self,
        _pin: u8,
        _intensity: u8,
        _duration_ms: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

/// Replays a fixed list of readings, one per call.
#[derive(Debug, Default, Clone)]
pub struct VecSource {
    readings: std::collections::VecDeque<ImuReading>,
}

impl VecSource {
    pub fn new(readings: impl IntoIterator<Item = ImuReading>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl SampleSource for VecSource {
    fn next_sample(
        &mut self,
    ) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.readings.pop_front())
    }

    fn is_exhausted(&self) -> bool {
        self.readings.is_empty()
    }
}
