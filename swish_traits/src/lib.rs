pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// One raw inertial reading as delivered by the acquisition hardware.
///
/// Units: acceleration in m/s², angular rate in deg/s, timestamp in monotonic
/// milliseconds. Gaps and repeated timestamps are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImuReading {
    pub timestamp_ms: u64,
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
}

impl ImuReading {
    pub fn new(timestamp_ms: u64, accel: [f32; 3], gyro: [f32; 3]) -> Self {
        Self {
            timestamp_ms,
            accel,
            gyro,
        }
    }
}

/// Sensor acquisition seam: yields the next raw reading, if one is ready.
pub trait SampleSource {
    /// `Ok(None)` means no reading is available right now.
    fn next_sample(&mut self) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>>;

    /// True once a finite source (trace replay) has nothing left to deliver.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Vibration motor driver seam. Commands are fire-and-forget: there is no
/// acknowledgment channel beyond the returned error.
pub trait Actuator {
    /// Drive the motor on `pin` at `intensity` (0 = off) for up to `duration_ms`.
    fn drive(
        &mut self,
        pin: u8,
        intensity: u8,
        duration_ms: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

impl<T: SampleSource + ?Sized> SampleSource for Box<T> {
    fn next_sample(&mut self) -> Result<Option<ImuReading>, Box<dyn std::error::Error + Send + Sync>> {
        (**self).next_sample()
    }

    fn is_exhausted(&self) -> bool {
        (**self).is_exhausted()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn drive(
        &mut self,
        pin: u8,
        intensity: u8,
        duration_ms: u64,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).drive(pin, intensity, duration_ms)
    }
}
